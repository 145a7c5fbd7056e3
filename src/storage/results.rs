use image::{ImageFormat, RgbImage};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{EditError, Result};

/// Persists edit results as `result_{N}.png`.
///
/// N starts at the number of entries already in the directory. Naming runs
/// under a lock and files are created with `create_new`, so concurrent saves
/// into the same directory never overwrite each other; a taken name bumps N.
/// Clones share the lock.
#[derive(Clone, Default)]
pub struct ResultStore {
    lock: Arc<Mutex<()>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result_path(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("result_{}.png", index))
    }

    /// Index the next save into `dir` will start probing from.
    pub fn next_index(dir: &Path) -> Result<usize> {
        match fs::read_dir(dir) {
            Ok(entries) => Ok(entries.count()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(source) => Err(EditError::Storage {
                path: dir.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save(&self, dir: &Path, image: &RgbImage) -> Result<PathBuf> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        fs::create_dir_all(dir).map_err(|source| EditError::Storage {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut index = Self::next_index(dir)?;
        let (path, file) = loop {
            let path = Self::result_path(dir, index);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => index += 1,
                Err(source) => return Err(EditError::Storage { path, source }),
            }
        };

        if let Err(e) = write_png(&path, file, image) {
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        log::info!("💾 Saved result to {}", path.display());
        Ok(path)
    }
}

fn write_png(path: &Path, file: File, image: &RgbImage) -> Result<()> {
    let mut writer = BufWriter::new(file);
    image
        .write_to(&mut writer, ImageFormat::Png)
        .map_err(|source| EditError::ImageSave {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::sync::Arc;

    #[test]
    fn test_first_result_in_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("out");

        let store = ResultStore::new();
        let path = store.save(&dir, &RgbImage::new(4, 4)).unwrap();
        assert_eq!(path, dir.join("result_0.png"));
        assert!(path.exists());
    }

    #[test]
    fn test_index_follows_entry_count() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }
        assert_eq!(ResultStore::next_index(tmp.path()).unwrap(), 3);

        let store = ResultStore::new();
        let path = store.save(tmp.path(), &RgbImage::new(2, 2)).unwrap();
        assert_eq!(path, tmp.path().join("result_3.png"));
    }

    #[test]
    fn test_taken_name_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        // One entry, but it already holds the name result_1.png.
        fs::write(tmp.path().join("result_1.png"), b"keep me").unwrap();

        let store = ResultStore::new();
        let path = store.save(tmp.path(), &RgbImage::new(2, 2)).unwrap();
        assert_eq!(path, tmp.path().join("result_2.png"));
        assert_eq!(fs::read(tmp.path().join("result_1.png")).unwrap(), b"keep me");
    }

    #[test]
    fn test_saved_pixels_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let image = RgbImage::from_fn(8, 4, |x, y| Rgb([x as u8, y as u8, 200]));

        let path = ResultStore::new().save(tmp.path(), &image).unwrap();
        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_concurrent_saves_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(ResultStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let dir = tmp.path().to_path_buf();
                std::thread::spawn(move || store.save(&dir, &RgbImage::new(2, 2)).unwrap())
            })
            .collect();

        let mut paths: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 8);
        assert_eq!(ResultStore::next_index(tmp.path()).unwrap(), 8);
    }

    #[test]
    fn test_unwritable_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not_a_dir");
        fs::write(&file, b"x").unwrap();

        match ResultStore::new().save(&file, &RgbImage::new(2, 2)) {
            Err(EditError::Storage { path, .. }) => assert_eq!(path, file),
            other => panic!("expected a storage error, got {:?}", other),
        }
    }
}
