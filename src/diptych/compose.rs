use image::{
    imageops::{self, FilterType},
    DynamicImage, GenericImageView, GrayImage, Luma, RgbImage,
};

use crate::error::{EditError, Result};

use super::{DIMENSION_MULTIPLE, MASK_FILL, MASK_KEEP, MAX_HEIGHT, TARGET_WIDTH};

/// A source image ready for composition: RGB, `TARGET_WIDTH` wide, height a
/// multiple of `DIMENSION_MULTIPLE`.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub image: RgbImage,
    pub original_size: (u32, u32),
    /// Set when the source width was not `TARGET_WIDTH` and the image had to be
    /// rescaled. Callers surface this to the user.
    pub rescaled: bool,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn warning(&self) -> Option<String> {
        self.rescaled.then(|| {
            format!(
                "Only {}px wide images are supported; resized {}x{} to {}x{}",
                TARGET_WIDTH,
                self.original_size.0,
                self.original_size.1,
                self.width(),
                self.height()
            )
        })
    }
}

/// Side-by-side composite and the mask selecting its right half.
#[derive(Debug, Clone)]
pub struct Diptych {
    pub image: RgbImage,
    pub mask: GrayImage,
    /// Width of one panel.
    pub panel_width: u32,
}

impl Diptych {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

fn floor_to_multiple(value: u32) -> u32 {
    value / DIMENSION_MULTIPLE * DIMENSION_MULTIPLE
}

/// Bring an arbitrary image to `TARGET_WIDTH` x (multiple of 8), RGB.
pub fn normalize(image: &DynamicImage) -> Result<NormalizedImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EditError::UnsupportedDimensions {
            width,
            height,
            reason: "image is empty".into(),
        });
    }

    let rescaled = width != TARGET_WIDTH;
    let scaled = u64::from(height) * u64::from(TARGET_WIDTH) / u64::from(width);
    let target_height = match u32::try_from(scaled) {
        Ok(scaled) if scaled <= MAX_HEIGHT => floor_to_multiple(scaled),
        _ => {
            return Err(EditError::UnsupportedDimensions {
                width,
                height,
                reason: format!(
                    "height would be {}px at width {}, the limit is {}px",
                    scaled, TARGET_WIDTH, MAX_HEIGHT
                ),
            })
        }
    };

    if target_height == 0 {
        return Err(EditError::UnsupportedDimensions {
            width,
            height,
            reason: format!(
                "height would be below {}px at width {}",
                DIMENSION_MULTIPLE, TARGET_WIDTH
            ),
        });
    }

    let rgb = image.to_rgb8();
    let image = if rescaled {
        log::warn!(
            "⚠️  We can only deal with images {}px wide, resizing {}x{} to {}x{}",
            TARGET_WIDTH,
            width,
            height,
            TARGET_WIDTH,
            target_height
        );
        imageops::resize(&rgb, TARGET_WIDTH, target_height, FilterType::CatmullRom)
    } else if target_height != height {
        log::debug!(
            "Adjusting height {} to {} to keep it a multiple of {}",
            height,
            target_height,
            DIMENSION_MULTIPLE
        );
        imageops::resize(&rgb, TARGET_WIDTH, target_height, FilterType::CatmullRom)
    } else {
        rgb
    };

    Ok(NormalizedImage {
        image,
        original_size: (width, height),
        rescaled,
    })
}

/// Place the normalized image on the left of a blank canvas twice as wide and
/// build the matching mask.
pub fn compose(source: &NormalizedImage) -> Diptych {
    let (width, height) = source.image.dimensions();

    let mut image = RgbImage::new(width * 2, height);
    imageops::replace(&mut image, &source.image, 0, 0);

    let mask = GrayImage::from_fn(width * 2, height, |x, _| {
        if x < width {
            Luma([MASK_KEEP])
        } else {
            Luma([MASK_FILL])
        }
    });

    Diptych {
        image,
        mask,
        panel_width: width,
    }
}

/// Cut the generated right panel out of the pipeline output.
///
/// The output must have exactly the requested diptych size.
pub fn crop_result(output: &RgbImage, panel_width: u32, height: u32) -> Result<RgbImage> {
    let expected = (panel_width * 2, height);
    let actual = output.dimensions();
    if actual != expected {
        return Err(EditError::ShapeMismatch { expected, actual });
    }

    Ok(imageops::crop_imm(output, panel_width, 0, panel_width, height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_normalize_rescales_wide_image() {
        let normalized = normalize(&solid(1024, 768, [10, 20, 30])).unwrap();
        assert_eq!(normalized.image.dimensions(), (512, 384));
        assert!(normalized.rescaled);
        assert_eq!(normalized.original_size, (1024, 768));
        assert!(normalized.warning().unwrap().contains("512x384"));
    }

    #[test]
    fn test_normalize_floors_height_when_rescaling() {
        // 300 * 512 / 700 = 219.4 -> 219 -> 216
        let normalized = normalize(&solid(700, 300, [0, 0, 0])).unwrap();
        assert_eq!(normalized.image.dimensions(), (512, 216));
        assert!(normalized.rescaled);
    }

    #[test]
    fn test_normalize_upscales_narrow_image() {
        let normalized = normalize(&solid(256, 256, [0, 0, 0])).unwrap();
        assert_eq!(normalized.image.dimensions(), (512, 512));
        assert!(normalized.rescaled);
    }

    #[test]
    fn test_normalize_keeps_512_wide_image() {
        let normalized = normalize(&solid(512, 320, [1, 2, 3])).unwrap();
        assert_eq!(normalized.image.dimensions(), (512, 320));
        assert!(!normalized.rescaled);
        assert!(normalized.warning().is_none());
        assert_eq!(normalized.image.get_pixel(100, 100), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_normalize_512_wide_still_floors_height() {
        let normalized = normalize(&solid(512, 301, [0, 0, 0])).unwrap();
        assert_eq!(normalized.image.dimensions(), (512, 296));
        assert!(!normalized.rescaled);
    }

    #[test]
    fn test_normalize_converts_to_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(512, 64, Luma([200])));
        let normalized = normalize(&gray).unwrap();
        assert_eq!(normalized.image.get_pixel(0, 0), &Rgb([200, 200, 200]));

        let rgba = DynamicImage::new_rgba8(512, 64);
        assert_eq!(normalize(&rgba).unwrap().image.dimensions(), (512, 64));
    }

    #[test]
    fn test_normalize_rejects_degenerate_images() {
        assert!(matches!(
            normalize(&solid(2048, 10, [0, 0, 0])),
            Err(EditError::UnsupportedDimensions { .. })
        ));
        assert!(normalize(&DynamicImage::new_rgb8(0, 0)).is_err());
    }

    #[test]
    fn test_normalize_rejects_extreme_aspect_ratios() {
        // 9_000_000 * 512 does not fit in u32
        let result = normalize(&DynamicImage::new_luma8(1, 9_000_000));
        match result {
            Err(EditError::UnsupportedDimensions { width, height, reason }) => {
                assert_eq!((width, height), (1, 9_000_000));
                assert!(reason.contains("4608000000"));
            }
            other => panic!("expected rejection, got {:?}", other.map(|n| n.original_size)),
        }

        assert!(matches!(
            normalize(&DynamicImage::new_luma8(1, 40_000)),
            Err(EditError::UnsupportedDimensions { .. })
        ));
        assert!(matches!(
            normalize(&DynamicImage::new_luma8(512, MAX_HEIGHT + 8)),
            Err(EditError::UnsupportedDimensions { .. })
        ));
    }

    #[test]
    fn test_normalize_accepts_tallest_allowed_height() {
        let normalized = normalize(&DynamicImage::new_luma8(256, MAX_HEIGHT / 2)).unwrap();
        assert_eq!(normalized.image.dimensions(), (512, MAX_HEIGHT));
    }

    #[test]
    fn test_compose_layout_and_mask() {
        let normalized = normalize(&solid(512, 64, [9, 8, 7])).unwrap();
        let diptych = compose(&normalized);

        assert_eq!(diptych.image.dimensions(), (1024, 64));
        assert_eq!(diptych.mask.dimensions(), diptych.image.dimensions());
        assert_eq!(diptych.panel_width, 512);

        for (x, _, pixel) in diptych.mask.enumerate_pixels() {
            let expected = if x < 512 { MASK_KEEP } else { MASK_FILL };
            assert_eq!(pixel.0[0], expected);
        }
        for (x, _, pixel) in diptych.image.enumerate_pixels() {
            let expected = if x < 512 { [9, 8, 7] } else { [0, 0, 0] };
            assert_eq!(pixel.0, expected);
        }
    }

    #[test]
    fn test_crop_takes_right_half() {
        let mut output = RgbImage::from_pixel(1024, 64, Rgb([255, 0, 0]));
        for x in 512..1024 {
            for y in 0..64 {
                output.put_pixel(x, y, Rgb([0, (x - 512) as u8, y as u8]));
            }
        }

        let cropped = crop_result(&output, 512, 64).unwrap();
        assert_eq!(cropped.dimensions(), (512, 64));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(cropped.get_pixel(10, 5), &Rgb([0, 10, 5]));
    }

    #[test]
    fn test_crop_rejects_wrong_shape() {
        let output = RgbImage::new(1024, 1024);
        match crop_result(&output, 512, 384) {
            Err(EditError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, (1024, 384));
                assert_eq!(actual, (1024, 1024));
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }
}
