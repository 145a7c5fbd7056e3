use clap::Parser;
use diptych_edit::{logger, server, Config, Editor, RemoteLoader};
use std::process::ExitCode;
use std::sync::Arc;

/// Web demo for instruction-based image editing.
#[derive(Parser, Debug)]
#[command(name = "diptych-edit", version, about, long_about = None)]
struct Args {
    /// Port for the web app (overrides PORT).
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let env_loaded = dotenv::dotenv().is_ok();

    if let Err(e) = logger::init_with_config(logger::LoggerConfig::from_env()) {
        eprintln!("Failed to initialize logger: {}", e);
        return ExitCode::FAILURE;
    }
    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }

    let mut config = Config::from_env();
    if let Some(port) = args.port {
        config = config.with_port(port);
    }

    if let Err(e) = run(config).await {
        log::error!("❌ {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port(),
    );
    logger::log_config_info(&config);

    let loader = RemoteLoader::new(&config.pipeline)?;
    let editor = Arc::new(Editor::new(Arc::new(loader)));

    server::serve(editor.clone(), &config).await?;

    log::info!("👋 Server stopped, releasing pipeline");
    editor.shutdown().await?;
    Ok(())
}
