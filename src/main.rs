mod catalog;
mod database;
mod server;
mod storage;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Result, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::catalog::service::CatalogService;
use crate::utils::config::{self, Overrides};

#[derive(Parser, Debug)]
#[command(author, version, about = "Marketplace item catalog API", long_about = None)]
struct Args {
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    #[arg(short, long, env = "DB_PATH")]
    db_path: Option<PathBuf>,

    #[arg(short, long, env = "IMAGE_DIR")]
    image_dir: Option<PathBuf>,

    /// Origin allowed to call the API from a browser.
    #[arg(short, long, env = "FRONT_URL")]
    front_url: Option<String>,

    /// Settings file read for anything not given above.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let overrides = Overrides {
        port: args.port,
        db_path: args.db_path,
        image_dir: args.image_dir,
        front_url: args.front_url,
    };
    let settings = config::resolve(overrides, &args.env_file)?;

    info!("Item catalog starting...");
    info!("DB: {:?}", settings.db_path);
    info!("Allowed origin: {}", settings.front_url);

    let catalog = CatalogService::open(&settings.db_path, &settings.image_dir)
        .context("Failed to open catalog")?;
    info!("Images: {:?}", catalog.images().root());
    let app = server::router(Arc::new(catalog), &settings.front_url)?;

    server::serve(app, settings.port).await?;

    info!("Item catalog stopped.");
    Ok(())
}
