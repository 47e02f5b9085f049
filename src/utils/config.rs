use std::collections::HashMap;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use tracing::info;

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_DB_PATH: &str = "db/mercari.sqlite3";
pub const DEFAULT_IMAGE_DIR: &str = "images";
pub const DEFAULT_FRONT_URL: &str = "http://localhost:3000";

/// Values given on the command line or through the process environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub front_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    pub db_path: PathBuf,
    pub image_dir: PathBuf,
    /// The one caller origin allowed by CORS.
    pub front_url: String,
}

/// Main entry point to get server settings.
/// Explicit overrides win, then the `.env` file, then built-in defaults.
pub fn resolve(overrides: Overrides, env_path: &Path) -> Result<Settings> {
    let file = if env_path.exists() {
        let values = load_from_env(env_path)?;
        info!("Loaded {} setting(s) from {:?}", values.len(), env_path);
        values
    } else {
        HashMap::new()
    };

    let port = match overrides.port {
        Some(port) => port,
        None => match file.get("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid PORT in {:?}: {}", env_path, raw))?,
            None => DEFAULT_PORT,
        },
    };

    let db_path = overrides
        .db_path
        .or_else(|| file.get("DB_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

    let image_dir = overrides
        .image_dir
        .or_else(|| file.get("IMAGE_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_DIR));

    let front_url = overrides
        .front_url
        .or_else(|| file.get("FRONT_URL").cloned())
        .unwrap_or_else(|| DEFAULT_FRONT_URL.to_string());

    Ok(Settings { port, db_path, image_dir, front_url })
}

/// Reads `KEY=VALUE` pairs without touching the process environment.
fn load_from_env(path: &Path) -> Result<HashMap<String, String>> {
    let entries = dotenvy::from_path_iter(path).with_context(|| format!("Failed to open {:?}", path))?;

    let mut values = HashMap::new();
    for entry in entries {
        let (key, value) = entry.with_context(|| format!("Malformed line in {:?}", path))?;
        values.insert(key, value);
    }

    Ok(values)
}
