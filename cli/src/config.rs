use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "127.0.0.1";

pub struct Config {
    pub db_path: PathBuf,
    pub port: u16,
    pub bind: String,
}

impl Config {
    /// Resolve the data directory and apply `FITTRACK_DB`, `FITTRACK_PORT` and
    /// `FITTRACK_BIND` overrides.
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "fittrack").context("Could not determine home directory")?;
        let data_dir = proj_dirs.data_dir().to_path_buf();

        let config = Self::resolve(
            &data_dir,
            std::env::var("FITTRACK_DB").ok(),
            std::env::var("FITTRACK_PORT").ok(),
            std::env::var("FITTRACK_BIND").ok(),
        )?;

        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
        Ok(config)
    }

    fn resolve(
        data_dir: &std::path::Path,
        db: Option<String>,
        port: Option<String>,
        bind: Option<String>,
    ) -> Result<Self> {
        let db_path = db
            .filter(|p| !p.trim().is_empty())
            .map_or_else(|| data_dir.join("fittrack.db"), PathBuf::from);
        let port = match port.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p
                .parse()
                .with_context(|| format!("Invalid FITTRACK_PORT '{p}'"))?,
            _ => DEFAULT_PORT,
        };
        let bind = bind
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        Ok(Config {
            db_path,
            port,
            bind,
        })
    }
}
