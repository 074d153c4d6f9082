use std::{env, path::PathBuf};

use anyhow::Context;

use crate::tree::DEFAULT_MAX_DEPTH;

#[derive(Debug, Clone)]
pub struct Config {
    /// `memory` selects the in-process store.
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub asset_dir: PathBuf,
    pub asset_url_prefix: String,
    pub max_thread_depth: u8,
    pub mutation_max_retries: u32,
    pub seed_default_thread: bool,
    pub fetch_remote_assets: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let max_thread_depth: u8 = parse_var("MAX_THREAD_DEPTH", DEFAULT_MAX_DEPTH)?;
        anyhow::ensure!(
            (1..=16).contains(&max_thread_depth),
            "MAX_THREAD_DEPTH must be between 1 and 16, got {}",
            max_thread_depth
        );

        let mutation_max_retries: u32 = parse_var("MUTATION_MAX_RETRIES", 8)?;
        anyhow::ensure!(
            mutation_max_retries >= 1,
            "MUTATION_MAX_RETRIES must be at least 1"
        );

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            port: parse_var("PORT", 3000)?,
            asset_dir: env::var("ASSET_DIR")
                .unwrap_or_else(|_| "./blogImages".to_string())
                .into(),
            asset_url_prefix: env::var("ASSET_URL_PREFIX")
                .unwrap_or_else(|_| "/blogImages".to_string()),
            max_thread_depth,
            mutation_max_retries,
            seed_default_thread: parse_var("SEED_DEFAULT_THREAD", true)?,
            fetch_remote_assets: parse_var("FETCH_REMOTE_ASSETS", false)?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == "memory"
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {value:?}")),
        Err(_) => Ok(default),
    }
}
