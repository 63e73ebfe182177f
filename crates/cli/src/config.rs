use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use storage::BackendConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub session_file: PathBuf,
    pub image_bucket: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            supabase_url: std::env::var("SUPABASE_URL")
                .context("Cannot load SUPABASE_URL env variable")?,
            supabase_anon_key: std::env::var("SUPABASE_ANON_KEY")
                .context("Cannot load SUPABASE_ANON_KEY env variable")?,
            session_file: std::env::var("IRONLOG_SESSION_FILE")
                .unwrap_or_else(|_| ".ironlog/session.json".to_string())
                .into(),
            image_bucket: std::env::var("IRONLOG_IMAGE_BUCKET")
                .unwrap_or_else(|_| "images".to_string()),
            http_timeout: Duration::from_secs(match std::env::var("IRONLOG_HTTP_TIMEOUT_SECS") {
                Ok(secs) => secs
                    .parse()
                    .context("IRONLOG_HTTP_TIMEOUT_SECS must be a number")?,
                Err(_) => 30,
            }),
        })
    }

    pub fn backend(&self) -> BackendConfig {
        BackendConfig {
            timeout: self.http_timeout,
            ..BackendConfig::new(&self.supabase_url, &self.supabase_anon_key)
        }
    }
}
