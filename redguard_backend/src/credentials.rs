use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    #[serde(default)]
    pub agent_name: Option<String>,
}

impl Credentials {
    /// Resolve the Moltbook API key: `MOLTBOOK_API_KEY`, then the configured
    /// file, then `./credentials.json`, then `~/.config/moltbook/credentials.json`.
    pub fn discover(configured: Option<&str>) -> Result<Self> {
        if let Ok(key) = std::env::var("MOLTBOOK_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(Self {
                    api_key: key.trim().to_string(),
                    agent_name: None,
                });
            }
        }

        for path in candidate_paths(configured) {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        bail!("No credentials.json found. Register the agent first or set MOLTBOOK_API_KEY.")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {:?}", path))?;
        let creds: Credentials = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse credentials in {:?}", path))?;
        if creds.api_key.trim().is_empty() {
            bail!("Credentials file {:?} has an empty api_key", path);
        }
        tracing::debug!("Loaded Moltbook credentials from {:?}", path);
        Ok(creds)
    }
}

fn candidate_paths(configured: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(path) = configured {
        paths.push(PathBuf::from(path));
    }
    paths.push(PathBuf::from("credentials.json"));
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config").join("moltbook").join("credentials.json"));
    }
    paths
}
