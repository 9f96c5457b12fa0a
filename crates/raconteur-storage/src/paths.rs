//! Path utilities for Raconteur directory resolution.
//!
//! This is the canonical source for shared path functions. Re-exported by
//! raconteur-core for convenience.

use anyhow::Result;
use std::path::PathBuf;

const RACONTEUR_DIR: &str = ".raconteur";
const MASTER_KEY_FILE: &str = "master.key";

/// Environment variable to override the Raconteur directory.
const RACONTEUR_DIR_ENV: &str = "RACONTEUR_DIR";

/// Resolve the Raconteur configuration directory.
/// Priority: RACONTEUR_DIR env var > ~/.raconteur/
pub fn resolve_raconteur_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(RACONTEUR_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(RACONTEUR_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the Raconteur directory exists and return its path.
pub fn ensure_raconteur_dir() -> Result<PathBuf> {
    let dir = resolve_raconteur_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the master key path: ~/.raconteur/master.key
pub fn master_key_path() -> Result<PathBuf> {
    Ok(resolve_raconteur_dir()?.join(MASTER_KEY_FILE))
}
