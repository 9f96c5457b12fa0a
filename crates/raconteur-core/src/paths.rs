use anyhow::Result;
use std::path::PathBuf;

// Re-export shared path utilities from raconteur-storage (single source of truth)
pub use raconteur_storage::paths::{ensure_raconteur_dir, master_key_path, resolve_raconteur_dir};

const DB_FILE: &str = "raconteur.db";
const CONFIG_FILE: &str = "config.json";
const LOGS_DIR: &str = "logs";
const SKILLS_DIR: &str = "skills";

/// Get the database path: ~/.raconteur/raconteur.db
pub fn database_path() -> Result<PathBuf> {
    Ok(resolve_raconteur_dir()?.join(DB_FILE))
}

/// Ensure database path exists and return as string.
pub fn ensure_database_path() -> Result<PathBuf> {
    Ok(ensure_raconteur_dir()?.join(DB_FILE))
}

/// Convenience helper returning the database path as a UTF-8 string.
pub fn ensure_database_path_string() -> Result<String> {
    Ok(ensure_database_path()?.to_string_lossy().into_owned())
}

/// Get the config file path: ~/.raconteur/config.json
pub fn config_path() -> Result<PathBuf> {
    Ok(resolve_raconteur_dir()?.join(CONFIG_FILE))
}

/// Get the logs directory: ~/.raconteur/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = resolve_raconteur_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// User-global skills directory: ~/.raconteur/skills/
pub fn user_skills_dir() -> Result<PathBuf> {
    let dir = ensure_raconteur_dir()?.join(SKILLS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// IPC socket path: ~/.raconteur/raconteur.sock
pub fn socket_path() -> Result<PathBuf> {
    Ok(ensure_raconteur_dir()?.join("raconteur.sock"))
}

/// Daemon PID file path: ~/.raconteur/daemon.pid
pub fn daemon_pid_path() -> Result<PathBuf> {
    Ok(ensure_raconteur_dir()?.join("daemon.pid"))
}

/// Daemon lock file path: ~/.raconteur/daemon.lock
pub fn daemon_lock_path() -> Result<PathBuf> {
    Ok(ensure_raconteur_dir()?.join("daemon.lock"))
}

/// Daemon log file path: ~/.raconteur/logs/daemon.log
pub fn daemon_log_path() -> Result<PathBuf> {
    Ok(logs_dir()?.join("daemon.log"))
}

/// Ensure the Raconteur data directory exists and return its path.
#[deprecated(note = "Use ensure_raconteur_dir instead")]
pub fn ensure_data_dir() -> Result<PathBuf> {
    ensure_raconteur_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
    }

    #[test]
    fn test_default_raconteur_dir() {
        let _lock = env_lock();
        unsafe { std::env::remove_var("RACONTEUR_DIR") };
        let dir = resolve_raconteur_dir().unwrap();
        assert!(dir.ends_with(".raconteur"));
    }

    #[test]
    fn test_env_override() {
        let _lock = env_lock();
        unsafe { std::env::set_var("RACONTEUR_DIR", "/tmp/test-raconteur") };
        let dir = resolve_raconteur_dir().unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/test-raconteur"));
        unsafe { std::env::remove_var("RACONTEUR_DIR") };
    }

    #[test]
    fn test_database_path() {
        let _lock = env_lock();
        unsafe { std::env::remove_var("RACONTEUR_DIR") };
        let path = database_path().unwrap();
        assert!(path.ends_with(DB_FILE));
        assert!(path.parent().unwrap().ends_with(".raconteur"));
    }

    #[test]
    fn test_daemon_lock_path() {
        let _lock = env_lock();
        unsafe { std::env::remove_var("RACONTEUR_DIR") };
        let path = daemon_lock_path().unwrap();
        assert!(path.ends_with("daemon.lock"));
        assert!(path.parent().unwrap().ends_with(".raconteur"));
    }
}
