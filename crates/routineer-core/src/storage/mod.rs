pub mod database;

pub use database::Database;

use std::path::PathBuf;

/// Returns `~/.config/routineer[-dev]/` based on ROUTINEER_ENV, or the
/// directory named by ROUTINEER_DATA_DIR when set.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = match std::env::var("ROUTINEER_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ROUTINEER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("routineer-dev")
            } else {
                base_dir.join("routineer")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
