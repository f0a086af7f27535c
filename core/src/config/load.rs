use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default data directory: ~/.domreplay
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".domreplay"))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.domreplay/config.toml
    let user_config = get_data_dir()?.join("config.toml");

    // Priority 2: ./domreplay.toml (current directory)
    let local_config = Path::new("domreplay.toml");

    let mut cfg = if user_config.exists() {
        load_from_path(&user_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

/// Environment overrides (highest priority).
pub fn apply_env_overrides(
    cfg: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("DOMREPLAY_SPEED") {
        if !v.trim().is_empty() {
            let speed: f64 = v
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("DOMREPLAY_SPEED must be a number, got {v:?}"))?;
            if speed <= 0.0 {
                anyhow::bail!("DOMREPLAY_SPEED must be positive, got {speed}");
            }
            cfg.player.speed = speed;
        }
    }
    if let Some(v) = lookup("DOMREPLAY_LOG") {
        if !v.trim().is_empty() {
            cfg.logging.level = v.trim().to_string();
        }
    }
    Ok(())
}
