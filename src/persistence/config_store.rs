//! Configuration document on disk.
//!
//! The document lives next to the executable. When that directory is not
//! writable it goes to the per-user configuration directory instead. Loading
//! reads whichever of the two was written last, so edits saved to the fallback
//! survive a restart even when a stale primary document is still present.

use super::MapperConfig;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "kbmpad";

#[derive(Clone, Debug)]
pub struct ConfigStore {
    primary: PathBuf,
    fallback: Option<PathBuf>,
}

impl ConfigStore {
    /// Primary next to the executable, fallback under the user config directory.
    pub fn locate() -> Self {
        let primary = match std::env::current_exe() {
            Ok(exe) => exe
                .parent()
                .map(|dir| dir.join(CONFIG_FILE))
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE)),
            Err(e) => {
                warn!("Could not determine executable location, using current directory: {}", e);
                PathBuf::from(CONFIG_FILE)
            }
        };

        let fallback = dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE));
        if fallback.is_none() {
            warn!("Could not determine user config directory, no fallback location");
        }

        Self::with_paths(primary, fallback)
    }

    pub fn with_paths(primary: PathBuf, fallback: Option<PathBuf>) -> Self {
        debug!("Config locations: primary={:?}, fallback={:?}", primary, fallback);
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    fn locations(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.primary.as_path()).chain(self.fallback.as_deref())
    }

    /// Most recently modified document; the primary wins ties.
    fn newest_document(&self) -> Option<&Path> {
        self.locations()
            .filter_map(|path| {
                let meta = std::fs::metadata(path).ok().filter(|meta| meta.is_file())?;
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((path, modified))
            })
            .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
            .map(|(path, _)| path)
    }

    /// Never fails: a missing document yields defaults (which are written out),
    /// an unreadable or unparsable one yields defaults in memory only.
    pub fn load(&self) -> MapperConfig {
        if let Some(path) = self.newest_document() {
            return match read_document(path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    error!("{}", e);
                    warn!(
                        "Using default configuration, {} is left untouched",
                        path.display()
                    );
                    MapperConfig::default()
                }
            };
        }

        info!("No configuration found, creating default");
        let config = MapperConfig::default();
        if let Err(e) = self.save(&config) {
            error!("Failed to write default configuration: {}", e);
        }
        config
    }

    /// Writes the primary location, falling back on failure. Returns the path written.
    pub fn save(&self, config: &MapperConfig) -> Result<PathBuf> {
        let content = toml::to_string_pretty(config)
            .map_err(|e| eyre!("Failed to serialize configuration: {}", e))?;

        match std::fs::write(&self.primary, &content) {
            Ok(()) => {
                debug!("Configuration saved to {}", self.primary.display());
                return Ok(self.primary.clone());
            }
            Err(e) => warn!(
                "Could not write {}: {}, trying fallback location",
                self.primary.display(),
                e
            ),
        }

        let fallback = self
            .fallback
            .as_ref()
            .ok_or_else(|| eyre!("Failed to save configuration and no fallback location is known"))?;

        if let Some(dir) = fallback.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| eyre!("Failed to create config directory {}: {}", dir.display(), e))?;
        }
        std::fs::write(fallback, &content)
            .map_err(|e| eyre!("Failed to write config file {}: {}", fallback.display(), e))?;

        info!("Configuration saved to fallback location {}", fallback.display());
        Ok(fallback.clone())
    }
}

fn read_document(path: &Path) -> Result<MapperConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
    toml::from_str(&content)
        .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_document_writes_defaults() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::with_paths(dir.path().join("config.toml"), None);

        let config = store.load();
        assert_eq!(config, MapperConfig::default());
        assert!(store.primary().exists());
        assert_eq!(store.load(), config);
    }

    #[test]
    fn unparsable_document_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "keybinds = [not toml").unwrap();
        let store = ConfigStore::with_paths(path.clone(), None);

        assert_eq!(store.load(), MapperConfig::default());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "keybinds = [not toml"
        );
    }

    #[test]
    fn save_falls_back_when_primary_is_unwritable() {
        let dir = tempdir().unwrap();
        let primary = dir.path().join("missing-dir").join("config.toml");
        let fallback = dir.path().join("user").join("kbmpad").join("config.toml");
        let store = ConfigStore::with_paths(primary.clone(), Some(fallback.clone()));

        let mut config = MapperConfig::default();
        config.settings.mouse_sensitivity = 0.3;
        let written = store.save(&config).unwrap();

        assert_eq!(written, fallback);
        assert!(!primary.exists());
        // Load finds the fallback document
        assert_eq!(store.load().settings.mouse_sensitivity, 0.3);
    }

    #[test]
    fn save_without_any_writable_location_fails() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::with_paths(dir.path().join("nope").join("config.toml"), None);
        assert!(store.save(&MapperConfig::default()).is_err());
    }

    fn write_at(path: &Path, content: &str, secs: u64) {
        std::fs::write(path, content).unwrap();
        let modified = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs);
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[test]
    fn primary_wins_over_older_fallback_and_ties() {
        let dir = tempdir().unwrap();
        let primary = dir.path().join("primary.toml");
        let fallback = dir.path().join("fallback.toml");
        write_at(&primary, "[settings]\nmouse_sensitivity = 0.7\n", 2_000_000);
        write_at(&fallback, "[settings]\nmouse_sensitivity = 0.2\n", 1_000_000);

        let store = ConfigStore::with_paths(primary.clone(), Some(fallback.clone()));
        assert_eq!(store.load().settings.mouse_sensitivity, 0.7);

        write_at(&fallback, "[settings]\nmouse_sensitivity = 0.2\n", 2_000_000);
        assert_eq!(store.load().settings.mouse_sensitivity, 0.7);
    }

    #[test]
    fn newer_fallback_beats_stale_primary() {
        let dir = tempdir().unwrap();
        let primary = dir.path().join("primary.toml");
        let fallback = dir.path().join("fallback.toml");
        // Install directory document that can no longer be rewritten
        write_at(&primary, "[settings]\nmouse_sensitivity = 0.05\n", 1_000_000);
        write_at(&fallback, "[settings]\nmouse_sensitivity = 0.125\n", 2_000_000);

        let store = ConfigStore::with_paths(primary.clone(), Some(fallback));
        assert_eq!(store.load().settings.mouse_sensitivity, 0.125);
        assert_eq!(
            std::fs::read_to_string(&primary).unwrap(),
            "[settings]\nmouse_sensitivity = 0.05\n"
        );
    }

    #[test]
    fn directory_at_primary_path_is_skipped() {
        let dir = tempdir().unwrap();
        let primary = dir.path().join("config.toml");
        std::fs::create_dir(&primary).unwrap();
        let fallback = dir.path().join("user").join("config.toml");
        let store = ConfigStore::with_paths(primary, Some(fallback.clone()));

        let mut config = MapperConfig::default();
        config.settings.mouse_sensitivity = 0.125;
        assert_eq!(store.save(&config).unwrap(), fallback);
        assert_eq!(store.load().settings.mouse_sensitivity, 0.125);
    }
}
