//! The whitelist gate: a name list plus an enable flag, answering a single
//! predicate before any bytes are forwarded to the backend.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WhitelistState {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub players: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for WhitelistState {
    fn default() -> Self {
        WhitelistState {
            enabled: true,
            players: vec![
                "Notch".to_string(),
                "Jeb_".to_string(),
                "TuNombreAqui".to_string(),
            ],
        }
    }
}

impl WhitelistState {
    /// `true` when `enabled` is false, `players` is empty, or `name` appears
    /// in `players` by exact case-sensitive match.
    pub fn allowed(&self, name: &str) -> bool {
        !self.enabled || self.players.is_empty() || self.players.iter().any(|p| p == name)
    }
}

/// Loads the whitelist from `path`. Creates the file with defaults if absent.
/// Parse failures leave the gate permissive (`enabled = false, players = []`)
/// and are logged; this never aborts startup.
pub fn load(path: &Path) -> WhitelistState {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<WhitelistState>(&contents) {
            Ok(state) => {
                log::info!(
                    "Loaded {} whitelisted players from {} (enabled={})",
                    state.players.len(),
                    path.display(),
                    state.enabled
                );
                state
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse whitelist at {}: {}. Falling back to permissive state",
                    path.display(),
                    e
                );
                WhitelistState {
                    enabled: false,
                    players: Vec::new(),
                }
            }
        },
        Err(_) => {
            let defaults = WhitelistState::default();
            log::info!(
                "No whitelist file found at {}. Writing example whitelist.",
                path.display()
            );
            if let Ok(json) = serde_json::to_string_pretty(&defaults) {
                if let Err(e) = fs::write(path, json) {
                    log::warn!(
                        "Failed to write default whitelist to {}: {}",
                        path.display(),
                        e
                    );
                }
            }
            defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_allows_everyone() {
        let state = WhitelistState {
            enabled: false,
            players: vec!["Notch".to_string()],
        };
        assert!(state.allowed("Mallory"));
    }

    #[test]
    fn empty_list_allows_everyone() {
        let state = WhitelistState {
            enabled: true,
            players: vec![],
        };
        assert!(state.allowed("Mallory"));
    }

    #[test]
    fn enabled_nonempty_requires_membership() {
        let state = WhitelistState {
            enabled: true,
            players: vec!["Notch".to_string(), "Jeb_".to_string()],
        };
        assert!(state.allowed("Notch"));
        assert!(!state.allowed("Mallory"));
    }

    #[test]
    fn membership_is_case_sensitive() {
        let state = WhitelistState {
            enabled: true,
            players: vec!["Notch".to_string()],
        };
        assert!(!state.allowed("notch"));
    }

    #[test]
    fn missing_file_creates_default_and_is_permissive_in_effect() {
        let dir = std::env::temp_dir().join(format!(
            "mcsleepproxy-wl-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("whitelist.json");
        let _ = std::fs::remove_file(&path);

        let state = load(&path);
        assert!(state.enabled);
        assert_eq!(state.players, vec!["Notch", "Jeb_", "TuNombreAqui"]);
        assert!(path.exists());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn malformed_file_falls_back_to_permissive() {
        let dir = std::env::temp_dir().join(format!(
            "mcsleepproxy-wl-test-bad-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("whitelist.json");
        std::fs::write(&path, "{not json").unwrap();

        let state = load(&path);
        assert!(!state.enabled);
        assert!(state.players.is_empty());
        assert!(state.allowed("anyone"));

        std::fs::remove_file(&path).unwrap();
    }
}
