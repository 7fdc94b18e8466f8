//! Static startup configuration: listen/backend endpoints, wake identifier,
//! asset/whitelist paths, and the MOTD/message templates. Loaded once from a
//! TOML file and treated as immutable for the rest of the process's life.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProxyConfig {
    pub listen_host: String,
    pub listen_port: u16,

    pub backend_host: String,
    pub backend_port: u16,
    /// Opaque identifier (typically a MAC address) handed to the wake
    /// capability verbatim. The core never parses it.
    pub backend_mac: String,

    pub icon_path: PathBuf,
    pub whitelist_path: PathBuf,

    pub offline_motd_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_motd_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_motd_bold: Option<bool>,

    pub online_motd_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_motd_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_motd_bold: Option<bool>,

    pub waking_message: String,
    pub not_whitelisted_message: String,

    pub wake_cooldown_secs: u64,
    /// External program invoked with `backend_mac` as its sole argument to
    /// perform the actual Wake-on-LAN side effect.
    pub wake_command: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 25565,

            backend_host: "127.0.0.1".to_string(),
            backend_port: 25566,
            backend_mac: "00:00:00:00:00:00".to_string(),

            icon_path: PathBuf::from("server-icon.png"),
            whitelist_path: PathBuf::from("whitelist.json"),

            offline_motd_text: "\u{a7}cSuspendido. \u{a7}7Conectate para encender el servidor! "
                .to_string(),
            offline_motd_color: None,
            offline_motd_bold: None,

            online_motd_text: "\u{a7}aActivo. \u{a7}7Ingresa para jugar!".to_string(),
            online_motd_color: None,
            online_motd_bold: None,

            waking_message:
                "Despertando el servidor! Espera unos 30 segundos y vuelve a recargar la lista de servidores."
                    .to_string(),
            not_whitelisted_message: "No estas en la whitelist de este servidor.".to_string(),

            wake_cooldown_secs: 60,
            wake_command: "wakeonlan".to_string(),
        }
    }
}

/// Loads configuration from `path`. If the file does not exist, writes out
/// the defaults and returns them. If the file exists but fails to parse,
/// logs a warning and falls back to the defaults rather than aborting
/// startup. A bad config is recoverable, only a bad bind address is fatal.
pub fn load_config(path: &Path) -> ProxyConfig {
    match fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Failed to parse config at {}: {}. Falling back to defaults",
                    path.display(),
                    e
                );
                ProxyConfig::default()
            }
        },
        Err(_) => {
            log::info!(
                "No configuration file found at {}. Writing defaults.",
                path.display()
            );
            let config = ProxyConfig::default();
            if let Ok(toml_str) = toml::to_string_pretty(&config) {
                if let Err(e) = fs::write(path, toml_str) {
                    log::warn!("Failed to write default config to {}: {}", path.display(), e);
                }
            }
            config
        }
    }
}
