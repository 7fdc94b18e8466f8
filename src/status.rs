//! Builds the StatusView JSON sent to clients during the status phase,
//! merging the configured MOTD templates with (when available) the
//! backend's authoritative player counts.

use crate::config::ProxyConfig;
use serde_json::{Value, json};

const SERVER_NAME: &str = "mc-sleepproxy";

fn description(text: &str, color: &Option<String>, bold: &Option<bool>) -> Value {
    match (color, bold) {
        (None, None) => json!({ "text": text }),
        _ => {
            let mut obj = serde_json::Map::new();
            obj.insert("text".to_string(), json!(text));
            if let Some(c) = color {
                obj.insert("color".to_string(), json!(c));
            }
            if let Some(b) = bold {
                obj.insert("bold".to_string(), json!(b));
            }
            Value::Object(obj)
        }
    }
}

fn offline_template(config: &ProxyConfig) -> Value {
    json!({
        "version": { "name": SERVER_NAME, "protocol": 0 },
        "players": { "max": 20, "online": 0, "sample": [] },
        "description": description(
            &config.offline_motd_text,
            &config.offline_motd_color,
            &config.offline_motd_bold,
        ),
    })
}

fn online_template(config: &ProxyConfig) -> Value {
    json!({
        "version": { "name": SERVER_NAME, "protocol": 0 },
        "players": { "max": 0, "online": 0, "sample": [] },
        "description": description(
            &config.online_motd_text,
            &config.online_motd_color,
            &config.online_motd_bold,
        ),
    })
}

/// The StatusView shown while the backend is unreachable: offline template
/// verbatim, with the client's advertised protocol and the favicon (if any).
pub fn offline_view(config: &ProxyConfig, client_protocol: i32, favicon: Option<&str>) -> Value {
    finish(offline_template(config), client_protocol, favicon)
}

/// The StatusView shown while the backend is reachable. If `backend_status`
/// was fetched successfully, its fields are preserved except `description`,
/// which is always overwritten with the online template; live player
/// counts survive, decorative MOTD does not. If the fetch failed,
/// `backend_status` is `None` and the online template is used verbatim.
pub fn online_view(
    config: &ProxyConfig,
    client_protocol: i32,
    favicon: Option<&str>,
    backend_status: Option<Value>,
) -> Value {
    let mut view = match backend_status {
        Some(mut v) => {
            v["description"] = description(
                &config.online_motd_text,
                &config.online_motd_color,
                &config.online_motd_bold,
            );
            v
        }
        None => online_template(config),
    };
    view = finish(view, client_protocol, favicon);
    view
}

fn finish(mut view: Value, client_protocol: i32, favicon: Option<&str>) -> Value {
    match view.get_mut("version").and_then(Value::as_object_mut) {
        Some(version) => {
            version.insert("protocol".to_string(), json!(client_protocol));
        }
        None => {
            view["version"] = json!({ "name": SERVER_NAME, "protocol": client_protocol });
        }
    }
    if let Some(icon) = favicon {
        view["favicon"] = json!(format!("data:image/png;base64,{}", icon));
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProxyConfig {
        ProxyConfig::default()
    }

    #[test]
    fn offline_view_uses_client_protocol_and_omits_backend_data() {
        let view = offline_view(&config(), 767, None);
        assert_eq!(view["version"]["protocol"], 767);
        assert_eq!(view["players"]["online"], 0);
        assert!(view.get("favicon").is_none());
    }

    #[test]
    fn online_view_preserves_backend_player_counts_but_overrides_description() {
        let backend = serde_json::json!({
            "version": { "name": "real server", "protocol": 767 },
            "players": { "max": 20, "online": 3, "sample": [] },
            "description": { "text": "a totally different MOTD" }
        });
        let cfg = config();
        let view = online_view(&cfg, 767, None, Some(backend));
        assert_eq!(view["players"]["online"], 3);
        assert_eq!(view["players"]["max"], 20);
        assert_eq!(view["description"]["text"], cfg.online_motd_text);
    }

    #[test]
    fn online_view_falls_back_to_template_on_fetch_failure() {
        let cfg = config();
        let view = online_view(&cfg, 767, None, None);
        assert_eq!(view["description"]["text"], cfg.online_motd_text);
        assert_eq!(view["players"]["online"], 0);
    }

    #[test]
    fn favicon_included_only_when_present() {
        let view = offline_view(&config(), 767, Some("QUJD"));
        assert_eq!(view["favicon"], "data:image/png;base64,QUJD");
    }

    #[test]
    fn online_view_survives_non_object_version_from_backend() {
        let backend = serde_json::json!({
            "version": "not an object",
            "players": { "max": 20, "online": 3, "sample": [] },
            "description": { "text": "whatever" }
        });
        let view = online_view(&config(), 767, None, Some(backend));
        assert_eq!(view["version"]["protocol"], 767);
        assert_eq!(view["players"]["online"], 3);
    }
}
