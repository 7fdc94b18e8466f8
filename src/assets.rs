//! Server icon loader. Reads the configured icon path once at startup and
//! caches its base64 data-URL string; contents are never validated or
//! resized. If the asset is absent or unreadable, the cache stays `None` and
//! the status phase simply omits the favicon field.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// Loads the icon at `path` and returns its base64 payload (without the
/// `data:image/png;base64,` prefix; callers compose the full data URL),
/// or `None` if the file is missing or unreadable.
pub fn load_icon(path: &Path) -> Option<String> {
    if !path.exists() {
        log::info!("No server icon found at {}", path.display());
        return None;
    }
    match std::fs::read(path) {
        Ok(bytes) => Some(STANDARD.encode(bytes)),
        Err(e) => {
            log::warn!("Failed to read server icon at {}: {}", path.display(), e);
            None
        }
    }
}
