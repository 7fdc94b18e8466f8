//! A debounced one-shot that emits a Wake-on-LAN signal to the backend and
//! suppresses re-emission for a cooldown window.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;
use tokio::time::Duration;

struct Inner {
    waking: AtomicBool,
    mac: String,
    command: String,
    cooldown: Duration,
}

/// Process-wide wake state, guarded by a single atomic flag. Cheaply
/// cloneable; clones share the same underlying flag.
#[derive(Clone)]
pub struct WakeTrigger {
    inner: Arc<Inner>,
}

impl WakeTrigger {
    pub fn new(mac: String, command: String, cooldown: Duration) -> Self {
        WakeTrigger {
            inner: Arc::new(Inner {
                waking: AtomicBool::new(false),
                mac,
                command,
                cooldown,
            }),
        }
    }

    /// If not already waking, flips the flag, invokes the wake command, and
    /// schedules the flag to reset after the cooldown. If a wake is already
    /// in flight, the request is coalesced (logged, no side effect).
    ///
    /// Concurrent callers observe at most one outstanding wake per cycle:
    /// the `compare_exchange` below is the single point of serialization.
    pub async fn request(&self, player_name: &str) {
        let already_waking = self
            .inner
            .waking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err();

        if already_waking {
            log::info!(
                "Wake already in progress; coalescing request from {}",
                player_name
            );
            return;
        }

        log::info!(
            "Sending wake signal for {} (requested by {})",
            self.inner.mac,
            player_name
        );
        if let Err(e) = Command::new(&self.inner.command)
            .arg(&self.inner.mac)
            .status()
            .await
        {
            log::warn!("Failed to invoke wake command {}: {}", self.inner.command, e);
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.cooldown).await;
            inner.waking.store(false, Ordering::SeqCst);
            log::debug!("Wake cooldown elapsed; ready for next request");
        });
    }

    #[cfg(test)]
    pub fn is_waking(&self) -> bool {
        self.inner.waking.load(Ordering::SeqCst)
    }
}
