//! Ephemeral "is typing" flags under `statusDigitando/{key}/{userId}`.
//!
//! The flag goes up after a short pause in typing and comes down on its own
//! a few seconds later, when the input is cleared, after a send, and when
//! the indicator is dropped.

use std::sync::Arc;
use std::time::Duration;

use adotely_types::{paths, RealtimeStore, Subscription};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingConfig {
    /// Quiet period after the last keystroke before the flag is raised.
    pub debounce: Duration,
    /// How long a raised flag stays up without further input.
    pub clear_after: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            clear_after: Duration::from_secs(3),
        }
    }
}

/// Publishes the local user's typing state for one conversation.
/// Must be driven from within a tokio runtime.
pub struct TypingIndicator {
    realtime: Arc<dyn RealtimeStore>,
    path: String,
    config: TypingConfig,
    pending: Option<JoinHandle<()>>,
}

impl TypingIndicator {
    pub fn new(
        realtime: Arc<dyn RealtimeStore>,
        conversation_key: &str,
        user_id: &str,
        config: TypingConfig,
    ) -> Self {
        Self {
            realtime,
            path: paths::typing(conversation_key, user_id),
            config,
            pending: None,
        }
    }

    /// Feed the current contents of the input box.
    pub fn input_changed(&mut self, text: &str) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        if text.trim().is_empty() {
            self.clear();
            return;
        }

        let realtime = self.realtime.clone();
        let path = self.path.clone();
        let config = self.config;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(config.debounce).await;
            if let Err(e) = realtime.set(&path, Value::Bool(true)) {
                warn!("Failed to raise typing flag {}: {}", path, e);
                return;
            }
            tokio::time::sleep(config.clear_after).await;
            if let Err(e) = realtime.remove(&path) {
                warn!("Failed to clear typing flag {}: {}", path, e);
            }
        }));
    }

    pub fn message_sent(&mut self) {
        self.input_changed("");
    }

    fn clear(&self) {
        if let Err(e) = self.realtime.remove(&self.path) {
            warn!("Failed to clear typing flag {}: {}", self.path, e);
        }
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.clear();
    }
}

/// Watch whether the other participant is typing.
pub fn watch_typing(
    realtime: &dyn RealtimeStore,
    conversation_key: &str,
    other_user_id: &str,
    on_change: impl Fn(bool) + Send + Sync + 'static,
) -> AppResult<Subscription> {
    let subscription = realtime.subscribe(
        &paths::typing(conversation_key, other_user_id),
        Arc::new(move |value: Option<Value>| on_change(value == Some(Value::Bool(true)))),
    )?;
    Ok(subscription)
}
