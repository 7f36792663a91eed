//! One-to-one messages in the realtime store, under `chats/{conversationKey}`.

use std::sync::Arc;

use adotely_types::models::ChatMessage;
use adotely_types::{paths, RealtimeStore, StoreError, Subscription};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::conversations::conversation_key;
use crate::error::{AppError, AppResult};
use crate::now_millis;

/// What the conversation list shows under a partner's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePreview {
    Text(String),
    Image,
}

impl MessagePreview {
    fn of(message: &ChatMessage) -> Self {
        if message.text.trim().is_empty() && message.image_url.is_some() {
            Self::Image
        } else {
            Self::Text(message.text.clone())
        }
    }
}

impl std::fmt::Display for MessagePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Image => f.write_str("[imagem]"),
        }
    }
}

/// Decode a conversation node into messages ordered by timestamp. Push keys
/// break ties.
pub fn parse_messages(value: Option<Value>) -> Vec<ChatMessage> {
    let Some(Value::Object(children)) = value else {
        return Vec::new();
    };
    let mut messages: Vec<ChatMessage> = children
        .into_iter()
        .filter_map(|(key, child)| match serde_json::from_value::<ChatMessage>(child) {
            Ok(mut message) => {
                message.id = key;
                Some(message)
            }
            Err(e) => {
                warn!("Skipping malformed message {}: {}", key, e);
                None
            }
        })
        .collect();
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    messages
}

/// Append a message from `from` to `to`. An image, when given, is uploaded
/// first and its URL stored on the message.
pub fn send_message(
    backend: &Backend,
    from: &str,
    to: &str,
    text: &str,
    image: Option<&[u8]>,
) -> AppResult<ChatMessage> {
    let text = text.trim();
    let image = image.filter(|bytes| !bytes.is_empty());
    if text.is_empty() && image.is_none() {
        return Err(AppError::invalid("texto", "empty message"));
    }
    if from == to {
        return Err(AppError::invalid("para", "cannot message yourself"));
    }

    let key = conversation_key(from, to);
    let image_url = match image {
        Some(bytes) => {
            let blob_path = format!("{}/{}/{}.jpg", paths::CHATS, key, uuid::Uuid::new_v4());
            Some(backend.store_blob(&blob_path, bytes)?)
        }
        None => None,
    };

    let mut message = ChatMessage {
        id: String::new(),
        text: text.to_string(),
        image_url,
        from: from.to_string(),
        to: to.to_string(),
        timestamp: now_millis(),
        read: false,
    };
    let value = serde_json::to_value(&message).map_err(StoreError::from)?;
    message.id = backend.realtime.push(&paths::chat(&key), value)?;
    debug!("Message {} appended to {}", message.id, key);
    Ok(message)
}

pub fn load_messages(realtime: &dyn RealtimeStore, key: &str) -> AppResult<Vec<ChatMessage>> {
    Ok(parse_messages(realtime.get_once(&paths::chat(key))?))
}

/// Latest message of a conversation, for list previews.
pub fn last_message(realtime: &dyn RealtimeStore, key: &str) -> AppResult<Option<MessagePreview>> {
    Ok(load_messages(realtime, key)?.last().map(MessagePreview::of))
}

/// Live, timestamp-ordered message list of a conversation.
pub fn watch_messages(
    realtime: &dyn RealtimeStore,
    key: &str,
    on_change: impl Fn(Vec<ChatMessage>) + Send + Sync + 'static,
) -> AppResult<Subscription> {
    let subscription = realtime.subscribe(
        &paths::chat(key),
        Arc::new(move |value: Option<Value>| on_change(parse_messages(value))),
    )?;
    Ok(subscription)
}
