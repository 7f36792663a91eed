//! Key paths of the deployed data layout.
//!
//! Document paths alternate collection and id segments, so a document path
//! has an even number of segments and a collection path an odd one.

use crate::error::{StoreError, StoreResult};

pub const USERS: &str = "usuarios";
pub const PETS: &str = "pets";
pub const INTERACTIONS: &str = "interacoes";
pub const CHATS: &str = "chats";
pub const TYPING: &str = "statusDigitando";

pub fn user(user_id: &str) -> String {
    format!("{USERS}/{user_id}")
}

pub fn pet(pet_id: &str) -> String {
    format!("{PETS}/{pet_id}")
}

/// Collection of an adopter's pet-directed interaction records.
pub fn adopter_interactions(adopter_id: &str) -> String {
    format!("{INTERACTIONS}/{adopter_id}/pets")
}

pub fn adopter_interaction(adopter_id: &str, pet_id: &str) -> String {
    format!("{INTERACTIONS}/{adopter_id}/pets/{pet_id}")
}

/// Collection of a shelter's adopter-directed interaction records.
pub fn shelter_interactions(shelter_id: &str) -> String {
    format!("{INTERACTIONS}/{shelter_id}/usuarios")
}

pub fn shelter_interaction(shelter_id: &str, adopter_id: &str) -> String {
    format!("{INTERACTIONS}/{shelter_id}/usuarios/{adopter_id}")
}

pub fn chat(conversation_key: &str) -> String {
    format!("{CHATS}/{conversation_key}")
}

pub fn typing(conversation_key: &str, user_id: &str) -> String {
    format!("{TYPING}/{conversation_key}/{user_id}")
}

/// Split a path into segments, rejecting empty segments.
pub fn segments(path: &str) -> StoreResult<Vec<&str>> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath("empty path".into()));
    }
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

pub fn is_document_path(path: &str) -> bool {
    segments(path).map(|s| s.len() % 2 == 0).unwrap_or(false)
}

pub fn is_collection_path(path: &str) -> bool {
    segments(path).map(|s| s.len() % 2 == 1).unwrap_or(false)
}

/// `(collection, id)` of a document path.
pub fn split_document(path: &str) -> StoreResult<(String, String)> {
    let parts = segments(path)?;
    if parts.len() % 2 != 0 {
        return Err(StoreError::InvalidPath(format!("not a document path: {}", path)));
    }
    let (id, collection) = parts.split_last().ok_or_else(|| StoreError::InvalidPath(path.into()))?;
    Ok((collection.join("/"), id.to_string()))
}

/// Parent of a realtime node path, `None` for a top-level node.
pub fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(p, _)| p)
}
