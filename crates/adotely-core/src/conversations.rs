//! The conversation gate: who a user may chat with, and the list of those
//! conversations.

use std::collections::HashSet;

use adotely_types::models::{Interaction, InteractionStatus, Role, UserProfile};
use adotely_types::{paths, DocumentStore};
use tracing::warn;

use crate::backend::Backend;
use crate::chat::{last_message, MessagePreview};
use crate::error::AppResult;
use crate::profiles::find_profile;

/// Stable key of the conversation between two users, independent of order.
pub fn conversation_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}-{b}")
    } else {
        format!("{b}-{a}")
    }
}

/// Users `user` may chat with: the other party of every `match` record the
/// user holds. Order follows the store's ordering; duplicates are dropped.
pub fn eligible_partners(docs: &dyn DocumentStore, user: &UserProfile) -> AppResult<Vec<String>> {
    let collection = match user.role {
        Role::Adopter => paths::adopter_interactions(&user.id),
        Role::Shelter => paths::shelter_interactions(&user.id),
    };

    let mut seen = HashSet::new();
    let mut partners = Vec::new();
    for doc in docs.query(&collection, &[])? {
        let record: Interaction = match doc.decode() {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed interaction {}: {}", doc.path, e);
                continue;
            }
        };
        if record.status != InteractionStatus::Match {
            continue;
        }
        let partner = match user.role {
            Role::Adopter => record.shelter_id,
            Role::Shelter => record.adopter_id.or(Some(doc.id)),
        };
        if let Some(partner) = partner {
            if seen.insert(partner.clone()) {
                partners.push(partner);
            }
        }
    }
    Ok(partners)
}

#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub partner: UserProfile,
    pub key: String,
    pub last_message: Option<MessagePreview>,
}

/// Conversations available to `user`, in partner order. Partners whose
/// profile is gone are left out.
pub fn list_conversations(backend: &Backend, user: &UserProfile) -> AppResult<Vec<ConversationSummary>> {
    let mut summaries = Vec::new();
    for partner_id in eligible_partners(&*backend.docs, user)? {
        let Some(partner) = find_profile(&*backend.docs, &partner_id)? else {
            warn!("Match partner {} of {} has no profile", partner_id, user.id);
            continue;
        };
        let key = conversation_key(&user.id, &partner_id);
        let last_message = last_message(&*backend.realtime, &key)?;
        summaries.push(ConversationSummary {
            partner,
            key,
            last_message,
        });
    }
    Ok(summaries)
}
