//! Adopters interested in one of a shelter's pets.

use adotely_types::models::{Interaction, InteractionStatus, UserProfile};
use adotely_types::{paths, DocumentStore, Predicate};
use tracing::warn;

use crate::error::AppResult;
use crate::pets::owned_pet;

const ANONYMOUS_ADOPTER: &str = "Adotante Anônimo";

#[derive(Debug, Clone, PartialEq)]
pub struct InterestedAdopter {
    pub user_id: String,
    pub name: String,
    pub age: String,
    pub city: String,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub status: InteractionStatus,
}

/// Adopters with a `curtido` or `match` record about the pet. Only the
/// owning shelter may ask.
pub fn interested_adopters(
    docs: &dyn DocumentStore,
    shelter_id: &str,
    pet_id: &str,
) -> AppResult<Vec<InterestedAdopter>> {
    owned_pet(docs, shelter_id, pet_id)?;

    let mut interested = Vec::new();
    for user_doc in docs.query(paths::USERS, &[Predicate::eq("tipo", "adotante")])? {
        let record = match docs.get(&paths::adopter_interaction(&user_doc.id, pet_id))? {
            Some(doc) => match doc.decode::<Interaction>() {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping malformed interaction {}: {}", doc.path, e);
                    continue;
                }
            },
            None => continue,
        };
        if !record.status.is_positive() {
            continue;
        }

        let profile: UserProfile = user_doc.decode().unwrap_or_default();
        let name = if profile.name.trim().is_empty() {
            ANONYMOUS_ADOPTER.to_string()
        } else {
            profile.name
        };
        interested.push(InterestedAdopter {
            user_id: user_doc.id,
            name,
            age: profile.age,
            city: profile.city,
            photo_url: profile.photo_url,
            bio: profile.bio,
            status: record.status,
        });
    }
    Ok(interested)
}
