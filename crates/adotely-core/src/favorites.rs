//! An adopter's pets by disposition: liked, matched and rejected.

use std::sync::Arc;

use adotely_types::models::{Interaction, InteractionStatus, Pet};
use adotely_types::{paths, Document, DocumentStore, Snapshot, Subscription};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::matching::{Disposition, DispositionOutcome, MatchService};
use crate::pets::find_pet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every disposition, rejections included.
    #[default]
    All,
    Only(InteractionStatus),
}

impl StatusFilter {
    fn accepts(self, status: InteractionStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => status == wanted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FavoritePet {
    pub pet: Pet,
    pub status: InteractionStatus,
}

/// Pets the adopter has a disposition on, filtered by status. Records whose
/// pet has been deleted are skipped.
pub fn list_favorites(
    docs: &dyn DocumentStore,
    adopter_id: &str,
    filter: StatusFilter,
) -> AppResult<Vec<FavoritePet>> {
    let records = docs.query(&paths::adopter_interactions(adopter_id), &[])?;
    collect_favorites(docs, records.iter(), filter)
}

/// Live variant of [`list_favorites`]. The list is rebuilt on every change to
/// the adopter's interactions; a failed pet lookup skips that emission.
pub fn watch_favorites(
    docs: Arc<dyn DocumentStore>,
    adopter_id: &str,
    filter: StatusFilter,
    on_change: impl Fn(Vec<FavoritePet>) + Send + Sync + 'static,
) -> AppResult<Subscription> {
    let collection = paths::adopter_interactions(adopter_id);
    let lookup = docs.clone();
    let subscription = docs.subscribe(
        &collection,
        Arc::new(move |snapshot: Snapshot| {
            match collect_favorites(&*lookup, snapshot.documents().into_iter(), filter) {
                Ok(favorites) => on_change(favorites),
                Err(e) => warn!("Could not refresh favorites: {}", e),
            }
        }),
    )?;
    Ok(subscription)
}

/// Change a disposition from the favorites list. Goes through the same
/// reconciling write as a swipe, so a like can still become a match.
pub fn change_status(
    matcher: &MatchService,
    adopter_id: &str,
    pet_id: &str,
    disposition: Disposition,
) -> AppResult<DispositionOutcome> {
    matcher.record_disposition(adopter_id, pet_id, disposition)
}

fn collect_favorites<'a>(
    docs: &dyn DocumentStore,
    records: impl Iterator<Item = &'a Document>,
    filter: StatusFilter,
) -> AppResult<Vec<FavoritePet>> {
    let mut favorites = Vec::new();
    for doc in records {
        let record: Interaction = match doc.decode() {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed interaction {}: {}", doc.path, e);
                continue;
            }
        };
        if !filter.accepts(record.status) {
            continue;
        }
        match find_pet(docs, &doc.id)? {
            Some(pet) => favorites.push(FavoritePet {
                pet,
                status: record.status,
            }),
            None => debug!("Favorite {} points at a deleted pet", doc.path),
        }
    }
    Ok(favorites)
}
