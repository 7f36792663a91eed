//! Discovery feed: pets an adopter has not yet acted on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use adotely_types::models::{Interaction, InteractionStatus, Pet};
use adotely_types::{paths, DocumentStore, Snapshot, Subscription};
use tracing::warn;

use crate::error::AppResult;
use crate::matching::{Disposition, DispositionOutcome, MatchService};
use crate::pets::decode_pets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPolicy {
    /// Also hide pets the adopter swiped left on.
    pub hide_rejected: bool,
}

impl Default for FeedPolicy {
    fn default() -> Self {
        Self { hide_rejected: true }
    }
}

/// Dispositions keyed by pet id.
pub type Dispositions = HashMap<String, InteractionStatus>;

/// Filter the full pet listing down to the adopter's feed.
///
/// Adopted pets and pets with a positive disposition never appear. Pets with
/// a rejection appear only when the policy allows it. Order follows `pets`.
pub fn candidate_pets(pets: &[Pet], dispositions: &Dispositions, policy: FeedPolicy) -> Vec<Pet> {
    pets.iter()
        .filter(|pet| !pet.adopted)
        .filter(|pet| match dispositions.get(&pet.id) {
            Some(status) if status.is_positive() => false,
            Some(InteractionStatus::Rejected) => !policy.hide_rejected,
            _ => true,
        })
        .cloned()
        .collect()
}

fn dispositions_from(snapshot: &Snapshot) -> Dispositions {
    snapshot
        .documents()
        .into_iter()
        .filter_map(|doc| match doc.decode::<Interaction>() {
            Ok(record) => Some((doc.id.clone(), record.status)),
            Err(e) => {
                warn!("Skipping malformed interaction {}: {}", doc.path, e);
                None
            }
        })
        .collect()
}

#[derive(Default)]
struct FeedState {
    pets: Option<Vec<Pet>>,
    dispositions: Option<Dispositions>,
}

impl FeedState {
    fn candidates(&self, policy: FeedPolicy) -> Option<Vec<Pet>> {
        match (&self.pets, &self.dispositions) {
            (Some(pets), Some(dispositions)) => Some(candidate_pets(pets, dispositions, policy)),
            _ => None,
        }
    }
}

/// Live feed for one adopter. Recomputes whenever the pet listing or the
/// adopter's interactions change, once both have been seen at least once.
/// Dropping the watch cancels both subscriptions.
pub struct FeedWatch {
    _pets: Subscription,
    _interactions: Subscription,
}

impl FeedWatch {
    pub fn start(
        docs: &dyn DocumentStore,
        adopter_id: &str,
        policy: FeedPolicy,
        on_change: impl Fn(Vec<Pet>) + Send + Sync + 'static,
    ) -> AppResult<Self> {
        let state = Arc::new(Mutex::new(FeedState::default()));
        let on_change = Arc::new(on_change);

        let pets_sub = {
            let state = state.clone();
            let on_change = on_change.clone();
            docs.subscribe(
                paths::PETS,
                Arc::new(move |snapshot: Snapshot| {
                    let pets = decode_pets(snapshot.documents());
                    let feed = match state.lock() {
                        Ok(mut state) => {
                            state.pets = Some(pets);
                            state.candidates(policy)
                        }
                        Err(_) => None,
                    };
                    if let Some(feed) = feed {
                        on_change(feed);
                    }
                }),
            )?
        };

        let interactions_sub = {
            let state = state.clone();
            docs.subscribe(
                &paths::adopter_interactions(adopter_id),
                Arc::new(move |snapshot: Snapshot| {
                    let dispositions = dispositions_from(&snapshot);
                    let feed = match state.lock() {
                        Ok(mut state) => {
                            state.dispositions = Some(dispositions);
                            state.candidates(policy)
                        }
                        Err(_) => None,
                    };
                    if let Some(feed) = feed {
                        on_change(feed);
                    }
                }),
            )?
        };

        Ok(Self {
            _pets: pets_sub,
            _interactions: interactions_sub,
        })
    }

    pub fn stop(self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Right,
    Left,
}

/// A feed card swipe: right likes, left rejects.
pub fn swipe(
    matcher: &MatchService,
    adopter_id: &str,
    pet_id: &str,
    direction: SwipeDirection,
) -> AppResult<DispositionOutcome> {
    let disposition = match direction {
        SwipeDirection::Right => Disposition::Liked,
        SwipeDirection::Left => Disposition::Rejected,
    };
    matcher.record_disposition(adopter_id, pet_id, disposition)
}
