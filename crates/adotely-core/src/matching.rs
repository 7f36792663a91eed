//! Like/Match reconciliation.
//!
//! Every disposition is a pair of records: the adopter's record about a pet
//! and the shelter's record about the adopter. A match exists only when both
//! sides say `match`. The two writes cannot be made atomic, so the actor's own
//! record is written first and the counterpart write is retried a few times;
//! whatever still diverges afterwards is converged by [`crate::sweep`].

use std::sync::Arc;

use adotely_types::models::{Interaction, InteractionStatus};
use adotely_types::{paths, to_fields, DocumentStore};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::{now_millis, pets};

/// An adopter's swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Liked,
    Rejected,
}

impl Disposition {
    fn status(self) -> InteractionStatus {
        match self {
            Self::Liked => InteractionStatus::Liked,
            Self::Rejected => InteractionStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Attempts at the counterpart write before leaving it to the sweep.
    pub counterpart_attempts: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            counterpart_attempts: 3,
        }
    }
}

/// Result of a reconciling write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispositionOutcome {
    /// Status written to the actor's own record.
    pub status: InteractionStatus,
    /// The counterpart record could not be written and awaits the sweep.
    pub counterpart_pending: bool,
}

#[derive(Clone)]
pub struct MatchService {
    docs: Arc<dyn DocumentStore>,
    config: MatchConfig,
}

impl MatchService {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(docs, MatchConfig::default())
    }

    pub fn with_config(docs: Arc<dyn DocumentStore>, config: MatchConfig) -> Self {
        Self { docs, config }
    }

    /// The adopter's record about a pet, if any.
    pub fn adopter_interaction(
        &self,
        adopter_id: &str,
        pet_id: &str,
    ) -> AppResult<Option<Interaction>> {
        read_interaction(&*self.docs, &paths::adopter_interaction(adopter_id, pet_id))
    }

    /// The shelter's record about an adopter, if any.
    pub fn shelter_interaction(
        &self,
        shelter_id: &str,
        adopter_id: &str,
    ) -> AppResult<Option<Interaction>> {
        read_interaction(&*self.docs, &paths::shelter_interaction(shelter_id, adopter_id))
    }

    /// Record an adopter's like or rejection of a pet.
    ///
    /// A like becomes a match when the owning shelter has already shown
    /// interest in the adopter; both records are then written as `match`
    /// with the same timestamp. A rejection is written as is and never
    /// touches the shelter's record, even when the shelter already likes
    /// the adopter. Upgrading it to `match` would open a conversation the
    /// adopter just declined, so rejections deliberately stay verbatim.
    pub fn record_disposition(
        &self,
        adopter_id: &str,
        pet_id: &str,
        disposition: Disposition,
    ) -> AppResult<DispositionOutcome> {
        let pet = pets::load_pet(&*self.docs, pet_id)?;
        if pet.shelter_id.is_empty() {
            return Err(AppError::NotFound(format!("shelter of pet {}", pet_id)));
        }

        let reciprocal = disposition == Disposition::Liked
            && self
                .shelter_interaction(&pet.shelter_id, adopter_id)?
                .is_some_and(|record| record.status.is_positive());
        let status = if reciprocal {
            InteractionStatus::Match
        } else {
            disposition.status()
        };

        let record = Interaction::new(status, &pet.shelter_id, adopter_id, pet_id, now_millis());
        self.docs.set(
            &paths::adopter_interaction(adopter_id, pet_id),
            to_fields(&record)?,
            false,
        )?;

        let counterpart_pending = reciprocal
            && !self.write_counterpart(
                &paths::shelter_interaction(&pet.shelter_id, adopter_id),
                &record,
            )?;

        if reciprocal {
            info!("Match: adopter {} and shelter {} over pet {}", adopter_id, pet.shelter_id, pet_id);
        } else {
            debug!("Adopter {} marked pet {} as {}", adopter_id, pet_id, status);
        }
        Ok(DispositionOutcome {
            status,
            counterpart_pending,
        })
    }

    /// A shelter showing interest in an adopter on behalf of one of its pets.
    /// Mirrors [`Self::record_disposition`] from the shelter's side.
    pub fn like_adopter(
        &self,
        shelter_id: &str,
        adopter_id: &str,
        pet_id: &str,
    ) -> AppResult<DispositionOutcome> {
        pets::owned_pet(&*self.docs, shelter_id, pet_id)?;

        let reciprocal = self
            .adopter_interaction(adopter_id, pet_id)?
            .is_some_and(|record| record.status.is_positive());
        // One shelter record covers every pet; a plain like must not demote
        // a match made over another pet.
        if !reciprocal
            && self
                .shelter_interaction(shelter_id, adopter_id)?
                .is_some_and(|existing| existing.status == InteractionStatus::Match)
        {
            debug!("Shelter {} already matched adopter {}, keeping it", shelter_id, adopter_id);
            return Ok(DispositionOutcome {
                status: InteractionStatus::Match,
                counterpart_pending: false,
            });
        }
        let status = if reciprocal {
            InteractionStatus::Match
        } else {
            InteractionStatus::Liked
        };

        let record = Interaction::new(status, shelter_id, adopter_id, pet_id, now_millis());
        self.docs.set(
            &paths::shelter_interaction(shelter_id, adopter_id),
            to_fields(&record)?,
            false,
        )?;

        let counterpart_pending = reciprocal
            && !self.write_counterpart(&paths::adopter_interaction(adopter_id, pet_id), &record)?;

        info!("Shelter {} marked adopter {} as {}", shelter_id, adopter_id, status);
        Ok(DispositionOutcome {
            status,
            counterpart_pending,
        })
    }

    /// Shelter approval of an interested adopter: both records become
    /// `match` with one shared timestamp, the adopter's side first.
    pub fn approve_match(
        &self,
        shelter_id: &str,
        adopter_id: &str,
        pet_id: &str,
    ) -> AppResult<DispositionOutcome> {
        pets::owned_pet(&*self.docs, shelter_id, pet_id)?;

        let record = Interaction::new(
            InteractionStatus::Match,
            shelter_id,
            adopter_id,
            pet_id,
            now_millis(),
        );
        self.docs.set(
            &paths::adopter_interaction(adopter_id, pet_id),
            to_fields(&record)?,
            false,
        )?;
        let counterpart_pending = !self.write_counterpart(
            &paths::shelter_interaction(shelter_id, adopter_id),
            &record,
        )?;

        info!("Shelter {} approved adopter {} for pet {}", shelter_id, adopter_id, pet_id);
        Ok(DispositionOutcome {
            status: InteractionStatus::Match,
            counterpart_pending,
        })
    }

    /// Shelter rejection of an interested adopter. The adopter's record about
    /// the pet is removed, so the adopter may show interest again later.
    ///
    /// The shelter's record is shared by every pet of the shelter. It is
    /// removed too unless it holds a match over a different pet.
    pub fn reject_interest(&self, shelter_id: &str, adopter_id: &str, pet_id: &str) -> AppResult<()> {
        pets::owned_pet(&*self.docs, shelter_id, pet_id)?;

        let shelter_path = paths::shelter_interaction(shelter_id, adopter_id);
        let keep_shelter_side = self
            .shelter_interaction(shelter_id, adopter_id)?
            .is_some_and(|record| {
                record.status == InteractionStatus::Match
                    && record.pet_id.as_deref().is_some_and(|other| other != pet_id)
            });
        if keep_shelter_side {
            debug!("Keeping {}: it holds a match over another pet", shelter_path);
        } else {
            self.docs.delete(&shelter_path)?;
        }
        self.docs
            .delete(&paths::adopter_interaction(adopter_id, pet_id))?;
        info!("Shelter {} rejected adopter {} for pet {}", shelter_id, adopter_id, pet_id);
        Ok(())
    }

    /// Write the mirror record, retrying transient failures. Returns `false`
    /// when every attempt failed; the divergence is then left for the sweep.
    fn write_counterpart(&self, path: &str, record: &Interaction) -> AppResult<bool> {
        let fields = to_fields(record)?;
        let attempts = self.config.counterpart_attempts.max(1);
        for attempt in 1..=attempts {
            match self.docs.set(path, fields.clone(), false) {
                Ok(()) => return Ok(true),
                Err(e) => warn!(
                    "Counterpart write {} failed (attempt {}/{}): {}",
                    path, attempt, attempts, e
                ),
            }
        }
        warn!("Leaving {} for the reconciliation sweep", path);
        Ok(false)
    }
}

pub(crate) fn read_interaction(
    docs: &dyn DocumentStore,
    path: &str,
) -> AppResult<Option<Interaction>> {
    match docs.get(path)? {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}
