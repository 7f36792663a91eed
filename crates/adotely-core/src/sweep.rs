//! Background convergence of interaction pairs.
//!
//! Repairs the divergence a failed counterpart write leaves behind:
//! - an adopter `match` whose shelter side is missing or only `curtido`
//! - a shelter `match` whose adopter side is missing or only `curtido`
//! - a `curtido` on both sides about the same pet, written concurrently and
//!   never upgraded
//!
//! The shelter's record is one per adopter while the adopter's are one per
//! pet, so a shelter record naming another pet is never rewritten from an
//! adopter `curtido`: that state comes from successful writes, not a failed one.
//!
//! A shelter `match` facing an adopter `rejeitado` is settled by timestamp: a
//! newer rejection withdraws the match, an older one is overwritten.
//! Every repair reuses the timestamp of the record it copies from, so running
//! the sweep again is a no-op.

use adotely_types::models::{Interaction, InteractionStatus, Role, UserProfile};
use adotely_types::{paths, to_fields, Document, DocumentStore};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::matching::read_interaction;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Interaction records examined.
    pub scanned: usize,
    /// Records written to complete a match.
    pub repaired: usize,
    /// Shelter-side matches removed because the adopter rejected later.
    pub withdrawn: usize,
    /// Records naming a pet that no longer exists.
    pub orphaned: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.repaired == 0 && self.withdrawn == 0
    }
}

/// One pass over every user's interaction records.
pub fn reconcile(docs: &dyn DocumentStore) -> AppResult<SweepReport> {
    let mut report = SweepReport::default();

    for user_doc in docs.query(paths::USERS, &[])? {
        let user = match user_doc.decode::<UserProfile>() {
            Ok(user) => user,
            Err(e) => {
                warn!("Skipping malformed user {}: {}", user_doc.path, e);
                continue;
            }
        };
        match user.role {
            Role::Adopter => sweep_adopter(docs, &user_doc.id, &mut report)?,
            Role::Shelter => sweep_shelter(docs, &user_doc.id, &mut report)?,
        }
    }

    if report.is_clean() {
        debug!("Sweep found nothing to repair ({} records)", report.scanned);
    } else {
        info!(
            "Sweep repaired {} and withdrew {} of {} records",
            report.repaired, report.withdrawn, report.scanned
        );
    }
    Ok(report)
}

fn decode_records(docs: Vec<Document>) -> impl Iterator<Item = (Document, Interaction)> {
    docs.into_iter().filter_map(|doc| match doc.decode::<Interaction>() {
        Ok(record) => Some((doc, record)),
        Err(e) => {
            warn!("Skipping malformed interaction {}: {}", doc.path, e);
            None
        }
    })
}

fn sweep_adopter(docs: &dyn DocumentStore, adopter_id: &str, report: &mut SweepReport) -> AppResult<()> {
    for (doc, record) in decode_records(docs.query(&paths::adopter_interactions(adopter_id), &[])?) {
        report.scanned += 1;
        let pet_id = doc.id.as_str();
        if docs.get(&paths::pet(pet_id))?.is_none() {
            report.orphaned += 1;
        }

        let Some(shelter_id) = record.shelter_id.as_deref() else {
            continue;
        };
        let shelter_path = paths::shelter_interaction(shelter_id, adopter_id);
        let shelter_side = read_interaction(docs, &shelter_path)?;

        let same_pet = shelter_side
            .as_ref()
            .is_some_and(|side| side.pet_id.as_deref() == Some(pet_id));

        match (record.status, shelter_side.map(|r| r.status)) {
            (InteractionStatus::Match, Some(InteractionStatus::Match)) => {}
            (InteractionStatus::Match, _) => {
                let mirror = mirror_of(&record, adopter_id, pet_id);
                docs.set(&shelter_path, to_fields(&mirror)?, false)?;
                report.repaired += 1;
                debug!("Completed shelter side {}", shelter_path);
            }
            (InteractionStatus::Liked, Some(InteractionStatus::Liked)) if same_pet => {
                let matched = mirror_of(&record, adopter_id, pet_id);
                docs.set(&doc.path, to_fields(&matched)?, false)?;
                docs.set(&shelter_path, to_fields(&matched)?, false)?;
                report.repaired += 2;
                debug!("Upgraded concurrent likes {} and {}", doc.path, shelter_path);
            }
            _ => {}
        }
    }
    Ok(())
}

fn sweep_shelter(docs: &dyn DocumentStore, shelter_id: &str, report: &mut SweepReport) -> AppResult<()> {
    for (doc, record) in decode_records(docs.query(&paths::shelter_interactions(shelter_id), &[])?) {
        report.scanned += 1;
        if record.status != InteractionStatus::Match {
            continue;
        }
        // Records without a pet cannot be mirrored.
        let Some(pet_id) = record.pet_id.as_deref() else {
            continue;
        };
        let adopter_id = record.adopter_id.as_deref().unwrap_or(&doc.id);
        let adopter_path = paths::adopter_interaction(adopter_id, pet_id);

        match read_interaction(docs, &adopter_path)? {
            Some(adopter_side) if adopter_side.status == InteractionStatus::Match => {}
            Some(adopter_side)
                if adopter_side.status == InteractionStatus::Rejected
                    && adopter_side.timestamp > record.timestamp =>
            {
                docs.delete(&doc.path)?;
                report.withdrawn += 1;
                debug!("Withdrew {}: adopter rejected afterwards", doc.path);
            }
            _ => {
                let mirror = Interaction {
                    shelter_id: Some(shelter_id.to_string()),
                    adopter_id: Some(adopter_id.to_string()),
                    ..record.clone()
                };
                docs.set(&adopter_path, to_fields(&mirror)?, false)?;
                report.repaired += 1;
                debug!("Completed adopter side {}", adopter_path);
            }
        }
    }
    Ok(())
}

/// The `match` record both sides should hold, stamped with the source's time.
fn mirror_of(record: &Interaction, adopter_id: &str, pet_id: &str) -> Interaction {
    Interaction {
        status: InteractionStatus::Match,
        adopter_id: Some(adopter_id.to_string()),
        pet_id: Some(pet_id.to_string()),
        ..record.clone()
    }
}
