//! Pet registration and maintenance. Only the owning shelter may change a pet.

use std::sync::Arc;

use adotely_types::api::{NewPet, PetForm, PetUpdate};
use adotely_types::models::{Pet, Role, UserProfile};
use adotely_types::{
    paths, to_fields, Document, DocumentStore, Predicate, Snapshot, StoreResult, Subscription,
};
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{AppError, AppResult, FieldError};
use crate::now_millis;

const UNKNOWN_SHELTER: &str = "Abrigo desconhecido";

/// Decode a pet document, filling in its id.
pub fn decode_pet(doc: &Document) -> StoreResult<Pet> {
    let mut pet: Pet = doc.decode()?;
    pet.id = doc.id.clone();
    Ok(pet)
}

/// Decode every pet in a snapshot, skipping (and logging) malformed ones.
pub(crate) fn decode_pets<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Vec<Pet> {
    docs.into_iter()
        .filter_map(|doc| match decode_pet(doc) {
            Ok(pet) => Some(pet),
            Err(e) => {
                warn!("Skipping malformed pet {}: {}", doc.path, e);
                None
            }
        })
        .collect()
}

pub fn find_pet(docs: &dyn DocumentStore, pet_id: &str) -> AppResult<Option<Pet>> {
    match docs.get(&paths::pet(pet_id))? {
        Some(doc) => Ok(Some(decode_pet(&doc)?)),
        None => Ok(None),
    }
}

pub fn load_pet(docs: &dyn DocumentStore, pet_id: &str) -> AppResult<Pet> {
    find_pet(docs, pet_id)?.ok_or_else(|| AppError::NotFound(format!("pet {}", pet_id)))
}

/// Load a pet and check that `shelter_id` owns it.
pub fn owned_pet(docs: &dyn DocumentStore, shelter_id: &str, pet_id: &str) -> AppResult<Pet> {
    let pet = load_pet(docs, pet_id)?;
    if pet.shelter_id != shelter_id {
        return Err(AppError::PermissionDenied(format!(
            "pet {} belongs to another shelter",
            pet_id
        )));
    }
    Ok(pet)
}

pub fn validate_form(form: &PetForm) -> Vec<FieldError> {
    let required = [
        ("nome", &form.name),
        ("raca", &form.breed),
        ("pelagem", &form.coat),
        ("idade", &form.age_value),
        ("sexo", &form.sex),
        ("comportamento", &form.behavior),
        ("descricao", &form.description),
    ];
    let mut errors: Vec<FieldError> = required
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| FieldError::required(field))
        .collect();

    let age = form.age_value.trim();
    if !age.is_empty() && !age.chars().all(|c| c.is_ascii_digit()) {
        errors.push(FieldError {
            field: "idade",
            message: "must be a whole number".into(),
        });
    }
    errors
}

fn apply_form(pet: &mut Pet, form: &PetForm) {
    pet.name = form.name.trim().to_string();
    pet.name_lower = pet.name.to_lowercase();
    pet.breed = form.breed.trim().to_string();
    pet.breed_lower = pet.breed.to_lowercase();
    pet.age = form.formatted_age();
    pet.sex = form.sex.clone();
    pet.coat = form.coat.clone();
    pet.description = form.description.trim().to_string();
    pet.behavior = form.behavior.clone();
    pet.health_conditions = form.all_conditions();
    pet.location = Some(form.location);
}

/// Register a pet for the signed-in shelter. Returns the new pet id.
pub fn create_pet(backend: &Backend, shelter: &UserProfile, new_pet: NewPet) -> AppResult<String> {
    if shelter.role != Role::Shelter {
        return Err(AppError::PermissionDenied(
            "only shelters can register pets".into(),
        ));
    }

    let mut errors = validate_form(&new_pet.form);
    if new_pet.photo.is_empty() {
        errors.push(FieldError::required("foto"));
    }
    AppError::check(errors)?;

    let mut pet = Pet::default();
    apply_form(&mut pet, &new_pet.form);

    let duplicates = backend.docs.query(
        paths::PETS,
        &[
            Predicate::eq("nome_lower", pet.name_lower.as_str()),
            Predicate::eq("raca_lower", pet.breed_lower.as_str()),
            Predicate::eq("idade", pet.age.as_str()),
            Predicate::eq("abrigoId", shelter.id.as_str()),
        ],
    )?;
    if !duplicates.is_empty() {
        return Err(AppError::Duplicate(format!(
            "{} ({}, {})",
            pet.name, pet.breed, pet.age
        )));
    }

    let blob_path = format!("{}/{}_{}.jpg", paths::PETS, shelter.id, now_millis());
    pet.photo_url = backend.store_blob(&blob_path, &new_pet.photo)?;
    pet.created_by = shelter.id.clone();
    pet.shelter_id = shelter.id.clone();
    pet.shelter_name = if shelter.name.trim().is_empty() {
        UNKNOWN_SHELTER.to_string()
    } else {
        shelter.name.clone()
    };
    pet.adopted = false;

    let pet_id = backend.docs.add(paths::PETS, to_fields(&pet)?)?;
    info!("Shelter {} registered pet {} ({})", shelter.id, pet_id, pet.name);
    Ok(pet_id)
}

/// Edit a pet. Ownership fields and the adoption flag are left untouched.
pub fn update_pet(
    backend: &Backend,
    shelter_id: &str,
    pet_id: &str,
    update: PetUpdate,
) -> AppResult<Pet> {
    AppError::check(validate_form(&update.form))?;
    let mut pet = owned_pet(&*backend.docs, shelter_id, pet_id)?;
    apply_form(&mut pet, &update.form);

    if let Some(photo) = update.photo.as_deref().filter(|p| !p.is_empty()) {
        let blob_path = format!("{}/{}_{}.jpg", paths::PETS, pet_id, now_millis());
        pet.photo_url = backend.store_blob(&blob_path, photo)?;
    }

    backend.docs.update(&paths::pet(pet_id), to_fields(&pet)?)?;
    info!("Shelter {} updated pet {}", shelter_id, pet_id);
    Ok(pet)
}

pub fn mark_adopted(docs: &dyn DocumentStore, shelter_id: &str, pet_id: &str) -> AppResult<()> {
    owned_pet(docs, shelter_id, pet_id)?;
    let mut fields = adotely_types::Fields::new();
    fields.insert("adotado".into(), true.into());
    docs.update(&paths::pet(pet_id), fields)?;
    info!("Pet {} marked as adopted", pet_id);
    Ok(())
}

/// Delete a pet document. Interaction records naming it are left in place;
/// readers skip records whose pet is gone.
pub fn delete_pet(docs: &dyn DocumentStore, shelter_id: &str, pet_id: &str) -> AppResult<()> {
    owned_pet(docs, shelter_id, pet_id)?;
    docs.delete(&paths::pet(pet_id))?;
    info!("Shelter {} deleted pet {}", shelter_id, pet_id);
    Ok(())
}

pub fn shelter_pets(docs: &dyn DocumentStore, shelter_id: &str) -> AppResult<Vec<Pet>> {
    let found = docs.query(paths::PETS, &[Predicate::eq("abrigoId", shelter_id)])?;
    Ok(decode_pets(&found))
}

/// Live list of the pets a shelter owns, adopted ones included.
pub fn watch_shelter_pets(
    docs: &dyn DocumentStore,
    shelter_id: &str,
    on_change: impl Fn(Vec<Pet>) + Send + Sync + 'static,
) -> AppResult<Subscription> {
    let shelter_id = shelter_id.to_string();
    let subscription = docs.subscribe(
        paths::PETS,
        Arc::new(move |snapshot: Snapshot| {
            let owned = decode_pets(snapshot.documents())
                .into_iter()
                .filter(|pet| pet.shelter_id == shelter_id)
                .collect();
            on_change(owned);
        }),
    )?;
    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adotely_types::api::AgeUnit;

    fn form() -> PetForm {
        PetForm {
            name: " Thor ".into(),
            breed: "Vira-lata".into(),
            coat: "Curta".into(),
            age_value: "3".into(),
            age_unit: AgeUnit::Years,
            sex: "Macho".into(),
            behavior: "Dócil".into(),
            description: "Muito carinhoso".into(),
            health_conditions: vec!["FIV".into()],
            other_condition: Some("alergia".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_form_lists_missing_fields() {
        let mut incomplete = form();
        incomplete.name = "  ".into();
        incomplete.description = String::new();
        let fields: Vec<_> = validate_form(&incomplete).iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["nome", "descricao"]);
    }

    #[test]
    fn test_validate_form_rejects_non_numeric_age() {
        let mut bad = form();
        bad.age_value = "três".into();
        assert_eq!(validate_form(&bad)[0].field, "idade");
    }

    #[test]
    fn test_apply_form_normalizes_search_keys() {
        let mut pet = Pet::default();
        apply_form(&mut pet, &form());
        assert_eq!(pet.name, "Thor");
        assert_eq!(pet.name_lower, "thor");
        assert_eq!(pet.breed_lower, "vira-lata");
        assert_eq!(pet.age, "3 anos");
        assert_eq!(pet.health_conditions, vec!["FIV", "alergia"]);
    }
}
