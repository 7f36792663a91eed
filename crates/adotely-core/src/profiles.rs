//! Accounts and user profiles.

use std::sync::Arc;

use adotely_types::api::{ProfileUpdate, RegisterRequest};
use adotely_types::models::UserProfile;
use adotely_types::{paths, to_fields, Document, DocumentStore, Snapshot, Subscription};
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{AppError, AppResult, FieldError};

fn decode_profile(doc: &Document) -> AppResult<UserProfile> {
    let mut profile: UserProfile = doc.decode()?;
    profile.id = doc.id.clone();
    Ok(profile)
}

pub fn find_profile(docs: &dyn DocumentStore, user_id: &str) -> AppResult<Option<UserProfile>> {
    match docs.get(&paths::user(user_id))? {
        Some(doc) => Ok(Some(decode_profile(&doc)?)),
        None => Ok(None),
    }
}

pub fn load_profile(docs: &dyn DocumentStore, user_id: &str) -> AppResult<UserProfile> {
    find_profile(docs, user_id)?.ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
}

pub fn validate_registration(req: &RegisterRequest) -> Vec<FieldError> {
    let required = [
        ("nome", &req.name),
        ("email", &req.email),
        ("senha", &req.password),
        ("idade", &req.age),
        ("cidade", &req.city),
    ];
    let mut errors: Vec<FieldError> = required
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| FieldError::required(field))
        .collect();
    let email = req.email.trim();
    if !email.is_empty() && !email.contains('@') {
        errors.push(FieldError {
            field: "email",
            message: "not an email address".into(),
        });
    }
    errors
}

/// Create the account and its profile document. The new user ends up signed in.
pub fn register(backend: &Backend, req: RegisterRequest) -> AppResult<UserProfile> {
    AppError::check(validate_registration(&req))?;

    let user_id = backend.auth.sign_up(req.email.trim(), &req.password)?;
    let profile = UserProfile {
        id: user_id.clone(),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_lowercase(),
        age: req.age.trim().to_string(),
        city: req.city.trim().to_string(),
        role: req.role,
        bio: None,
        photo_url: None,
    };

    let written = to_fields(&profile)
        .map_err(AppError::from)
        .and_then(|fields| Ok(backend.docs.set(&paths::user(&user_id), fields, false)?));
    if let Err(e) = written {
        // An account without a profile cannot sign in usefully; undo it.
        warn!("Profile write for {} failed, removing account: {}", user_id, e);
        if let Err(undo) = backend.auth.delete_current_user() {
            warn!("Could not remove account {}: {}", user_id, undo);
        }
        return Err(e);
    }

    info!("Registered {} as {:?}", profile.id, profile.role);
    Ok(profile)
}

pub fn sign_in(backend: &Backend, email: &str, password: &str) -> AppResult<UserProfile> {
    let mut errors = Vec::new();
    if email.trim().is_empty() {
        errors.push(FieldError::required("email"));
    }
    if password.is_empty() {
        errors.push(FieldError::required("senha"));
    }
    AppError::check(errors)?;
    let session = backend.auth.sign_in(email, password)?;
    load_profile(&*backend.docs, &session.user_id)
}

/// Profile of whoever the auth provider currently has signed in.
pub fn current_profile(backend: &Backend) -> AppResult<Option<UserProfile>> {
    match backend.auth.current_user_id() {
        Some(user_id) => find_profile(&*backend.docs, &user_id),
        None => Ok(None),
    }
}

pub fn update_profile(
    backend: &Backend,
    user_id: &str,
    update: ProfileUpdate,
) -> AppResult<UserProfile> {
    let mut profile = load_profile(&*backend.docs, user_id)?;
    if update.name.trim().is_empty() {
        return Err(AppError::Validation(vec![FieldError::required("nome")]));
    }

    if let Some(photo) = update.photo.as_deref().filter(|p| !p.is_empty()) {
        let blob_path = format!("{}/{}_perfil.jpg", paths::USERS, user_id);
        profile.photo_url = Some(backend.store_blob(&blob_path, photo)?);
    }
    profile.name = update.name.trim().to_string();
    profile.age = update.age.trim().to_string();
    profile.city = update.city.trim().to_string();
    let bio = update.bio.trim();
    profile.bio = (!bio.is_empty()).then(|| bio.to_string());

    backend
        .docs
        .set(&paths::user(user_id), to_fields(&profile)?, false)?;
    info!("Updated profile {}", user_id);
    Ok(profile)
}

/// Delete the profile document, then the account itself.
pub fn delete_account(backend: &Backend, user_id: &str) -> AppResult<()> {
    if backend.auth.current_user_id().as_deref() != Some(user_id) {
        return Err(AppError::NotSignedIn);
    }
    backend.docs.delete(&paths::user(user_id))?;
    backend.auth.delete_current_user()?;
    info!("Deleted account {}", user_id);
    Ok(())
}

pub fn request_password_reset(backend: &Backend, email: &str) -> AppResult<()> {
    if email.trim().is_empty() {
        return Err(AppError::Validation(vec![FieldError::required("email")]));
    }
    backend.auth.send_password_reset(email.trim())?;
    Ok(())
}

/// Live view of one profile; `None` once the document is deleted.
pub fn watch_profile(
    docs: &dyn DocumentStore,
    user_id: &str,
    on_change: impl Fn(Option<UserProfile>) + Send + Sync + 'static,
) -> AppResult<Subscription> {
    let subscription = docs.subscribe(
        &paths::user(user_id),
        Arc::new(move |snapshot: Snapshot| {
            let profile = match snapshot {
                Snapshot::Document(Some(doc)) => match decode_profile(&doc) {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        warn!("Malformed profile {}: {}", doc.path, e);
                        None
                    }
                },
                _ => None,
            };
            on_change(profile);
        }),
    )?;
    Ok(subscription)
}
