mod common;

use std::sync::Arc;

use adotely_core::{profiles, AppContext, AppError, Backend, ErrorKind};
use adotely_db::{AuthSettings, LocalBackend, LocalConfig};
use adotely_types::api::{ProfileUpdate, RegisterRequest};
use adotely_types::models::Role;
use adotely_types::{paths, DocumentStore, PreferenceStore};

use common::{Harness, PASSWORD};

fn request(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Fernanda Lima".into(),
        email: email.into(),
        password: PASSWORD.into(),
        age: "27".into(),
        city: "Olinda".into(),
        role: Role::Adopter,
    }
}

#[test]
fn test_register_then_sign_in_loads_role() {
    let h = Harness::new();
    let registered = profiles::register(&h.backend, request("fer@example.com")).unwrap();
    assert_eq!(registered.first_name(), "Fernanda");
    h.backend.auth.sign_out().unwrap();

    let profile = profiles::sign_in(&h.backend, "FER@example.com", PASSWORD).unwrap();
    assert_eq!(profile.id, registered.id);
    assert_eq!(profile.role, Role::Adopter);

    let err = profiles::sign_in(&h.backend, "fer@example.com", "errada").unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
}

#[test]
fn test_duplicate_email_is_refused() {
    let h = Harness::new();
    profiles::register(&h.backend, request("fer@example.com")).unwrap();
    let err = profiles::register(&h.backend, request("fer@example.com")).unwrap_err();
    assert!(matches!(err, AppError::Duplicate(_)));
}

#[test]
fn test_incomplete_registration_creates_nothing() {
    let h = Harness::new();
    let mut req = request("fer@example.com");
    req.city.clear();
    let err = profiles::register(&h.backend, req).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.backend.auth.current_user_id().is_none());
}

#[test]
fn test_profile_update_and_account_deletion() {
    let h = Harness::new();
    let user = profiles::register(&h.backend, request("fer@example.com")).unwrap();

    let updated = profiles::update_profile(
        &h.backend,
        &user.id,
        ProfileUpdate {
            name: "Fernanda L.".into(),
            age: "28".into(),
            city: "Recife".into(),
            bio: "Tenho um quintal grande".into(),
            photo: Some(vec![0xff, 0xd8]),
        },
    )
    .unwrap();
    assert_eq!(updated.city, "Recife");
    assert_eq!(updated.bio.as_deref(), Some("Tenho um quintal grande"));
    assert!(updated.photo_url.unwrap().contains("_perfil.jpg"));

    profiles::delete_account(&h.backend, &user.id).unwrap();
    assert!(DocumentStore::get(&*h.db, &paths::user(&user.id)).unwrap().is_none());
    let err = profiles::sign_in(&h.backend, "fer@example.com", PASSWORD).unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
}

#[test]
fn test_password_reset_for_unknown_email() {
    let h = Harness::new();
    let err = profiles::request_password_reset(&h.backend, "ninguem@example.com").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_context_session_and_preferences() {
    let h = Harness::new();
    let prefs: Arc<dyn PreferenceStore> = h.db.clone();

    let mut ctx = AppContext::start(h.backend.clone(), prefs.clone()).unwrap();
    assert!(!ctx.is_signed_in());
    assert!(ctx.should_show_onboarding());
    assert!(ctx.dark_mode(true));

    ctx.register(request("fer@example.com")).unwrap();
    ctx.finish_onboarding().unwrap();
    assert!(!ctx.toggle_dark_mode(true).unwrap());

    // A restart picks up both the session and the preferences.
    let mut restarted = AppContext::start(h.backend.clone(), prefs).unwrap();
    assert_eq!(restarted.user().unwrap().name, "Fernanda Lima");
    assert!(!restarted.should_show_onboarding());
    assert!(!restarted.dark_mode(true));

    restarted.sign_out().unwrap();
    assert_eq!(restarted.user().unwrap_err().kind(), ErrorKind::Permission);
}

fn open_local(config: &LocalConfig) -> AppContext {
    let local = LocalBackend::open(config).unwrap();
    let backend = Backend::new(local.db.clone(), local.db.clone(), local.auth, local.blobs);
    AppContext::start(backend, local.db).unwrap()
}

#[test]
fn test_app_restart_on_local_backend_restores_user() {
    let dir = std::env::temp_dir().join(format!("adotely-app-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let config = LocalConfig {
        db_path: dir.join("adotely.db"),
        blob_dir: dir.join("blobs"),
        blob_base_url: None,
        auth: AuthSettings::new("integration-test-secret"),
    };

    let mut first = open_local(&config);
    assert!(!first.is_signed_in());
    first.register(request("fer@example.com")).unwrap();
    drop(first);

    let mut second = open_local(&config);
    assert_eq!(second.user().unwrap().name, "Fernanda Lima");
    second.sign_out().unwrap();
    drop(second);

    let third = open_local(&config);
    assert!(!third.is_signed_in());
    drop(third);

    let _ = std::fs::remove_dir_all(&dir);
}
