#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use adotely_core::{pets, profiles, Backend};
use adotely_db::{AuthSettings, Database, DiskBlobStore, LocalAuth};
use adotely_types::api::{AgeUnit, NewPet, PetForm, RegisterRequest};
use adotely_types::models::{Role, UserProfile};
use adotely_types::{
    Document, DocumentStore, Fields, Predicate, SnapshotCallback, StoreError, StoreResult,
    Subscription,
};

pub const PASSWORD: &str = "senha123";

/// In-memory database, local auth and a throwaway blob directory.
pub struct Harness {
    pub db: Arc<Database>,
    pub auth: Arc<LocalAuth>,
    pub backend: Backend,
    blob_dir: PathBuf,
}

impl Harness {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let auth = Arc::new(LocalAuth::new(
            db.clone(),
            AuthSettings::new("integration-test-secret"),
        ));
        let blob_dir = std::env::temp_dir().join(format!("adotely-test-{}", uuid::Uuid::new_v4()));
        let blobs = Arc::new(DiskBlobStore::new(blob_dir.clone(), None).unwrap());
        let backend = Backend::new(db.clone(), db.clone(), auth.clone(), blobs);
        Self {
            db,
            auth,
            backend,
            blob_dir,
        }
    }

    /// Same collaborators, different document store.
    pub fn backend_with_docs(&self, docs: Arc<dyn DocumentStore>) -> Backend {
        Backend {
            docs,
            ..self.backend.clone()
        }
    }

    pub fn register(&self, name: &str, role: Role) -> UserProfile {
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        profiles::register(
            &self.backend,
            RegisterRequest {
                name: name.into(),
                email,
                password: PASSWORD.into(),
                age: "30".into(),
                city: "Recife".into(),
                role,
            },
        )
        .unwrap()
    }

    pub fn profile(&self, user_id: &str) -> UserProfile {
        profiles::load_profile(&*self.backend.docs, user_id).unwrap()
    }

    pub fn add_pet(&self, shelter: &UserProfile, name: &str) -> String {
        pets::create_pet(
            &self.backend,
            shelter,
            NewPet {
                form: pet_form(name),
                photo: vec![0xff, 0xd8, 0xff, 0xe0],
            },
        )
        .unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.blob_dir);
    }
}

pub fn pet_form(name: &str) -> PetForm {
    PetForm {
        name: name.into(),
        breed: "Vira-lata".into(),
        coat: "Curta".into(),
        age_value: "2".into(),
        age_unit: AgeUnit::Years,
        sex: "Fêmea".into(),
        behavior: "Brincalhona".into(),
        description: "Adora passear".into(),
        ..Default::default()
    }
}

/// Document store that rejects a number of writes under a path prefix.
pub struct FlakyDocs {
    inner: Arc<Database>,
    prefix: String,
    failures: AtomicU32,
}

impl FlakyDocs {
    pub fn new(inner: Arc<Database>, prefix: impl Into<String>, failures: u32) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
            failures: AtomicU32::new(failures),
        }
    }

    fn fail(&self, path: &str) -> StoreResult<()> {
        let injected = path.starts_with(&self.prefix)
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if injected {
            Err(StoreError::Unavailable(format!("injected failure at {}", path)))
        } else {
            Ok(())
        }
    }
}

impl DocumentStore for FlakyDocs {
    fn get(&self, path: &str) -> StoreResult<Option<Document>> {
        DocumentStore::get(&*self.inner, path)
    }

    fn set(&self, path: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        self.fail(path)?;
        DocumentStore::set(&*self.inner, path, fields, merge)
    }

    fn update(&self, path: &str, fields: Fields) -> StoreResult<()> {
        self.fail(path)?;
        DocumentStore::update(&*self.inner, path, fields)
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        self.fail(path)?;
        DocumentStore::delete(&*self.inner, path)
    }

    fn add(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        self.fail(collection)?;
        DocumentStore::add(&*self.inner, collection, fields)
    }

    fn query(&self, collection: &str, predicates: &[Predicate]) -> StoreResult<Vec<Document>> {
        DocumentStore::query(&*self.inner, collection, predicates)
    }

    fn subscribe(&self, path: &str, callback: SnapshotCallback) -> StoreResult<Subscription> {
        DocumentStore::subscribe(&*self.inner, path, callback)
    }
}
