//! Per-device application state: the signed-in user and local preferences.
//!
//! Built once at startup from a [`Backend`]. Signing out drops the user;
//! live views hold their own [`adotely_types::Subscription`] guards and are
//! expected to be dropped alongside.

use std::sync::Arc;

use adotely_types::api::{Preferences, RegisterRequest};
use adotely_types::models::UserProfile;
use adotely_types::PreferenceStore;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{AppError, AppResult};
use crate::matching::MatchService;
use crate::profiles;

pub struct AppContext {
    backend: Backend,
    matcher: MatchService,
    preference_store: Arc<dyn PreferenceStore>,
    preferences: Preferences,
    user: Option<UserProfile>,
}

impl AppContext {
    /// Load preferences and pick up a session that survived a restart.
    pub fn start(backend: Backend, preference_store: Arc<dyn PreferenceStore>) -> AppResult<Self> {
        let preferences = match preference_store.load() {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!("Could not load preferences, using defaults: {}", e);
                Preferences::default()
            }
        };
        let user = profiles::current_profile(&backend)?;
        if let Some(user) = &user {
            info!("Restored session for {}", user.id);
        }

        Ok(Self {
            matcher: MatchService::new(backend.docs.clone()),
            backend,
            preference_store,
            preferences,
            user,
        })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn matcher(&self) -> &MatchService {
        &self.matcher
    }

    pub fn user(&self) -> AppResult<&UserProfile> {
        self.user.as_ref().ok_or(AppError::NotSignedIn)
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> AppResult<&UserProfile> {
        let profile = profiles::sign_in(&self.backend, email, password)?;
        Ok(&*self.user.insert(profile))
    }

    pub fn register(&mut self, req: RegisterRequest) -> AppResult<&UserProfile> {
        let profile = profiles::register(&self.backend, req)?;
        Ok(&*self.user.insert(profile))
    }

    /// Reload the signed-in user's profile after an edit elsewhere.
    pub fn refresh_profile(&mut self) -> AppResult<&UserProfile> {
        let user_id = self.user()?.id.clone();
        let profile = profiles::load_profile(&*self.backend.docs, &user_id)?;
        Ok(&*self.user.insert(profile))
    }

    pub fn sign_out(&mut self) -> AppResult<()> {
        self.backend.auth.sign_out()?;
        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.id);
        }
        Ok(())
    }

    pub fn delete_account(&mut self) -> AppResult<()> {
        let user_id = self.user()?.id.clone();
        profiles::delete_account(&self.backend, &user_id)?;
        self.user = None;
        Ok(())
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Effective theme: the stored choice, or the system's when none was made.
    pub fn dark_mode(&self, system_prefers_dark: bool) -> bool {
        self.preferences.dark_mode.unwrap_or(system_prefers_dark)
    }

    pub fn toggle_dark_mode(&mut self, system_prefers_dark: bool) -> AppResult<bool> {
        let dark = !self.dark_mode(system_prefers_dark);
        self.preferences.dark_mode = Some(dark);
        self.preference_store.save(&self.preferences)?;
        Ok(dark)
    }

    pub fn should_show_onboarding(&self) -> bool {
        !self.preferences.onboarding_seen
    }

    pub fn finish_onboarding(&mut self) -> AppResult<()> {
        self.preferences.onboarding_seen = true;
        self.preference_store.save(&self.preferences)?;
        Ok(())
    }
}
