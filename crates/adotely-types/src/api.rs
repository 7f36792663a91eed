use serde::{Deserialize, Serialize};

use crate::models::{GeoPoint, Role};

// -- Session claims --

/// Claims carried by a session token issued by an auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

// -- Preferences --

/// Device-local preferences. `dark_mode == None` means "follow the system".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub dark_mode: Option<bool>,
    pub onboarding_seen: bool,
}

// -- Account forms --

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: String,
    pub city: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub age: String,
    pub city: String,
    pub bio: String,
    /// New photo bytes, if the user picked one.
    pub photo: Option<Vec<u8>>,
}

// -- Pet forms --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgeUnit {
    #[default]
    Years,
    Months,
}

impl AgeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Years => "anos",
            Self::Months => "meses",
        }
    }
}

/// Fields shared by pet registration and pet editing.
#[derive(Debug, Clone, Default)]
pub struct PetForm {
    pub name: String,
    pub breed: String,
    pub coat: String,
    pub age_value: String,
    pub age_unit: AgeUnit,
    pub sex: String,
    pub behavior: String,
    pub description: String,
    pub health_conditions: Vec<String>,
    /// Free-form condition not in the predefined tag list.
    pub other_condition: Option<String>,
    pub location: GeoPoint,
}

impl PetForm {
    /// `"{value} {unit}"`, the stored age format.
    pub fn formatted_age(&self) -> String {
        format!("{} {}", self.age_value.trim(), self.age_unit.as_str())
    }

    /// Selected tags followed by the free-form condition, if any.
    pub fn all_conditions(&self) -> Vec<String> {
        let mut conditions = self.health_conditions.clone();
        if let Some(other) = self.other_condition.as_deref().map(str::trim) {
            if !other.is_empty() {
                conditions.push(other.to_string());
            }
        }
        conditions
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewPet {
    pub form: PetForm,
    pub photo: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct PetUpdate {
    pub form: PetForm,
    /// Replacement photo, if any; the current one is kept otherwise.
    pub photo: Option<Vec<u8>>,
}
