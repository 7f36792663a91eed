use serde::{Deserialize, Serialize};

/// Role chosen at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "adotante")]
    Adopter,
    #[serde(rename = "abrigo")]
    Shelter,
}

/// Profile document stored at `usuarios/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Document id; never stored as a field.
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "idade")]
    pub age: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "tipo")]
    pub role: Role,
    #[serde(rename = "biografia", skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(rename = "foto", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UserProfile {
    /// First name, for greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("Usuário")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Pet document stored at `pets/{id}`. Owned by the shelter in `shelter_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pet {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "nome_lower")]
    pub name_lower: String,
    #[serde(rename = "raca")]
    pub breed: String,
    #[serde(rename = "raca_lower")]
    pub breed_lower: String,
    /// Formatted as `"{value} {unit}"`, e.g. `"3 anos"`.
    #[serde(rename = "idade")]
    pub age: String,
    #[serde(rename = "sexo")]
    pub sex: String,
    #[serde(rename = "pelagem")]
    pub coat: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "comportamento")]
    pub behavior: String,
    #[serde(rename = "foto")]
    pub photo_url: String,
    #[serde(rename = "doencas")]
    pub health_conditions: Vec<String>,
    #[serde(rename = "criadoPor")]
    pub created_by: String,
    #[serde(rename = "nomeAbrigo")]
    pub shelter_name: String,
    #[serde(rename = "abrigoId")]
    pub shelter_id: String,
    #[serde(rename = "localizacao", skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(rename = "adotado")]
    pub adopted: bool,
}

/// Disposition carried by an interaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionStatus {
    #[serde(rename = "curtido")]
    Liked,
    #[serde(rename = "rejeitado")]
    Rejected,
    #[serde(rename = "match")]
    Match,
}

impl InteractionStatus {
    /// Positive dispositions: the ones that hide a pet from the feed and
    /// count as reciprocity.
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Liked | Self::Match)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Liked => "curtido",
            Self::Rejected => "rejeitado",
            Self::Match => "match",
        }
    }
}

impl std::fmt::Display for InteractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directional disposition record.
///
/// Adopter→pet records live at `interacoes/{adopterId}/pets/{petId}`,
/// shelter→adopter records at `interacoes/{shelterId}/usuarios/{adopterId}`.
/// Older records may carry only `status`, so everything else is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub status: InteractionStatus,
    #[serde(rename = "abrigoId", default, skip_serializing_if = "Option::is_none")]
    pub shelter_id: Option<String>,
    #[serde(rename = "adotanteId", default, skip_serializing_if = "Option::is_none")]
    pub adopter_id: Option<String>,
    #[serde(rename = "petId", default, skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<String>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Interaction {
    pub fn new(
        status: InteractionStatus,
        shelter_id: &str,
        adopter_id: &str,
        pet_id: &str,
        timestamp: i64,
    ) -> Self {
        Self {
            status,
            shelter_id: Some(shelter_id.to_string()),
            adopter_id: Some(adopter_id.to_string()),
            pet_id: Some(pet_id.to_string()),
            timestamp: Some(timestamp),
        }
    }

    pub fn with_status(&self, status: InteractionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Chat message appended under `chats/{conversationKey}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Push key; never stored as a field.
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "texto", default)]
    pub text: String,
    #[serde(rename = "imagem", default)]
    pub image_url: Option<String>,
    #[serde(rename = "de")]
    pub from: String,
    #[serde(rename = "para")]
    pub to: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(rename = "lido", default)]
    pub read: bool,
}
