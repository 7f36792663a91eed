//! Application logic of the shelter/adopter matching app: match reconciliation,
//! the discovery feed, the conversation gate, chat, and the CRUD flows around
//! them. Everything talks to the outside world through the capability traits
//! in `adotely-types`.

pub mod backend;
pub mod chat;
pub mod context;
pub mod conversations;
pub mod error;
pub mod favorites;
pub mod feed;
pub mod interested;
pub mod matching;
pub mod pets;
pub mod profiles;
pub mod sweep;
pub mod typing;

pub use backend::Backend;
pub use context::AppContext;
pub use error::{AppError, AppResult, ErrorKind, FieldError};
pub use matching::{Disposition, DispositionOutcome, MatchConfig, MatchService};

/// Epoch milliseconds, the timestamp unit of every stored record.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
