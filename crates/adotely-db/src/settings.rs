use anyhow::Result;

use adotely_types::api::Preferences;
use adotely_types::{PreferenceStore, StoreResult};

use crate::queries::OptionalExt;
use crate::{Database, backend};

const PREFERENCES_KEY: &str = "preferences";

/// Device-local key/value pairs: preferences and the persisted session.
impl Database {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
                .optional()
        })
    }

    pub fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )?;
            Ok(())
        })
    }

    pub fn delete_setting(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
            Ok(())
        })
    }
}

impl PreferenceStore for Database {
    fn load(&self) -> StoreResult<Preferences> {
        match self.get_setting(PREFERENCES_KEY).map_err(backend)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Preferences::default()),
        }
    }

    fn save(&self, prefs: &Preferences) -> StoreResult<()> {
        let raw = serde_json::to_string(prefs)?;
        self.put_setting(PREFERENCES_KEY, &raw).map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_then_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.load().unwrap(), Preferences::default());

        let prefs = Preferences {
            dark_mode: Some(true),
            onboarding_seen: true,
        };
        db.save(&prefs).unwrap();
        assert_eq!(db.load().unwrap(), prefs);
    }

    #[test]
    fn test_delete_setting() {
        let db = Database::open_in_memory().unwrap();
        db.put_setting("session", "abc").unwrap();
        assert_eq!(db.get_setting("session").unwrap().as_deref(), Some("abc"));
        db.delete_setting("session").unwrap();
        assert_eq!(db.get_setting("session").unwrap(), None);
    }
}
