use crate::Database;
use crate::models::AccountRow;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Accounts --

    pub fn create_account(&self, id: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO accounts (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "email", email))
    }

    pub fn get_account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id", id))
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET password = ?2 WHERE id = ?1",
                (id, password_hash),
            )?;
            Ok(())
        })
    }

    /// Removes the account and any outstanding reset tokens.
    pub fn delete_account(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM password_resets WHERE account_id = ?1", [id])?;
            tx.execute("DELETE FROM accounts WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Password resets --

    pub fn insert_password_reset(&self, token: &str, account_id: &str, expires_at: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO password_resets (token, account_id, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![token, account_id, expires_at],
            )?;
            Ok(())
        })
    }

    /// Consume a reset token. Returns the account id if the token existed and
    /// had not expired at `now`.
    pub fn take_password_reset(&self, token: &str, now: i64) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let found: Option<(String, i64)> = tx
                .query_row(
                    "SELECT account_id, expires_at FROM password_resets WHERE token = ?1",
                    [token],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            tx.execute("DELETE FROM password_resets WHERE token = ?1", [token])?;
            tx.commit()?;

            Ok(found.and_then(|(account_id, expires_at)| (expires_at > now).then_some(account_id)))
        })
    }
}

fn query_account(conn: &Connection, column: &str, value: &str) -> Result<Option<AccountRow>> {
    let sql = format!(
        "SELECT id, email, password, created_at FROM accounts WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(AccountRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
