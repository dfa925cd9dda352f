use anyhow::Result;
use rusqlite::Connection;

use agora_types::models::email_key;

use super::OptionalExt;
use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str = "id, username, email, password, role, image_url, refresh_token, refresh_token_expires_at, created_at";

impl Database {
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str, role: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, email_key, password, role) VALUES (?1, ?2, ?3, ?4, ?5)",
                (username, email, email_key(email), password_hash, role),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", &username))
    }

    /// Matches on [`email_key`], so any casing of the address finds the row.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email_key = ?1", &email_key(email)))
    }

    /// True if another account (anything but `except_id`) already uses the
    /// username or email.
    pub fn is_identity_taken(&self, username: &str, email: &str, except_id: Option<i64>) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users
                 WHERE (username = ?1 OR email_key = ?2) AND id IS NOT ?3",
                rusqlite::params![username, email_key(email), except_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Returns false if no such user exists.
    pub fn update_user_profile(&self, id: i64, username: &str, email: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET username = ?2, email = ?3, email_key = ?4 WHERE id = ?1",
                rusqlite::params![id, username, email, email_key(email)],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_refresh_token(&self, id: i64, token: Option<&str>, expires_at: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET refresh_token = ?2, refresh_token_expires_at = ?3 WHERE id = ?1",
                rusqlite::params![id, token, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn set_user_image(&self, id: i64, image_url: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET image_url = ?2 WHERE id = ?1",
                rusqlite::params![id, image_url],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, filter: &str, value: &dyn rusqlite::types::ToSql) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, filter);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                image_url: row.get(5)?,
                refresh_token: row.get(6)?,
                refresh_token_expires_at: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn email_lookup_ignores_case() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("ann", "Ann@Example.com", "hash", "user").unwrap();

        let row = db.get_user_by_email("ann@example.COM").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.role, "user");
    }

    #[test]
    fn email_lookup_folds_non_ascii_case() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("emile", "Émile@example.com", "hash", "user").unwrap();

        let row = db.get_user_by_email("émile@EXAMPLE.com").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.email, "Émile@example.com");
        assert!(db.is_identity_taken("other", "ÉMILE@example.com", None).unwrap());
    }

    #[test]
    fn identity_check_skips_the_account_itself() {
        let db = Database::open_in_memory().unwrap();
        let ann = db.create_user("ann", "ann@example.com", "hash", "user").unwrap();
        db.create_user("bob", "bob@example.com", "hash", "user").unwrap();

        assert!(!db.is_identity_taken("ann", "ann@example.com", Some(ann)).unwrap());
        assert!(db.is_identity_taken("bob", "ann2@example.com", Some(ann)).unwrap());
        assert!(db.is_identity_taken("carl", "BOB@example.com", None).unwrap());
    }
}
