use crate::domain::models::AuthToken;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{open_connection, parse_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Server-side record of issued bearer tokens.
pub trait SessionRepository: Send + Sync {
    fn save(&self, token: &AuthToken) -> Result<(), InfraError>;
    fn find(&self, token: &str) -> Result<Option<AuthToken>, InfraError>;
    fn revoke(&self, token: &str) -> Result<(), InfraError>;
    fn revoke_for_user(&self, user_id: &str) -> Result<(), InfraError>;
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSessionRepository {
    db_path: PathBuf,
}

impl SqliteSessionRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_connection(&self.db_path)
    }
}

impl SessionRepository for SqliteSessionRepository {
    fn save(&self, token: &AuthToken) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO sessions (token, user_id, issued_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(token) DO UPDATE SET
               user_id = excluded.user_id,
               issued_at = excluded.issued_at,
               expires_at = excluded.expires_at",
            params![
                token.token,
                token.user_id,
                token.issued_at.to_rfc3339(),
                token.expires_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn find(&self, token: &str) -> Result<Option<AuthToken>, InfraError> {
        let connection = self.connect()?;
        let row: Option<(String, String, String, String)> = connection
            .query_row(
                "SELECT token, user_id, issued_at, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((token, user_id, issued_at, expires_at)) = row else {
            return Ok(None);
        };
        Ok(Some(AuthToken {
            token,
            user_id,
            issued_at: parse_timestamp(&issued_at, "sessions.issued_at")?,
            expires_at: parse_timestamp(&expires_at, "sessions.expires_at")?,
        }))
    }

    fn revoke(&self, token: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    fn revoke_for_user(&self, user_id: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare("SELECT token, expires_at FROM sessions")?;
        let rows = statement
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut purged = 0;
        for (token, expires_at) in rows {
            if parse_timestamp(&expires_at, "sessions.expires_at")? <= now {
                purged +=
                    connection.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            }
        }
        Ok(purged)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, AuthToken>>,
}

impl InMemorySessionRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, AuthToken>>, InfraError> {
        self.sessions.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("session repository lock poisoned: {error}"))
        })
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn save(&self, token: &AuthToken) -> Result<(), InfraError> {
        self.lock()?.insert(token.token.clone(), token.clone());
        Ok(())
    }

    fn find(&self, token: &str) -> Result<Option<AuthToken>, InfraError> {
        Ok(self.lock()?.get(token).cloned())
    }

    fn revoke(&self, token: &str) -> Result<(), InfraError> {
        self.lock()?.remove(token);
        Ok(())
    }

    fn revoke_for_user(&self, user_id: &str) -> Result<(), InfraError> {
        self.lock()?.retain(|_, session| session.user_id != user_id);
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, InfraError> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::User;
    use crate::infrastructure::storage::initialize_database;
    use crate::infrastructure::user_store::{SqliteUserStore, UserStore};

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn token(value: &str, user_id: &str, expires_at: &str) -> AuthToken {
        AuthToken {
            token: value.to_string(),
            user_id: user_id.to_string(),
            issued_at: fixed_time("2026-02-16T08:00:00Z"),
            expires_at: fixed_time(expires_at),
        }
    }

    fn exercise_repository(repository: &dyn SessionRepository) {
        repository
            .save(&token("tok-a", "usr-1", "2026-02-16T09:00:00Z"))
            .expect("save a");
        repository
            .save(&token("tok-b", "usr-1", "2026-02-16T10:00:00Z"))
            .expect("save b");
        repository
            .save(&token("tok-c", "usr-2", "2026-02-16T10:00:00Z"))
            .expect("save c");

        let found = repository.find("tok-a").expect("find").expect("present");
        assert_eq!(found.user_id, "usr-1");

        let purged = repository
            .purge_expired(fixed_time("2026-02-16T09:30:00Z"))
            .expect("purge");
        assert_eq!(purged, 1);
        assert!(repository.find("tok-a").expect("find").is_none());

        repository.revoke_for_user("usr-1").expect("revoke user");
        assert!(repository.find("tok-b").expect("find").is_none());
        assert!(repository.find("tok-c").expect("find").is_some());

        repository.revoke("tok-c").expect("revoke");
        assert!(repository.find("tok-c").expect("find").is_none());
    }

    #[test]
    fn sqlite_session_repository_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "taskdeck-session-repo-{}.sqlite",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        initialize_database(&path).expect("initialize database");

        let users = SqliteUserStore::new(&path);
        for (id, email) in [("usr-1", "one@example.com"), ("usr-2", "two@example.com")] {
            users
                .insert(&User {
                    id: id.to_string(),
                    username: id.to_string(),
                    email: email.to_string(),
                    password_hash: "hash".to_string(),
                    avatar_url: String::new(),
                    created_at: fixed_time("2026-02-16T07:00:00Z"),
                })
                .expect("insert user");
        }

        exercise_repository(&SqliteSessionRepository::new(&path));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn in_memory_session_repository_round_trip() {
        exercise_repository(&InMemorySessionRepository::default());
    }
}
