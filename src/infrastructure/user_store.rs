use crate::domain::models::User;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{is_constraint_violation, open_connection, parse_timestamp};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait UserStore: Send + Sync {
    fn insert(&self, user: &User) -> Result<(), InfraError>;
    fn find_by_id(&self, user_id: &str) -> Result<Option<User>, InfraError>;
    /// Email lookup ignores case and surrounding whitespace.
    fn find_by_email(&self, email: &str) -> Result<Option<User>, InfraError>;
    fn list(&self) -> Result<Vec<User>, InfraError>;
    fn update(&self, user: &User) -> Result<(), InfraError>;
    fn delete(&self, user_id: &str) -> Result<bool, InfraError>;
}

pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn duplicate_email(email: &str) -> InfraError {
    InfraError::Conflict(format!("email already registered: {email}"))
}

#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    db_path: PathBuf,
}

impl SqliteUserStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_connection(&self.db_path)
    }

    fn read_row(
        row: &Row<'_>,
    ) -> rusqlite::Result<(String, String, String, String, String, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn into_user(
        (id, username, email, password_hash, avatar_url, created_at): (
            String,
            String,
            String,
            String,
            String,
            String,
        ),
    ) -> Result<User, InfraError> {
        Ok(User {
            id,
            username,
            email,
            password_hash,
            avatar_url,
            created_at: parse_timestamp(&created_at, "users.created_at")?,
        })
    }

    fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, InfraError> {
        let connection = self.connect()?;
        let sql = format!(
            "SELECT id, username, email, password_hash, avatar_url, created_at
             FROM users WHERE {column} = ?1"
        );
        let row = connection
            .query_row(&sql, params![value], Self::read_row)
            .optional()?;
        row.map(Self::into_user).transpose()
    }
}

impl UserStore for SqliteUserStore {
    fn insert(&self, user: &User) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection
            .execute(
                "INSERT INTO users
                 (id, username, email, email_key, password_hash, avatar_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id,
                    user.username,
                    user.email,
                    email_key(&user.email),
                    user.password_hash,
                    user.avatar_url,
                    user.created_at.to_rfc3339()
                ],
            )
            .map_err(|error| {
                if is_constraint_violation(&error) {
                    duplicate_email(&user.email)
                } else {
                    InfraError::from(error)
                }
            })?;
        Ok(())
    }

    fn find_by_id(&self, user_id: &str) -> Result<Option<User>, InfraError> {
        self.find_one("id", user_id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, InfraError> {
        self.find_one("email_key", &email_key(email))
    }

    fn list(&self) -> Result<Vec<User>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, username, email, password_hash, avatar_url, created_at
             FROM users ORDER BY created_at, id",
        )?;
        let rows = statement
            .query_map([], Self::read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::into_user).collect()
    }

    fn update(&self, user: &User) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let changed = connection
            .execute(
                "UPDATE users SET username = ?2, email = ?3, email_key = ?4,
                   password_hash = ?5, avatar_url = ?6
                 WHERE id = ?1",
                params![
                    user.id,
                    user.username,
                    user.email,
                    email_key(&user.email),
                    user.password_hash,
                    user.avatar_url
                ],
            )
            .map_err(|error| {
                if is_constraint_violation(&error) {
                    duplicate_email(&user.email)
                } else {
                    InfraError::from(error)
                }
            })?;
        if changed == 0 {
            return Err(InfraError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    fn delete(&self, user_id: &str) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let removed = connection.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        Ok(removed > 0)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, User>>, InfraError> {
        self.users
            .lock()
            .map_err(|error| {
                InfraError::InvalidConfig(format!("user store lock poisoned: {error}"))
            })
    }
}

impl UserStore for InMemoryUserStore {
    fn insert(&self, user: &User) -> Result<(), InfraError> {
        let mut users = self.lock()?;
        let key = email_key(&user.email);
        if users.values().any(|existing| email_key(&existing.email) == key) {
            return Err(duplicate_email(&user.email));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn find_by_id(&self, user_id: &str) -> Result<Option<User>, InfraError> {
        Ok(self.lock()?.get(user_id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, InfraError> {
        let key = email_key(email);
        Ok(self
            .lock()?
            .values()
            .find(|user| email_key(&user.email) == key)
            .cloned())
    }

    fn list(&self) -> Result<Vec<User>, InfraError> {
        let mut users = self.lock()?.values().cloned().collect::<Vec<_>>();
        users.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(users)
    }

    fn update(&self, user: &User) -> Result<(), InfraError> {
        let mut users = self.lock()?;
        let key = email_key(&user.email);
        if users
            .values()
            .any(|existing| existing.id != user.id && email_key(&existing.email) == key)
        {
            return Err(duplicate_email(&user.email));
        }
        let Some(stored) = users.get_mut(&user.id) else {
            return Err(InfraError::NotFound(format!("user {}", user.id)));
        };
        *stored = user.clone();
        Ok(())
    }

    fn delete(&self, user_id: &str) -> Result<bool, InfraError> {
        Ok(self.lock()?.remove(user_id).is_some())
    }
}
