use crate::domain::models::PublicUser;
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};

/// Token and profile of the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionData {
    pub token: String,
    pub user: PublicUser,
}

/// Shared handle to the current session. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Arc<RwLock<Option<SessionData>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from whatever the store persisted last.
    pub fn restore(store: &dyn SessionStore) -> Result<Self, InfraError> {
        let session = Self::new();
        if let Some(data) = store.load()? {
            session.set(data)?;
        }
        Ok(session)
    }

    pub fn current(&self) -> Result<Option<SessionData>, InfraError> {
        let guard = self
            .current
            .read()
            .map_err(|error| InfraError::Credential(format!("session lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    pub fn token(&self) -> Result<Option<String>, InfraError> {
        Ok(self.current()?.map(|data| data.token))
    }

    pub fn user(&self) -> Result<Option<PublicUser>, InfraError> {
        Ok(self.current()?.map(|data| data.user))
    }

    pub fn set(&self, data: SessionData) -> Result<(), InfraError> {
        let mut guard = self
            .current
            .write()
            .map_err(|error| InfraError::Credential(format!("session lock poisoned: {error}")))?;
        *guard = Some(data);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), InfraError> {
        let mut guard = self
            .current
            .write()
            .map_err(|error| InfraError::Credential(format!("session lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}

pub trait SessionStore: Send + Sync {
    fn save(&self, data: &SessionData) -> Result<(), InfraError>;
    fn load(&self) -> Result<Option<SessionData>, InfraError>;
    fn delete(&self) -> Result<(), InfraError>;
}

/// Persists the session in the OS credential store.
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service_name: String,
    account_name: String,
}

impl KeyringSessionStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new("taskdeck.session", "default")
    }
}

impl SessionStore for KeyringSessionStore {
    fn save(&self, data: &SessionData) -> Result<(), InfraError> {
        let payload =
            serde_json::to_string(data).map_err(|error| InfraError::Credential(error.to_string()))?;
        self.entry()?
            .set_password(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load(&self) -> Result<Option<SessionData>, InfraError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(InfraError::Credential(error.to_string())),
        };

        let data = serde_json::from_str::<SessionData>(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        Ok(Some(data))
    }

    fn delete(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    data: Mutex<Option<SessionData>>,
}

impl InMemorySessionStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<SessionData>>, InfraError> {
        self.data
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))
    }
}

impl SessionStore for InMemorySessionStore {
    fn save(&self, data: &SessionData) -> Result<(), InfraError> {
        *self.lock()? = Some(data.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionData>, InfraError> {
        Ok(self.lock()?.clone())
    }

    fn delete(&self) -> Result<(), InfraError> {
        *self.lock()? = None;
        Ok(())
    }
}
