//! Domain library for the Profile service.
//!
//! This crate holds the domain types, ports (traits), the application
//! service and error definitions. Its only dependency is serde; adapters and
//! IO concerns stay out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

use serde::{Deserialize, Serialize};

/// Opaque, store-assigned identifier of a profile.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidProfileId("empty".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProfileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProfileId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProfileId> for String {
    fn from(id: ProfileId) -> Self {
        id.0
    }
}

/// A stored profile document.
///
/// `id` is `None` until the store has saved the profile for the first time.
/// Updates never patch fields; they persist a whole new value under the same id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProfileId>,
    pub email: String,
}

impl Profile {
    /// A profile that has not been saved yet.
    pub fn new<S: Into<String>>(email: S) -> Self {
        Self {
            id: None,
            email: email.into(),
        }
    }

    pub fn with_id<S: Into<String>>(id: ProfileId, email: S) -> Self {
        Self {
            id: Some(id),
            email: email.into(),
        }
    }

    /// Whether the store has assigned an identity to this profile.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Identifier source for adapters that assign ids themselves.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> ProfileId;
}

/// Repository port over the profile document store.
///
/// Every operation is asynchronous; implementations must return `Send`
/// futures so the service can be driven from a multi-threaded runtime.
pub trait ProfileRepository: Send + Sync {
    /// All stored profiles, in no particular order.
    fn find_all(&self) -> impl Future<Output = Result<Vec<Profile>, CoreError>> + Send;

    /// `Ok(None)` when no profile has this id.
    fn find_by_id(
        &self,
        id: &ProfileId,
    ) -> impl Future<Output = Result<Option<Profile>, CoreError>> + Send;

    /// Insert when `profile.id` is `None` (a new id is assigned), otherwise
    /// overwrite the stored document entirely.
    fn save(&self, profile: Profile) -> impl Future<Output = Result<Profile, CoreError>> + Send;

    /// Remove a profile. Succeeds when the id does not exist.
    fn delete_by_id(&self, id: &ProfileId) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Remove every profile.
    fn delete_all(&self) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Core domain errors (hand-rolled, no external error crates).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    InvalidProfileId(String),
    /// The store could not be reached or its client could not be built.
    StoreUnavailable(String),
    /// The store answered but the operation failed (I/O, bad stored data).
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidProfileId(msg) => write!(f, "invalid profile id: {}", msg),
            CoreError::StoreUnavailable(msg) => write!(f, "store unavailable: {}", msg),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

pub mod adapters;
pub mod base62;
pub mod events;
pub mod ids;
pub mod service;
