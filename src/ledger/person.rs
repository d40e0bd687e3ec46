use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const COMMON_ID: &str = "common";

/// Identifier of a person, or of the shared "common" pseudo-person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The pseudo-person whose expenses are shared by the household.
    pub fn common() -> Self {
        Self(COMMON_ID.into())
    }

    pub fn is_common(&self) -> bool {
        self.0 == COMMON_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PersonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A member of the household whose money is tracked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
}

impl Person {
    /// Creates a person with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PersonId::new(Uuid::new_v4().to_string()),
            name: name.into(),
        }
    }

    pub fn with_id(id: impl Into<PersonId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
