//! Content pack identity and activation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Versioned namespace grouping catalog rows. Every catalog row is tagged
/// with a pack id; lookups resolve through an explicit pack priority list or
/// through the set of active packs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPack {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentPack {
    /// Build an active pack stamped with the current time
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            version: version.into(),
            author: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
