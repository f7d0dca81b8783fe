//! Board models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Patch;

/// A board owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Unique among the boards of the owner
    pub slug: String,
    /// Free-form client settings
    pub settings: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request payload for creating a board
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoard {
    pub name: String,
    #[serde(default)]
    pub settings: Option<Value>,
}

/// Request payload for updating a board
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBoard {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub settings: Patch<Value>,
}
