use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application-level record about a student, keyed by the identity record's id
///
/// At most one profile exists per user id, and a user may legitimately have no
/// profile yet; absence is an expected state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// School grade/class, kept as free text ("9", "12", ...)
    pub grade: String,
    /// Education board, e.g. "CBSE"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Insert payload for a fresh profile row; timestamps are store-assigned
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
}

/// Partial update: only set fields are sent to the store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.grade.is_none()
            && self.board.is_none()
            && self.area.is_none()
            && self.profile_picture_url.is_none()
    }
}
