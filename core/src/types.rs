//! Domain DTOs for the training-records API.
//!
//! # Design
//! These mirror the backend's JSON (snake_case, `{ success, data }`
//! envelope) but are defined independently of the mock-server crate.
//! Integration tests catch schema drift between the two.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Numeric primary key as issued by the backend.
pub type Id = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    /// Instructor: may author courses and materials.
    Readit,
    Admin,
    SystemAdmin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SystemAdmin)
    }

    pub fn is_instructor(&self) -> bool {
        matches!(self, Role::Readit | Role::Admin | Role::SystemAdmin)
    }

    pub fn can_create_content(&self) -> bool {
        self.is_instructor()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Reply to login and register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrewMember {
    pub personnel_id: Id,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Crew {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub uav_type: Option<String>,
    #[serde(default)]
    pub members: Vec<CrewMember>,
    #[serde(default)]
    pub avatar_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uav_type: Option<String>,
    #[serde(default)]
    pub members: Vec<CrewMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EquipmentType {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentTypeInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Equipment {
    pub id: Id,
    pub name: String,
    pub type_id: Id,
    #[serde(default)]
    pub type_uav: Option<String>,
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub photo_data: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Remote backends store `photo_path`; local stores keep inline
/// `photo_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentInput {
    pub name: String,
    pub type_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_uav: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Personnel {
    pub id: Id,
    /// Service number.
    pub shpk: String,
    pub full_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub unit_id: Option<Id>,
    #[serde(default)]
    pub user_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonnelInput {
    pub shpk: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Id>,
}

/// Serialize a payload into the JSON body carried by an `Operation`.
pub fn to_body<T: Serialize>(payload: &T) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Decode a whole handled reply.
pub fn from_reply<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Decode the `data` member of a `{ success, data }` envelope. A missing
/// `data` decodes as `null`, so `Option<T>` targets yield `None`.
pub fn envelope_data<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    envelope_member(value, "data")
}

/// Decode one named member of a reply object.
pub fn envelope_member<T: DeserializeOwned>(mut value: Value, key: &str) -> Result<T, ApiError> {
    let member = value.get_mut(key).map(Value::take).unwrap_or(Value::Null);
    from_reply(member)
}
