use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub fn from_claim(role: &str) -> Option<Self> {
        match role.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "instructor" | "teacher" => Some(Role::Instructor),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

/// The authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn require_instructor(&self) -> Result<i64> {
        match self.role {
            Role::Instructor | Role::Admin => Ok(self.id),
            Role::Student => Err(Error::Forbidden("Instructor access required".to_string())),
        }
    }

    pub fn require_student(&self) -> Result<i64> {
        match self.role {
            Role::Student => Ok(self.id),
            _ => Err(Error::Forbidden("Student access required".to_string())),
        }
    }
}
