//! Request actor model
//!
//! User accounts live in the authentication collaborator; this crate only sees
//! who is calling and with which role.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<i64>,
    pub role: Role,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self { user_id: None, role: Role::Anonymous }
    }

    pub fn user(user_id: i64) -> Self {
        Self { user_id: Some(user_id), role: Role::Authenticated }
    }

    pub fn admin(user_id: i64) -> Self {
        Self { user_id: Some(user_id), role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this actor is the given user
    pub fn is(&self, user_id: i64) -> bool {
        self.role != Role::Anonymous && self.user_id == Some(user_id)
    }
}
