//! Business logic for the Agora forum.
//!
//! Services here are synchronous over the SQLite [`agora_db::Database`];
//! HTTP handlers run them on blocking threads. The two pieces with real
//! state are the profile-update confirmation workflow ([`users`] with
//! [`pending`] and [`queue`]) and the reaction toggle ([`reactions`]).

pub mod comments;
pub mod convert;
pub mod error;
pub mod pagination;
pub mod password;
pub mod pending;
pub mod posts;
pub mod queue;
pub mod reactions;
pub mod shutdown;
pub mod tags;
pub mod tokens;
pub mod topics;
pub mod uploads;
pub mod users;

pub use error::{Result, ServiceError};

use agora_types::api::Claims;
use agora_types::models::Role;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Authors may change their own content; admins may change anyone's.
    pub fn ensure_owner(&self, owner_id: i64, what: &str) -> Result<()> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!("only the author can modify this {}", what)))
        }
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }
}
