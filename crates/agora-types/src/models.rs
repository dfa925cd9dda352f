use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role carried in the JWT and checked by admin-only routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionType {
    Like,
    Dislike,
}

impl ReactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

impl FromStr for ReactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// What a reaction points at. A reaction always targets exactly one of
/// a post or a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTarget {
    Post(i64),
    Comment(i64),
}

impl ReactionTarget {
    /// Builds a target from the optional ids sent by clients.
    /// Returns `None` unless exactly one id is present.
    pub fn from_ids(post_id: Option<i64>, comment_id: Option<i64>) -> Option<Self> {
        match (post_id, comment_id) {
            (Some(id), None) => Some(Self::Post(id)),
            (None, Some(id)) => Some(Self::Comment(id)),
            _ => None,
        }
    }

    pub fn post_id(&self) -> Option<i64> {
        match self {
            Self::Post(id) => Some(*id),
            Self::Comment(_) => None,
        }
    }

    pub fn comment_id(&self) -> Option<i64> {
        match self {
            Self::Post(_) => None,
            Self::Comment(id) => Some(*id),
        }
    }
}

/// Canonical form used to compare email addresses. Case folding is full
/// Unicode, so `Émile@x` and `émile@x` are the same address.
pub fn email_key(email: &str) -> String {
    email.to_lowercase()
}

/// Proposed profile change held back until the owner confirms it by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileChanges {
    pub username: String,
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_target_requires_exactly_one_id() {
        assert_eq!(ReactionTarget::from_ids(Some(3), None), Some(ReactionTarget::Post(3)));
        assert_eq!(ReactionTarget::from_ids(None, Some(9)), Some(ReactionTarget::Comment(9)));
        assert_eq!(ReactionTarget::from_ids(Some(3), Some(9)), None);
        assert_eq!(ReactionTarget::from_ids(None, None), None);
    }

    #[test]
    fn reaction_type_parses_stored_names() {
        assert_eq!("like".parse::<ReactionType>(), Ok(ReactionType::Like));
        assert_eq!("dislike".parse::<ReactionType>(), Ok(ReactionType::Dislike));
        assert!("love".parse::<ReactionType>().is_err());
    }
}
