use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::{self, serde_helpers::chrono_datetime_as_bson_datetime, Bson};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Privilege ranks, as reported by the auth server.
///
/// `User < Moderator < Admin` form the orderly ladder users climb one step
/// at a time; `Operator` sits outside it as a pure approver rank.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Moderator,
    Admin,
    Operator,
}

impl Role {
    /// The one rank a holder of this role may request, if any.
    pub fn next_rank(self) -> Option<Role> {
        match self {
            Role::User => Some(Role::Moderator),
            Role::Moderator => Some(Role::Admin),
            Role::Admin | Role::Operator => None,
        }
    }

    /// May this role triage reports?
    pub fn may_moderate(self) -> bool {
        !matches!(self, Role::User)
    }

    /// May this role decide a role-change request targeting `requested`?
    ///
    /// Operators decide anything, admins decide requests up to Moderator,
    /// moderators decide requests up to User.
    pub fn may_decide(self, requested: Role) -> bool {
        match self {
            Role::Operator => true,
            Role::Admin => matches!(requested, Role::User | Role::Moderator),
            Role::Moderator => requested == Role::User,
            Role::User => false,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::User => "User",
            Role::Moderator => "Moderator",
            Role::Admin => "Admin",
            Role::Operator => "Operator",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "User" => Ok(Role::User),
            "Moderator" => Ok(Role::Moderator),
            "Admin" => Ok(Role::Admin),
            "Operator" => Ok(Role::Operator),
            _ => Err(()),
        }
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        bson::to_bson(&role).unwrap() // Infallible for a unit enum.
    }
}

/// A pending or decided role-change request, as stored in the database.
///
/// `approved` is the one-way terminal state: `None` while open, then set
/// exactly once to the decision. At most one open request exists per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRequest {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: Id,
    /// Subject id of the requester.
    pub user_id: Id,
    /// The requested role, exactly one rank above the requester's.
    pub role: Role,
    /// Why the requester wants the role.
    pub reason: String,
    /// `None` = open; `Some(decision)` = terminally decided.
    pub approved: Option<bool>,
    /// Subject id of the decider, set with the decision.
    pub decided_by: Option<Id>,
    /// Creation time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl RoleRequest {
    pub fn new(user_id: Id, role: Role, reason: String) -> Self {
        Self {
            id: Id::new(),
            user_id,
            role,
            reason,
            approved: None,
            decided_by: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_ladder() {
        assert_eq!(Role::User.next_rank(), Some(Role::Moderator));
        assert_eq!(Role::Moderator.next_rank(), Some(Role::Admin));
        assert_eq!(Role::Admin.next_rank(), None);
        assert_eq!(Role::Operator.next_rank(), None);
    }

    #[test]
    fn decision_authority() {
        assert!(Role::Operator.may_decide(Role::Admin));
        assert!(Role::Operator.may_decide(Role::Moderator));
        assert!(Role::Admin.may_decide(Role::Moderator));
        assert!(Role::Admin.may_decide(Role::User));
        assert!(!Role::Admin.may_decide(Role::Admin));
        assert!(Role::Moderator.may_decide(Role::User));
        assert!(!Role::Moderator.may_decide(Role::Moderator));
        assert!(!Role::User.may_decide(Role::User));
    }

    #[test]
    fn moderation_rank() {
        assert!(!Role::User.may_moderate());
        assert!(Role::Moderator.may_moderate());
        assert!(Role::Admin.may_moderate());
        assert!(Role::Operator.may_moderate());
    }

    #[test]
    fn parses_auth_server_text() {
        assert_eq!("Moderator".parse::<Role>(), Ok(Role::Moderator));
        assert_eq!(" Admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("Superuser".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn new_requests_are_open() {
        let request = RoleRequest::new(Id::new(), Role::Moderator, "active member".to_string());
        assert_eq!(request.approved, None);
        assert_eq!(request.decided_by, None);
    }
}
