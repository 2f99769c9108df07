use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    mongodb::Id,
    role::{Role, RoleRequest},
};

/// A role-change request, as submitted by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequestSpec {
    /// The desired role; must be exactly one rank above the caller's.
    pub role: Role,
    /// Why the caller wants it.
    pub reason: String,
}

/// An open request as shown to approvers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRoleRequest {
    /// Request id.
    pub id: Id,
    /// When the request was made.
    pub created_at: DateTime<Utc>,
    /// Subject id of the requester.
    pub requester_id: Id,
    /// The requester's reason.
    pub reason: String,
    /// The requested role.
    pub role: Role,
}

impl From<RoleRequest> for OpenRoleRequest {
    fn from(request: RoleRequest) -> Self {
        Self {
            id: request.id,
            created_at: request.created_at,
            requester_id: request.user_id,
            reason: request.reason,
            role: request.role,
        }
    }
}

/// The approver's decision when closing a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDecision {
    /// Subject id of the user whose open request is being decided.
    pub user_id: Id,
    /// Approve or reject. Either way the request closes for good.
    pub approved: bool,
}
