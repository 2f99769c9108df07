use mongodb::bson::{doc, Bson};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::auth::Bearer;
use crate::error::{Error, Result};
use crate::model::{
    api::role::{OpenRoleRequest, RoleDecision, RoleRequestSpec},
    mongodb::{Coll, Id},
    role::{Role, RoleRequest},
};
use crate::upstream::AuthServer;

pub fn routes() -> Vec<Route> {
    routes![request_role_change, open_role_requests, close_role_request]
}

/// Request a role exactly one rank above the caller's current one.
/// At most one open request per user.
#[post("/users/role-requests", data = "<spec>", format = "json")]
async fn request_role_change(
    bearer: Bearer,
    spec: Json<RoleRequestSpec>,
    auth_server: &State<AuthServer>,
    requests: Coll<RoleRequest>,
) -> Result<Json<Id>> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    if auth_server.is_struck(bearer.token()).await? {
        return Err(Error::Forbidden("user is struck".to_string()));
    }
    let user_id = bearer.subject()?;

    let open_filter = doc! { "user_id": user_id, "approved": Bson::Null };
    if requests.find_one(open_filter, None).await?.is_some() {
        return Err(Error::Conflict(
            "an open role request already exists".to_string(),
        ));
    }

    let current = auth_server.role(bearer.token()).await?;
    if current.next_rank() != Some(spec.role) {
        return Err(Error::Forbidden(
            "role requests must climb exactly one rank".to_string(),
        ));
    }

    let request = RoleRequest::new(user_id, spec.role, spec.0.reason);
    requests.insert_one(&request, None).await?;

    info!("role request {} opened for {}", request.id, request.role);
    Ok(Json(request.id))
}

/// Open requests visible to the caller: Operators see everything, Admins see
/// requests up to Moderator, Moderators see requests for User.
#[get("/users/role-requests")]
async fn open_role_requests(
    bearer: Bearer,
    auth_server: &State<AuthServer>,
    requests: Coll<RoleRequest>,
) -> Result<Json<Vec<OpenRoleRequest>>> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }

    let filter = match auth_server.role(bearer.token()).await? {
        Role::Operator => doc! { "approved": Bson::Null },
        Role::Admin => doc! {
            "approved": Bson::Null,
            "role": { "$in": [Role::User, Role::Moderator] },
        },
        Role::Moderator => doc! { "approved": Bson::Null, "role": Role::User },
        Role::User => {
            return Err(Error::Forbidden(
                "no authority over role requests".to_string(),
            ))
        }
    };

    let open: Vec<RoleRequest> = requests.find(filter, None).await?.try_collect().await?;
    Ok(Json(open.into_iter().map(OpenRoleRequest::from).collect()))
}

/// Decide a user's open request. Approval first delegates the actual role
/// change to the auth server; if that fails the request stays open. The
/// recorded decision is terminal either way.
#[post("/users/role-requests/close", data = "<decision>", format = "json")]
async fn close_role_request(
    bearer: Bearer,
    decision: Json<RoleDecision>,
    auth_server: &State<AuthServer>,
    requests: Coll<RoleRequest>,
) -> Result<()> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    let decider_id = bearer.subject()?;
    let role = auth_server.role(bearer.token()).await?;

    let open_filter = doc! { "user_id": decision.user_id, "approved": Bson::Null };
    let request = requests
        .find_one(open_filter, None)
        .await?
        .ok_or_else(|| Error::not_found("request not found"))?;

    if !role.may_decide(request.role) {
        return Err(Error::Forbidden(
            "no authority over this role request".to_string(),
        ));
    }

    if decision.approved {
        auth_server
            .change_role(bearer.token(), request.user_id, request.role)
            .await?;
    }

    let close = doc! {
        "$set": {
            "approved": decision.approved,
            "decided_by": decider_id,
        }
    };
    requests.update_one(request.id.as_doc(), close, None).await?;

    info!(
        "role request {} {}",
        request.id,
        if decision.approved { "approved" } else { "rejected" }
    );
    Ok(())
}
