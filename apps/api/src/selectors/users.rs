//! User and employee reads.

use serde::Serialize;

use aria_core::{Permission, PermissionSet, User};
use aria_db::{Database, UserFilter};

use super::found;
use crate::error::ApiResult;

/// A user with the permissions they effectively hold.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub permissions: Vec<Permission>,
}

pub async fn user_list(
    db: &Database,
    filter: &UserFilter,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<User>, i64)> {
    let users = db.users();
    Ok((users.list(filter, limit, offset).await?, users.count(filter).await?))
}

pub async fn user_detail(db: &Database, id: &str) -> ApiResult<UserDetail> {
    let user = found(db.users().get_by_id(id).await?, "User", id)?;
    with_permissions(db, user).await
}

/// Employees are users with `is_staff`; anyone else reads as missing.
pub async fn employee_detail(db: &Database, id: &str) -> ApiResult<UserDetail> {
    let user = db.users().get_by_id(id).await?.filter(|u| u.is_staff);
    let user = found(user, "Employee", id)?;
    with_permissions(db, user).await
}

pub async fn with_permissions(db: &Database, user: User) -> ApiResult<UserDetail> {
    let codenames = db.users().permissions(&user.id).await?;
    let permissions = PermissionSet::new(
        user.is_active,
        user.is_staff,
        user.is_superuser,
        codenames.iter().map(String::as_str),
    )
    .granted();

    Ok(UserDetail { user, permissions })
}
