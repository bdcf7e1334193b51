//! # User Services
//!
//! Customers register themselves; employees are created by other employees.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register             anyone        → customer (is_staff = false)       │
//! │  update_me            the user      → names, phone, password            │
//! │  employee_create      employees     → staff user + permissions          │
//! │  employee_update      employees     → profile, is_active, permissions   │
//! │  employee_deactivate  employees     → is_active = false, tokens revoked │
//! │  employee_grant       employees     → one more permission               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An employee can only hand out permissions they hold themselves, and only
//! a superuser can touch another superuser.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use aria_core::password::hash_password;
use aria_core::validation::{validate_email, validate_password};
use aria_core::{CoreError, LogAction, Permission, ResourceType, User, ValidationError};
use aria_db::Database;

use super::{clean, commit, log_entry, new_id};
use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::selectors::found;
use crate::selectors::users::{with_permissions, UserDetail};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeInput {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Fields left out stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub permission: String,
}

// =============================================================================
// Helpers
// =============================================================================

fn new_user(
    email: String,
    password_hash: String,
    first_name: &str,
    last_name: &str,
    phone: Option<String>,
) -> User {
    let now = Utc::now();
    User {
        id: new_id(),
        email,
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        phone: clean(phone),
        password_hash,
        is_active: true,
        is_staff: false,
        is_superuser: false,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

async fn ensure_email_free(db: &Database, email: &str, except_id: Option<&str>) -> ApiResult<()> {
    match db.users().get_by_email(email).await? {
        Some(existing) if Some(existing.id.as_str()) != except_id => {
            Err(ValidationError::Duplicate {
                field: "email".to_string(),
                value: email.to_string(),
            }
            .into())
        }
        _ => Ok(()),
    }
}

/// Parses codenames and checks that `actor` may hand each of them out.
fn grantable(actor: &CurrentUser, codenames: &[String]) -> ApiResult<Vec<String>> {
    let mut permissions = BTreeSet::new();
    for codename in codenames {
        let permission: Permission = codename.trim().parse()?;
        if !actor.permissions.allows(permission) {
            return Err(CoreError::Forbidden(format!("You cannot grant {permission}")).into());
        }
        permissions.insert(permission.codename().to_string());
    }
    Ok(permissions.into_iter().collect())
}

/// `requested` plus every codename in `current` the actor does not hold.
///
/// Replacing a permission set can only touch what the actor could grant.
fn replace_permissions(
    actor: &CurrentUser,
    current: &[String],
    requested: Vec<String>,
) -> Vec<String> {
    let mut permissions: BTreeSet<String> = requested.into_iter().collect();
    permissions.extend(
        current
            .iter()
            .filter(|codename| {
                !codename
                    .parse::<Permission>()
                    .is_ok_and(|permission| actor.permissions.allows(permission))
            })
            .cloned(),
    );
    permissions.into_iter().collect()
}

fn ensure_may_manage(actor: &CurrentUser, target: &User) -> ApiResult<()> {
    if target.is_superuser && !actor.permissions.is_superuser() {
        return Err(
            CoreError::Forbidden("Only a superuser can change a superuser".to_string()).into(),
        );
    }
    Ok(())
}

// =============================================================================
// Customers
// =============================================================================

/// Registers a customer account.
pub async fn register(db: &Database, input: RegisterInput) -> ApiResult<UserDetail> {
    let email = validate_email(&input.email)?;
    validate_password(&input.password)?;
    ensure_email_free(db, &email, None).await?;

    let user = new_user(
        email,
        hash_password(&input.password)?,
        &input.first_name,
        &input.last_name,
        input.phone,
    );

    let mut tx = db.begin().await?;
    db.users().insert(&mut *tx, &user).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(&user, ResourceType::User, &user.id, LogAction::Create, "Registered"),
        )
        .await?;
    commit(tx).await?;

    info!(id = %user.id, name = %user.full_name(), "User registered");
    with_permissions(db, user).await
}

pub async fn update_me(db: &Database, me: &User, input: UpdateMeInput) -> ApiResult<UserDetail> {
    let mut user = me.clone();
    if let Some(first_name) = input.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = input.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if input.phone.is_some() {
        user.phone = clean(input.phone);
    }
    let password_hash = match input.password {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_password(&password)?)
        }
        None => None,
    };
    user.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.users().update(&mut *tx, &user).await?;
    if let Some(hash) = &password_hash {
        db.users().set_password(&mut *tx, &user.id, hash).await?;
    }
    let message = if password_hash.is_some() {
        "Updated profile and password"
    } else {
        "Updated profile"
    };
    db.logs()
        .insert(&mut *tx, &log_entry(me, ResourceType::User, &user.id, LogAction::Update, message))
        .await?;
    commit(tx).await?;

    with_permissions(db, user).await
}

// =============================================================================
// Employees
// =============================================================================

pub async fn employee_create(
    db: &Database,
    actor: &CurrentUser,
    input: EmployeeInput,
) -> ApiResult<UserDetail> {
    let email = validate_email(&input.email)?;
    validate_password(&input.password)?;
    let permissions = grantable(actor, &input.permissions)?;
    ensure_email_free(db, &email, None).await?;

    let mut user = new_user(
        email,
        hash_password(&input.password)?,
        &input.first_name,
        &input.last_name,
        input.phone,
    );
    user.is_staff = true;

    let mut tx = db.begin().await?;
    db.users().insert(&mut *tx, &user).await?;
    db.users().set_permissions(&mut tx, &user.id, &permissions).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                &actor.user,
                ResourceType::User,
                &user.id,
                LogAction::Create,
                format!("Created employee {} with [{}]", user.email, permissions.join(", ")),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id = %user.id, by = %actor.id(), "Employee created");
    with_permissions(db, user).await
}

pub async fn employee_update(
    db: &Database,
    actor: &CurrentUser,
    id: &str,
    input: EmployeeUpdate,
) -> ApiResult<UserDetail> {
    let existing = db.users().get_by_id(id).await?.filter(|u| u.is_staff);
    let mut user = found(existing, "Employee", id)?;
    ensure_may_manage(actor, &user)?;

    if let Some(email) = &input.email {
        let email = validate_email(email)?;
        ensure_email_free(db, &email, Some(id)).await?;
        user.email = email;
    }
    if let Some(first_name) = input.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = input.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if input.phone.is_some() {
        user.phone = clean(input.phone);
    }
    let deactivating = input.is_active == Some(false) && user.is_active;
    if deactivating && user.id == actor.id() {
        return Err(CoreError::Forbidden("You cannot deactivate yourself".to_string()).into());
    }
    if let Some(is_active) = input.is_active {
        user.is_active = is_active;
    }
    let permissions = match input.permissions.as_deref() {
        Some(codenames) => {
            let requested = grantable(actor, codenames)?;
            let current = db.users().permissions(id).await?;
            Some(replace_permissions(actor, &current, requested))
        }
        None => None,
    };
    user.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.users().update(&mut *tx, &user).await?;
    if let Some(permissions) = &permissions {
        db.users().set_permissions(&mut tx, id, permissions).await?;
    }
    if deactivating {
        db.tokens().blacklist_all_for_user(&mut *tx, id).await?;
    }
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                &actor.user,
                ResourceType::User,
                id,
                LogAction::Update,
                format!("Updated employee {}", user.email),
            ),
        )
        .await?;
    commit(tx).await?;

    with_permissions(db, user).await
}

/// Deactivates an employee and revokes every refresh token they hold.
pub async fn employee_deactivate(
    db: &Database,
    actor: &CurrentUser,
    id: &str,
) -> ApiResult<UserDetail> {
    let existing = db.users().get_by_id(id).await?.filter(|u| u.is_staff);
    let mut user = found(existing, "Employee", id)?;
    ensure_may_manage(actor, &user)?;
    if user.id == actor.id() {
        return Err(CoreError::Forbidden("You cannot deactivate yourself".to_string()).into());
    }

    user.is_active = false;
    user.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.users().update(&mut *tx, &user).await?;
    let revoked = db.tokens().blacklist_all_for_user(&mut *tx, id).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                &actor.user,
                ResourceType::User,
                id,
                LogAction::Update,
                format!("Deactivated employee {}", user.email),
            ),
        )
        .await?;
    commit(tx).await?;

    warn!(id, revoked, by = %actor.id(), "Employee deactivated");
    with_permissions(db, user).await
}

pub async fn employee_grant_permission(
    db: &Database,
    actor: &CurrentUser,
    id: &str,
    input: PermissionGrant,
) -> ApiResult<UserDetail> {
    let existing = db.users().get_by_id(id).await?.filter(|u| u.is_staff);
    let user = found(existing, "Employee", id)?;
    ensure_may_manage(actor, &user)?;
    let codenames = grantable(actor, std::slice::from_ref(&input.permission))?;

    let mut tx = db.begin().await?;
    for codename in &codenames {
        db.users().grant_permission(&mut *tx, id, codename).await?;
    }
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                &actor.user,
                ResourceType::User,
                id,
                LogAction::Update,
                format!("Granted {}", codenames.join(", ")),
            ),
        )
        .await?;
    commit(tx).await?;

    with_permissions(db, user).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use aria_core::password::verify_password;
    use aria_core::PermissionSet;
    use axum::http::StatusCode;

    async fn current(db: &Database, user: User) -> CurrentUser {
        let codenames = db.users().permissions(&user.id).await.unwrap();
        let permissions = PermissionSet::new(
            user.is_active,
            user.is_staff,
            user.is_superuser,
            codenames.iter().map(String::as_str),
        );
        CurrentUser { user, permissions }
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: "fliser-og-fuger".to_string(),
            first_name: " Kari ".to_string(),
            last_name: "Nordmann".to_string(),
            phone: None,
        }
    }

    fn employee_input(email: &str, permissions: &[&str]) -> EmployeeInput {
        EmployeeInput {
            email: email.to_string(),
            password: "ansatt-passord".to_string(),
            first_name: "Ola".to_string(),
            last_name: "Ansatt".to_string(),
            phone: None,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_register_and_update_me() {
        let db = test_support::db().await;

        let detail = register(&db, register_input(" Kari@Example.NO ")).await.unwrap();
        assert_eq!(detail.user.email, "kari@example.no");
        assert_eq!(detail.user.first_name, "Kari");
        assert!(!detail.user.is_staff);
        assert!(detail.permissions.is_empty());

        let duplicate = register(&db, register_input("kari@example.no")).await.unwrap_err();
        assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
        assert!(duplicate.errors.unwrap().contains_key("email"));

        let short = RegisterInput {
            password: "kort".to_string(),
            ..register_input("ola@example.no")
        };
        assert_eq!(register(&db, short).await.unwrap_err().status, StatusCode::BAD_REQUEST);

        let update = UpdateMeInput {
            phone: Some("+47 99 88 77 66".to_string()),
            password: Some("nytt-passord".to_string()),
            ..Default::default()
        };
        let updated = update_me(&db, &detail.user, update).await.unwrap();
        assert_eq!(updated.user.phone.as_deref(), Some("+47 99 88 77 66"));
        assert_eq!(updated.user.first_name, "Kari");

        let stored = db.users().get_by_id(&detail.user.id).await.unwrap().unwrap();
        assert!(verify_password("nytt-passord", &stored.password_hash));
    }

    #[tokio::test]
    async fn test_employee_permissions_are_bounded_by_actor() {
        let db = test_support::db().await;
        let manager = test_support::staff(
            &db,
            "leder@aria.local",
            &[Permission::HasEmployeesEdit, Permission::HasProductsEdit],
        )
        .await;
        let manager = current(&db, manager).await;

        let created = employee_create(
            &db,
            &manager,
            employee_input("selger@aria.local", &["has_products_edit"]),
        )
        .await
        .unwrap();
        assert!(created.user.is_staff);
        assert_eq!(created.permissions, vec![Permission::HasProductsEdit]);

        let beyond = employee_create(
            &db,
            &manager,
            employee_input("lager@aria.local", &["has_discounts_edit"]),
        )
        .await
        .unwrap_err();
        assert_eq!(beyond.status, StatusCode::FORBIDDEN);

        let unknown = employee_create(&db, &manager, employee_input("x@aria.local", &["has_all"]))
            .await
            .unwrap_err();
        assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

        let grant = employee_grant_permission(
            &db,
            &manager,
            &created.user.id,
            PermissionGrant {
                permission: "has_employees_edit".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            grant.permissions,
            vec![Permission::HasEmployeesEdit, Permission::HasProductsEdit]
        );

        let admin = test_support::superuser(&db).await;
        let touch_admin = employee_update(&db, &manager, &admin.id, EmployeeUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(touch_admin.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_employee_update_keeps_permissions_the_actor_lacks() {
        let db = test_support::db().await;
        let manager = test_support::staff(
            &db,
            "leder@aria.local",
            &[Permission::HasEmployeesEdit, Permission::HasNotesEdit],
        )
        .await;
        let manager = current(&db, manager).await;
        let peer = test_support::staff(
            &db,
            "kollega@aria.local",
            &[Permission::HasProductsEdit, Permission::HasNotesEdit],
        )
        .await;

        let cleared = EmployeeUpdate {
            permissions: Some(vec![]),
            ..Default::default()
        };
        let detail = employee_update(&db, &manager, &peer.id, cleared).await.unwrap();
        assert_eq!(detail.permissions, vec![Permission::HasProductsEdit]);

        let stored = db.users().permissions(&peer.id).await.unwrap();
        assert_eq!(stored, vec!["has_products_edit".to_string()]);

        let regranted = EmployeeUpdate {
            permissions: Some(vec!["has_notes_edit".to_string()]),
            ..Default::default()
        };
        let detail = employee_update(&db, &manager, &peer.id, regranted).await.unwrap();
        assert!(detail.permissions.contains(&Permission::HasProductsEdit));
        assert!(detail.permissions.contains(&Permission::HasNotesEdit));
        assert_eq!(detail.permissions.len(), 2);
    }

    #[tokio::test]
    async fn test_deactivate_revokes_tokens() {
        let db = test_support::db().await;
        let admin = test_support::superuser(&db).await;
        let admin = current(&db, admin).await;
        let employee = test_support::staff(&db, "ansatt@aria.local", &[]).await;

        let state = test_support::test_state_with(db.clone()).await;
        let pair = test_support::login(&state, "ansatt@aria.local").await;

        let detail = employee_deactivate(&db, &admin, &employee.id).await.unwrap();
        assert!(!detail.user.is_active);

        let claims = state.jwt.validate_refresh_token(&pair.refresh).unwrap();
        assert!(db.tokens().is_blacklisted(&claims.jti).await.unwrap());

        let myself = employee_deactivate(&db, &admin, admin.id()).await.unwrap_err();
        assert_eq!(myself.status, StatusCode::FORBIDDEN);
    }
}
