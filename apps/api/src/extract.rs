//! Request extractors.
//!
//! ```text
//! Authorization: Bearer <access> ─► CurrentUser { user, permissions }
//!                     (missing)  ─► OptionalUser(None)
//! body / query / path            ─► ApiJson / ApiQuery / ApiPath
//!                                   (rejections become 400 VALIDATION_FAILED)
//! ?limit=&offset=&...            ─► Pagination
//! ```

use axum::extract::{FromRequest, FromRequestParts, OriginalUri, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use aria_core::pagination::query_string;
use aria_core::{Page, PageParams, Permission, PermissionSet, User};

use crate::auth::extract_bearer_token;
use crate::error::{ApiResult, ApplicationError};
use crate::AppState;

// =============================================================================
// Authentication
// =============================================================================

/// The authenticated, active user behind the request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub permissions: PermissionSet,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn is_staff(&self) -> bool {
        self.permissions.is_staff()
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApplicationError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApplicationError::unauthenticated("Authentication credentials were not provided")
            })?;

        authenticate(header, state).await
    }
}

/// Like [`CurrentUser`], but anonymous requests are allowed.
///
/// A present but invalid token is still rejected.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl OptionalUser {
    pub fn is_staff(&self) -> bool {
        self.0.as_ref().is_some_and(CurrentUser::is_staff)
    }
}

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = ApplicationError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match parts.headers.get(AUTHORIZATION) {
            None => Ok(OptionalUser(None)),
            Some(value) => {
                let header = value
                    .to_str()
                    .map_err(|_| {
                        ApplicationError::unauthenticated("Malformed authorization header")
                    })?;
                Ok(OptionalUser(Some(authenticate(header, state).await?)))
            }
        }
    }
}

async fn authenticate(header: &str, state: &AppState) -> ApiResult<CurrentUser> {
    let token = extract_bearer_token(header)
        .ok_or_else(|| ApplicationError::unauthenticated("Expected a Bearer token"))?;
    let claims = state.jwt.validate_access_token(token)?;

    let users = state.db.users();
    let user = users
        .get_by_id(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApplicationError::unauthenticated("User not found or inactive"))?;

    let codenames = users.permissions(&user.id).await?;
    let permissions = PermissionSet::new(
        user.is_active,
        user.is_staff,
        user.is_superuser,
        codenames.iter().map(String::as_str),
    );

    Ok(CurrentUser { user, permissions })
}

// =============================================================================
// Permission Guards
// =============================================================================

/// Fails with 403 unless the user holds `permission`.
pub fn require(user: &CurrentUser, permission: Permission) -> ApiResult<()> {
    if user.permissions.allows(permission) {
        Ok(())
    } else {
        Err(ApplicationError::forbidden(format!(
            "Missing permission: {permission}"
        )))
    }
}

/// Fails with 403 unless the user is active staff or a superuser.
pub fn require_staff(user: &CurrentUser) -> ApiResult<()> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(ApplicationError::forbidden("Staff only"))
    }
}

// =============================================================================
// Body / Query / Path
// =============================================================================

/// `Json<T>` with [`ApplicationError`] as rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApplicationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Query<T>` with [`ApplicationError`] as rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApplicationError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

/// `Path<T>` with [`ApplicationError`] as rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApplicationError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// `limit` / `offset` plus what is needed to build page links.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub params: PageParams,
    path: String,
    query: Vec<(String, String)>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.params.limit
    }

    pub fn offset(&self) -> i64 {
        self.params.offset
    }

    /// Builds the page; links are absolute, rooted at `base_url`.
    pub fn page<T>(&self, results: Vec<T>, count: i64, base_url: &str) -> Page<T> {
        let url = format!("{base_url}{}", self.path);
        Page::new(results, count, self.params, &url, &self.query)
    }

    /// A stable key for caching this exact listing.
    pub fn cache_key(&self, prefix: &str) -> String {
        let mut pairs: Vec<(&str, &str)> = self
            .query
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        pairs.sort_unstable();
        format!(
            "{prefix}:{}:{}:{}",
            self.params.limit,
            self.params.offset,
            query_string(pairs)
        )
    }
}

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApplicationError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());

        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&uri)?;

        let mut params = PageParams::default();
        let mut query = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            match key.as_str() {
                "limit" => params.limit = parse_number("limit", &value)?,
                "offset" => params.offset = parse_number("offset", &value)?,
                _ => query.push((key, value)),
            }
        }

        Ok(Pagination {
            params: params.clamped(),
            path: uri.path().to_string(),
            query,
        })
    }
}

fn parse_number(field: &str, value: &str) -> ApiResult<i64> {
    value.parse().map_err(|_| {
        ApplicationError::validation(format!("{field} must be an integer"))
            .with_field(field, "must be an integer")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    async fn pagination(uri: &str) -> Pagination {
        let (mut parts, _) = HttpRequest::builder().uri(uri).body(()).unwrap().into_parts();
        Pagination::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_cache_key_encodes_values() {
        let literal = pagination("/api/front/products?search=flis%26supplierId%3DS1").await;
        let filtered = pagination("/api/front/products?search=flis&supplierId=S1").await;

        assert_ne!(literal.cache_key("front:products"), filtered.cache_key("front:products"));
        assert_eq!(
            filtered.cache_key("front:products"),
            "front:products:25:0:search=flis&supplierId=S1"
        );
    }

    #[tokio::test]
    async fn test_cache_key_ignores_parameter_order() {
        let a = pagination("/api/front/products?supplierId=S1&search=flis&limit=10").await;
        let b = pagination("/api/front/products?limit=10&search=flis&supplierId=S1").await;

        assert_eq!(a.cache_key("front:products"), b.cache_key("front:products"));
    }

    #[tokio::test]
    async fn test_rejects_non_numeric_limit() {
        let (mut parts, _) = HttpRequest::builder()
            .uri("/api/products?limit=many")
            .body(())
            .unwrap()
            .into_parts();
        let err = Pagination::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
