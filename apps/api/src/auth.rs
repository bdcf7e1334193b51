//! JWT authentication module.
//!
//! ## Token Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /api/auth/login ──► access + refresh(jti₁)                        │
//! │                              │                                          │
//! │                              └─► outstanding_tokens(jti₁)               │
//! │                                                                         │
//! │  POST /api/auth/refresh(jti₁)                                           │
//! │      ├── blacklisted?  ─────────► 401                                   │
//! │      ├── issue access + refresh(jti₂) ─► outstanding_tokens(jti₂)       │
//! │      └── blacklist jti₁                   (rotation)                    │
//! │                                                                         │
//! │  POST /api/auth/logout(jti₂) ──► blacklist jti₂                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Access tokens are never stored; they expire on their own.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use aria_core::password::verify_password;
use aria_core::{OutstandingToken, User};
use aria_db::Database;

use crate::error::{ApiResult, ApplicationError};

pub const ACCESS: &str = "access";
pub const REFRESH: &str = "refresh";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access" or "refresh")
    pub token_type: String,
}

impl Claims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_else(Utc::now)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// A signed token with its decoded claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// JWT token manager.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime_secs: i64,
    refresh_lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &str, access_lifetime_secs: i64, refresh_lifetime_secs: i64) -> Self {
        JwtManager {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_lifetime_secs,
            refresh_lifetime_secs,
        }
    }

    pub fn generate_access_token(&self, user_id: &str) -> ApiResult<IssuedToken> {
        self.generate(user_id, ACCESS, self.access_lifetime_secs)
    }

    pub fn generate_refresh_token(&self, user_id: &str) -> ApiResult<IssuedToken> {
        self.generate(user_id, REFRESH, self.refresh_lifetime_secs)
    }

    fn generate(
        &self,
        user_id: &str,
        token_type: &str,
        lifetime_secs: i64,
    ) -> ApiResult<IssuedToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: token_type.to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| {
                ApplicationError::internal(format!("Failed to generate {token_type} token: {e}"))
            })?;

        Ok(IssuedToken { token, claims })
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let token_data: TokenData<Claims> =
            decode(token, &self.decoding_key, &Validation::default())
                .map_err(|e| ApplicationError::unauthenticated(format!("Invalid token: {e}")))?;

        Ok(token_data.claims)
    }

    pub fn validate_access_token(&self, token: &str) -> ApiResult<Claims> {
        self.validate_typed(token, ACCESS)
    }

    pub fn validate_refresh_token(&self, token: &str) -> ApiResult<Claims> {
        self.validate_typed(token, REFRESH)
    }

    fn validate_typed(&self, token: &str, expected: &str) -> ApiResult<Claims> {
        let claims = self.validate_token(token)?;

        if claims.token_type != expected {
            return Err(ApplicationError::unauthenticated(format!(
                "Expected {expected} token"
            )));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// AuthService
// =============================================================================

/// An access/refresh pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Login, refresh rotation and logout on top of [`JwtManager`].
pub struct AuthService<'a> {
    db: &'a Database,
    jwt: &'a JwtManager,
}

impl<'a> AuthService<'a> {
    pub fn new(db: &'a Database, jwt: &'a JwtManager) -> Self {
        AuthService { db, jwt }
    }

    /// Checks credentials and issues a pair.
    ///
    /// Unknown email, wrong password and inactive account all answer with
    /// the same message.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, TokenPair)> {
        let invalid = || {
            ApplicationError::unauthenticated("No active account found with the given credentials")
        };

        let email = email.trim().to_lowercase();
        let user = self.db.users().get_by_email(&email).await?.ok_or_else(invalid)?;

        if !user.is_active || !verify_password(password, &user.password_hash) {
            warn!(email = %email, "Failed login");
            return Err(invalid());
        }

        let pair = self.issue_pair(&user.id, None).await?;
        self.db.users().touch_last_login(&user.id, Utc::now()).await?;

        info!(user_id = %user.id, "User logged in");
        Ok((user, pair))
    }

    /// Rotates a refresh token: issues a new pair and blacklists the old one.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenPair> {
        let claims = self.jwt.validate_refresh_token(refresh_token)?;
        let outstanding = self.usable_outstanding(&claims).await?;

        let user = self
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApplicationError::unauthenticated("User not found or inactive"))?;

        let pair = self.issue_pair(&user.id, Some(&outstanding.id)).await?;
        info!(user_id = %user.id, "Rotated refresh token");
        Ok(pair)
    }

    /// Blacklists a refresh token.
    pub async fn logout(&self, refresh_token: &str) -> ApiResult<()> {
        let claims = self.jwt.validate_refresh_token(refresh_token)?;
        let outstanding = self.usable_outstanding(&claims).await?;

        self.db.tokens().blacklist(self.db.pool(), &outstanding.id).await?;
        info!(user_id = %claims.sub, "User logged out");
        Ok(())
    }

    /// Deletes outstanding tokens that can no longer be used.
    pub async fn flush_expired(&self) -> ApiResult<u64> {
        Ok(self.db.tokens().flush_expired(Utc::now()).await?)
    }

    async fn usable_outstanding(&self, claims: &Claims) -> ApiResult<OutstandingToken> {
        let tokens = self.db.tokens();

        let outstanding = tokens
            .get_outstanding_by_jti(&claims.jti)
            .await?
            .ok_or_else(|| ApplicationError::unauthenticated("Token is invalid or expired"))?;

        if tokens.is_blacklisted(&claims.jti).await? {
            warn!(user_id = %claims.sub, jti = %claims.jti, "Blacklisted refresh token used");
            return Err(ApplicationError::unauthenticated("Token is blacklisted"));
        }

        Ok(outstanding)
    }

    /// Issues a pair, records the refresh token and blacklists `consumed`
    /// in one transaction.
    async fn issue_pair(&self, user_id: &str, consumed: Option<&str>) -> ApiResult<TokenPair> {
        let access = self.jwt.generate_access_token(user_id)?;
        let refresh = self.jwt.generate_refresh_token(user_id)?;

        let outstanding = OutstandingToken {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            jti: refresh.claims.jti.clone(),
            token: refresh.token.clone(),
            created_at: refresh.claims.issued_at(),
            expires_at: refresh.claims.expires_at(),
        };

        let tokens = self.db.tokens();
        let mut tx = self.db.begin().await?;
        tokens.insert_outstanding(&mut *tx, &outstanding).await?;
        if let Some(token_id) = consumed {
            if !tokens.blacklist(&mut *tx, token_id).await? {
                // lost a race with a concurrent refresh of the same token
                return Err(ApplicationError::unauthenticated("Token is blacklisted"));
            }
        }
        tx.commit().await.map_err(aria_db::DbError::from)?;

        Ok(TokenPair {
            access: access.token,
            refresh: refresh.token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aria_core::password::hash_password;
    use aria_db::DbConfig;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret", 3600, 86400)
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = manager();
        let access = manager.generate_access_token("user-001").unwrap();

        let claims = manager.validate_access_token(&access.token).unwrap();
        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.token_type, ACCESS);
        assert_eq!(claims.jti, access.claims.jti);
    }

    #[test]
    fn test_wrong_token_type() {
        let manager = manager();
        let access = manager.generate_access_token("user-001").unwrap();
        let refresh = manager.generate_refresh_token("user-001").unwrap();

        assert!(manager.validate_refresh_token(&access.token).is_err());
        assert!(manager.validate_access_token(&refresh.token).is_err());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = JwtManager::new("other-secret", 3600, 86400);
        let token = other.generate_access_token("user-001").unwrap();
        assert!(manager().validate_access_token(&token.token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    async fn db_with_user(password: &str) -> (Database, User) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: "kari@flis.no".to_string(),
            first_name: "Kari".to_string(),
            last_name: "Nordmann".to_string(),
            phone: None,
            password_hash: hash_password(password).unwrap(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.users().insert(db.pool(), &user).await.unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let (db, user) = db_with_user("riktig-passord").await;
        let jwt = manager();
        let auth = AuthService::new(&db, &jwt);

        assert!(auth.login("kari@flis.no", "feil-passord").await.is_err());
        let (logged_in, pair) = auth.login(" KARI@flis.no ", "riktig-passord").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(jwt.validate_access_token(&pair.access).unwrap().sub, user.id);

        let stored = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_refresh_rotation_blacklists_old_token() {
        let (db, _) = db_with_user("riktig-passord").await;
        let jwt = manager();
        let auth = AuthService::new(&db, &jwt);

        let (_, first) = auth.login("kari@flis.no", "riktig-passord").await.unwrap();
        let second = auth.refresh(&first.refresh).await.unwrap();
        assert_ne!(first.refresh, second.refresh);

        let reused = auth.refresh(&first.refresh).await.unwrap_err();
        assert_eq!(reused.status, axum::http::StatusCode::UNAUTHORIZED);

        assert!(auth.refresh(&second.refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_and_access_token_as_refresh() {
        let (db, _) = db_with_user("riktig-passord").await;
        let jwt = manager();
        let auth = AuthService::new(&db, &jwt);

        let (_, pair) = auth.login("kari@flis.no", "riktig-passord").await.unwrap();
        assert!(auth.refresh(&pair.access).await.is_err());

        auth.logout(&pair.refresh).await.unwrap();
        assert!(auth.refresh(&pair.refresh).await.is_err());
        assert!(auth.logout(&pair.refresh).await.is_err());
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_login() {
        let (db, mut user) = db_with_user("riktig-passord").await;
        user.is_active = false;
        db.users().update(db.pool(), &user).await.unwrap();

        let jwt = manager();
        let err = AuthService::new(&db, &jwt)
            .login("kari@flis.no", "riktig-passord")
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }
}
