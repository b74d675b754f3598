//! Session-token authentication and credential handling.
//!
//! Passwords are stored as salted, peppered HMAC-SHA256 digests and verified
//! with constant-time comparison to mitigate timing attacks. Sessions are
//! opaque bearer tokens resolved against the database, so every request
//! carries an explicit role claim from the account row.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::models::{Role, UserAccount};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Compute the password digest for storage or verification.
pub fn hash_password(pepper: &str, salt: &str, password: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(pepper.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(salt.as_bytes());
    mac.update(password.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Generate a fresh per-user salt.
pub fn generate_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generate an opaque 256-bit session token.
pub fn generate_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Verify a password against the stored digest in constant time.
pub fn verify_password(pepper: &str, salt: &str, password: &str, stored_hash: &str) -> bool {
    let computed = hash_password(pepper, salt, password);
    computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Issue a session for the given account and return the bearer token.
pub async fn issue_session(state: &AppState, user_id: &str) -> Result<String, AppError> {
    let token = generate_token();
    let expires_at = (Utc::now() + Duration::hours(state.config.session_ttl_hours)).to_rfc3339();
    state
        .repo
        .create_session(&token, user_id, &expires_at)
        .await?;
    Ok(token)
}

/// The authenticated caller, resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserAccount,
    pub token: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    /// Guard for admin-only operations.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Operasi ini hanya untuk admin".to_string(),
            ))
        }
    }

    /// Row scope for guardian visibility: `None` means unrestricted (admin),
    /// `Some(id)` restricts queries to rows referencing the guardian.
    pub fn wali_scope(&self) -> Option<&str> {
        match self.user.role {
            Role::Admin => None,
            Role::Wali => Some(&self.user.id),
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?
            .to_string();

        let user = state
            .repo
            .get_session_user(&token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        Ok(CurrentUser { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash_password("pepper", "salt", "rahasia123");
        let b = hash_password("pepper", "salt", "rahasia123");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_varies_with_inputs() {
        let base = hash_password("pepper", "salt", "rahasia123");
        assert_ne!(base, hash_password("pepper", "salt", "rahasia124"));
        assert_ne!(base, hash_password("pepper", "other", "rahasia123"));
        assert_ne!(base, hash_password("other", "salt", "rahasia123"));
    }

    #[test]
    fn test_verify_password() {
        let salt = generate_salt();
        let stored = hash_password("pepper", &salt, "rahasia123");
        assert!(verify_password("pepper", &salt, "rahasia123", &stored));
        assert!(!verify_password("pepper", &salt, "salah", &stored));
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, generate_token());
    }
}
