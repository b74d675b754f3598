//! Authentication endpoints: registration, login, logout, introspection.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::auth::{self, CurrentUser};
use crate::errors::AppError;
use crate::models::{AuthResponse, LoginRequest, NewSantri, RegisterRequest, UserAccount};
use crate::AppState;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 6;

/// POST /api/auth/register - Guardian self-registration.
///
/// Validation runs before any database call; a rejected form issues no write.
/// A successful registration creates the account (role `wali`) plus the
/// child's santri record, then signs the caller in.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    if request.nama.trim().is_empty() {
        return Err(AppError::Validation("Nama wajib diisi".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email wajib diisi".to_string()));
    }
    if request.nama_anak.trim().is_empty() {
        return Err(AppError::Validation("Nama anak wajib diisi".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(
            "Password minimal 6 karakter".to_string(),
        ));
    }
    if request.password != request.confirm_password {
        return Err(AppError::Validation(
            "Password dan konfirmasi password tidak sama".to_string(),
        ));
    }

    let salt = auth::generate_salt();
    let password_hash = auth::hash_password(&state.config.auth_pepper, &salt, &request.password);

    // One transaction: the account and the child record exist together or
    // not at all
    let (user, _santri) = state
        .repo
        .create_wali_with_santri(
            request.nama.trim(),
            request.email.trim(),
            request.no_hp.as_deref(),
            request.alamat.as_deref(),
            &password_hash,
            &salt,
            &NewSantri {
                nama: request.nama_anak.trim().to_string(),
                tgl_lahir: request.tgl_lahir_anak.clone(),
                ..NewSantri::default()
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, "registered new wali account");

    let token = auth::issue_session(&state, &user.id).await?;
    success(AuthResponse { token, user })
}

/// POST /api/auth/login - Email + password sign-in.
///
/// Returns the bearer token and the account with its role claim.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let invalid = || AppError::Unauthorized("Email atau password salah".to_string());

    let (user, creds) = state
        .repo
        .get_user_by_email(request.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !auth::verify_password(
        &state.config.auth_pepper,
        &creds.salt,
        &request.password,
        &creds.password_hash,
    ) {
        return Err(invalid());
    }

    let token = auth::issue_session(&state, &user.id).await?;
    success(AuthResponse { token, user })
}

/// POST /api/auth/logout - Invalidate the caller's session.
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> ApiResult<()> {
    state.repo.delete_session(&current.token).await?;
    success(())
}

/// GET /api/auth/me - The authenticated account.
pub async fn me(current: CurrentUser) -> ApiResult<UserAccount> {
    success(current.user)
}
