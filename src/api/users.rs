//! Account administration endpoints (admin console).

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{paginate, success, ApiResult, ListParams, Page};
use crate::auth::{self, CurrentUser};
use crate::errors::AppError;
use crate::models::{CreateUserRequest, SetRoleRequest, UpdateUserRequest, UserAccount};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

/// GET /api/users - All accounts, newest first (admin).
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<UserAccount>> {
    current.require_admin()?;

    let items = state.repo.list_users().await?;
    let page = paginate(items, &params, |u, q| {
        u.nama.to_lowercase().contains(q) || u.email.to_lowercase().contains(q)
    });
    success(page)
}

/// POST /api/users - Create an account with an explicit role (admin).
pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<UserAccount> {
    current.require_admin()?;

    if request.nama.trim().is_empty() {
        return Err(AppError::Validation("Nama wajib diisi".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email wajib diisi".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(
            "Password minimal 6 karakter".to_string(),
        ));
    }

    let salt = auth::generate_salt();
    let password_hash = auth::hash_password(&state.config.auth_pepper, &salt, &request.password);

    let user = state
        .repo
        .create_user(
            request.nama.trim(),
            request.email.trim(),
            request.no_hp.as_deref(),
            request.alamat.as_deref(),
            request.role,
            request.permissions.as_ref(),
            &password_hash,
            &salt,
        )
        .await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "account created");
    success(user)
}

/// PUT /api/users/:id - Update account fields (admin). Absent fields keep
/// their stored values.
pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<UserAccount> {
    current.require_admin()?;
    let user = state.repo.update_user(&id, &request).await?;
    success(user)
}

/// PUT /api/users/:id/role - Change an account's role claim (admin).
pub async fn set_user_role(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<SetRoleRequest>,
) -> ApiResult<UserAccount> {
    current.require_admin()?;

    if id == current.user.id {
        return Err(AppError::Validation(
            "Tidak dapat mengubah role akun sendiri".to_string(),
        ));
    }

    let user = state.repo.set_user_role(&id, request.role).await?;
    tracing::info!(user_id = %id, role = user.role.as_str(), "role changed");
    success(user)
}

/// DELETE /api/users/:id - Remove an account (admin). Santri rows keep
/// existing with `waliId` cleared.
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    current.require_admin()?;

    if id == current.user.id {
        return Err(AppError::Validation(
            "Tidak dapat menghapus akun sendiri".to_string(),
        ));
    }

    state.repo.delete_user(&id).await?;
    success(())
}
