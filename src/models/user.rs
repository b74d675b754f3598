//! Account model and authentication request/response types.

use serde::{Deserialize, Serialize};

/// Role claim attached to every account.
///
/// Issued by the backend at registration/seed time and returned on login;
/// never inferred from an email constant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unrestricted read/write and role management
    Admin,
    /// Guardian: visibility restricted to records referencing own santri
    Wali,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Wali => "wali",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "wali" => Some(Role::Wali),
            _ => None,
        }
    }
}

/// Per-module permission flags shown in the admin console.
///
/// Absent on an account means standard access for its role; all five set
/// means full access. Display/bookkeeping data, not an enforcement layer:
/// the access boundary is the `Role` claim.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permissions {
    #[serde(default)]
    pub pembayaran: bool,
    #[serde(default)]
    pub berita: bool,
    #[serde(default)]
    pub keaktifan: bool,
    #[serde(default)]
    pub santri: bool,
    #[serde(default)]
    pub users: bool,
}

impl Permissions {
    /// All five modules granted.
    pub fn full() -> Self {
        Self {
            pembayaran: true,
            berita: true,
            keaktifan: true,
            santri: true,
            users: true,
        }
    }
}

/// A portal account (administrator or guardian).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub nama: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_hp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alamat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    pub created_at: String,
}

/// Request body for guardian self-registration.
///
/// Registration also creates the first santri record for the guardian's child.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub nama: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub no_hp: Option<String>,
    #[serde(default)]
    pub alamat: Option<String>,
    pub nama_anak: String,
    #[serde(default)]
    pub tgl_lahir_anak: Option<String>,
}

/// Request body for login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login/registration response: bearer token plus the account
/// carrying its role claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserAccount,
}

/// Request body for creating an account from the admin console.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub nama: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub no_hp: Option<String>,
    #[serde(default)]
    pub alamat: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

/// Request body for updating an account from the admin console.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub nama: Option<String>,
    #[serde(default)]
    pub no_hp: Option<String>,
    #[serde(default)]
    pub alamat: Option<String>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

/// Request body for changing an account's role.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("wali"), Some(Role::Wali));
        assert_eq!(Role::from_str("guru"), None);
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Wali.as_str(), "wali");
    }

    #[test]
    fn test_permissions_serde_defaults_missing_flags() {
        let p: Permissions = serde_json::from_str(r#"{"berita":true,"users":true}"#).unwrap();
        assert!(p.berita);
        assert!(p.users);
        assert!(!p.pembayaran);
        assert!(!p.santri);
        assert!(!p.keaktifan);
        assert_eq!(Permissions::full(), serde_json::from_str::<Permissions>(
            r#"{"pembayaran":true,"berita":true,"keaktifan":true,"santri":true,"users":true}"#
        ).unwrap());
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Wali).unwrap(), "\"wali\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
