use serde::{Deserialize, Serialize};

use crate::types::AuthUser;

/// Successful response from `POST /api/auth/login` and `POST /api/auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Bearer credential for subsequent requests.
    pub access_token: String,

    /// Token scheme, normally `"Bearer"`.
    pub token_type: String,

    /// The authenticated identity.
    pub user: AuthUser,

    /// Opaque rotation credential, when the server issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account email.
    pub email: String,
    /// Chosen display name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Body of `POST /api/auth/logout`.
///
/// Serializes to `{}` when there is no refresh token to revoke.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    /// Refresh token to revoke server side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_token_is_optional() {
        let res: AuthResponse = serde_json::from_value(serde_json::json!({
            "accessToken": "abc",
            "tokenType": "Bearer",
            "user": {"id": "1", "email": "a@b.c", "username": "a", "role": "USER"}
        }))
        .unwrap();
        assert_eq!(res.access_token, "abc");
        assert!(res.refresh_token.is_none());
    }

    #[test]
    fn empty_logout_body() {
        let json = serde_json::to_value(LogoutRequest::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));

        let json = serde_json::to_value(LogoutRequest {
            refresh_token: Some("r".to_string()),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"refreshToken": "r"}));
    }
}
