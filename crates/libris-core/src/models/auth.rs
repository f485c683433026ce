//! Authentication payloads and the identity/credential pair held by a session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role. The backend only issues these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}' (expected admin or user)", other)),
        }
    }
}

/// Public profile of the signed-in user, as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Identity {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Bearer token pair. Only `access_token` is ever sent; the refresh token is
/// kept so a later login can replace both together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "auth_token")]
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// `POST /auth/login` body.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// First required field left blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.email.trim().is_empty() {
            Some("email")
        } else if self.password.is_empty() {
            Some("password")
        } else {
            None
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /auth/register` body.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl RegisterRequest {
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.username.trim().is_empty() {
            Some("username")
        } else if self.email.trim().is_empty() {
            Some("email")
        } else if self.password.is_empty() {
            Some("password")
        } else {
            None
        }
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Response shared by the login and register endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: Credential,
    pub user: Identity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" USER ".parse::<Role>(), Ok(Role::User));
        assert!("librarian".parse::<Role>().is_err());
    }

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"token":{"auth_token":"T","refresh_token":"R"},"user":{"_id":"1","username":"u","role":"user"}}"#;
        let resp: AuthResponse = serde_json::from_str(json).expect("auth response should parse");

        assert_eq!(resp.token.access_token, "T");
        assert_eq!(resp.token.refresh_token, "R");
        assert_eq!(resp.user.id, "1");
        assert_eq!(resp.user.username, "u");
        assert_eq!(resp.user.role, Role::User);
        assert_eq!(resp.user.email, None);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let json = r#"{"_id":"1","username":"u","role":"superuser"}"#;
        assert!(serde_json::from_str::<Identity>(json).is_err());
    }

    #[test]
    fn test_identity_serializes_wire_id() {
        let identity = Identity {
            id: "42".to_string(),
            username: "ada".to_string(),
            role: Role::Admin,
            email: None,
        };
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, r#"{"_id":"42","username":"ada","role":"admin"}"#);
    }

    #[test]
    fn test_login_missing_field() {
        assert_eq!(LoginRequest::new("", "p").missing_field(), Some("email"));
        assert_eq!(LoginRequest::new("u@x.com", "").missing_field(), Some("password"));
        assert_eq!(LoginRequest::new("u@x.com", "p").missing_field(), None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let request = LoginRequest::new("u@x.com", "hunter2");
        assert!(!format!("{:?}", request).contains("hunter2"));

        let credential = Credential {
            access_token: "secret-token".to_string(),
            refresh_token: "secret-refresh".to_string(),
        };
        assert!(!format!("{:?}", credential).contains("secret"));
    }
}
