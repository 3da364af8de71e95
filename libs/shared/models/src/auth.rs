use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    /// Id of the caller's patient or doctor profile, once one exists.
    pub profile_id: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Portal roles. Every permission decision dispatches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Doctor => write!(f, "DOCTOR"),
            Role::Patient => write!(f, "PATIENT"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "DOCTOR" => Ok(Role::Doctor),
            "PATIENT" => Ok(Role::Patient),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    pub profile_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The profile id the backend keys appointments, reviews and requests on.
    /// Acting without one is a missing prerequisite, not a remote failure.
    pub fn require_profile(&self) -> Result<&str, AppError> {
        self.profile_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::PreconditionFailed(
                    "Please complete your profile before continuing".to_string(),
                )
            })
    }

    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            return Err(AppError::Forbidden(format!(
                "This action is only available to {} accounts",
                role.to_string().to_lowercase()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, profile_id: Option<&str>) -> User {
        User {
            id: "user-1".to_string(),
            email: None,
            role,
            profile_id: profile_id.map(str::to_string),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("patient".parse::<Role>(), Ok(Role::Patient));
        assert_eq!(" Doctor ".parse::<Role>(), Ok(Role::Doctor));
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn missing_profile_is_a_precondition_failure() {
        let err = user(Role::Patient, None).require_profile().unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));

        let err = user(Role::Patient, Some("")).require_profile().unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));

        assert_eq!(user(Role::Doctor, Some("42")).require_profile().unwrap(), "42");
    }

    #[test]
    fn require_role_rejects_other_roles() {
        assert!(user(Role::Doctor, None).require_role(Role::Doctor).is_ok());
        assert!(matches!(
            user(Role::Patient, None).require_role(Role::Doctor),
            Err(AppError::Forbidden(_))
        ));
    }
}
