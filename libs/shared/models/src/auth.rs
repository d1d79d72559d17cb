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
    pub role: Option<String>,
    pub clinic_id: Option<i32>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Doctor,
    Receptionist,
    Admin,
}

/// Identity resolved from a validated bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    Patient {
        patient_id: i32,
    },
    Staff {
        staff_id: i32,
        role: StaffRole,
        clinic_id: Option<i32>,
    },
}

impl AuthContext {
    pub fn from_claims(claims: &JwtClaims) -> Result<Self, String> {
        let id: i32 = claims
            .sub
            .parse()
            .map_err(|_| "Token subject is not a numeric id".to_string())?;

        match claims.role.as_deref() {
            None | Some("patient") => Ok(AuthContext::Patient { patient_id: id }),
            Some("doctor") => Ok(AuthContext::Staff {
                staff_id: id,
                role: StaffRole::Doctor,
                clinic_id: claims.clinic_id,
            }),
            Some("receptionist") => Ok(AuthContext::Staff {
                staff_id: id,
                role: StaffRole::Receptionist,
                clinic_id: claims.clinic_id,
            }),
            Some("admin") => Ok(AuthContext::Staff {
                staff_id: id,
                role: StaffRole::Admin,
                clinic_id: claims.clinic_id,
            }),
            Some(other) => Err(format!("Unknown role: {}", other)),
        }
    }

    pub fn require_patient(&self) -> Result<i32, AppError> {
        match self {
            AuthContext::Patient { patient_id } => Ok(*patient_id),
            AuthContext::Staff { .. } => Err(AppError::Forbidden(
                "Only patients can perform this action".to_string(),
            )),
        }
    }
}
