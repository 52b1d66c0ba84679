use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";

/// A tenant (`empresas`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCompany {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
}

/// Membership row (`usuarios`) linking an auth user to a company.
#[derive(Debug, Clone, Serialize)]
pub struct NewUserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "nome")]
    pub name: String,
    pub empresa_id: Uuid,
    pub email: String,
    #[serde(rename = "perfil")]
    pub role: String,
}
