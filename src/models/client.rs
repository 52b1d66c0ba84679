use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of the `clientes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,
    #[serde(rename = "ativo")]
    pub active: bool,
    #[serde(rename = "empresa_id", default)]
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when registering a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientInput {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "observacoes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "ativo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Insert payload: the caller's input stamped with the tenant id.
#[derive(Debug, Clone, Serialize)]
pub struct NewClientRow {
    #[serde(flatten)]
    pub input: ClientInput,
    pub empresa_id: Uuid,
}

/// Partial update. Absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientPatch {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "observacoes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "ativo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl ClientPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Name and phone copied onto appointments at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
}
