use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of the `atendentes` table. Read-only from this application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendant {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "ativo")]
    pub active: bool,
}
