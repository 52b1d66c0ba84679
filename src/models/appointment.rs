use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pendente";
pub const STATUS_CONFIRMED: &str = "confirmado";
pub const STATUS_DONE: &str = "concluido";
pub const STATUS_CANCELLED: &str = "cancelado";

/// Statuses offered by the terminal UI. The column itself is free text.
pub const KNOWN_STATUSES: [&str; 4] = [STATUS_PENDING, STATUS_CONFIRMED, STATUS_DONE, STATUS_CANCELLED];

/// Embedded `cliente:clientes(...)` / `atendente:atendentes(...)` summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartySummary {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A row of the `agendamentos` table joined with its client and attendant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    #[serde(rename = "cliente_id")]
    pub client_id: Uuid,
    #[serde(rename = "cliente_nome")]
    pub client_name: String,
    #[serde(rename = "cliente_telefone")]
    pub client_phone: String,
    #[serde(rename = "atendente_id")]
    pub attendant_id: Uuid,
    #[serde(rename = "atendente_nome")]
    pub attendant_name: String,
    #[serde(rename = "atendente_telefone")]
    pub attendant_phone: String,
    #[serde(rename = "data_agendamento")]
    pub date: NaiveDate,
    #[serde(rename = "hora_agendamento")]
    pub time: NaiveTime,
    #[serde(rename = "assunto")]
    pub subject: String,
    pub status: String,
    #[serde(rename = "empresa_id", default)]
    pub company_id: Option<Uuid>,
    #[serde(rename = "cliente", default)]
    pub client: Option<PartySummary>,
    #[serde(rename = "atendente", default)]
    pub attendant: Option<PartySummary>,
}

impl Appointment {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }
}

/// What a caller provides to book an appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub client_id: Uuid,
    pub attendant_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub subject: String,
    pub status: Option<String>,
}

/// Denormalized insert payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAppointmentRow {
    pub cliente_id: Uuid,
    pub cliente_nome: String,
    pub cliente_telefone: String,
    pub atendente_id: Uuid,
    pub atendente_nome: String,
    pub atendente_telefone: String,
    pub data_agendamento: NaiveDate,
    pub hora_agendamento: NaiveTime,
    pub assunto: String,
    pub empresa_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentPatch {
    #[serde(rename = "data_agendamento", skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "hora_agendamento", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(rename = "assunto", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl AppointmentPatch {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }
}
