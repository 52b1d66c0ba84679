mod supabase;

#[cfg(test)]
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    Appointment, AppointmentPatch, Attendant, AuthChange, Client, ClientPatch, Company, Contact,
    NewAppointmentRow, NewClientRow, NewCompany, NewUserProfile, Session, SignUpOutcome, User,
};
use crate::storage::{LocalStorage, StorageError};

pub use supabase::SupabaseBackend;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Falha de comunicação com o servidor: {0}")]
    Http(#[from] reqwest::Error),

    /// Error body returned by the REST or auth service.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Registro não encontrado")]
    NotFound,

    #[error("Sessão não encontrada")]
    NoSession,

    #[error("Resposta inválida do servidor: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Operations the application needs from the hosted backend.
///
/// Tenant scoping is enforced server-side by row-level security; none of
/// these calls filter by company on their own.
#[async_trait]
pub trait Backend: Send + Sync {
    // Auth operations
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session>;
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome>;
    async fn sign_out(&self) -> BackendResult<()>;
    async fn get_session(&self) -> BackendResult<Option<Session>>;
    async fn get_user(&self) -> BackendResult<Option<User>>;
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    // Tenancy operations
    /// Server-side resolution of the caller's company (`get_user_empresa_id`).
    async fn current_company_id(&self) -> BackendResult<Uuid>;
    async fn company_id_for_user(&self, user_id: Uuid) -> BackendResult<Option<Uuid>>;
    async fn get_company(&self, id: Uuid) -> BackendResult<Option<Company>>;
    async fn insert_company(&self, company: &NewCompany) -> BackendResult<Company>;
    async fn insert_user_profile(&self, profile: &NewUserProfile) -> BackendResult<()>;

    // Client operations
    async fn list_clients(&self, active_only: bool) -> BackendResult<Vec<Client>>;
    async fn get_client_contact(&self, id: Uuid) -> BackendResult<Option<Contact>>;
    async fn insert_client(&self, row: &NewClientRow) -> BackendResult<Client>;
    async fn update_client(&self, id: Uuid, patch: &ClientPatch) -> BackendResult<Vec<Client>>;
    async fn delete_client(&self, id: Uuid) -> BackendResult<()>;

    // Attendant operations
    async fn list_attendants(&self, active_only: bool) -> BackendResult<Vec<Attendant>>;
    async fn get_attendant_contact(&self, id: Uuid) -> BackendResult<Option<Contact>>;

    // Appointment operations
    /// Latest first: date descending, then time descending.
    async fn list_appointments(&self) -> BackendResult<Vec<Appointment>>;
    async fn appointment_ids_for_client(&self, client_id: Uuid, status: &str) -> BackendResult<Vec<Uuid>>;
    async fn insert_appointment(&self, row: &NewAppointmentRow) -> BackendResult<Appointment>;
    async fn update_appointment(&self, id: Uuid, patch: &AppointmentPatch) -> BackendResult<Appointment>;
    async fn delete_appointment(&self, id: Uuid) -> BackendResult<()>;
}

/// Build the shared backend handle from configuration.
pub fn init(config: &Config, storage: Arc<LocalStorage>) -> Result<Arc<dyn Backend>> {
    let backend = SupabaseBackend::new(config.supabase_url(), config.supabase_anon_key(), storage)?;
    Ok(Arc::new(backend))
}
