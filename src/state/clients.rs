use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::Backend;
use crate::error::{AppError, Result};
use crate::models::{Client, ClientInput, ClientPatch, NewClientRow, STATUS_PENDING};

/// Client list as visible to the signed-in user. Tenant scoping is left to
/// row-level security; every mutation re-fetches the whole list.
pub struct ClientStore {
    backend: Arc<dyn Backend>,
    clients: Vec<Client>,
    is_loading: bool,
    error: Option<String>,
}

impl ClientStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            clients: Vec::new(),
            is_loading: false,
            error: None,
        }
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub async fn fetch(&mut self) {
        self.is_loading = true;
        self.error = None;
        match self.backend.list_clients(false).await {
            Ok(clients) => {
                info!(count = clients.len(), "clients loaded");
                self.clients = clients;
            }
            Err(err) => {
                error!(error = %err, "failed to fetch clients");
                self.error = Some(format!("Erro ao carregar clientes: {err}"));
            }
        }
        self.is_loading = false;
    }

    pub async fn add(&mut self, input: ClientInput) -> Result<Client> {
        self.is_loading = true;
        self.error = None;

        let result = self.insert(input).await;
        let client = match result {
            Ok(client) => client,
            Err(err) => {
                error!(error = %err, "failed to add client");
                self.error = Some(err.to_string());
                self.is_loading = false;
                return Err(err);
            }
        };

        info!(id = %client.id, "client added");
        self.fetch().await;
        self.is_loading = false;
        Ok(client)
    }

    async fn insert(&self, input: ClientInput) -> Result<Client> {
        let company_id = self
            .backend
            .current_company_id()
            .await
            .map_err(AppError::CompanyLookup)?;

        let row = NewClientRow {
            input,
            empresa_id: company_id,
        };
        Ok(self.backend.insert_client(&row).await?)
    }

    /// Returns `false` and records the message when the update fails.
    pub async fn update(&mut self, id: Uuid, patch: ClientPatch) -> bool {
        self.is_loading = true;
        self.error = None;

        if let Err(err) = self.backend.update_client(id, &patch).await {
            error!(error = %err, %id, "failed to update client");
            self.error = Some(format!("Erro ao atualizar cliente: {err}"));
            self.is_loading = false;
            return false;
        }

        self.fetch().await;
        self.is_loading = false;
        true
    }

    /// Delete a client unless it still has pending appointments.
    ///
    /// The pending check and the delete are separate requests: an
    /// appointment booked in between is not seen.
    pub async fn delete(&mut self, id: Uuid) -> Result<()> {
        self.is_loading = true;
        self.error = None;

        let result = self.check_and_delete(id).await;
        if let Err(err) = &result {
            error!(error = %err, %id, "failed to delete client");
            self.error = Some(err.to_string());
            self.is_loading = false;
            return result;
        }

        self.fetch().await;
        self.is_loading = false;
        Ok(())
    }

    async fn check_and_delete(&self, id: Uuid) -> Result<()> {
        let pending = self
            .backend
            .appointment_ids_for_client(id, STATUS_PENDING)
            .await
            .map_err(AppError::PendingCheck)?;

        if !pending.is_empty() {
            warn!(%id, pending = pending.len(), "client has pending appointments");
            return Err(AppError::PendingAppointments(pending.len()));
        }

        self.backend
            .delete_client(id)
            .await
            .map_err(AppError::ClientDelete)
    }
}
