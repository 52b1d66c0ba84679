use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::db::Backend;
use crate::error::{AppError, Result};
use crate::models::{
    Appointment, AppointmentPatch, Attendant, Client, NewAppointment, NewAppointmentRow, STATUS_PENDING,
};

/// Appointment list of the caller's company plus the shared loading flag
/// and last error message rendered by the screens.
pub struct AppointmentStore {
    backend: Arc<dyn Backend>,
    appointments: Vec<Appointment>,
    is_loading: bool,
    error: Option<String>,
}

impl AppointmentStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            appointments: Vec::new(),
            is_loading: false,
            error: None,
        }
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
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

    fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    fn record<T>(&mut self, context: &str, result: Result<T>) -> Result<T> {
        self.is_loading = false;
        if let Err(err) = &result {
            error!(error = %err, "{context}");
            self.error = Some(err.to_string());
        }
        result
    }

    /// Reload the list. Failures leave an empty list and an error message.
    pub async fn fetch(&mut self) -> &[Appointment] {
        self.begin();
        match self.backend.list_appointments().await {
            Ok(appointments) => {
                self.appointments = appointments;
            }
            Err(err) => {
                error!(error = %err, "failed to fetch appointments");
                self.error = Some(err.to_string());
                self.appointments.clear();
            }
        }
        self.is_loading = false;
        &self.appointments
    }

    /// Book an appointment, copying the client's and attendant's name and
    /// phone onto the row.
    pub async fn create(&mut self, request: NewAppointment) -> Result<Appointment> {
        self.begin();
        let result = self.insert(request).await;
        let appointment = self.record("failed to create appointment", result)?;

        info!(id = %appointment.id, "appointment created");
        self.appointments.insert(0, appointment.clone());
        Ok(appointment)
    }

    async fn insert(&self, request: NewAppointment) -> Result<Appointment> {
        let company_id = self
            .backend
            .current_company_id()
            .await
            .map_err(AppError::CompanyLookup)?;

        let client = self
            .backend
            .get_client_contact(request.client_id)
            .await
            .ok()
            .flatten()
            .ok_or(AppError::ClientNotFound)?;

        let attendant = self
            .backend
            .get_attendant_contact(request.attendant_id)
            .await
            .ok()
            .flatten()
            .ok_or(AppError::AttendantNotFound)?;

        let row = NewAppointmentRow {
            cliente_id: request.client_id,
            cliente_nome: client.name,
            cliente_telefone: client.phone,
            atendente_id: request.attendant_id,
            atendente_nome: attendant.name,
            atendente_telefone: attendant.phone,
            data_agendamento: request.date,
            hora_agendamento: request.time,
            assunto: request.subject,
            empresa_id: company_id,
            status: request
                .status
                .filter(|status| !status.is_empty())
                .unwrap_or_else(|| STATUS_PENDING.to_string()),
        };

        Ok(self.backend.insert_appointment(&row).await?)
    }

    pub async fn update(&mut self, id: Uuid, patch: AppointmentPatch) -> Result<Appointment> {
        self.begin();
        let result = self.backend.update_appointment(id, &patch).await.map_err(AppError::from);
        let updated = self.record("failed to update appointment", result)?;

        if let Some(slot) = self.appointments.iter_mut().find(|appointment| appointment.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<()> {
        self.begin();
        let result = self.backend.delete_appointment(id).await.map_err(AppError::from);
        self.record("failed to delete appointment", result)?;

        self.appointments.retain(|appointment| appointment.id != id);
        Ok(())
    }

    /// Active clients by name, for the booking form.
    pub async fn fetch_clients(&self) -> Vec<Client> {
        self.backend.list_clients(true).await.unwrap_or_else(|err| {
            error!(error = %err, "failed to fetch clients for booking");
            Vec::new()
        })
    }

    /// Active attendants by name, for the booking form.
    pub async fn fetch_attendants(&self) -> Vec<Attendant> {
        self.backend.list_attendants(true).await.unwrap_or_else(|err| {
            error!(error = %err, "failed to fetch attendants");
            Vec::new()
        })
    }
}
