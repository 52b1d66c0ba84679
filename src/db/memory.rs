//! In-process `Backend` used by the unit tests.
//!
//! Models a single tenant: every row belongs to the signed-in user's
//! company. Individual operations can be made to fail through
//! [`MemoryBackend::fail`].

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{Backend, BackendError, BackendResult};
use crate::models::{
    Appointment, AppointmentPatch, Attendant, AuthChange, Client, ClientPatch,
    Company, Contact, NewAppointmentRow, NewClientRow, NewCompany, NewUserProfile, PartySummary,
    Session, SignUpOutcome, User,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    SignIn,
    SignUp,
    SignOut,
    GetSession,
    GetUser,
    CompanyRpc,
    Membership,
    GetCompany,
    InsertCompany,
    InsertUserProfile,
    ListClients,
    ClientContact,
    InsertClient,
    UpdateClient,
    DeleteClient,
    ListAttendants,
    AttendantContact,
    ListAppointments,
    PendingCheck,
    InsertAppointment,
    UpdateAppointment,
    DeleteAppointment,
}

#[derive(Debug, Clone)]
pub struct Membership {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub role: String,
}

#[derive(Default)]
pub struct Tables {
    pub session: Option<Session>,
    pub company_id: Option<Uuid>,
    pub companies: Vec<Company>,
    pub memberships: Vec<Membership>,
    pub clients: Vec<Client>,
    pub attendants: Vec<Attendant>,
    pub appointments: Vec<Appointment>,
    pub sign_out_calls: usize,
    pub failing: HashSet<Op>,
}

pub struct MemoryBackend {
    tables: Mutex<Tables>,
    events: broadcast::Sender<AuthChange>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            tables: Mutex::new(Tables::default()),
            events,
        }
    }

    /// A backend with one company whose id the RPC resolves to.
    pub fn with_company(name: &str) -> (Self, Uuid) {
        let backend = Self::new();
        let id = Uuid::new_v4();
        {
            let mut tables = backend.tables();
            tables.company_id = Some(id);
            tables.companies.push(Company {
                id,
                name: name.to_string(),
                email: None,
            });
        }
        (backend, id)
    }

    pub fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn fail(&self, op: Op) {
        self.tables().failing.insert(op);
    }

    pub fn emit(&self, change: AuthChange) {
        let _ = self.events.send(change);
    }

    pub fn add_client(&self, name: &str, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        let mut tables = self.tables();
        let company_id = tables.company_id;
        tables.clients.push(Client {
            id,
            name: name.to_string(),
            phone: format!("tel-{name}"),
            email: None,
            notes: None,
            active,
            company_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn add_attendant(&self, name: &str, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.tables().attendants.push(Attendant {
            id,
            name: name.to_string(),
            phone: format!("tel-{name}"),
            email: None,
            active,
        });
        id
    }

    pub fn client_ids(&self) -> Vec<Uuid> {
        self.tables().clients.iter().map(|client| client.id).collect()
    }

    fn check(&self, op: Op) -> BackendResult<()> {
        if self.tables().failing.contains(&op) {
            return Err(BackendError::Api {
                status: 500,
                code: None,
                message: format!("{op:?} failed"),
            });
        }
        Ok(())
    }
}

pub fn session_for(user_id: Uuid, expires_at: i64) -> Session {
    Session {
        access_token: format!("token-{user_id}"),
        refresh_token: Some("refresh".into()),
        token_type: "bearer".into(),
        expires_in: Some(3600),
        expires_at: Some(expires_at),
        user: User {
            id: user_id,
            email: Some("ana@example.com".into()),
            created_at: None,
        },
    }
}

/// Date descending, then time descending, like the `order` query.
fn sort_latest_first(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));
}

fn summary(id: Uuid, name: &str, phone: &str) -> PartySummary {
    PartySummary {
        id,
        name: name.to_string(),
        phone: phone.to_string(),
        email: None,
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in_with_password(&self, email: &str, _password: &str) -> BackendResult<Session> {
        self.check(Op::SignIn)?;
        let mut session = session_for(Uuid::new_v4(), Utc::now().timestamp() + 3600);
        session.user.email = Some(email.to_string());
        self.tables().session = Some(session.clone());
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> BackendResult<SignUpOutcome> {
        self.check(Op::SignUp)?;
        Ok(SignUpOutcome {
            user: Some(User {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
                created_at: None,
            }),
            session: None,
        })
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.tables().sign_out_calls += 1;
        self.check(Op::SignOut)?;
        self.tables().session = None;
        self.emit(AuthChange::SignedOut);
        Ok(())
    }

    async fn get_session(&self) -> BackendResult<Option<Session>> {
        self.check(Op::GetSession)?;
        Ok(self.tables().session.clone())
    }

    async fn get_user(&self) -> BackendResult<Option<User>> {
        self.check(Op::GetUser)?;
        Ok(self.tables().session.as_ref().map(|session| session.user.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn current_company_id(&self) -> BackendResult<Uuid> {
        self.check(Op::CompanyRpc)?;
        self.tables().company_id.ok_or(BackendError::NotFound)
    }

    async fn company_id_for_user(&self, user_id: Uuid) -> BackendResult<Option<Uuid>> {
        self.check(Op::Membership)?;
        Ok(self
            .tables()
            .memberships
            .iter()
            .find(|membership| membership.user_id == user_id)
            .map(|membership| membership.company_id))
    }

    async fn get_company(&self, id: Uuid) -> BackendResult<Option<Company>> {
        self.check(Op::GetCompany)?;
        Ok(self.tables().companies.iter().find(|company| company.id == id).cloned())
    }

    async fn insert_company(&self, company: &NewCompany) -> BackendResult<Company> {
        self.check(Op::InsertCompany)?;
        let row = Company {
            id: Uuid::new_v4(),
            name: company.name.clone(),
            email: Some(company.email.clone()),
        };
        self.tables().companies.push(row.clone());
        Ok(row)
    }

    async fn insert_user_profile(&self, profile: &NewUserProfile) -> BackendResult<()> {
        self.check(Op::InsertUserProfile)?;
        self.tables().memberships.push(Membership {
            user_id: profile.id.unwrap_or_else(Uuid::new_v4),
            company_id: profile.empresa_id,
            name: profile.name.clone(),
            role: profile.role.clone(),
        });
        Ok(())
    }

    async fn list_clients(&self, active_only: bool) -> BackendResult<Vec<Client>> {
        self.check(Op::ListClients)?;
        let mut clients: Vec<Client> = self
            .tables()
            .clients
            .iter()
            .filter(|client| !active_only || client.active)
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn get_client_contact(&self, id: Uuid) -> BackendResult<Option<Contact>> {
        self.check(Op::ClientContact)?;
        Ok(self
            .tables()
            .clients
            .iter()
            .find(|client| client.id == id)
            .map(|client| Contact {
                name: client.name.clone(),
                phone: client.phone.clone(),
            }))
    }

    async fn insert_client(&self, row: &NewClientRow) -> BackendResult<Client> {
        self.check(Op::InsertClient)?;
        let client = Client {
            id: Uuid::new_v4(),
            name: row.input.name.clone(),
            phone: row.input.phone.clone(),
            email: row.input.email.clone(),
            notes: row.input.notes.clone(),
            active: row.input.active.unwrap_or(true),
            company_id: Some(row.empresa_id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.tables().clients.push(client.clone());
        Ok(client)
    }

    async fn update_client(&self, id: Uuid, patch: &ClientPatch) -> BackendResult<Vec<Client>> {
        self.check(Op::UpdateClient)?;
        let mut tables = self.tables();
        let mut updated = Vec::new();
        for client in tables.clients.iter_mut().filter(|client| client.id == id) {
            if let Some(name) = &patch.name {
                client.name = name.clone();
            }
            if let Some(phone) = &patch.phone {
                client.phone = phone.clone();
            }
            if patch.email.is_some() {
                client.email = patch.email.clone();
            }
            if patch.notes.is_some() {
                client.notes = patch.notes.clone();
            }
            if let Some(active) = patch.active {
                client.active = active;
            }
            client.updated_at = Utc::now();
            updated.push(client.clone());
        }
        Ok(updated)
    }

    async fn delete_client(&self, id: Uuid) -> BackendResult<()> {
        self.check(Op::DeleteClient)?;
        self.tables().clients.retain(|client| client.id != id);
        Ok(())
    }

    async fn list_attendants(&self, active_only: bool) -> BackendResult<Vec<Attendant>> {
        self.check(Op::ListAttendants)?;
        let mut attendants: Vec<Attendant> = self
            .tables()
            .attendants
            .iter()
            .filter(|attendant| !active_only || attendant.active)
            .cloned()
            .collect();
        attendants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(attendants)
    }

    async fn get_attendant_contact(&self, id: Uuid) -> BackendResult<Option<Contact>> {
        self.check(Op::AttendantContact)?;
        Ok(self
            .tables()
            .attendants
            .iter()
            .find(|attendant| attendant.id == id)
            .map(|attendant| Contact {
                name: attendant.name.clone(),
                phone: attendant.phone.clone(),
            }))
    }

    async fn list_appointments(&self) -> BackendResult<Vec<Appointment>> {
        self.check(Op::ListAppointments)?;
        let mut appointments = self.tables().appointments.clone();
        sort_latest_first(&mut appointments);
        Ok(appointments)
    }

    async fn appointment_ids_for_client(&self, client_id: Uuid, status: &str) -> BackendResult<Vec<Uuid>> {
        self.check(Op::PendingCheck)?;
        Ok(self
            .tables()
            .appointments
            .iter()
            .filter(|appointment| appointment.client_id == client_id && appointment.status == status)
            .map(|appointment| appointment.id)
            .collect())
    }

    async fn insert_appointment(&self, row: &NewAppointmentRow) -> BackendResult<Appointment> {
        self.check(Op::InsertAppointment)?;
        let appointment = Appointment {
            id: Uuid::new_v4(),
            client_id: row.cliente_id,
            client_name: row.cliente_nome.clone(),
            client_phone: row.cliente_telefone.clone(),
            attendant_id: row.atendente_id,
            attendant_name: row.atendente_nome.clone(),
            attendant_phone: row.atendente_telefone.clone(),
            date: row.data_agendamento,
            time: row.hora_agendamento,
            subject: row.assunto.clone(),
            status: row.status.clone(),
            company_id: Some(row.empresa_id),
            client: Some(summary(row.cliente_id, &row.cliente_nome, &row.cliente_telefone)),
            attendant: Some(summary(row.atendente_id, &row.atendente_nome, &row.atendente_telefone)),
        };
        self.tables().appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(&self, id: Uuid, patch: &AppointmentPatch) -> BackendResult<Appointment> {
        self.check(Op::UpdateAppointment)?;
        let mut tables = self.tables();
        let appointment = tables
            .appointments
            .iter_mut()
            .find(|appointment| appointment.id == id)
            .ok_or(BackendError::NotFound)?;
        if let Some(date) = patch.date {
            appointment.date = date;
        }
        if let Some(time) = patch.time {
            appointment.time = time;
        }
        if let Some(subject) = &patch.subject {
            appointment.subject = subject.clone();
        }
        if let Some(status) = &patch.status {
            appointment.status = status.clone();
        }
        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: Uuid) -> BackendResult<()> {
        self.check(Op::DeleteAppointment)?;
        self.tables().appointments.retain(|appointment| appointment.id != id);
        Ok(())
    }
}
