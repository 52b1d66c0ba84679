use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Backend, BackendError, BackendResult};
use crate::models::{
    Appointment, AppointmentPatch, Attendant, AuthChange, Client, ClientPatch, Company, Contact,
    NewAppointmentRow, NewClientRow, NewCompany, NewUserProfile, Session, SignUpOutcome, User,
};
use crate::storage::LocalStorage;

const SESSION_STORAGE_KEY: &str = "sb-auth-token";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";
/// PostgREST code for "JSON object requested, multiple (or no) rows returned".
const NO_ROWS_CODE: &str = "PGRST116";

const APPOINTMENTS: &str = "agendamentos";
const CLIENTS: &str = "clientes";
const ATTENDANTS: &str = "atendentes";
const COMPANIES: &str = "empresas";
const USERS: &str = "usuarios";
const COMPANY_ID_RPC: &str = "rpc/get_user_empresa_id";

const APPOINTMENT_SELECT: &str =
    "*,cliente:clientes(id,nome,telefone,email),atendente:atendentes(id,nome,telefone,email)";
const APPOINTMENT_ORDER: &str = "data_agendamento.desc,hora_agendamento.desc";

/// Supabase client speaking PostgREST (`/rest/v1`) and GoTrue (`/auth/v1`).
///
/// The current session lives in memory and is mirrored to local storage so
/// that a restart picks it up again.
pub struct SupabaseBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    storage: Arc<LocalStorage>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
}

#[derive(Deserialize)]
struct IdRow {
    id: Uuid,
}

#[derive(Deserialize)]
struct MembershipRow {
    empresa_id: Option<Uuid>,
}

/// Union of the error shapes returned by PostgREST and GoTrue.
#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    code: Option<Value>,
}

impl SupabaseBackend {
    pub fn new(base_url: &str, api_key: &str, storage: Arc<LocalStorage>) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("agenda_manager/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let session = match storage.get_item(SESSION_STORAGE_KEY) {
            Some(raw) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => Some(session),
                Err(err) => {
                    warn!(error = %err, "discarding unreadable persisted session");
                    None
                }
            },
            None => None,
        };

        let (events, _) = broadcast::channel(16);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            storage,
            session: RwLock::new(session),
            events,
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Requests run as the signed-in user when there is one, else as `anon`.
    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
            .unwrap_or_else(|| self.api_key.clone());

        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.auth_url(path))
            .header("apikey", &self.api_key)
    }

    async fn store_session(&self, session: Option<Session>) -> BackendResult<()> {
        match &session {
            Some(session) => self
                .storage
                .set_item(SESSION_STORAGE_KEY, &serde_json::to_string(session)?)?,
            None => self.storage.remove_item(SESSION_STORAGE_KEY)?,
        }
        *self.session.write().await = session;
        Ok(())
    }

    fn emit(&self, change: AuthChange) {
        // No subscriber yet is fine.
        let _ = self.events.send(change);
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<Session> {
        let resp = self
            .auth_request(Method::POST, "token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        parse_json(resp).await
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> BackendResult<Vec<T>> {
        let resp = self
            .request(Method::GET, self.rest_url(table))
            .await
            .query(query)
            .send()
            .await?;
        parse_json(resp).await
    }

    async fn first<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> BackendResult<Option<T>> {
        let rows: Vec<T> = self.select(table, query).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return its representation.
    async fn insert_one<B, T>(&self, table: &str, body: &B, query: &[(&str, String)]) -> BackendResult<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let resp = self
            .request(Method::POST, self.rest_url(table))
            .await
            .header("Prefer", RETURN_REPRESENTATION)
            .header(ACCEPT, SINGLE_OBJECT)
            .query(query)
            .json(body)
            .send()
            .await?;
        parse_json(resp).await
    }

    /// Fold a freshly fetched user into the stored session and announce it
    /// when anything changed.
    async fn sync_user(&self, user: &User) -> BackendResult<()> {
        let updated = {
            let mut session = self.session.write().await;
            match session.as_mut() {
                Some(session) if session.user != *user => {
                    session.user = user.clone();
                    Some(session.clone())
                }
                _ => None,
            }
        };

        if let Some(session) = updated {
            debug!(user = %user.id, "user details changed");
            self.store_session(Some(session.clone())).await?;
            self.emit(AuthChange::UserUpdated(Some(session)));
        }
        Ok(())
    }

    async fn revoke(&self, token: &str) -> BackendResult<()> {
        let resp = self
            .auth_request(Method::POST, "logout")
            .bearer_auth(token)
            .send()
            .await?;
        expect_success(resp).await
    }

    async fn delete_by_id(&self, table: &str, id: Uuid) -> BackendResult<()> {
        let resp = self
            .request(Method::DELETE, self.rest_url(table))
            .await
            .query(&[("id", eq(id))])
            .send()
            .await?;
        expect_success(resp).await
    }
}

fn eq(value: impl Display) -> String {
    format!("eq.{value}")
}

fn select_and_order(select: &str, order: &str, active_only: bool) -> Vec<(&'static str, String)> {
    let mut query = vec![("select", select.to_string()), ("order", order.to_string())];
    if active_only {
        query.push(("ativo", eq(true)));
    }
    query
}

async fn parse_json<T: DeserializeOwned>(resp: Response) -> BackendResult<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(api_error(status, &body));
    }
    Ok(serde_json::from_str(&body)?)
}

async fn expect_success(resp: Response) -> BackendResult<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await?;
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.map(|code| match code {
        Value::String(code) => code,
        other => other.to_string(),
    });

    if code.as_deref() == Some(NO_ROWS_CODE) {
        return BackendError::NotFound;
    }

    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("erro desconhecido").to_string()
            } else {
                body.trim().to_string()
            }
        });

    BackendError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        let resp = self
            .auth_request(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: Session = parse_json(resp).await?;

        self.store_session(Some(session.clone())).await?;
        info!(user = %session.user.id, "signed in");
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome> {
        let resp = self
            .auth_request(Method::POST, "signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: Value = parse_json(resp).await?;

        // Auto-confirmed projects answer with a session, the others with the bare user.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            self.store_session(Some(session.clone())).await?;
            self.emit(AuthChange::SignedIn(session.clone()));
            return Ok(SignUpOutcome {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user = match body.get("user") {
            Some(user) => serde_json::from_value(user.clone())?,
            None => serde_json::from_value(body)?,
        };
        Ok(SignUpOutcome {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone());

        let revoked = match token {
            Some(token) => match self.revoke(&token).await {
                // Already invalid server-side.
                Err(BackendError::Api { status: 401 | 403 | 404, .. }) => Ok(()),
                other => other,
            },
            None => Ok(()),
        };
        if let Err(err) = &revoked {
            warn!(error = %err, "token revoke failed, clearing local session anyway");
        }

        self.store_session(None).await?;
        self.emit(AuthChange::SignedOut);
        revoked
    }

    async fn get_session(&self) -> BackendResult<Option<Session>> {
        let stored = self.session.read().await.clone();
        let Some(session) = stored else {
            return Ok(None);
        };

        let refresh_token = match (&session.refresh_token, session.is_expired()) {
            (Some(token), true) => token.clone(),
            _ => return Ok(Some(session)),
        };

        debug!("stored session expired, refreshing");
        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                self.store_session(Some(refreshed.clone())).await?;
                self.emit(AuthChange::TokenRefreshed(Some(refreshed.clone())));
                Ok(Some(refreshed))
            }
            Err(BackendError::Api { message, .. }) => {
                warn!(%message, "session refresh rejected");
                self.store_session(None).await?;
                self.emit(AuthChange::TokenRefreshed(None));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn get_user(&self) -> BackendResult<Option<User>> {
        if self.session.read().await.is_none() {
            return Ok(None);
        }
        let resp = self.request(Method::GET, self.auth_url("user")).await.send().await?;
        let user: User = parse_json(resp).await?;
        self.sync_user(&user).await?;
        Ok(Some(user))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn current_company_id(&self) -> BackendResult<Uuid> {
        // The RPC resolves the tenant from the caller's JWT.
        if self.session.read().await.is_none() {
            return Err(BackendError::NoSession);
        }
        let resp = self
            .request(Method::POST, self.rest_url(COMPANY_ID_RPC))
            .await
            .json(&json!({}))
            .send()
            .await?;
        let company_id: Option<Uuid> = parse_json(resp).await?;
        company_id.ok_or(BackendError::NotFound)
    }

    async fn company_id_for_user(&self, user_id: Uuid) -> BackendResult<Option<Uuid>> {
        let row: Option<MembershipRow> = self
            .first(USERS, &[("select", "empresa_id".to_string()), ("id", eq(user_id))])
            .await?;
        Ok(row.and_then(|row| row.empresa_id))
    }

    async fn get_company(&self, id: Uuid) -> BackendResult<Option<Company>> {
        self.first(COMPANIES, &[("select", "id,nome,email".to_string()), ("id", eq(id))])
            .await
    }

    async fn insert_company(&self, company: &NewCompany) -> BackendResult<Company> {
        self.insert_one(COMPANIES, company, &[]).await
    }

    async fn insert_user_profile(&self, profile: &NewUserProfile) -> BackendResult<()> {
        let resp = self
            .request(Method::POST, self.rest_url(USERS))
            .await
            .header("Prefer", RETURN_MINIMAL)
            .json(profile)
            .send()
            .await?;
        expect_success(resp).await
    }

    async fn list_clients(&self, active_only: bool) -> BackendResult<Vec<Client>> {
        self.select(CLIENTS, &select_and_order("*", "nome.asc", active_only))
            .await
    }

    async fn get_client_contact(&self, id: Uuid) -> BackendResult<Option<Contact>> {
        self.first(CLIENTS, &[("select", "nome,telefone".to_string()), ("id", eq(id))])
            .await
    }

    async fn insert_client(&self, row: &NewClientRow) -> BackendResult<Client> {
        self.insert_one(CLIENTS, row, &[]).await
    }

    async fn update_client(&self, id: Uuid, patch: &ClientPatch) -> BackendResult<Vec<Client>> {
        let resp = self
            .request(Method::PATCH, self.rest_url(CLIENTS))
            .await
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("id", eq(id))])
            .json(patch)
            .send()
            .await?;
        parse_json(resp).await
    }

    async fn delete_client(&self, id: Uuid) -> BackendResult<()> {
        self.delete_by_id(CLIENTS, id).await
    }

    async fn list_attendants(&self, active_only: bool) -> BackendResult<Vec<Attendant>> {
        self.select(ATTENDANTS, &select_and_order("*", "nome.asc", active_only))
            .await
    }

    async fn get_attendant_contact(&self, id: Uuid) -> BackendResult<Option<Contact>> {
        self.first(ATTENDANTS, &[("select", "nome,telefone".to_string()), ("id", eq(id))])
            .await
    }

    async fn list_appointments(&self) -> BackendResult<Vec<Appointment>> {
        self.select(
            APPOINTMENTS,
            &select_and_order(APPOINTMENT_SELECT, APPOINTMENT_ORDER, false),
        )
        .await
    }

    async fn appointment_ids_for_client(&self, client_id: Uuid, status: &str) -> BackendResult<Vec<Uuid>> {
        let rows: Vec<IdRow> = self
            .select(
                APPOINTMENTS,
                &[
                    ("select", "id".to_string()),
                    ("cliente_id", eq(client_id)),
                    ("status", eq(status)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn insert_appointment(&self, row: &NewAppointmentRow) -> BackendResult<Appointment> {
        self.insert_one(APPOINTMENTS, row, &[("select", APPOINTMENT_SELECT.to_string())])
            .await
    }

    async fn update_appointment(&self, id: Uuid, patch: &AppointmentPatch) -> BackendResult<Appointment> {
        let resp = self
            .request(Method::PATCH, self.rest_url(APPOINTMENTS))
            .await
            .header("Prefer", RETURN_REPRESENTATION)
            .header(ACCEPT, SINGLE_OBJECT)
            .query(&[("id", eq(id)), ("select", APPOINTMENT_SELECT.to_string())])
            .json(patch)
            .send()
            .await?;
        parse_json(resp).await
    }

    async fn delete_appointment(&self, id: Uuid) -> BackendResult<()> {
        self.delete_by_id(APPOINTMENTS, id).await
    }
}
