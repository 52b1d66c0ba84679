use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db::{Backend, BackendError};
use crate::error::AppError;
use crate::models::{AuthChange, NewCompany, NewUserProfile, Session, SignUpRequest, User, ROLE_ADMIN};

/// Published view of the authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.session.is_some()
    }
}

/// Process-wide authentication state.
///
/// Created once at startup and shared through `Arc`. The snapshot starts
/// in the loading state; [`AuthState::bootstrap`] settles it and fires the
/// readiness signal that navigation waits on.
pub struct AuthState {
    backend: Arc<dyn Backend>,
    snapshot: watch::Sender<AuthSnapshot>,
    ready: watch::Sender<bool>,
}

impl AuthState {
    pub fn new(backend: Arc<dyn Backend>) -> Arc<Self> {
        let (snapshot, _) = watch::channel(AuthSnapshot {
            is_loading: true,
            ..Default::default()
        });
        let (ready, _) = watch::channel(false);

        Arc::new(Self {
            backend,
            snapshot,
            ready,
        })
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.borrow().is_authenticated()
    }

    pub fn clear_error(&self) {
        self.snapshot.send_modify(|state| state.error = None);
    }

    /// Wait for [`AuthState::bootstrap`] to finish, at most `timeout`.
    /// Returns whether it finished in time.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<bool, AppError> {
        let mut ready = self.ready.subscribe();
        match tokio::time::timeout(timeout, ready.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(_)) => Err(AppError::AuthUnavailable),
            Err(_) => Ok(false),
        }
    }

    fn set_session(&self, session: Option<Session>) {
        self.snapshot.send_modify(|state| {
            state.user = session.as_ref().map(|session| session.user.clone());
            state.session = session;
        });
    }

    fn start(&self) {
        self.snapshot.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn finish(&self, failure: Option<&BackendError>) {
        self.snapshot.send_modify(|state| {
            state.is_loading = false;
            if let Some(err) = failure {
                state.error = Some(err.to_string());
            }
        });
    }

    /// Restore the persisted session at startup.
    ///
    /// An already-expired session is cleared locally and signed out with the
    /// backend.
    pub async fn bootstrap(&self) {
        match self.backend.get_session().await {
            Err(err) => {
                error!(error = %err, "could not read session");
                self.set_session(None);
            }
            Ok(Some(session)) if !session.is_expired() => {
                info!(user = ?session.user.email, "session restored");
                self.set_session(Some(session));
            }
            Ok(Some(_)) => {
                info!("stored session expired, signing out");
                self.set_session(None);
                if let Err(err) = self.backend.sign_out().await {
                    warn!(error = %err, "sign-out of expired session failed");
                }
            }
            Ok(None) => {
                debug!("no stored session");
                self.set_session(None);
            }
        }

        self.snapshot.send_modify(|state| state.is_loading = false);
        self.ready.send_replace(true);
    }

    /// Apply one backend auth event to the snapshot.
    pub fn apply_change(&self, change: AuthChange) {
        match change {
            AuthChange::SignedOut | AuthChange::TokenRefreshed(None) => {
                debug!("session removed");
                self.set_session(None);
            }
            AuthChange::SignedIn(session) | AuthChange::TokenRefreshed(Some(session)) => {
                debug!(user = ?session.user.email, "session updated");
                self.set_session(Some(session));
            }
            AuthChange::UserUpdated(session) => {
                if let Some(session) = session {
                    self.snapshot
                        .send_modify(|state| state.user = Some(session.user));
                }
            }
        }
    }

    /// Follow backend auth events until the state is dropped.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::downgrade(self);
        let mut events = self.backend.subscribe();

        tokio::spawn(async move {
            loop {
                let change = match events.recv().await {
                    Ok(change) => change,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth listener lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(state) = state.upgrade() else {
                    break;
                };
                state.apply_change(change);
            }
            debug!("auth listener stopped");
        })
    }

    /// Password sign-in. The snapshot itself is updated by the listener
    /// when the backend announces the new session.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Option<User> {
        self.start();
        match self.backend.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.finish(None);
                Some(session.user)
            }
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                self.finish(Some(&err));
                None
            }
        }
    }

    /// Create the auth identity, the company and the admin profile, in that
    /// order. Nothing is rolled back when a later step fails.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Option<User> {
        self.start();
        match self.register(request).await {
            Ok(user) => {
                self.finish(None);
                user
            }
            Err(err) => {
                error!(error = %err, "sign-up failed");
                self.finish(Some(&err));
                None
            }
        }
    }

    async fn register(&self, request: &SignUpRequest) -> Result<Option<User>, BackendError> {
        let outcome = self.backend.sign_up(&request.email, &request.password).await?;

        let company = self
            .backend
            .insert_company(&NewCompany {
                name: request.company_name.clone(),
                email: request.email.clone(),
            })
            .await?;

        let profile = NewUserProfile {
            id: outcome.user.as_ref().map(|user| user.id),
            name: request.name.clone(),
            empresa_id: company.id,
            email: request.email.clone(),
            role: ROLE_ADMIN.to_string(),
        };
        if let Err(err) = self.backend.insert_user_profile(&profile).await {
            warn!(company = %company.id, "profile insert failed, company left without members");
            return Err(err);
        }

        info!(company = %company.id, "account registered");
        Ok(outcome.user)
    }

    pub async fn sign_out(&self) {
        self.start();
        match self.backend.sign_out().await {
            Ok(()) => {
                self.set_session(None);
                self.finish(None);
            }
            Err(err) => {
                warn!(error = %err, "sign-out failed");
                self.finish(Some(&err));
            }
        }
    }

    /// Re-read the backend session when the published state looks stale.
    pub async fn reload_session(&self) -> bool {
        match self.backend.get_session().await {
            Ok(Some(session)) => {
                self.set_session(Some(session));
                true
            }
            Ok(None) => {
                self.set_session(None);
                false
            }
            Err(err) => {
                error!(error = %err, "session reload failed");
                self.set_session(None);
                false
            }
        }
    }
}
