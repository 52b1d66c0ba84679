use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::AppError;
use crate::state::AuthState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Appointments,
    Clients,
}

impl Route {
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

/// Where the navigation is being evaluated. Server-side rendering has no
/// session to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(Route),
}

/// Decide whether navigation to `to` may proceed.
///
/// Waits at most `timeout` for the session bootstrap to finish, then gives
/// a signed-out user one session reload before redirecting to login.
pub async fn check(to: Route, side: Side, auth: &AuthState, timeout: Duration) -> Navigation {
    if !to.requires_auth() || side == Side::Server {
        return Navigation::Allow;
    }

    match authorize(auth, timeout).await {
        Ok(true) => Navigation::Allow,
        Ok(false) => {
            debug!(?to, "not authenticated, redirecting to login");
            Navigation::Redirect(Route::Login)
        }
        Err(err) => {
            error!(error = %err, ?to, "route guard failed");
            Navigation::Redirect(Route::Login)
        }
    }
}

async fn authorize(auth: &AuthState, timeout: Duration) -> Result<bool, AppError> {
    if !auth.wait_ready(timeout).await? {
        warn!(?timeout, "auth bootstrap still running, deciding on current state");
    }

    if auth.is_authenticated() {
        return Ok(true);
    }
    Ok(auth.reload_session().await)
}
