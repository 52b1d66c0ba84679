mod config;
mod db;
mod error;
mod guard;
mod logging;
mod models;
mod state;
mod storage;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info};
use tui::{
    backend::{Backend, CrosstermBackend},
    widgets::Block,
    Terminal,
};

use crate::config::Config;
use crate::db::Backend as DataBackend;
use crate::guard::{Navigation, Route, Side};
use crate::models::{AppointmentPatch, ClientPatch};
use crate::state::{theme, AppointmentStore, AuthState, ClientStore, CompanyStore, ThemeState};
use crate::storage::LocalStorage;
use crate::ui::{
    appointment_wizard::{
        handle_input as handle_appointment_wizard_input, render_appointment_wizard, AppointmentWizardAction,
        AppointmentWizardState,
    },
    appointments::{handle_input as handle_appointments_input, render_appointments, AppointmentAction, AppointmentsState},
    client_wizard::{handle_input as handle_client_wizard_input, render_client_wizard, ClientWizardAction, ClientWizardState},
    clients::{handle_input as handle_clients_input, render_clients, ClientAction, ClientsState},
    components::{frame_layout, render_header, render_status, Palette},
    login::{handle_input as handle_login_input, render_login, LoginAction, LoginState},
};

const SIGN_UP_NOTICE: &str = "Conta criada. Confirme seu e-mail e entre com sua senha.";

#[derive(Parser, Debug)]
#[command(name = "agenda", version, about = "Agenda de atendimentos no terminal")]
struct Cli {
    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Directory for local storage and logs (overrides AGENDA_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

// Represents the current screen in the app
enum AppScreen {
    Starting,
    Login,
    Appointments,
    AppointmentWizard,
    Clients,
    ClientWizard,
}

// Main application state
struct AppState {
    config: Config,
    backend: Arc<dyn DataBackend>,
    auth: Arc<AuthState>,
    theme: ThemeState,
    company: CompanyStore,
    appointments: AppointmentStore,
    clients: ClientStore,
    screen: AppScreen,
    login_state: LoginState,
    appointments_state: Option<AppointmentsState>,
    appointment_wizard_state: Option<AppointmentWizardState>,
    clients_state: Option<ClientsState>,
    client_wizard_state: Option<ClientWizardState>,
}

impl AppState {
    fn new(config: Config, backend: Arc<dyn DataBackend>, auth: Arc<AuthState>, theme: ThemeState) -> Self {
        Self {
            config,
            company: CompanyStore::new(backend.clone()),
            appointments: AppointmentStore::new(backend.clone()),
            clients: ClientStore::new(backend.clone()),
            backend,
            auth,
            theme,
            screen: AppScreen::Starting,
            login_state: LoginState::new(),
            appointments_state: None,
            appointment_wizard_state: None,
            clients_state: None,
            client_wizard_state: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::init()?;
    if let Some(dir) = cli.data_dir {
        config.set_data_dir(dir);
    }
    let _log_guard = logging::init_logging(config.data_dir(), cli.debug)?;
    info!(data_dir = %config.data_dir().display(), "starting agenda manager");

    let storage = Arc::new(LocalStorage::open(config.data_dir()).context("could not open local storage")?);

    // Theme is applied before the first frame is drawn
    let os_prefers_dark = theme::os_prefers_dark();
    let root = theme::bootstrap(&storage, os_prefers_dark);
    let theme = ThemeState::new(storage.clone(), os_prefers_dark, root);

    let backend = db::init(&config, storage)?;
    let auth = AuthState::new(backend.clone());
    let _listener = auth.spawn_listener();
    let booting = Arc::clone(&auth);
    tokio::spawn(async move { booting.bootstrap().await });

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app_state = AppState::new(config, backend, auth, theme);

    // The guard may wait on bootstrap, so show the loading header first
    let result = match draw(&mut terminal, &mut app_state) {
        Ok(()) => match navigate(&mut app_state, Route::Appointments).await {
            Ok(()) => run_app(&mut terminal, &mut app_state).await,
            Err(err) => Err(err),
        },
        Err(err) => Err(err),
    };

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!(error = %err, "application stopped");
        eprintln!("Erro: {err}");
    }
    info!("agenda manager closed");

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        draw(terminal, app_state)?;

        let should_quit = match app_state.screen {
            AppScreen::Starting => false,
            AppScreen::Login => handle_login_screen(app_state).await?,
            AppScreen::Appointments => handle_appointments_screen(app_state).await?,
            AppScreen::AppointmentWizard => handle_appointment_wizard_screen(app_state).await?,
            AppScreen::Clients => handle_clients_screen(app_state).await?,
            AppScreen::ClientWizard => handle_client_wizard_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

fn draw<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    let palette = Palette::for_root(app_state.theme.root());
    let company = app_state.company.display_name().to_string();
    let auth = app_state.auth.snapshot();
    let user = auth.user.and_then(|user| user.email);
    let loading = auth.is_loading
        || app_state.company.is_loading()
        || app_state.appointments.is_loading()
        || app_state.clients.is_loading();
    let (error, notice) = match app_state.screen {
        AppScreen::Starting => (None, None),
        AppScreen::Login => (auth.error, app_state.login_state.notice.clone()),
        AppScreen::Appointments | AppScreen::AppointmentWizard => {
            (app_state.appointments.error().map(str::to_string), None)
        }
        AppScreen::Clients | AppScreen::ClientWizard => (app_state.clients.error().map(str::to_string), None),
    };

    terminal.draw(|f| {
        f.render_widget(Block::default().style(palette.base()), f.size());
        let (header, body, status) = frame_layout(f.size());
        render_header(f, header, &company, user.as_deref(), loading, &palette);

        match app_state.screen {
            AppScreen::Starting => {}
            AppScreen::Login => render_login(f, body, &app_state.login_state, &palette),
            AppScreen::Appointments => {
                if let Some(state) = &mut app_state.appointments_state {
                    render_appointments(f, body, state, &palette);
                }
            }
            AppScreen::AppointmentWizard => {
                if let Some(state) = &mut app_state.appointment_wizard_state {
                    render_appointment_wizard(f, body, state, &palette);
                }
            }
            AppScreen::Clients => {
                if let Some(state) = &mut app_state.clients_state {
                    render_clients(f, body, state, &palette);
                }
            }
            AppScreen::ClientWizard => {
                if let Some(state) = &mut app_state.client_wizard_state {
                    render_client_wizard(f, body, state, &palette);
                }
            }
        }

        render_status(f, status, error.as_deref(), notice.as_deref(), &palette);
    })?;

    Ok(())
}

/// Every route change goes through the guard.
async fn navigate(app_state: &mut AppState, to: Route) -> Result<()> {
    let timeout = app_state.config.auth_ready_timeout();
    let route = match guard::check(to, Side::Client, &app_state.auth, timeout).await {
        Navigation::Allow => to,
        Navigation::Redirect(route) => route,
    };

    match route {
        Route::Login => {
            app_state.auth.clear_error();
            app_state.login_state.password.clear();
            app_state.screen = AppScreen::Login;
        }
        Route::Appointments => load_appointments_screen(app_state).await?,
        Route::Clients => load_clients_screen(app_state).await?,
    }
    Ok(())
}

async fn load_appointments_screen(app_state: &mut AppState) -> Result<()> {
    if app_state.company.name().is_none() {
        app_state.company.fetch_name().await;
    }

    let appointments = app_state.appointments.fetch().await.to_vec();
    app_state.appointments_state = Some(AppointmentsState::new(appointments));
    app_state.appointment_wizard_state = None;
    app_state.screen = AppScreen::Appointments;

    Ok(())
}

async fn load_clients_screen(app_state: &mut AppState) -> Result<()> {
    app_state.clients.fetch().await;
    show_clients(app_state);
    Ok(())
}

fn show_clients(app_state: &mut AppState) {
    let clients = app_state.clients.clients().to_vec();
    match &mut app_state.clients_state {
        Some(state) => state.replace(clients),
        None => app_state.clients_state = Some(ClientsState::new(clients)),
    }
    app_state.client_wizard_state = None;
    app_state.screen = AppScreen::Clients;
}

fn sync_appointments(app_state: &mut AppState) {
    if let Some(state) = &mut app_state.appointments_state {
        state.replace(app_state.appointments.appointments().to_vec());
    }
}

/// Per-user caches are dropped so the next account starts clean.
fn reset_session_caches(app_state: &mut AppState) {
    app_state.company = CompanyStore::new(app_state.backend.clone());
    app_state.appointments = AppointmentStore::new(app_state.backend.clone());
    app_state.clients = ClientStore::new(app_state.backend.clone());
    app_state.appointments_state = None;
    app_state.clients_state = None;
}

async fn handle_login_screen(app_state: &mut AppState) -> Result<bool> {
    match handle_login_input(&mut app_state.login_state)? {
        Some(LoginAction::Quit) => return Ok(true),
        Some(LoginAction::SignIn { email, password }) => {
            app_state.login_state.notice = None;
            if app_state.auth.sign_in_with_password(&email, &password).await.is_some() {
                reset_session_caches(app_state);
                navigate(app_state, Route::Appointments).await?;
            }
        }
        Some(LoginAction::SignUp(request)) => {
            app_state.login_state.notice = None;
            if app_state.auth.sign_up(&request).await.is_some() {
                reset_session_caches(app_state);
                navigate(app_state, Route::Appointments).await?;
                // No session yet: the address still has to be confirmed
                if matches!(app_state.screen, AppScreen::Login) {
                    app_state.login_state.toggle_mode();
                    app_state.login_state.notice = Some(SIGN_UP_NOTICE.to_string());
                }
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_appointments_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.appointments_state else {
        return Ok(false);
    };

    match handle_appointments_input(state)? {
        Some(AppointmentAction::Quit) => return Ok(true),
        Some(AppointmentAction::Refresh) => navigate(app_state, Route::Appointments).await?,
        Some(AppointmentAction::NewAppointment) => {
            app_state.appointments.clear_error();
            let clients = app_state.appointments.fetch_clients().await;
            let attendants = app_state.appointments.fetch_attendants().await;
            app_state.appointment_wizard_state = Some(AppointmentWizardState::new(clients, attendants));
            app_state.screen = AppScreen::AppointmentWizard;
        }
        Some(AppointmentAction::SetStatus(id, status)) => {
            if app_state
                .appointments
                .update(id, AppointmentPatch::status(status))
                .await
                .is_ok()
            {
                sync_appointments(app_state);
            }
        }
        Some(AppointmentAction::DeleteAppointment(id)) => {
            if app_state.appointments.delete(id).await.is_ok() {
                sync_appointments(app_state);
            }
        }
        Some(AppointmentAction::OpenClients) => navigate(app_state, Route::Clients).await?,
        Some(AppointmentAction::ToggleTheme) => app_state.theme.toggle(),
        Some(AppointmentAction::SignOut) => {
            app_state.auth.sign_out().await;
            if !app_state.auth.is_authenticated() {
                reset_session_caches(app_state);
                navigate(app_state, Route::Login).await?;
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_appointment_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.appointment_wizard_state else {
        return Ok(false);
    };

    match handle_appointment_wizard_input(state)? {
        Some(AppointmentWizardAction::Cancel) => {
            app_state.appointments.clear_error();
            app_state.appointment_wizard_state = None;
            app_state.screen = AppScreen::Appointments;
        }
        Some(AppointmentWizardAction::Save(request)) => {
            // On failure the form stays open with the message in the status line
            if app_state.appointments.create(request).await.is_ok() {
                navigate(app_state, Route::Appointments).await?;
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_clients_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.clients_state else {
        return Ok(false);
    };

    match handle_clients_input(state)? {
        Some(ClientAction::Back) => {
            app_state.clients.clear_error();
            navigate(app_state, Route::Appointments).await?;
        }
        Some(ClientAction::NewClient) => {
            app_state.clients.clear_error();
            app_state.client_wizard_state = Some(ClientWizardState::new());
            app_state.screen = AppScreen::ClientWizard;
        }
        Some(ClientAction::EditClient(id)) => {
            let client = app_state.clients.clients().iter().find(|client| client.id == id).cloned();
            if let Some(client) = client {
                app_state.clients.clear_error();
                app_state.client_wizard_state = Some(ClientWizardState::from_existing(client));
                app_state.screen = AppScreen::ClientWizard;
            }
        }
        Some(ClientAction::ToggleActive(id, active)) => {
            let patch = ClientPatch {
                active: Some(active),
                ..Default::default()
            };
            if app_state.clients.update(id, patch).await {
                show_clients(app_state);
            }
        }
        Some(ClientAction::DeleteClient(id)) => {
            if app_state.clients.delete(id).await.is_ok() {
                show_clients(app_state);
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_client_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.client_wizard_state else {
        return Ok(false);
    };

    match handle_client_wizard_input(state)? {
        Some(ClientWizardAction::Cancel) => {
            app_state.clients.clear_error();
            show_clients(app_state);
        }
        Some(ClientWizardAction::Create(input)) => {
            if app_state.clients.add(input).await.is_ok() {
                show_clients(app_state);
            }
        }
        Some(ClientWizardAction::Update(id, patch)) => {
            if patch.is_empty() || app_state.clients.update(id, patch).await {
                show_clients(app_state);
            }
        }
        None => {}
    }

    Ok(false)
}
