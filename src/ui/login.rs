use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::SignUpRequest;
use crate::ui::components::{centered_rect, Palette};

#[derive(Debug, PartialEq)]
pub enum LoginAction {
    Quit,
    SignIn { email: String, password: String },
    SignUp(SignUpRequest),
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LoginMode {
    SignIn,
    SignUp,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LoginField {
    Name,
    Company,
    Email,
    Password,
}

/// The form is always in typing mode; arrows move between fields and
/// `F2` switches between signing in and creating an account.
pub struct LoginState {
    pub mode: LoginMode,
    pub name: String,
    pub company_name: String,
    pub email: String,
    pub password: String,
    pub current_field: LoginField,
    pub notice: Option<String>,
}

impl LoginState {
    pub fn new() -> Self {
        Self {
            mode: LoginMode::SignIn,
            name: String::new(),
            company_name: String::new(),
            email: String::new(),
            password: String::new(),
            current_field: LoginField::Email,
            notice: None,
        }
    }

    fn fields(&self) -> &'static [LoginField] {
        match self.mode {
            LoginMode::SignIn => &[LoginField::Email, LoginField::Password],
            LoginMode::SignUp => &[
                LoginField::Name,
                LoginField::Company,
                LoginField::Email,
                LoginField::Password,
            ],
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoginMode::SignIn => LoginMode::SignUp,
            LoginMode::SignUp => LoginMode::SignIn,
        };
        self.current_field = self.fields()[0];
        self.password.clear();
    }

    fn step(&mut self, forward: bool) {
        let fields = self.fields();
        let position = fields
            .iter()
            .position(|field| *field == self.current_field)
            .unwrap_or(0);
        let len = fields.len();
        let next = if forward { (position + 1) % len } else { (position + len - 1) % len };
        self.current_field = fields[next];
    }

    fn current_value(&mut self) -> &mut String {
        match self.current_field {
            LoginField::Name => &mut self.name,
            LoginField::Company => &mut self.company_name,
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn is_valid(&self) -> bool {
        let credentials = !self.email.trim().is_empty() && !self.password.is_empty();
        match self.mode {
            LoginMode::SignIn => credentials,
            LoginMode::SignUp => {
                credentials && !self.name.trim().is_empty() && !self.company_name.trim().is_empty()
            }
        }
    }

    fn submit(&self) -> Option<LoginAction> {
        if !self.is_valid() {
            return None;
        }
        let email = self.email.trim().to_string();
        Some(match self.mode {
            LoginMode::SignIn => LoginAction::SignIn {
                email,
                password: self.password.clone(),
            },
            LoginMode::SignUp => LoginAction::SignUp(SignUpRequest {
                name: self.name.trim().to_string(),
                company_name: self.company_name.trim().to_string(),
                email,
                password: self.password.clone(),
            }),
        })
    }
}

pub fn render_login<B: Backend>(f: &mut Frame<B>, area: Rect, state: &LoginState, palette: &Palette) {
    let form_area = centered_rect(60, 60, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)].as_ref())
        .split(form_area);

    let title = match state.mode {
        LoginMode::SignIn => "Entrar",
        LoginMode::SignUp => "Criar conta",
    };

    let items: Vec<ListItem> = state
        .fields()
        .iter()
        .map(|field| {
            let (label, value) = match field {
                LoginField::Name => ("Seu nome", state.name.clone()),
                LoginField::Company => ("Empresa", state.company_name.clone()),
                LoginField::Email => ("E-mail", state.email.clone()),
                LoginField::Password => ("Senha", "*".repeat(state.password.chars().count())),
            };
            let current = *field == state.current_field;
            let (label_style, value) = if current {
                (palette.selected(), Span::styled(format!("{value}|"), Style::default().add_modifier(Modifier::BOLD)))
            } else {
                (Style::default(), Span::raw(value))
            };
            ListItem::new(Spans::from(vec![Span::styled(format!("{label:<10}"), label_style), value]))
        })
        .collect();

    let form = List::new(items)
        .style(palette.base())
        .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(form, chunks[0]);

    let help_text = match state.mode {
        LoginMode::SignIn => "Enter - Entrar | F2 - Criar conta | Cima/Baixo - Navegar | Esc - Fechar",
        LoginMode::SignUp => "Enter - Cadastrar | F2 - Já tenho conta | Cima/Baixo - Navegar | Esc - Fechar",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(palette.muted).bg(palette.bg))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[1]);
}

pub fn handle_input(state: &mut LoginState) -> Result<Option<LoginAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key));
    }
    Ok(None)
}

fn handle_key(state: &mut LoginState, key: KeyEvent) -> Option<LoginAction> {
    match key.code {
        KeyCode::Esc => return Some(LoginAction::Quit),
        KeyCode::F(2) => state.toggle_mode(),
        KeyCode::Enter => return state.submit(),
        KeyCode::Down | KeyCode::Tab => state.step(true),
        KeyCode::Up | KeyCode::BackTab => state.step(false),
        KeyCode::Char(c) => state.current_value().push(c),
        KeyCode::Backspace => {
            state.current_value().pop();
        }
        _ => {}
    }
    None
}
