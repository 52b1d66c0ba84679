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
use uuid::Uuid;

use crate::models::{Client, ClientInput, ClientPatch};
use crate::ui::components::Palette;

#[derive(Debug, PartialEq)]
pub enum ClientWizardAction {
    Cancel,
    Create(ClientInput),
    Update(Uuid, ClientPatch),
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum ClientField {
    Name,
    Phone,
    Email,
    Notes,
    Active,
}

const FIELDS: [ClientField; 5] = [
    ClientField::Name,
    ClientField::Phone,
    ClientField::Email,
    ClientField::Notes,
    ClientField::Active,
];

pub struct ClientWizardState {
    original: Option<Client>,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub notes: String,
    pub active: bool,
    pub current_field: ClientField,
    pub editing: bool,
}

impl ClientWizardState {
    pub fn new() -> Self {
        Self {
            original: None,
            name: String::new(),
            phone: String::new(),
            email: String::new(),
            notes: String::new(),
            active: true,
            current_field: ClientField::Name,
            editing: false,
        }
    }

    pub fn from_existing(client: Client) -> Self {
        Self {
            name: client.name.clone(),
            phone: client.phone.clone(),
            email: client.email.clone().unwrap_or_default(),
            notes: client.notes.clone().unwrap_or_default(),
            active: client.active,
            original: Some(client),
            current_field: ClientField::Name,
            editing: false,
        }
    }

    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    pub fn toggle_editing(&mut self) {
        if self.current_field == ClientField::Active {
            self.active = !self.active;
            return;
        }
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            ClientField::Name => ClientField::Phone,
            ClientField::Phone => ClientField::Email,
            ClientField::Email => ClientField::Notes,
            ClientField::Notes => ClientField::Active,
            ClientField::Active => ClientField::Name,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            ClientField::Name => ClientField::Active,
            ClientField::Phone => ClientField::Name,
            ClientField::Email => ClientField::Phone,
            ClientField::Notes => ClientField::Email,
            ClientField::Active => ClientField::Notes,
        };
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ClientField::Name => &mut self.name,
            ClientField::Phone => &mut self.phone,
            ClientField::Email => &mut self.email,
            ClientField::Notes => &mut self.notes,
            ClientField::Active => return,
        };

        match key {
            KeyCode::Char(c) => field_value.push(c),
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.phone.trim().is_empty()
    }

    fn optional(value: &str) -> Option<String> {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn to_input(&self) -> ClientInput {
        ClientInput {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: Self::optional(&self.email),
            notes: Self::optional(&self.notes),
            active: Some(self.active),
        }
    }

    /// Only the fields that differ from the loaded client.
    pub fn to_patch(&self) -> ClientPatch {
        let Some(original) = &self.original else {
            return ClientPatch::default();
        };
        let input = self.to_input();

        ClientPatch {
            name: (input.name != original.name).then_some(input.name),
            phone: (input.phone != original.phone).then_some(input.phone),
            email: (input.email != original.email).then(|| input.email.unwrap_or_default()),
            notes: (input.notes != original.notes).then(|| input.notes.unwrap_or_default()),
            active: (self.active != original.active).then_some(self.active),
        }
    }

    fn save_action(&self) -> ClientWizardAction {
        match &self.original {
            None => ClientWizardAction::Create(self.to_input()),
            Some(original) => ClientWizardAction::Update(original.id, self.to_patch()),
        }
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, area: Rect, state: &mut ClientWizardState, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(7),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let title_text = if state.is_new() { "Novo cliente" } else { "Editar cliente" };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(palette.accent).bg(palette.bg))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1], palette);

    let help_text = if state.editing {
        "Enter - Confirmar campo | Esc - Parar edição"
    } else {
        "Enter - Editar campo | Cima/Baixo - Navegar | S - Salvar | Esc - Cancelar"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(palette.muted).bg(palette.bg))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ClientWizardState, area: Rect, palette: &Palette) {
    let active = if state.active { "sim" } else { "não" };
    let fields = [
        ("Nome*", state.name.as_str()),
        ("Telefone*", state.phone.as_str()),
        ("E-mail", state.email.as_str()),
        ("Observações", state.notes.as_str()),
        ("Ativo", active),
    ];

    let items: Vec<ListItem> = FIELDS
        .iter()
        .zip(fields.iter())
        .map(|(field, (name, value))| {
            let current = *field == state.current_field;
            let label_style = if current {
                palette.selected()
            } else {
                Style::default()
            };

            let value = if current && state.editing {
                Span::styled(format!("{value}|"), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(value.to_string())
            };

            ListItem::new(Spans::from(vec![Span::styled(format!("{name}: "), label_style), value]))
        })
        .collect();

    let form_list = List::new(items)
        .style(palette.base())
        .block(Block::default().borders(Borders::ALL).title("Dados do cliente"));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ClientWizardState) -> Result<Option<ClientWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key));
    }
    Ok(None)
}

fn handle_key(state: &mut ClientWizardState, key: KeyEvent) -> Option<ClientWizardAction> {
    match key.code {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(ClientWizardAction::Cancel);
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down if !state.editing => state.next_field(),
        KeyCode::Char('s') if !state.editing => {
            if state.is_valid() {
                return Some(state.save_action());
            }
        }
        _ if state.editing => state.edit_current_field(key.code),
        _ => {}
    }
    None
}
