use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use uuid::Uuid;

use crate::models::Client;
use crate::ui::components::{render_confirmation, Palette};

// Represents the state of the client list screen
pub struct ClientsState {
    clients: Vec<Client>,
    list_state: ListState,
    show_delete_confirmation: bool,
}

impl ClientsState {
    pub fn new(clients: Vec<Client>) -> Self {
        let mut list_state = ListState::default();
        if !clients.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            clients,
            list_state,
            show_delete_confirmation: false,
        }
    }

    /// Swap in a re-fetched list, keeping the cursor where it was when
    /// possible.
    pub fn replace(&mut self, clients: Vec<Client>) {
        let selected = self.list_state.selected().unwrap_or(0);
        self.clients = clients;
        self.list_state.select(match self.clients.len() {
            0 => None,
            len => Some(selected.min(len - 1)),
        });
    }

    pub fn next(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.clients.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(0) | None => self.clients.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.list_state.selected().and_then(|i| self.clients.get(i))
    }
}

#[derive(Debug, PartialEq)]
pub enum ClientAction {
    Back,
    NewClient,
    EditClient(Uuid),
    ToggleActive(Uuid, bool),
    DeleteClient(Uuid),
}

pub fn render_clients<B: Backend>(f: &mut Frame<B>, area: Rect, state: &mut ClientsState, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let items: Vec<ListItem> = state
        .clients
        .iter()
        .map(|client| {
            let mut spans = vec![
                Span::raw(format!("{:<28}", client.name)),
                Span::raw(format!("{:<18}", client.phone)),
                Span::raw(format!("{:<28}", client.email.as_deref().unwrap_or("-"))),
            ];
            if !client.active {
                spans.push(Span::styled("inativo", Style::default().fg(palette.muted)));
            }
            ListItem::new(Spans::from(spans))
        })
        .collect();

    let clients_list = List::new(items)
        .style(palette.base())
        .block(Block::default().title("Clientes").borders(Borders::ALL))
        .highlight_style(palette.highlight());

    f.render_stateful_widget(clients_list, chunks[0], &mut state.list_state);

    let buttons_text = if state.selected_client().is_some() {
        "<N> Novo | <E> Editar | <A> Ativar/Desativar | <D> Excluir | <Esc> Agendamentos"
    } else {
        "<N> Novo | <Esc> Agendamentos"
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(palette.muted).bg(palette.bg));

    f.render_widget(buttons, chunks[1]);

    if state.show_delete_confirmation {
        if let Some(client) = state.selected_client() {
            let question = format!("Excluir o cliente {}?", client.name);
            render_confirmation(
                f,
                area,
                "Confirmar exclusão",
                &[question.as_str(), "Clientes com agendamentos pendentes não são excluídos."],
                palette,
            );
        }
    }
}

pub fn handle_input(state: &mut ClientsState) -> Result<Option<ClientAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key));
    }
    Ok(None)
}

fn handle_key(state: &mut ClientsState, key: KeyEvent) -> Option<ClientAction> {
    if state.show_delete_confirmation {
        match key.code {
            KeyCode::Char('s') | KeyCode::Char('y') => {
                state.toggle_delete_confirmation();
                return state.selected_client().map(|client| ClientAction::DeleteClient(client.id));
            }
            KeyCode::Char('n') | KeyCode::Esc => state.toggle_delete_confirmation(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(ClientAction::Back),
        KeyCode::Char('n') => return Some(ClientAction::NewClient),
        KeyCode::Char('e') | KeyCode::Enter => {
            return state.selected_client().map(|client| ClientAction::EditClient(client.id));
        }
        KeyCode::Char('a') => {
            return state
                .selected_client()
                .map(|client| ClientAction::ToggleActive(client.id, !client.active));
        }
        KeyCode::Char('d') => {
            if state.selected_client().is_some() {
                state.toggle_delete_confirmation();
            }
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }
    None
}
