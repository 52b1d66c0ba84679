use anyhow::Result;
use chrono::{Duration, Local, NaiveDateTime, Timelike};
use crossterm::event::{self, Event, KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{Attendant, Client, NewAppointment};
use crate::ui::components::schedule_input::ScheduleInputState;
use crate::ui::components::Palette;

#[derive(Debug, PartialEq)]
pub enum AppointmentWizardAction {
    Cancel,
    Save(NewAppointment),
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppointmentField {
    Client,
    Attendant,
    Schedule,
    Subject,
}

const FIELDS: [AppointmentField; 4] = [
    AppointmentField::Client,
    AppointmentField::Attendant,
    AppointmentField::Schedule,
    AppointmentField::Subject,
];

pub struct AppointmentWizardState {
    clients: Vec<Client>,
    attendants: Vec<Attendant>,
    client_index: usize,
    attendant_index: usize,
    pub schedule: ScheduleInputState,
    pub subject: String,
    pub current_field: AppointmentField,
    pub editing: bool,
}

/// Next full hour from now.
fn default_slot() -> NaiveDateTime {
    let now = Local::now().naive_local() + Duration::hours(1);
    now.with_minute(0)
        .and_then(|slot| slot.with_second(0))
        .and_then(|slot| slot.with_nanosecond(0))
        .unwrap_or(now)
}

impl AppointmentWizardState {
    pub fn new(clients: Vec<Client>, attendants: Vec<Attendant>) -> Self {
        Self::with_slot(clients, attendants, default_slot())
    }

    fn with_slot(clients: Vec<Client>, attendants: Vec<Attendant>, slot: NaiveDateTime) -> Self {
        Self {
            clients,
            attendants,
            client_index: 0,
            attendant_index: 0,
            schedule: ScheduleInputState::new(slot),
            subject: String::new(),
            current_field: AppointmentField::Client,
            editing: false,
        }
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.clients.get(self.client_index)
    }

    pub fn selected_attendant(&self) -> Option<&Attendant> {
        self.attendants.get(self.attendant_index)
    }

    fn is_editing(&self) -> bool {
        self.editing || self.schedule.editing
    }

    pub fn toggle_editing(&mut self) {
        match self.current_field {
            AppointmentField::Schedule => self.schedule.toggle_editing(),
            AppointmentField::Subject => self.editing = !self.editing,
            AppointmentField::Client | AppointmentField::Attendant => {}
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            AppointmentField::Client => AppointmentField::Attendant,
            AppointmentField::Attendant => AppointmentField::Schedule,
            AppointmentField::Schedule => AppointmentField::Subject,
            AppointmentField::Subject => AppointmentField::Client,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            AppointmentField::Client => AppointmentField::Subject,
            AppointmentField::Attendant => AppointmentField::Client,
            AppointmentField::Schedule => AppointmentField::Attendant,
            AppointmentField::Subject => AppointmentField::Schedule,
        };
    }

    /// Left/Right on a picker cycles through its options.
    fn cycle(&mut self, forward: bool) {
        let (index, len) = match self.current_field {
            AppointmentField::Client => (&mut self.client_index, self.clients.len()),
            AppointmentField::Attendant => (&mut self.attendant_index, self.attendants.len()),
            _ => return,
        };
        if len == 0 {
            return;
        }
        *index = if forward { (*index + 1) % len } else { (*index + len - 1) % len };
    }

    pub fn is_valid(&self) -> bool {
        self.selected_client().is_some()
            && self.selected_attendant().is_some()
            && !self.subject.trim().is_empty()
    }

    pub fn to_request(&self) -> Option<NewAppointment> {
        if !self.is_valid() {
            return None;
        }
        Some(NewAppointment {
            client_id: self.selected_client()?.id,
            attendant_id: self.selected_attendant()?.id,
            date: self.schedule.date(),
            time: self.schedule.time(),
            subject: self.subject.trim().to_string(),
            status: None,
        })
    }
}

pub fn render_appointment_wizard<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    state: &mut AppointmentWizardState,
    palette: &Palette,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let title = Paragraph::new("Novo agendamento")
        .style(Style::default().fg(palette.accent).bg(palette.bg))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let client = state
        .selected_client()
        .map(|client| format!("< {} >", client.name))
        .unwrap_or_else(|| "nenhum cliente ativo".to_string());
    let attendant = state
        .selected_attendant()
        .map(|attendant| format!("< {} >", attendant.name))
        .unwrap_or_else(|| "nenhum atendente ativo".to_string());
    let subject = if state.editing {
        format!("{}|", state.subject)
    } else {
        state.subject.clone()
    };
    let values = [client, attendant, state.schedule.get_display_string(), subject];
    let labels = ["Cliente", "Atendente", "Data e hora", "Assunto"];

    let items: Vec<ListItem> = FIELDS
        .iter()
        .zip(labels.iter().zip(values))
        .map(|(field, (label, value))| {
            let current = *field == state.current_field;
            let label_style = if current { palette.selected() } else { Style::default() };
            let value_style = if current && state.is_editing() {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Spans::from(vec![
                Span::styled(format!("{label}: "), label_style),
                Span::styled(value, value_style),
            ]))
        })
        .collect();

    let form = List::new(items)
        .style(palette.base())
        .block(Block::default().borders(Borders::ALL).title("Detalhes"));
    f.render_widget(form, chunks[1]);

    let help_text = if state.schedule.editing {
        "Dígitos - Preencher | Esquerda/Direita - Parte | Enter - Confirmar"
    } else if state.editing {
        "Enter - Confirmar campo | Esc - Parar edição"
    } else {
        "Esquerda/Direita - Escolher | Enter - Editar | Cima/Baixo - Navegar | S - Salvar | Esc - Cancelar"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(palette.muted).bg(palette.bg))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

pub fn handle_input(state: &mut AppointmentWizardState) -> Result<Option<AppointmentWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key));
    }
    Ok(None)
}

fn handle_key(state: &mut AppointmentWizardState, key: KeyEvent) -> Option<AppointmentWizardAction> {
    if state.schedule.editing {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => state.schedule.toggle_editing(),
            code => state.schedule.handle_input(code),
        }
        return None;
    }

    if state.editing {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => state.editing = false,
            KeyCode::Char(c) => state.subject.push(c),
            KeyCode::Backspace => {
                state.subject.pop();
            }
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Esc => return Some(AppointmentWizardAction::Cancel),
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up => state.previous_field(),
        KeyCode::Down => state.next_field(),
        KeyCode::Left => state.cycle(false),
        KeyCode::Right => state.cycle(true),
        KeyCode::Char('s') => return state.to_request().map(AppointmentWizardAction::Save),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use crossterm::event::KeyModifiers;
    use uuid::Uuid;

    fn client(name: &str) -> Client {
        Client {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: "1".into(),
            email: None,
            notes: None,
            active: true,
            company_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn attendant(name: &str) -> Attendant {
        Attendant {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: "2".into(),
            email: None,
            active: true,
        }
    }

    fn press(state: &mut AppointmentWizardState, code: KeyCode) -> Option<AppointmentWizardAction> {
        handle_key(state, KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn slot() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 20)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn builds_request_from_pickers_schedule_and_subject() {
        let clients = vec![client("Ana"), client("Bia")];
        let attendants = vec![attendant("Bruno"), attendant("Carla")];
        let (bia, carla) = (clients[1].id, attendants[1].id);
        let mut state = AppointmentWizardState::with_slot(clients, attendants, slot());

        press(&mut state, KeyCode::Left);
        press(&mut state, KeyCode::Down);
        press(&mut state, KeyCode::Right);
        press(&mut state, KeyCode::Down);
        press(&mut state, KeyCode::Enter);
        for c in "21".chars() {
            press(&mut state, KeyCode::Char(c));
        }
        press(&mut state, KeyCode::Enter);
        press(&mut state, KeyCode::Down);
        press(&mut state, KeyCode::Enter);
        for c in "Retorno".chars() {
            press(&mut state, KeyCode::Char(c));
        }
        press(&mut state, KeyCode::Enter);

        let Some(AppointmentWizardAction::Save(request)) = press(&mut state, KeyCode::Char('s')) else {
            panic!("expected save");
        };
        assert_eq!(request.client_id, bia);
        assert_eq!(request.attendant_id, carla);
        assert_eq!(request.date, NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
        assert_eq!(request.time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(request.subject, "Retorno");
        assert_eq!(request.status, None);
    }

    #[test]
    fn cannot_save_without_choices() {
        let mut state = AppointmentWizardState::with_slot(Vec::new(), vec![attendant("Bruno")], slot());
        state.subject = "Consulta".into();

        assert_eq!(press(&mut state, KeyCode::Right), None);
        assert_eq!(press(&mut state, KeyCode::Char('s')), None);
        assert_eq!(press(&mut state, KeyCode::Esc), Some(AppointmentWizardAction::Cancel));
    }

    #[test]
    fn default_slot_is_on_the_hour() {
        let slot = default_slot();
        assert_eq!(slot.minute(), 0);
        assert_eq!(slot.second(), 0);
    }
}
