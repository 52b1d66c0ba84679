use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use uuid::Uuid;

use crate::models::{Appointment, PartySummary, KNOWN_STATUSES};
use crate::ui::components::{render_confirmation, Palette};

pub struct AppointmentsState {
    appointments: Vec<Appointment>,
    list_state: ListState,
    show_delete_confirmation: bool,
}

impl AppointmentsState {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        let mut list_state = ListState::default();
        if !appointments.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            appointments,
            list_state,
            show_delete_confirmation: false,
        }
    }

    pub fn replace(&mut self, appointments: Vec<Appointment>) {
        let selected = self.list_state.selected().unwrap_or(0);
        self.appointments = appointments;
        self.list_state.select(match self.appointments.len() {
            0 => None,
            len => Some(selected.min(len - 1)),
        });
    }

    pub fn next(&mut self) {
        if self.appointments.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.appointments.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.appointments.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.appointments.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn selected_appointment(&self) -> Option<&Appointment> {
        self.list_state.selected().and_then(|i| self.appointments.get(i))
    }
}

#[derive(Debug, PartialEq)]
pub enum AppointmentAction {
    Quit,
    Refresh,
    NewAppointment,
    SetStatus(Uuid, String),
    DeleteAppointment(Uuid),
    OpenClients,
    ToggleTheme,
    SignOut,
}

/// Status that follows `current` in the fixed cycle. Unknown statuses
/// restart the cycle.
pub fn next_status(current: &str) -> &'static str {
    match KNOWN_STATUSES.iter().position(|status| *status == current) {
        Some(i) => KNOWN_STATUSES[(i + 1) % KNOWN_STATUSES.len()],
        None => KNOWN_STATUSES[0],
    }
}

/// Name from the joined record when the query embedded it, else the copy
/// stored on the appointment at booking time.
fn party_name<'a>(embedded: Option<&'a PartySummary>, booked: &'a str) -> &'a str {
    embedded.map_or(booked, |party| party.name.as_str())
}

pub fn render_appointments<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    state: &mut AppointmentsState,
    palette: &Palette,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let items: Vec<ListItem> = state
        .appointments
        .iter()
        .map(|appointment| {
            let status_style = if appointment.is_pending() {
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.muted)
            };
            ListItem::new(Spans::from(vec![
                Span::raw(format!(
                    "{} {}  ",
                    appointment.date.format("%d/%m/%Y"),
                    appointment.time.format("%H:%M")
                )),
                Span::raw(format!(
                    "{:<22}",
                    party_name(appointment.client.as_ref(), &appointment.client_name)
                )),
                Span::raw(format!(
                    "{:<18}",
                    party_name(appointment.attendant.as_ref(), &appointment.attendant_name)
                )),
                Span::raw(format!("{:<26}", appointment.subject)),
                Span::styled(appointment.status.clone(), status_style),
            ]))
        })
        .collect();

    let title = format!("Agendamentos ({})", state.appointments.len());
    let list = List::new(items)
        .style(palette.base())
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(palette.highlight());

    f.render_stateful_widget(list, chunks[0], &mut state.list_state);

    let buttons_text = if state.selected_appointment().is_some() {
        "<N> Novo | <S> Status | <D> Excluir | <R> Atualizar | <C> Clientes | <T> Tema | <O> Sair da conta | <Q> Fechar"
    } else {
        "<N> Novo | <R> Atualizar | <C> Clientes | <T> Tema | <O> Sair da conta | <Q> Fechar"
    };
    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(palette.muted).bg(palette.bg));
    f.render_widget(buttons, chunks[1]);

    if state.show_delete_confirmation {
        if let Some(appointment) = state.selected_appointment() {
            let question = format!(
                "Excluir o agendamento de {} em {}?",
                party_name(appointment.client.as_ref(), &appointment.client_name),
                appointment.date.format("%d/%m/%Y")
            );
            render_confirmation(f, area, "Confirmar exclusão", &[question.as_str()], palette);
        }
    }
}

pub fn handle_input(state: &mut AppointmentsState) -> Result<Option<AppointmentAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key));
    }
    Ok(None)
}

fn handle_key(state: &mut AppointmentsState, key: KeyEvent) -> Option<AppointmentAction> {
    if state.show_delete_confirmation {
        match key.code {
            KeyCode::Char('s') | KeyCode::Char('y') => {
                state.show_delete_confirmation = false;
                return state
                    .selected_appointment()
                    .map(|appointment| AppointmentAction::DeleteAppointment(appointment.id));
            }
            KeyCode::Char('n') | KeyCode::Esc => state.show_delete_confirmation = false,
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') => return Some(AppointmentAction::Quit),
        KeyCode::Char('r') => return Some(AppointmentAction::Refresh),
        KeyCode::Char('n') => return Some(AppointmentAction::NewAppointment),
        KeyCode::Char('c') => return Some(AppointmentAction::OpenClients),
        KeyCode::Char('t') => return Some(AppointmentAction::ToggleTheme),
        KeyCode::Char('o') => return Some(AppointmentAction::SignOut),
        KeyCode::Char('s') => {
            return state.selected_appointment().map(|appointment| {
                AppointmentAction::SetStatus(appointment.id, next_status(&appointment.status).to_string())
            });
        }
        KeyCode::Char('d') => {
            if state.selected_appointment().is_some() {
                state.show_delete_confirmation = true;
            }
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use crossterm::event::KeyModifiers;

    fn appointment(status: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_name: "Ana".into(),
            client_phone: "1".into(),
            attendant_id: Uuid::new_v4(),
            attendant_name: "Bruno".into(),
            attendant_phone: "2".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            subject: "Consulta".into(),
            status: status.into(),
            company_id: None,
            client: None,
            attendant: None,
        }
    }

    fn press(state: &mut AppointmentsState, code: KeyCode) -> Option<AppointmentAction> {
        handle_key(state, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn status_cycle_wraps_and_restarts_unknown() {
        assert_eq!(next_status("pendente"), "confirmado");
        assert_eq!(next_status("cancelado"), "pendente");
        assert_eq!(next_status("remarcado"), "pendente");
    }

    #[test]
    fn joined_name_wins_over_booked_copy() {
        let mut row = appointment("pendente");
        assert_eq!(party_name(row.client.as_ref(), &row.client_name), "Ana");

        row.client = Some(PartySummary {
            id: row.client_id,
            name: "Ana Paula".into(),
            phone: "1".into(),
            email: None,
        });
        assert_eq!(party_name(row.client.as_ref(), &row.client_name), "Ana Paula");
    }

    #[test]
    fn status_key_targets_selected_row() {
        let rows = vec![appointment("pendente"), appointment("concluido")];
        let second = rows[1].id;
        let mut state = AppointmentsState::new(rows);

        press(&mut state, KeyCode::Down);
        assert_eq!(
            press(&mut state, KeyCode::Char('s')),
            Some(AppointmentAction::SetStatus(second, "cancelado".into()))
        );
    }

    #[test]
    fn delete_confirmation_can_be_dismissed() {
        let rows = vec![appointment("pendente")];
        let id = rows[0].id;
        let mut state = AppointmentsState::new(rows);

        press(&mut state, KeyCode::Char('d'));
        assert_eq!(press(&mut state, KeyCode::Char('n')), None);
        assert_eq!(press(&mut state, KeyCode::Char('q')), Some(AppointmentAction::Quit));

        press(&mut state, KeyCode::Char('d'));
        assert_eq!(press(&mut state, KeyCode::Char('s')), Some(AppointmentAction::DeleteAppointment(id)));
    }
}
