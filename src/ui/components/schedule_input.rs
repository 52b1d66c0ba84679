use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use crossterm::event::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulePart {
    Day,
    Month,
    Year,
    Hour,
    Minute,
}

impl SchedulePart {
    fn width(&self) -> usize {
        match self {
            SchedulePart::Year => 4,
            _ => 2,
        }
    }

    fn placeholder(&self) -> &'static str {
        match self {
            SchedulePart::Day => "[DD]",
            SchedulePart::Month => "[MM]",
            SchedulePart::Year => "[AAAA]",
            SchedulePart::Hour => "[hh]",
            SchedulePart::Minute => "[mm]",
        }
    }
}

/// Date and time entry for a booking, typed one part at a time
/// (`dd/mm/aaaa hh:mm`). A part only changes once all its digits are typed
/// and the result is a real date or time.
pub struct ScheduleInputState {
    pub value: NaiveDateTime,
    pub editing: bool,
    pub part: SchedulePart,
    pub buffer: String,
}

impl ScheduleInputState {
    pub fn new(value: NaiveDateTime) -> Self {
        Self {
            value,
            editing: false,
            part: SchedulePart::Day,
            buffer: String::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.value.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.value.time()
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.part = SchedulePart::Day;
        }
        self.buffer.clear();
    }

    pub fn next_part(&mut self) {
        self.part = match self.part {
            SchedulePart::Day => SchedulePart::Month,
            SchedulePart::Month => SchedulePart::Year,
            SchedulePart::Year => SchedulePart::Hour,
            SchedulePart::Hour => SchedulePart::Minute,
            SchedulePart::Minute => SchedulePart::Day,
        };
        self.buffer.clear();
    }

    pub fn previous_part(&mut self) {
        self.part = match self.part {
            SchedulePart::Day => SchedulePart::Minute,
            SchedulePart::Month => SchedulePart::Day,
            SchedulePart::Year => SchedulePart::Month,
            SchedulePart::Hour => SchedulePart::Year,
            SchedulePart::Minute => SchedulePart::Hour,
        };
        self.buffer.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.buffer.push(c);
                if self.buffer.len() == self.part.width() {
                    if let Ok(number) = self.buffer.parse::<u32>() {
                        if let Some(value) = self.with_part(number) {
                            self.value = value;
                        }
                    }
                    self.buffer.clear();
                }
            }
            KeyCode::Backspace => {
                self.buffer.pop();
            }
            KeyCode::Right => self.next_part(),
            KeyCode::Left => self.previous_part(),
            _ => {}
        }
    }

    fn with_part(&self, number: u32) -> Option<NaiveDateTime> {
        let (date, time) = (self.value.date(), self.value.time());
        match self.part {
            SchedulePart::Day => date.with_day(number).map(|date| date.and_time(time)),
            SchedulePart::Month => date.with_month(number).map(|date| date.and_time(time)),
            SchedulePart::Year => {
                let year = i32::try_from(number).ok().filter(|year| (1900..=2100).contains(year))?;
                date.with_year(year).map(|date| date.and_time(time))
            }
            SchedulePart::Hour => time.with_hour(number).map(|time| date.and_time(time)),
            SchedulePart::Minute => time.with_minute(number).map(|time| date.and_time(time)),
        }
    }

    pub fn get_display_string(&self) -> String {
        let parts = [
            (SchedulePart::Day, format!("{:02}", self.value.day())),
            (SchedulePart::Month, format!("{:02}", self.value.month())),
            (SchedulePart::Year, format!("{:04}", self.value.year())),
            (SchedulePart::Hour, format!("{:02}", self.value.hour())),
            (SchedulePart::Minute, format!("{:02}", self.value.minute())),
        ];
        let shown: Vec<String> = parts
            .into_iter()
            .map(|(part, text)| {
                if !self.editing || part != self.part {
                    text
                } else if self.buffer.is_empty() {
                    format!("{text}{}", part.placeholder())
                } else {
                    format!("{text}[{}]", self.buffer)
                }
            })
            .collect();

        format!("{}/{}/{} {}:{}", shown[0], shown[1], shown[2], shown[3], shown[4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ScheduleInputState {
        let value = NaiveDate::from_ymd_opt(2026, 10, 20)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut state = ScheduleInputState::new(value);
        state.toggle_editing();
        state
    }

    fn type_digits(state: &mut ScheduleInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_each_part_updates_value() {
        let mut state = input();
        type_digits(&mut state, "05");
        state.next_part();
        type_digits(&mut state, "11");
        state.handle_input(KeyCode::Right);
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "14");
        state.next_part();
        type_digits(&mut state, "30");

        assert_eq!(state.date(), NaiveDate::from_ymd_opt(2026, 11, 5).unwrap());
        assert_eq!(state.time(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
    }

    #[test]
    fn impossible_values_are_ignored() {
        let mut state = input();
        state.part = SchedulePart::Month;
        type_digits(&mut state, "02");
        state.part = SchedulePart::Day;
        type_digits(&mut state, "30");
        state.part = SchedulePart::Hour;
        type_digits(&mut state, "25");

        assert_eq!(state.date(), NaiveDate::from_ymd_opt(2026, 2, 20).unwrap());
        assert_eq!(state.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(state.buffer.is_empty());
    }

    #[test]
    fn display_marks_the_part_being_typed() {
        let mut state = input();
        assert_eq!(state.get_display_string(), "20[DD]/10/2026 09:00");

        state.handle_input(KeyCode::Char('1'));
        assert_eq!(state.get_display_string(), "20[1]/10/2026 09:00");

        state.toggle_editing();
        assert_eq!(state.get_display_string(), "20/10/2026 09:00");
    }
}
