mod appointment;
mod attendant;
mod client;
mod company;
mod session;

pub use appointment::{
    Appointment, AppointmentPatch, NewAppointment, NewAppointmentRow, PartySummary,
    KNOWN_STATUSES, STATUS_PENDING,
};
pub use attendant::Attendant;
pub use client::{Client, ClientInput, ClientPatch, Contact, NewClientRow};
pub use company::{Company, NewCompany, NewUserProfile, ROLE_ADMIN};
pub use session::{AuthChange, Session, SignUpOutcome, SignUpRequest, User};
