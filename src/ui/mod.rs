pub mod appointment_wizard;
pub mod appointments;
pub mod client_wizard;
pub mod clients;
pub mod components;
pub mod login;
