pub mod appointments;
pub mod auth;
pub mod clients;
pub mod company;
pub mod theme;

pub use appointments::AppointmentStore;
pub use auth::AuthState;
pub use clients::ClientStore;
pub use company::CompanyStore;
pub use theme::{RootClasses, ThemeState};
