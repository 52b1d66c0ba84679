use thiserror::Error;

use crate::db::BackendError;

/// Failures surfaced by the data-access stores.
///
/// The `Display` text is what the screens show to the user, so the
/// domain variants carry Portuguese messages.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro ao identificar sua empresa")]
    CompanyLookup(#[source] BackendError),

    #[error("Cliente não encontrado")]
    ClientNotFound,

    #[error("Atendente não encontrado")]
    AttendantNotFound,

    #[error("Erro ao verificar agendamentos do cliente")]
    PendingCheck(#[source] BackendError),

    #[error(
        "Não é possível excluir este cliente. Existem {0} agendamento(s) pendente(s) associado(s) a ele."
    )]
    PendingAppointments(usize),

    #[error("Erro ao deletar cliente: {0}")]
    ClientDelete(#[source] BackendError),

    #[error("Estado de autenticação indisponível")]
    AuthUnavailable,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_message_carries_count() {
        let err = AppError::PendingAppointments(2);
        assert_eq!(
            err.to_string(),
            "Não é possível excluir este cliente. Existem 2 agendamento(s) pendente(s) associado(s) a ele."
        );
    }

    #[test]
    fn backend_errors_pass_through_unchanged() {
        let err: AppError = BackendError::Api {
            status: 409,
            code: Some("23505".into()),
            message: "duplicate key value".into(),
        }
        .into();
        assert_eq!(err.to_string(), "duplicate key value");
    }

    #[test]
    fn delete_failure_is_prefixed() {
        let err = AppError::ClientDelete(BackendError::NotFound);
        assert!(err.to_string().starts_with("Erro ao deletar cliente: "));
    }
}
