use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::{Backend, BackendError};

pub const DEFAULT_COMPANY_NAME: &str = "Sistema de Agendamentos";

/// Display name of the signed-in user's company.
pub struct CompanyStore {
    backend: Arc<dyn Backend>,
    name: Option<String>,
    is_loading: bool,
}

impl CompanyStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            name: None,
            is_loading: false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(DEFAULT_COMPANY_NAME)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// user → membership row → company. Any missing hop or failure falls
    /// back to [`DEFAULT_COMPANY_NAME`].
    pub async fn fetch_name(&mut self) -> &str {
        self.is_loading = true;
        let name = match self.lookup().await {
            Ok(Some(name)) if !name.is_empty() => name,
            Ok(_) => DEFAULT_COMPANY_NAME.to_string(),
            Err(err) => {
                warn!(error = %err, "company lookup failed");
                DEFAULT_COMPANY_NAME.to_string()
            }
        };
        self.name = Some(name);
        self.is_loading = false;
        self.display_name()
    }

    async fn lookup(&self) -> Result<Option<String>, BackendError> {
        let Some(user) = self.backend.get_user().await? else {
            debug!("no signed-in user");
            return Ok(None);
        };

        let Some(company_id) = self.backend.company_id_for_user(user.id).await? else {
            debug!(user = %user.id, "user has no company membership");
            return Ok(None);
        };

        let company = self.backend.get_company(company_id).await?;
        Ok(company.map(|company| company.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{Membership, MemoryBackend, Op};
    use crate::models::ROLE_ADMIN;

    async fn signed_in_member() -> (Arc<MemoryBackend>, CompanyStore) {
        let (backend, company_id) = MemoryBackend::with_company("Clínica Sorriso");
        let backend = Arc::new(backend);
        let session = backend.sign_in_with_password("ana@example.com", "secret").await.unwrap();
        backend.tables().memberships.push(Membership {
            user_id: session.user.id,
            company_id,
            name: "Ana".into(),
            role: ROLE_ADMIN.into(),
        });
        let store = CompanyStore::new(backend.clone());
        (backend, store)
    }

    #[tokio::test]
    async fn resolves_name_through_membership() {
        let (_backend, mut store) = signed_in_member().await;
        assert_eq!(store.fetch_name().await, "Clínica Sorriso");
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn falls_back_when_not_signed_in() {
        let (backend, _) = MemoryBackend::with_company("Clínica Sorriso");
        let mut store = CompanyStore::new(Arc::new(backend));
        assert_eq!(store.display_name(), DEFAULT_COMPANY_NAME);
        assert_eq!(store.fetch_name().await, DEFAULT_COMPANY_NAME);
    }

    #[tokio::test]
    async fn falls_back_when_membership_missing() {
        let (backend, mut store) = signed_in_member().await;
        backend.tables().memberships.clear();
        assert_eq!(store.fetch_name().await, DEFAULT_COMPANY_NAME);
    }

    #[tokio::test]
    async fn falls_back_when_company_missing_or_failing() {
        let (backend, mut store) = signed_in_member().await;
        backend.tables().companies.clear();
        assert_eq!(store.fetch_name().await, DEFAULT_COMPANY_NAME);

        let (backend, mut store) = signed_in_member().await;
        backend.fail(Op::GetCompany);
        assert_eq!(store.fetch_name().await, DEFAULT_COMPANY_NAME);
    }
}
