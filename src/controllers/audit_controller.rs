use std::sync::Arc;

use futures::stream::BoxStream;

use crate::dto::audit_dto::AuditListQuery;
use crate::models::audit_log::{AuditLogEntry, AuditPage};
use crate::models::auth::Principal;
use crate::services::authorization_service::{Action, AuthorizationService, ResourceType, Target};
use crate::services::AuditRecorder;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub struct AuditController {
    recorder: Arc<AuditRecorder>,
}

fn audit_trail() -> Target {
    Target::collection(ResourceType::AuditLog)
}

impl AuditController {
    pub fn new(state: &AppState) -> Self {
        Self {
            recorder: Arc::clone(&state.recorder),
        }
    }

    pub async fn list(&self, principal: &Principal, query: AuditListQuery) -> AppResult<AuditPage> {
        AuthorizationService::authorize(Some(principal), Action::Read, &audit_trail())?;
        let filters = query.filters()?;
        self.recorder
            .query(
                filters,
                query.page.unwrap_or(1),
                query.per_page.unwrap_or(AuditListQuery::DEFAULT_PER_PAGE),
            )
            .await
    }

    pub fn export(
        &self,
        principal: &Principal,
        query: AuditListQuery,
    ) -> AppResult<BoxStream<'static, AppResult<AuditLogEntry>>> {
        AuthorizationService::authorize(Some(principal), Action::Read, &audit_trail())?;
        Ok(self.recorder.stream(query.filters()?))
    }
}
