use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::dto::common_dto::ListResponse;
use crate::dto::request_dto::{parse_create_body, RequestListQuery, TransitionRequestBody};
use crate::models::auth::Principal;
use crate::models::request::{RequestKind, ServiceRequest};
use crate::repositories::FleetStore;
use crate::services::authorization_service::{Action, AuthorizationService, Target};
use crate::services::LifecycleEngine;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppResult};

pub struct RequestController {
    store: Arc<dyn FleetStore>,
    lifecycle: Arc<LifecycleEngine>,
}

impl RequestController {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            lifecycle: Arc::clone(&state.lifecycle),
        }
    }

    pub async fn create(
        &self,
        principal: &Principal,
        kind: RequestKind,
        body: serde_json::Value,
    ) -> AppResult<ServiceRequest> {
        // La autorización de rol va antes de validar el cuerpo
        AuthorizationService::authorize(Some(principal), Action::Create, &Target::collection(kind.into()))?;
        let request = parse_create_body(kind, body, principal.user_id, Utc::now())?;
        self.lifecycle.submit(principal, request).await
    }

    pub async fn get(&self, principal: &Principal, kind: RequestKind, id: Uuid) -> AppResult<ServiceRequest> {
        let request = self
            .store
            .get_request(kind, id)
            .await?
            .ok_or_else(|| not_found_error(kind.entity_type(), id))?;
        AuthorizationService::authorize(Some(principal), Action::Read, &Target::request(&request))?;
        Ok(request)
    }

    /// Owners sólo ven lo suyo; el resto de roles con lectura ven todo
    pub async fn list(
        &self,
        principal: &Principal,
        kind: RequestKind,
        query: RequestListQuery,
    ) -> AppResult<ListResponse<ServiceRequest>> {
        let scope = AuthorizationService::read_scope(principal, kind.into())?;
        let mut filters = query.into_filters()?;
        if let Some(owner) = scope.owner_filter() {
            filters.requester_id = Some(owner);
        }
        let items = self.store.list_requests(kind, &filters).await?;
        Ok(ListResponse {
            items,
            limit: filters.limit,
            offset: filters.offset,
        })
    }

    pub async fn transition(
        &self,
        principal: &Principal,
        kind: RequestKind,
        id: Uuid,
        body: TransitionRequestBody,
    ) -> AppResult<ServiceRequest> {
        let (expected, to) = body.statuses()?;
        self.lifecycle.transition(principal, kind, id, expected, to).await
    }
}
