use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::audit_log::{AuditQuery, EntityType};
use crate::utils::errors::{bad_request_error, AppResult};

// Query de GET /audit y /audit/export
#[derive(Debug, Default, Deserialize)]
pub struct AuditListQuery {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub actor: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl AuditListQuery {
    pub const DEFAULT_PER_PAGE: i64 = 50;

    pub fn filters(&self) -> AppResult<AuditQuery> {
        let entity_type = match self.entity_type.as_deref() {
            Some(raw) => Some(
                EntityType::parse(raw).ok_or_else(|| bad_request_error(&format!("Unknown entity type '{}'", raw)))?,
            ),
            None => None,
        };
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(bad_request_error("'from' must not be after 'to'"));
            }
        }
        Ok(AuditQuery {
            entity_type,
            entity_id: self.entity_id,
            actor_id: self.actor,
            from: self.from,
            to: self.to,
            ..AuditQuery::default()
        })
    }
}
