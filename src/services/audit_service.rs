//! Audit Recorder
//!
//! Sella las entradas (id + marca de tiempo estrictamente creciente en el
//! proceso), las persiste y ofrece la lectura paginada, más reciente primero.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::models::audit_log::{AuditLogEntry, AuditPage, AuditQuery, NewAuditEntry};
use crate::repositories::FleetStore;
use crate::utils::errors::{bad_request_error, AppError, AppResult};

/// Reloj de auditoría con resolución de microsegundos (la de PostgreSQL)
#[derive(Debug)]
struct AuditClock {
    last: Mutex<DateTime<Utc>>,
}

impl AuditClock {
    fn new() -> Self {
        Self {
            last: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    fn now(&self) -> AppResult<DateTime<Utc>> {
        let mut last = self
            .last
            .lock()
            .map_err(|_| AppError::Internal("audit clock poisoned".to_string()))?;
        let mut now = Utc::now().trunc_subsecs(6);
        if now <= *last {
            now = *last + Duration::microseconds(1);
        }
        *last = now;
        Ok(now)
    }
}

pub struct AuditRecorder {
    store: Arc<dyn FleetStore>,
    clock: AuditClock,
    max_page_size: i64,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn FleetStore>, max_page_size: i64) -> Self {
        Self {
            store,
            clock: AuditClock::new(),
            max_page_size: max_page_size.max(1),
        }
    }

    /// Asigna id y marca de tiempo sin persistir (el motor lo escribe junto a la transición)
    pub fn stamp(&self, entry: NewAuditEntry) -> AppResult<AuditLogEntry> {
        Ok(entry.seal(self.clock.now()?))
    }

    /// `record(entityType, entityId, action, actor, timestamp)`
    pub async fn record(&self, entry: NewAuditEntry) -> AppResult<AuditLogEntry> {
        let sealed = self.stamp(entry)?;
        let stored = self.store.append_audit(&sealed).await.map_err(|e| match e {
            AppError::Dependency(msg) => AppError::Dependency(format!("audit recorder: {}", msg)),
            other => other,
        })?;
        tracing::debug!(
            "📝 Audit {} {} {} by {}",
            stored.entity_type.as_str(),
            stored.entity_id,
            stored.action,
            stored.actor_id
        );
        Ok(stored)
    }

    /// Página `page` (desde 1) de tamaño `per_page`, acotado a la configuración
    pub async fn query(&self, filters: AuditQuery, page: i64, per_page: i64) -> AppResult<AuditPage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, self.max_page_size);
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| bad_request_error("page is out of range"))?;
        let query = AuditQuery {
            limit: per_page,
            offset,
            ..filters
        };
        let (entries, total) = self.store.query_audit(&query).await?;
        let has_more = query.offset.saturating_add(entries.len() as i64) < total;
        Ok(AuditPage {
            entries,
            page,
            per_page,
            total,
            has_more,
        })
    }

    /// Secuencia perezosa de entradas, página a página. Se fija el límite
    /// superior `to` al empezar para que las inserciones concurrentes no
    /// desplacen los offsets.
    pub fn stream(&self, filters: AuditQuery) -> BoxStream<'static, AppResult<AuditLogEntry>> {
        let store = Arc::clone(&self.store);
        let page_size = self.max_page_size;
        let now = self.clock.now().unwrap_or_else(|_| Utc::now());
        let start = AuditQuery {
            to: Some(filters.to.map_or(now, |to| to.min(now))),
            limit: page_size,
            offset: 0,
            ..filters
        };

        stream::try_unfold(Some(start), move |cursor| next_page(Arc::clone(&store), cursor))
        .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, AppError>)))
        .try_flatten()
        .boxed()
    }
}

type Page = (Vec<AuditLogEntry>, Option<AuditQuery>);

/// Una página del cursor y el cursor siguiente (`None` al agotarse)
async fn next_page(store: Arc<dyn FleetStore>, cursor: Option<AuditQuery>) -> AppResult<Option<Page>> {
    let Some(query) = cursor else {
        return Ok(None);
    };
    let (entries, total) = store.query_audit(&query).await?;
    if entries.is_empty() {
        return Ok(None);
    }
    let fetched = query.offset.saturating_add(entries.len() as i64);
    let next = (fetched < total).then(|| AuditQuery {
        offset: fetched,
        ..query
    });
    Ok(Some((entries, next)))
}
