use uuid::Uuid;

use crate::models::auth::Principal;
use crate::models::request::{RequestKind, ServiceRequest};
use crate::models::user::UserRole;
use crate::models::vehicle::Vehicle;
use crate::utils::errors::{forbidden_error, AppError, AppResult};

/// Acciones sujetas a autorización
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    UpdateStatus,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::UpdateStatus => "update-status",
            Action::Delete => "delete",
        }
    }
}

/// Clases de recurso protegidas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    User,
    Vehicle,
    FuelRequest,
    MaintenanceRequest,
    ConditionUpdate,
    AuditLog,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::User => "User",
            ResourceType::Vehicle => "Vehicle",
            ResourceType::FuelRequest => "FuelRequest",
            ResourceType::MaintenanceRequest => "MaintenanceRequest",
            ResourceType::ConditionUpdate => "ConditionUpdate",
            ResourceType::AuditLog => "AuditLogEntry",
        }
    }

    fn is_request(&self) -> bool {
        matches!(
            self,
            ResourceType::FuelRequest | ResourceType::MaintenanceRequest | ResourceType::ConditionUpdate
        )
    }
}

impl From<RequestKind> for ResourceType {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Fuel => ResourceType::FuelRequest,
            RequestKind::Maintenance => ResourceType::MaintenanceRequest,
            RequestKind::Condition => ResourceType::ConditionUpdate,
        }
    }
}

/// Recurso sobre el que se decide: la clase y, si se conoce, su propietario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub resource: ResourceType,
    pub owner_id: Option<Uuid>,
}

impl Target {
    pub fn collection(resource: ResourceType) -> Self {
        Self { resource, owner_id: None }
    }

    pub fn owned(resource: ResourceType, owner_id: Uuid) -> Self {
        Self {
            resource,
            owner_id: Some(owner_id),
        }
    }

    pub fn request(request: &ServiceRequest) -> Self {
        Self::owned(request.kind().into(), request.owner_id())
    }

    pub fn vehicle(vehicle: &Vehicle) -> Self {
        Self::owned(ResourceType::Vehicle, vehicle.owner_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No hay principal: la capa HTTP responde 401
    Unauthenticated,
    /// Principal válido sin permiso: la capa HTTP responde 403
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(Denial),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// Alcance de lectura de un listado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    All,
    Own(Uuid),
}

impl ReadScope {
    pub fn owner_filter(&self) -> Option<Uuid> {
        match self {
            ReadScope::All => None,
            ReadScope::Own(id) => Some(*id),
        }
    }
}

/// Servicio de autorización: función pura sobre (rol, acción, recurso, propiedad)
pub struct AuthorizationService;

impl AuthorizationService {
    /// Tabla de permisos por rol
    fn role_allows(role: UserRole, action: Action, resource: ResourceType, owns: bool) -> bool {
        use Action::*;
        use ResourceType as R;

        match role {
            // Acceso total salvo mutar la auditoría, que sólo escribe el motor de ciclo de vida
            UserRole::Admin => resource != R::AuditLog || action == Read,
            UserRole::Manager => match action {
                Read => resource == R::Vehicle || resource.is_request(),
                UpdateStatus => resource.is_request(),
                _ => false,
            },
            UserRole::Owner => match action {
                Create => resource == R::Vehicle || resource.is_request(),
                Read => (resource == R::Vehicle || resource.is_request()) && owns,
                Update | Delete => resource == R::Vehicle && owns,
                UpdateStatus => false,
            },
            UserRole::Auditor => {
                action == Read && (resource == R::AuditLog || resource == R::Vehicle || resource.is_request())
            }
        }
    }

    /// `canPerform(principal, action, target)`: nunca falla, devuelve la decisión
    pub fn can_perform(principal: Option<&Principal>, action: Action, target: &Target) -> AccessDecision {
        let Some(principal) = principal else {
            return AccessDecision::Deny(Denial::Unauthenticated);
        };
        let owns = target.owner_id.map_or(false, |owner| principal.owns(owner));
        if Self::role_allows(principal.role, action, target.resource, owns) {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(Denial::Forbidden)
        }
    }

    /// Convierte la decisión en error para la capa que la invoca
    pub fn authorize(principal: Option<&Principal>, action: Action, target: &Target) -> AppResult<()> {
        match Self::can_perform(principal, action, target) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(Denial::Unauthenticated) => {
                Err(AppError::Unauthenticated("Authentication required".to_string()))
            }
            AccessDecision::Deny(Denial::Forbidden) => {
                let role = principal.map_or("anonymous", |p| p.role.as_str());
                Err(forbidden_error(
                    &format!("{} {}", action.as_str(), target.resource.as_str()),
                    &format!("role '{}' is not allowed", role),
                ))
            }
        }
    }

    /// Alcance para listados: todo, o sólo lo propio si el rol lee por propiedad
    pub fn read_scope(principal: &Principal, resource: ResourceType) -> AppResult<ReadScope> {
        let everything = Target::collection(resource);
        if Self::can_perform(Some(principal), Action::Read, &everything).is_allowed() {
            return Ok(ReadScope::All);
        }
        let own = Target::owned(resource, principal.user_id);
        Self::authorize(Some(principal), Action::Read, &own)?;
        Ok(ReadScope::Own(principal.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: UserRole) -> Principal {
        Principal::new(Uuid::new_v4(), format!("{}@fleet.test", role.as_str()), role)
    }

    const REQUESTS: [ResourceType; 3] = [
        ResourceType::FuelRequest,
        ResourceType::MaintenanceRequest,
        ResourceType::ConditionUpdate,
    ];

    #[test]
    fn test_missing_principal_is_unauthenticated() {
        let decision = AuthorizationService::can_perform(None, Action::Read, &Target::collection(ResourceType::Vehicle));
        assert_eq!(decision, AccessDecision::Deny(Denial::Unauthenticated));
        let err = AuthorizationService::authorize(None, Action::Read, &Target::collection(ResourceType::Vehicle));
        assert!(matches!(err, Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_only_manager_and_admin_update_request_status() {
        let owner = principal(UserRole::Owner);
        for resource in REQUESTS {
            let own = Target::owned(resource, owner.user_id);
            for role in [UserRole::Admin, UserRole::Manager] {
                let p = principal(role);
                assert!(AuthorizationService::can_perform(Some(&p), Action::UpdateStatus, &own).is_allowed());
            }
            for p in [owner.clone(), principal(UserRole::Auditor)] {
                assert_eq!(
                    AuthorizationService::can_perform(Some(&p), Action::UpdateStatus, &own),
                    AccessDecision::Deny(Denial::Forbidden)
                );
            }
        }
    }

    #[test]
    fn test_owner_reads_only_own_requests_and_vehicles() {
        let owner = principal(UserRole::Owner);
        let stranger = Uuid::new_v4();
        for resource in REQUESTS.into_iter().chain([ResourceType::Vehicle]) {
            assert!(AuthorizationService::can_perform(
                Some(&owner),
                Action::Read,
                &Target::owned(resource, owner.user_id)
            )
            .is_allowed());
            assert!(!AuthorizationService::can_perform(
                Some(&owner),
                Action::Read,
                &Target::owned(resource, stranger)
            )
            .is_allowed());
            assert_eq!(
                AuthorizationService::read_scope(&owner, resource).unwrap(),
                ReadScope::Own(owner.user_id)
            );
        }
    }

    #[test]
    fn test_owner_creates_but_manager_does_not() {
        let owner = principal(UserRole::Owner);
        let manager = principal(UserRole::Manager);
        for resource in REQUESTS {
            let target = Target::collection(resource);
            assert!(AuthorizationService::can_perform(Some(&owner), Action::Create, &target).is_allowed());
            assert!(!AuthorizationService::can_perform(Some(&manager), Action::Create, &target).is_allowed());
        }
    }

    #[test]
    fn test_auditor_is_read_only() {
        let auditor = principal(UserRole::Auditor);
        for resource in REQUESTS.into_iter().chain([ResourceType::Vehicle, ResourceType::AuditLog]) {
            let target = Target::collection(resource);
            assert!(AuthorizationService::can_perform(Some(&auditor), Action::Read, &target).is_allowed());
            for action in [Action::Create, Action::Update, Action::UpdateStatus, Action::Delete] {
                assert!(!AuthorizationService::can_perform(Some(&auditor), action, &target).is_allowed());
            }
        }
        assert!(AuthorizationService::read_scope(&auditor, ResourceType::User).is_err());
    }

    #[test]
    fn test_user_management_is_admin_only() {
        let target = Target::collection(ResourceType::User);
        let admin = principal(UserRole::Admin);
        for action in [Action::Create, Action::Read, Action::UpdateStatus, Action::Delete] {
            assert!(AuthorizationService::can_perform(Some(&admin), action, &target).is_allowed());
        }
        for role in [UserRole::Manager, UserRole::Owner, UserRole::Auditor] {
            let p = principal(role);
            let err = AuthorizationService::authorize(Some(&p), Action::Create, &target);
            assert!(matches!(err, Err(AppError::Forbidden(_))));
        }
    }

    #[test]
    fn test_audit_log_cannot_be_mutated_by_anyone() {
        let target = Target::collection(ResourceType::AuditLog);
        for role in [UserRole::Admin, UserRole::Manager, UserRole::Owner, UserRole::Auditor] {
            let p = principal(role);
            for action in [Action::Create, Action::Update, Action::UpdateStatus, Action::Delete] {
                assert!(!AuthorizationService::can_perform(Some(&p), action, &target).is_allowed());
            }
        }
        let manager = principal(UserRole::Manager);
        assert!(AuthorizationService::read_scope(&manager, ResourceType::AuditLog).is_err());
    }

    #[test]
    fn test_owner_manages_only_own_vehicle() {
        let owner = principal(UserRole::Owner);
        let mine = Target::owned(ResourceType::Vehicle, owner.user_id);
        let theirs = Target::owned(ResourceType::Vehicle, Uuid::new_v4());
        for action in [Action::Update, Action::Delete] {
            assert!(AuthorizationService::can_perform(Some(&owner), action, &mine).is_allowed());
            assert!(!AuthorizationService::can_perform(Some(&owner), action, &theirs).is_allowed());
        }
        let manager = principal(UserRole::Manager);
        assert!(!AuthorizationService::can_perform(Some(&manager), Action::Update, &theirs).is_allowed());
    }
}
