use feedback_core::SensorKind;
use serde::Deserialize;

/// Answer to a privilege check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Allow,
    Deny,
    /// The user has not decided yet.
    Ask,
}

/// Platform privilege guarding a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    HealthInfo,
    Location,
}

impl Privilege {
    /// Privilege required before acquiring `kind`, if any.
    pub fn for_kind(kind: SensorKind) -> Option<Self> {
        match kind {
            SensorKind::Health | SensorKind::Activity => Some(Privilege::HealthInfo),
            SensorKind::Location => Some(Privilege::Location),
        }
    }
}

/// Tri-state privilege check consulted before first sensor acquisition.
pub trait PermissionChecker: Send + Sync {
    fn check(&self, privilege: Privilege) -> PermissionStatus;

    /// Record the user's answer to a pending request. Returns false if the
    /// privilege was already decided.
    fn answer(&mut self, privilege: Privilege, allowed: bool) -> bool;
}

/// Answers taken from configuration. Pending ones can be answered once at
/// runtime.
#[derive(Debug, Clone)]
pub struct StaticPermissions {
    pub health: PermissionStatus,
    pub location: PermissionStatus,
}

impl StaticPermissions {
    pub fn allow_all() -> Self {
        Self {
            health: PermissionStatus::Allow,
            location: PermissionStatus::Allow,
        }
    }
}

impl StaticPermissions {
    fn status_mut(&mut self, privilege: Privilege) -> &mut PermissionStatus {
        match privilege {
            Privilege::HealthInfo => &mut self.health,
            Privilege::Location => &mut self.location,
        }
    }
}

impl PermissionChecker for StaticPermissions {
    fn check(&self, privilege: Privilege) -> PermissionStatus {
        match privilege {
            Privilege::HealthInfo => self.health,
            Privilege::Location => self.location,
        }
    }

    fn answer(&mut self, privilege: Privilege, allowed: bool) -> bool {
        let status = self.status_mut(privilege);
        if *status != PermissionStatus::Ask {
            return false;
        }
        *status = if allowed {
            PermissionStatus::Allow
        } else {
            PermissionStatus::Deny
        };
        true
    }
}

impl From<&crate::config::PermissionsConfig> for StaticPermissions {
    fn from(config: &crate::config::PermissionsConfig) -> Self {
        Self {
            health: config.health,
            location: config.location,
        }
    }
}
