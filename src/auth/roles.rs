use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::riders::RiderStore;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Rider,
    Client,
}

/// Source of the admin-privilege predicate.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn is_admin(&self, user_id: Uuid) -> Result<bool, AppError>;
}

/// Admin list loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticAdminDirectory {
    admins: HashSet<Uuid>,
}

impl StaticAdminDirectory {
    pub fn new(admins: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AdminDirectory for StaticAdminDirectory {
    async fn is_admin(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.admins.contains(&user_id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleResolution {
    pub user_id: Uuid,
    pub role: Role,
    pub rider_id: Option<Uuid>,
    pub diagnostic: Option<String>,
}

/// Admin check bounded by `timeout`. Times out or errors to "not admin"; the
/// error case also carries a diagnostic for the caller to show.
pub async fn check_admin(
    admins: &dyn AdminDirectory,
    user_id: Uuid,
    timeout: Duration,
) -> (bool, Option<String>) {
    match tokio::time::timeout(timeout, admins.is_admin(user_id)).await {
        Ok(Ok(is_admin)) => (is_admin, None),
        Ok(Err(err)) => {
            warn!(user_id = %user_id, error = %err, "admin check failed");
            (false, Some("could not verify admin access".to_string()))
        }
        Err(_) => {
            warn!(user_id = %user_id, timeout_ms = timeout.as_millis() as u64, "admin check timed out");
            (false, None)
        }
    }
}

pub async fn resolve_role(
    admins: &dyn AdminDirectory,
    riders: &RiderStore,
    user_id: Uuid,
    timeout: Duration,
) -> RoleResolution {
    let (is_admin, diagnostic) = check_admin(admins, user_id, timeout).await;
    let rider_id = riders.find_by_user(&user_id).map(|rider| rider.id);

    let role = if is_admin {
        Role::Admin
    } else if rider_id.is_some() {
        Role::Rider
    } else {
        Role::Client
    };

    RoleResolution {
        user_id,
        role,
        rider_id,
        diagnostic,
    }
}
