//! Manager eligibility
//!
//! A manager must exist, hold one of the configured position tiers, and not
//! already manage a different department.

use tracing::warn;

use crate::config::HierarchyConfig;
use crate::entity::user;
use crate::error::{AppError, AppResult, ErrorCode, OptionExt};
use crate::store::HierarchyStore;

/// Check that `manager_id` may manage `department_id` (`None` for a new department)
pub async fn ensure_eligible<S: HierarchyStore>(
    store: &S,
    config: &HierarchyConfig,
    manager_id: i64,
    department_id: Option<i64>,
) -> AppResult<user::Model> {
    let manager = store
        .find_user_by_id(manager_id)
        .await?
        .ok_or_not_found(format!("manager {}", manager_id))?;

    if !config.is_manager_position(&manager.position) {
        warn!(
            "User {} holds position '{}' and cannot manage a department",
            manager_id, manager.position
        );
        return Err(AppError::Invalid(ErrorCode::ManagerIneligible));
    }

    if store.any_department_managed_by(manager_id, department_id).await? {
        warn!("User {} already manages another department", manager_id);
        return Err(AppError::Conflict(ErrorCode::ManagerAlreadyAssigned));
    }

    Ok(manager)
}
