use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

use crate::database::users;
use crate::domain::{AuditEntry, Tournament, UserRole};
use crate::errors::{EngineError, EngineResult};

/// Whoever an audited change is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
            display_name: "System".to_string(),
        }
    }

    pub fn audit(
        &self,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        old_value: Option<Value>,
        new_value: Option<Value>,
        now: DateTime<Utc>,
    ) -> AuditEntry {
        AuditEntry {
            id: Uuid::new_v4().to_string(),
            user_id: self.id.clone(),
            user_display_name: self.display_name.clone(),
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            old_value,
            new_value,
            created_at: now,
        }
    }
}

pub fn authenticate(caller_id: Option<&str>) -> EngineResult<&str> {
    caller_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(EngineError::Authentication)
}

/// Only the tournament's organizer or an admin may manage it.
pub fn authorize_organizer(
    conn: &Connection,
    tournament: &Tournament,
    caller_id: &str,
) -> EngineResult<Actor> {
    let caller = users::find_by_id(conn, caller_id)?;
    let is_admin = caller.as_ref().is_some_and(|u| u.role == UserRole::Admin);

    if caller_id != tournament.organizer_id && !is_admin {
        return Err(EngineError::Authorization(format!(
            "only the organizer of tournament {} or an admin may do this",
            tournament.id
        )));
    }

    Ok(Actor {
        id: caller_id.to_string(),
        display_name: caller
            .map(|u| u.display_name)
            .unwrap_or_else(|| "Unknown".to_string()),
    })
}
