//! Runtime control of the maintenance gate.
//!
//! Every route here, status included, requires an admin bearer token on top
//! of whatever the gate itself lets through.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize)]
pub struct GateStatus {
    pub enabled: bool,
    pub excluded_paths: Vec<String>,
    pub maintenance_page: Option<String>,
    pub roles: Vec<String>,
}

fn current_status(state: &AppState) -> GateStatus {
    let settings = state.gate.snapshot();
    GateStatus {
        enabled: settings.is_enabled(),
        excluded_paths: settings.excluded_paths().to_vec(),
        maintenance_page: settings.maintenance_page().map(|p| p.display().to_string()),
        roles: settings.rules().iter().map(|rule| rule.role().to_string()).collect(),
    }
}

fn require_admin(auth: &AuthUser) -> AppResult<()> {
    if auth.caller.role == ADMIN_ROLE {
        Ok(())
    } else {
        Err(AppError::forbidden("admin role required"))
    }
}

pub async fn status(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<GateStatus>> {
    require_admin(&auth)?;
    Ok(Json(current_status(&state)))
}

pub async fn enable(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<GateStatus>> {
    require_admin(&auth)?;
    state.gate.stop_pokeflute();
    tracing::info!(user_id = %auth.caller.user_id, "maintenance gate enabled");
    Ok(Json(current_status(&state)))
}

pub async fn disable(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<GateStatus>> {
    require_admin(&auth)?;
    state.gate.play_pokeflute();
    tracing::info!(user_id = %auth.caller.user_id, "maintenance gate disabled");
    Ok(Json(current_status(&state)))
}
