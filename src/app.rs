use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::InvalidRuleError;
use crate::gate::{Configuration, GateLayer};
use crate::jwt::{bearer_provider, Caller, JwtConfig};
use crate::routes::gate::ADMIN_ROLE;
use crate::routes::{gate, health, pages};

pub const GUEST_ROLE: &str = "guest";

#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<JwtConfig>,
    pub gate: Arc<Configuration<Caller>>,
}

impl AppState {
    pub fn new(jwt: JwtConfig, gate: Configuration<Caller>) -> Self {
        Self {
            jwt: Arc::new(jwt),
            gate: Arc::new(gate),
        }
    }
}

/// Admins pass everywhere, guests only under `/public`. Callers are read from
/// bearer tokens.
pub fn install_rules(gate: &Configuration<Caller>, jwt: Arc<JwtConfig>) -> Result<(), InvalidRuleError> {
    gate.set_identity_provider(bearer_provider(jwt));
    gate.add_rule(ADMIN_ROLE, |caller: &Caller, _| caller.role == ADMIN_ROLE)?;
    gate.add_rule(GUEST_ROLE, |caller: &Caller, req| {
        caller.role == GUEST_ROLE && req.path().starts_with("/public")
    })?;
    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let gate_routes = Router::new()
        .route("/", get(gate::status))
        .route("/enable", post(gate::enable))
        .route("/disable", post(gate::disable));

    let gate_layer = GateLayer::new(Arc::clone(&state.gate));

    Router::new()
        .route("/health_check", get(health::health))
        .route("/favicon.ico", get(health::favicon))
        .route("/", get(pages::index))
        .route("/public/*rest", get(pages::public))
        .route("/admin/*rest", get(pages::admin))
        .nest("/gate", gate_routes)
        .with_state(state)
        .layer(gate_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
