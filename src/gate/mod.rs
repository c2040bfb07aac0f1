//! Maintenance gate - rule engine and middleware
//!
//! Requests go through, in order:
//! - excluded paths (always forwarded)
//! - the global enable switch (disabled means forwarded)
//! - the identity provider
//! - the any-match rule set
//!
//! and are answered with a 503 maintenance page when they fall through.

mod config;
mod maintenance;
mod middleware;
mod request;
mod rule;

pub use config::{
    Configuration, ConfigurationBuilder, GateSettings, IdentityProvider, DEFAULT_EXCLUDED_PATHS,
};
pub use maintenance::{load_custom_page, maintenance_response, resolve_page, DEFAULT_PAGE};
pub use middleware::{decide, Decision, DenyReason, ForwardReason, Gate, GateLayer};
pub use request::RequestView;
pub use rule::{Predicate, Role, Rule};

use crate::errors::ProviderError;

/// Identity provider reading the caller's role from a request header.
/// A missing or blank header means no identity.
pub fn header_provider(
    name: &'static str,
) -> impl Fn(&RequestView<'_>) -> Result<Option<String>, ProviderError> + Send + Sync + 'static {
    move |req| {
        Ok(req
            .header(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn header_provider_trims_and_skips_blank() {
        let provider = header_provider("x-role");

        let req = Request::builder().uri("/").header("x-role", " admin ").body(()).unwrap();
        assert_eq!(provider(&RequestView::from_request(&req)).unwrap(), Some("admin".to_string()));

        let req = Request::builder().uri("/").header("x-role", "  ").body(()).unwrap();
        assert_eq!(provider(&RequestView::from_request(&req)).unwrap(), None);

        let req = Request::builder().uri("/").body(()).unwrap();
        assert_eq!(provider(&RequestView::from_request(&req)).unwrap(), None);
    }
}
