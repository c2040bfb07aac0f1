use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use crate::errors::ProviderError;

use super::config::{Configuration, GateSettings};
use super::maintenance::{maintenance_response, resolve_page};
use super::request::RequestView;

/// Why a request was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardReason {
    Excluded,
    Disabled,
    Authorized,
}

/// Why a request got the maintenance page. Never leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingIdentity,
    NoMatchingRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Forward(ForwardReason),
    Deny(DenyReason),
}

/// Evaluation order:
/// 1. excluded path -> forward
/// 2. gate disabled -> forward
/// 3. resolve identity (provider errors are returned untouched)
/// 4. identity present and allowed -> forward
/// 5. deny
pub fn decide<I>(
    settings: &GateSettings<I>,
    request: &RequestView<'_>,
) -> Result<Decision, ProviderError> {
    if settings.is_excluded(request.path()) {
        return Ok(Decision::Forward(ForwardReason::Excluded));
    }

    if !settings.is_enabled() {
        return Ok(Decision::Forward(ForwardReason::Disabled));
    }

    let identity = settings.resolve_identity(request)?;
    if !GateSettings::identity_present(identity.as_ref()) {
        return Ok(Decision::Deny(DenyReason::MissingIdentity));
    }

    match identity {
        Some(identity) if settings.allowed(&identity, request) => {
            Ok(Decision::Forward(ForwardReason::Authorized))
        }
        _ => Ok(Decision::Deny(DenyReason::NoMatchingRule)),
    }
}

/// Layer that puts a [`Gate`] in front of a service.
pub struct GateLayer<I> {
    config: Arc<Configuration<I>>,
}

impl<I> GateLayer<I> {
    pub fn new(config: Arc<Configuration<I>>) -> Self {
        Self { config }
    }
}

impl<I> Clone for GateLayer<I> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, I> Layer<S> for GateLayer<I> {
    type Service = Gate<S, I>;

    fn layer(&self, inner: S) -> Self::Service {
        Gate {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Middleware answering 503 with the maintenance page unless the request is
/// let through by the configuration.
pub struct Gate<S, I> {
    inner: S,
    config: Arc<Configuration<I>>,
}

impl<S: Clone, I> Clone for Gate<S, I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, I: 'static> Gate<S, I> {
    pub fn new(inner: S, config: Arc<Configuration<I>>) -> Self {
        Self { inner, config }
    }
}

impl<S, I, B> Service<Request<B>> for Gate<S, I>
where
    S: Service<Request<B>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
    I: 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        // Take the service that was driven to readiness and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let settings = self.config.snapshot();
        let decision = decide(&settings, &RequestView::from_request(&req));
        let page = settings.maintenance_page().map(|path| path.to_path_buf());
        drop(settings);

        match decision {
            Ok(Decision::Forward(reason)) => {
                tracing::debug!(path = %req.uri().path(), reason = ?reason, "gate forward");
                Box::pin(inner.call(req))
            }
            Ok(Decision::Deny(reason)) => {
                tracing::debug!(path = %req.uri().path(), reason = ?reason, "gate deny");
                Box::pin(async move {
                    let body = resolve_page(page.as_deref()).await;
                    Ok(maintenance_response(body))
                })
            }
            Err(err) => {
                tracing::debug!(path = %req.uri().path(), "gate provider error");
                Box::pin(async move { Ok(err.into_response()) })
            }
        }
    }
}
