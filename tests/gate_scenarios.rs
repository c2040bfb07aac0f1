use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tempfile::tempdir;
use tower::util::ServiceExt; // for `oneshot`

use ronflex::errors::ProviderError;
use ronflex::gate::{header_provider, Configuration, GateLayer, DEFAULT_PAGE};

fn router(config: Arc<Configuration<String>>, hits: Arc<AtomicUsize>) -> Router {
    let handler = move || {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            "through"
        }
    };

    Router::new()
        .route("/health_check", get(handler.clone()))
        .route("/admin", get(handler.clone()))
        .route("/private", get(handler.clone()))
        .route("/public/faq", get(handler))
        .layer(GateLayer::new(config))
}

async fn send(app: &Router, path: &str, role: Option<&str>) -> Result<Response> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(role) = role {
        builder = builder.header("x-role", role);
    }
    let resp = app.clone().oneshot(builder.body(Body::empty())?).await?;
    Ok(resp)
}

async fn body_string(resp: Response) -> Result<String> {
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

async fn assert_maintenance(resp: Response) -> Result<()> {
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/html");
    assert_eq!(body_string(resp).await?, DEFAULT_PAGE);
    Ok(())
}

#[tokio::test]
async fn excluded_path_passes_regardless_of_identity() -> Result<()> {
    let config = Arc::new(Configuration::new());
    config.set_excluded_paths(["/health_check"]);
    config.set_identity_provider(header_provider("x-role"));
    let app = router(Arc::clone(&config), Arc::new(AtomicUsize::new(0)));

    for enabled in [true, false] {
        config.set_enabled(enabled);
        for role in [None, Some("admin"), Some("guest")] {
            let resp = send(&app, "/health_check", role).await?;
            assert_eq!(resp.status(), StatusCode::OK, "enabled={enabled} role={role:?}");
        }
    }

    Ok(())
}

#[tokio::test]
async fn disabled_gate_passes_everything() -> Result<()> {
    let config = Arc::new(Configuration::new());
    config.add_rule("nobody", |_: &String, _| false)?;
    let app = router(Arc::clone(&config), Arc::new(AtomicUsize::new(0)));

    assert_eq!(send(&app, "/private", None).await?.status(), StatusCode::OK);
    assert_eq!(send(&app, "/admin", Some("guest")).await?.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn admin_rule_lets_admin_through() -> Result<()> {
    let config = Arc::new(Configuration::new());
    config.enable_gate();
    config.set_identity_provider(|_| Ok(Some("admin".to_string())));
    config.add_rule("admin", |_: &String, _| true)?;
    let app = router(config, Arc::new(AtomicUsize::new(0)));

    let resp = send(&app, "/admin", None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await?, "through");

    Ok(())
}

#[tokio::test]
async fn missing_identity_gets_maintenance_page() -> Result<()> {
    let config = Arc::new(Configuration::new());
    config.enable_gate();
    let hits = Arc::new(AtomicUsize::new(0));
    let app = router(config, Arc::clone(&hits));

    assert_maintenance(send(&app, "/admin", None).await?).await?;
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn present_identity_passes_empty_rule_set() -> Result<()> {
    let config = Arc::new(Configuration::new());
    config.enable_gate();
    config.set_identity_provider(header_provider("x-role"));
    let app = router(config, Arc::new(AtomicUsize::new(0)));

    for role in ["admin", "guest", "anyone"] {
        assert_eq!(send(&app, "/private", Some(role)).await?.status(), StatusCode::OK);
    }

    Ok(())
}

#[tokio::test]
async fn guest_rule_blocks_private_path() -> Result<()> {
    let config = Arc::new(Configuration::new());
    config.enable_gate();
    config.set_identity_provider(|_| Ok(Some("guest".to_string())));
    config.add_rule("guest", |_: &String, req| req.path().starts_with("/public"))?;
    let app = router(config, Arc::new(AtomicUsize::new(0)));

    assert_maintenance(send(&app, "/private", None).await?).await?;
    assert_eq!(send(&app, "/public/faq", None).await?.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn missing_custom_page_falls_back_to_default() -> Result<()> {
    let dir = tempdir()?;
    let config = Arc::new(Configuration::new());
    config.enable_gate();
    config.set_maintenance_page(dir.path().join("does-not-exist.html"));
    let app = router(config, Arc::new(AtomicUsize::new(0)));

    assert_maintenance(send(&app, "/private", None).await?).await?;

    Ok(())
}

#[tokio::test]
async fn custom_pages_are_served() -> Result<()> {
    let dir = tempdir()?;
    let html = dir.path().join("maintenance.html");
    std::fs::write(&html, "<h1>Snoozing</h1>")?;
    let template = dir.path().join("maintenance.hbs");
    std::fs::write(&template, "<h1>{{#if true}}Back soon{{/if}}</h1>")?;

    let config = Arc::new(Configuration::new());
    config.enable_gate();
    let app = router(Arc::clone(&config), Arc::new(AtomicUsize::new(0)));

    config.set_maintenance_page(&html);
    let resp = send(&app, "/private", None).await?;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_string(resp).await?, "<h1>Snoozing</h1>");

    config.set_maintenance_page(&template);
    let resp = send(&app, "/private", None).await?;
    assert_eq!(body_string(resp).await?, "<h1>Back soon</h1>");

    config.clear_maintenance_page();
    assert_maintenance(send(&app, "/private", None).await?).await?;

    Ok(())
}

#[tokio::test]
async fn provider_failure_skips_wrapped_service() -> Result<()> {
    let config = Arc::new(Configuration::new());
    config.enable_gate();
    config.set_identity_provider(|_| Err(ProviderError::msg("session store offline")));
    let hits = Arc::new(AtomicUsize::new(0));
    let app = router(config, Arc::clone(&hits));

    let resp = send(&app, "/private", None).await?;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(resp).await?;
    assert!(!body.contains("session store offline"), "provider detail leaked: {body}");
    assert!(body.contains("\"error\":\"provider\""), "unexpected body: {body}");
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn toggling_takes_effect_on_next_request() -> Result<()> {
    let config = Arc::new(Configuration::new());
    let app = router(Arc::clone(&config), Arc::new(AtomicUsize::new(0)));

    assert_eq!(send(&app, "/private", None).await?.status(), StatusCode::OK);

    config.stop_pokeflute();
    assert_eq!(send(&app, "/private", None).await?.status(), StatusCode::SERVICE_UNAVAILABLE);

    config.play_pokeflute();
    assert_eq!(send(&app, "/private", None).await?.status(), StatusCode::OK);

    Ok(())
}
