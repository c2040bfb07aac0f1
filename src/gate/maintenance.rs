use std::path::Path;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use handlebars::Handlebars;

use crate::errors::MaintenancePageError;

pub const DEFAULT_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Maintenance</title>
  </head>
  <body>
    <h1>The site is currently under maintenance</h1>
    <p>Please try again later</p>
  </body>
</html>
"#;

const TEMPLATE_EXTENSIONS: [&str; 2] = ["hbs", "handlebars"];

fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Reads a custom maintenance page. Handlebars files are rendered with no
/// bound variables, anything else is returned as-is.
pub async fn load_custom_page(path: &Path) -> Result<String, MaintenancePageError> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| MaintenancePageError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if !is_template(path) {
        return Ok(source);
    }

    Handlebars::new()
        .render_template(&source, &serde_json::json!({}))
        .map_err(|source| MaintenancePageError::Render {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
}

/// Body for the maintenance response. Never fails: a broken custom page
/// falls back to [`DEFAULT_PAGE`].
pub async fn resolve_page(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return DEFAULT_PAGE.to_string();
    };

    match load_custom_page(path).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(error = %err, "falling back to default maintenance page");
            DEFAULT_PAGE.to_string()
        }
    }
}

pub fn maintenance_response(body: String) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/html"))],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn page_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn no_custom_page_uses_default() {
        assert_eq!(resolve_page(None).await, DEFAULT_PAGE);
    }

    #[tokio::test]
    async fn html_page_is_returned_verbatim() {
        let file = page_file(".html", "<h1>Back soon {{not a template}}</h1>");
        assert_eq!(
            resolve_page(Some(file.path())).await,
            "<h1>Back soon {{not a template}}</h1>"
        );
    }

    #[tokio::test]
    async fn handlebars_page_is_rendered() {
        let file = page_file(".hbs", "<p>{{#if true}}rendered{{/if}}{{missing}}</p>");
        assert_eq!(resolve_page(Some(file.path())).await, "<p>rendered</p>");
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.html");

        let err = load_custom_page(&path).await.unwrap_err();
        assert!(matches!(err, MaintenancePageError::Read { .. }));
        assert_eq!(resolve_page(Some(&path)).await, DEFAULT_PAGE);
    }

    #[tokio::test]
    async fn broken_template_falls_back_to_default() {
        let file = page_file(".hbs", "{{#if}}");

        let err = load_custom_page(file.path()).await.unwrap_err();
        assert!(matches!(err, MaintenancePageError::Render { .. }));
        assert_eq!(resolve_page(Some(file.path())).await, DEFAULT_PAGE);
    }

    #[test]
    fn default_page_content() {
        assert!(DEFAULT_PAGE.contains("<title>Maintenance</title>"));
        assert!(DEFAULT_PAGE.contains("<h1>The site is currently under maintenance</h1>"));
        assert!(DEFAULT_PAGE.contains("<p>Please try again later</p>"));
    }

    #[test]
    fn response_is_503_html() {
        let resp = maintenance_response(DEFAULT_PAGE.to_string());
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/html");
    }
}
