use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, Method, Request, Uri};

/// Read-only view over the parts of an inbound request that identity
/// providers and rule predicates get to see.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    method: &'a Method,
    uri: &'a Uri,
    headers: &'a HeaderMap,
    extensions: &'a Extensions,
}

impl<'a> RequestView<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        Self {
            method: req.method(),
            uri: req.uri(),
            headers: req.headers(),
            extensions: req.extensions(),
        }
    }

    pub fn from_parts(parts: &'a Parts) -> Self {
        Self {
            method: &parts.method,
            uri: &parts.uri,
            headers: &parts.headers,
            extensions: &parts.extensions,
        }
    }

    pub fn path(&self) -> &'a str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&'a str> {
        self.uri.query()
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }

    /// Header value as a string, if present and valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn extensions(&self) -> &'a Extensions {
        self.extensions
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&'a T> {
        self.extensions.get::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_path_query_and_headers() {
        let req = Request::builder()
            .method("POST")
            .uri("/admin/users?page=2")
            .header("x-role", "admin")
            .body(())
            .unwrap();
        let view = RequestView::from_request(&req);

        assert_eq!(view.path(), "/admin/users");
        assert_eq!(view.query(), Some("page=2"));
        assert_eq!(view.method(), &Method::POST);
        assert_eq!(view.header("x-role"), Some("admin"));
        assert_eq!(view.header("x-missing"), None);
    }

    #[test]
    fn reads_typed_extensions() {
        #[derive(Debug, Clone, PartialEq)]
        struct CurrentUser(&'static str);

        let mut req = Request::builder().uri("/").body(()).unwrap();
        req.extensions_mut().insert(CurrentUser("ash"));
        let (parts, _) = req.into_parts();
        let view = RequestView::from_parts(&parts);

        assert_eq!(view.extension::<CurrentUser>(), Some(&CurrentUser("ash")));
        assert_eq!(view.extension::<u32>(), None);
    }
}
