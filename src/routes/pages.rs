use axum::extract::Path;
use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html("<h1>Welcome</h1>")
}

pub async fn public(Path(rest): Path<String>) -> Html<String> {
    Html(format!("<h1>Public: {rest}</h1>"))
}

pub async fn admin(Path(rest): Path<String>) -> Html<String> {
    Html(format!("<h1>Admin: {rest}</h1>"))
}
