use anyhow::Result;
use axum::{extract::State, response::Html, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The page is rendered once before serving and only read afterwards.
pub struct AppState {
    pub page: String,
}

pub fn router(page: String) -> Router {
    let state = Arc::new(AppState { page });

    Router::new()
        .route("/", get(index_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(page: String, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let app = router(page);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.page.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_index_serves_page() {
        let app = router("<html><svg></svg></html>".to_string());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<html><svg></svg></html>");
    }

    #[tokio::test]
    async fn test_other_routes_are_not_found() {
        let app = router(String::new());

        let response = app
            .oneshot(Request::builder().uri("/api/query").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
