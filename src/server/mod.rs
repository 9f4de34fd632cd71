//! # HTTP API for Card Templates
//!
//! JSON endpoints for template CRUD, background uploads, validation,
//! fill-in photo uploads and PNG rendering.
//!
//! ## Usage
//!
//! ```bash
//! carteirinha serve --listen 0.0.0.0:8080 --data-dir ./data
//! ```
//!
//! | Method | Path | |
//! |--------|------|-|
//! | GET/POST | `/api/templates` | list / create |
//! | GET/PUT/DELETE | `/api/templates/:id` | read / update / delete |
//! | GET | `/api/templates/:id/validate` | validation report |
//! | POST/DELETE | `/api/templates/:id/images/:side` | background upload / removal |
//! | POST | `/api/templates/:id/render/:side` | PNG download |
//! | POST | `/api/photos` | fill-in photo upload |
//! | GET | `/images/:id/:side` | stored background |

mod error;
mod handlers;
mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, PhotoSession};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::CarteirinhaError;

/// Multipart overhead allowed on top of the configured upload limit, so
/// oversized files reach the upload check and get a readable error.
const MULTIPART_SLACK: usize = 64 * 1024;

/// Build the API router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.upload.max_bytes * 2 + MULTIPART_SLACK);

    Router::new()
        .route(
            "/api/templates",
            get(handlers::templates::list).post(handlers::templates::create),
        )
        .route(
            "/api/templates/:id",
            get(handlers::templates::get)
                .put(handlers::templates::update)
                .delete(handlers::templates::delete),
        )
        .route("/api/templates/:id/validate", get(handlers::templates::check))
        .route(
            "/api/templates/:id/images/:side",
            post(handlers::images::upload)
                .delete(handlers::images::remove)
                .layer(upload_limit),
        )
        .route("/api/templates/:id/render/:side", post(handlers::render::render))
        .route(
            "/api/photos",
            post(handlers::photos::upload).layer(upload_limit),
        )
        .route("/images/:id/:side", get(handlers::images::serve))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use carteirinha::config::Config;
/// use carteirinha::server::serve;
///
/// # async fn example() -> Result<(), carteirinha::error::CarteirinhaError> {
/// let mut config = Config::default();
/// config.server.listen_addr = "0.0.0.0:8080".to_string();
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: Config) -> Result<(), CarteirinhaError> {
    let listen_addr = config.server.listen_addr.clone();
    let state = Arc::new(AppState::open(config).await?);

    tokio::spawn(cleanup_sessions(state.clone()));

    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| CarteirinhaError::Backend(format!("Failed to bind to {}: {}", listen_addr, e)))?;

    let storage = match &state.config.server.data_dir {
        Some(dir) => dir.display().to_string(),
        None => "memory".to_string(),
    };
    info!(addr = %listen_addr, storage = %storage, "Carteirinha HTTP server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| CarteirinhaError::Backend(format!("Server error: {}", e)))?;

    Ok(())
}

/// Background task dropping photo sessions nobody touched within the TTL.
async fn cleanup_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let removed = state.expire_sessions(Instant::now()).await;
        if removed > 0 {
            info!(removed, "Cleaned up expired photo sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use base64::Engine;
    use image::{ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "carteirinha-test-boundary";

    fn app() -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::in_memory(Config::default()).unwrap());
        (router(state.clone()), state)
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(w, h, Rgba([200, 200, 255, 255]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>, header::HeaderMap) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec(), headers)
    }

    async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let (status, body, _) = send(app, req).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn create_card(app: &Router) -> String {
        let front = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png(80, 50))
        );
        let (status, body) = send_json(
            app,
            json_request(
                "POST",
                "/api/templates",
                json!({
                    "name": "Carteira Estudante",
                    "frontImageUrl": front,
                    "width": 800,
                    "height": 600,
                    "fields": [
                        {"id": "nome", "name": "Nome", "type": "text", "side": "front",
                         "x": 100, "y": 100, "width": 200, "height": 30, "required": true, "locked": false}
                    ]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_template_crud() {
        let (app, _) = app();
        let id = create_card(&app).await;

        let (status, list) = send_json(&app, Request::get("/api/templates").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, body) = send_json(
            &app,
            json_request("PUT", &format!("/api/templates/{id}"), json!({"name": "Carteira Docente"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["template"]["name"], "Carteira Docente");
        assert_eq!(body["validation"]["isValid"], true);

        let (status, _) = send_json(
            &app,
            Request::delete(format!("/api/templates/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(
            &app,
            Request::get(format!("/api/templates/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let (app, _) = app();
        let (status, body) = send_json(
            &app,
            json_request("POST", "/api/templates", json!({"name": " ", "width": 800, "height": 600})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Template name is required");
    }

    #[tokio::test]
    async fn test_oversized_canvas_is_refused() {
        let (app, _) = app();
        let (status, body) = send_json(
            &app,
            json_request("POST", "/api/templates", json!({"name": "Banner", "width": 65535, "height": 65535})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Template width and height must be at most 8192px");

        let id = create_card(&app).await;
        let (status, _) = send_json(
            &app,
            json_request("PUT", &format!("/api/templates/{id}"), json!({"height": 100000})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_validate_endpoint_reports_back_photo_lock() {
        let (app, _) = app();
        let id = create_card(&app).await;
        let fields = json!([
            {"id": "nome", "name": "Nome", "type": "text", "side": "front",
             "x": 100, "y": 100, "width": 200, "height": 30, "required": true, "locked": false},
            {"id": "foto", "name": "Foto", "type": "photo", "side": "back",
             "x": 200, "y": 200, "width": 150, "height": 150, "required": true, "locked": false}
        ]);
        send_json(
            &app,
            json_request(
                "PUT",
                &format!("/api/templates/{id}"),
                json!({"fields": fields, "backImageUrl": "/images/x/back"}),
            ),
        )
        .await;

        let (status, report) = send_json(
            &app,
            Request::get(format!("/api/templates/{id}/validate")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["isValid"], false);
        assert_eq!(
            report["errors"],
            json!([crate::template::validate::MSG_BACK_PHOTO_UNLOCKED])
        );
    }

    #[tokio::test]
    async fn test_background_upload_and_serve() {
        let (app, _) = app();
        let id = create_card(&app).await;
        let bytes = png(16, 10);

        let (status, body) = send_json(
            &app,
            multipart_request(&format!("/api/templates/{id}/images/back"), "verso.png", "image/png", &bytes),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], format!("/images/{id}/back"));
        assert_eq!(body["template"]["backImageUrl"], format!("/images/{id}/back"));

        let (status, served, headers) = send(
            &app,
            Request::get(format!("/images/{id}/back")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(served, bytes);
    }

    #[tokio::test]
    async fn test_upload_rejects_gif() {
        let (app, _) = app();
        let id = create_card(&app).await;
        let (status, body) = send_json(
            &app,
            multipart_request(&format!("/api/templates/{id}/images/front"), "a.gif", "image/gif", b"GIF89a"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only PNG and JPEG images are allowed");
    }

    #[tokio::test]
    async fn test_render_downloads_png() {
        let (app, _) = app();
        let id = create_card(&app).await;

        let (status, body) = send_json(&app, multipart_request("/api/photos", "me.png", "image/png", &png(4, 4))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["width"], 4);

        let (status, png_bytes, headers) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/templates/{id}/render/front"),
                json!({"values": {"nome": "Maria"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"documento-Carteira-Estudante-front-"));
        let card = image::load_from_memory(&png_bytes).unwrap();
        assert_eq!((card.width(), card.height()), (800, 600));
    }

    #[tokio::test]
    async fn test_render_back_without_image() {
        let (app, _) = app();
        let id = create_card(&app).await;
        let (status, body) = send_json(
            &app,
            json_request("POST", &format!("/api/templates/{id}/render/back"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_render_unknown_photo_session() {
        let (app, _) = app();
        let id = create_card(&app).await;
        let (status, _) = send_json(
            &app,
            json_request(
                "POST",
                &format!("/api/templates/{id}/render/front"),
                json!({"photos": {"foto": "no-such-session"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_expire_sessions() {
        let (_, state) = app();
        state.photo_sessions.write().await.insert(
            "old".to_string(),
            PhotoSession::new(image::DynamicImage::new_rgba8(1, 1)),
        );
        assert_eq!(state.expire_sessions(Instant::now()).await, 0);
        let later = Instant::now() + state.session_ttl() + Duration::from_secs(1);
        assert_eq!(state.expire_sessions(later).await, 1);
    }
}
