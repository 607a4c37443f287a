//! # HTTP 服务装配
//!
//! 路由、CORS、请求日志中间件与健康检查。
//! 路由层只持有 `ImageServiceState`，不保存任何跨请求的可变状态。

use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::error::AppError;
use crate::image_handler::{self, ImageServiceState};
use crate::settings::ServerSettings;

/// multipart 边界与其它字段的额外余量。
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// 根据设置构建完整路由。
pub fn build_router(settings: &ServerSettings) -> Result<Router, AppError> {
    let service = ImageServiceState::with_config(settings.image_config());
    let origins = settings.cors_origins()?;
    Ok(router(service, origins))
}

/// 以给定的服务状态与 CORS 白名单组装路由。
pub fn router(service: ImageServiceState, allowed_origins: Vec<HeaderValue>) -> Router {
    let body_limit = usize::try_from(service.config().max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health))
        .route(
            "/process",
            post(image_handler::process_image).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(service)
        .layer(cors_layer(allowed_origins))
        .layer(middleware::from_fn(log_requests))
}

fn cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} -> {} ({}ms)",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );
    response
}
