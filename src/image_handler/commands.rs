//! # HTTP 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做 multipart 参数接收与 JSON 结果返回，不承载业务逻辑。
//! 所有实际处理交由 `ImageServiceState`，保持处理函数薄、稳定、易测试。
//!
//! 上传字段按块读取：声明类型不合法时立即拒绝，体积超限时立即中止读取。

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use serde::Serialize;

use super::source::UploadedImage;
use super::{ImageConfig, ImageError, ImageHandler, ImageServiceState};
use crate::error::AppError;

const FILE_FIELD: &str = "file";
const PHASE_FIELD: &str = "phase";

#[derive(Debug, Clone, Serialize)]
pub struct ProcessImageResponse {
    pub processed_image: String,
}

/// `POST /process`：接收 `file` 与 `phase`，返回处理后的 PNG Data URL。
pub async fn process_image(
    State(state): State<ImageServiceState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessImageResponse>, AppError> {
    let result = handle(&state, multipart).await;
    if let Err(err) = &result {
        log_rejection(err);
    }
    result
}

async fn handle(
    state: &ImageServiceState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessImageResponse>, AppError> {
    let mut multipart = multipart?;
    let config = state.config();

    let mut upload: Option<UploadedImage> = None;
    let mut phase: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => upload = Some(read_file_field(&mut field, config).await?),
            Some(PHASE_FIELD) => phase = Some(field.text().await?),
            _ => {}
        }
    }

    let upload = upload.ok_or(ImageError::MissingField(FILE_FIELD))?;
    // phase 缺失按空串处理，由处理链路在解码后统一报 invalid phase
    let outcome = state
        .process_upload(upload, phase.unwrap_or_default())
        .await?;

    Ok(Json(ProcessImageResponse {
        processed_image: outcome.data_url,
    }))
}

async fn read_file_field(
    field: &mut Field<'_>,
    config: &ImageConfig,
) -> Result<UploadedImage, AppError> {
    let content_type = field.content_type().map(str::to_owned);
    ImageHandler::validate_declared_type(content_type.as_deref(), config)?;

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        ImageHandler::push_chunk_with_limit(&mut bytes, &chunk, config)?;
    }

    Ok(UploadedImage {
        bytes,
        content_type,
    })
}

fn log_rejection(err: &AppError) {
    match err {
        AppError::Image(image_err) => log::warn!(
            "⚠️ 请求被拒绝 - code={} stage={} status={} detail={}",
            image_err.code(),
            image_err.stage(),
            image_err.status().as_u16(),
            image_err
        ),
        other => log::warn!(
            "⚠️ 请求被拒绝 - status={} detail={}",
            other.status().as_u16(),
            other
        ),
    }
}
