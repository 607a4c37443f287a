//! # 服务设置
//!
//! 进程级设置：监听地址、CORS 白名单、上传上限。
//! 读取顺序：默认值 → JSON 文件（`PHASE_SIM_CONFIG`，可选）→ 环境变量覆盖 → 校验。

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_handler::{DEFAULT_MAX_FILE_SIZE, ImageConfig};

pub const CONFIG_PATH_ENV: &str = "PHASE_SIM_CONFIG";
pub const BIND_ENV: &str = "PHASE_SIM_BIND";
pub const ALLOWED_ORIGINS_ENV: &str = "PHASE_SIM_ALLOWED_ORIGINS";
pub const MAX_UPLOAD_BYTES_ENV: &str = "PHASE_SIM_MAX_UPLOAD_BYTES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            max_upload_bytes: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl ServerSettings {
    /// 从进程环境加载并校验设置。
    pub fn load() -> Result<Self, AppError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// 以给定的变量查找函数加载设置，便于测试注入。
    pub fn load_with<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match lookup(CONFIG_PATH_ENV) {
            Some(path) if !path.trim().is_empty() => Self::load_from_path(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        settings.apply_overrides(&lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 读取 JSON 设置文件；文件不存在时回退默认值，内容非法时报错。
    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::warn!("设置文件不存在，使用默认设置: {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("解析设置文件失败 {}: {}", path.display(), e)))
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV) {
            self.bind_addr = bind.trim().to_string();
        }

        if let Some(origins) = lookup(ALLOWED_ORIGINS_ENV) {
            self.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(max) = lookup(MAX_UPLOAD_BYTES_ENV) {
            self.max_upload_bytes = max.trim().parse().map_err(|e| {
                AppError::Config(format!("{} 不是合法的字节数 ({}): {}", MAX_UPLOAD_BYTES_ENV, max, e))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.socket_addr()?;
        self.cors_origins()?;
        if self.max_upload_bytes == 0 {
            return Err(AppError::Config("max_upload_bytes 必须大于 0".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        self.bind_addr
            .parse()
            .map_err(|e| AppError::Config(format!("监听地址非法 {}: {}", self.bind_addr, e)))
    }

    /// 将白名单转换为 CORS 可用的 header 值。
    ///
    /// 末尾的 `/` 会被去掉，与浏览器发送的 `Origin` 保持一致。
    pub fn cors_origins(&self) -> Result<Vec<HeaderValue>, AppError> {
        self.allowed_origins
            .iter()
            .map(|origin| {
                let origin = origin.trim().trim_end_matches('/');
                if origin == "*" {
                    return Err(AppError::Config(
                        "CORS 白名单不允许使用通配符 *".to_string(),
                    ));
                }
                if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                    return Err(AppError::Config(format!(
                        "CORS 来源必须以 http:// 或 https:// 开头: {}",
                        origin
                    )));
                }
                HeaderValue::from_str(origin)
                    .map_err(|e| AppError::Config(format!("CORS 来源非法 {}: {}", origin, e)))
            })
            .collect()
    }

    pub fn image_config(&self) -> ImageConfig {
        ImageConfig::with_max_file_size(self.max_upload_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir() -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("phase-sim-settings-test-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = ServerSettings::load_with(lookup_from(&[])).expect("defaults load");
        assert_eq!(settings, ServerSettings::default());
        assert_eq!(settings.image_config().max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn env_overrides_apply_after_file() {
        let dir = unique_temp_dir();
        let path = dir.join("settings.json");
        std::fs::write(
            &path,
            r#"{ "bind_addr": "127.0.0.1:9000", "allowed_origins": ["https://file.example"] }"#,
        )
        .expect("write settings");
        let path_str = path.to_string_lossy().to_string();

        let settings = ServerSettings::load_with(lookup_from(&[
            (CONFIG_PATH_ENV, path_str.as_str()),
            (ALLOWED_ORIGINS_ENV, "https://a.example/, https://b.example"),
        ]))
        .expect("load settings");

        assert_eq!(settings.bind_addr, "127.0.0.1:9000");
        assert_eq!(settings.max_upload_bytes, DEFAULT_MAX_FILE_SIZE);
        let origins = settings.cors_origins().expect("origins");
        assert_eq!(origins[0], "https://a.example");
        assert_eq!(origins[1], "https://b.example");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = unique_temp_dir();
        let loaded = ServerSettings::load_from_path(&dir.join("absent.json")).expect("fallback");
        assert_eq!(loaded, ServerSettings::default());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = unique_temp_dir();
        let path = dir.join("settings.json");
        std::fs::write(&path, "not-json").expect("write invalid settings");

        assert!(matches!(
            ServerSettings::load_from_path(&path),
            Err(AppError::Config(_))
        ));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn wildcard_and_bad_values_are_rejected() {
        assert!(ServerSettings::load_with(lookup_from(&[(ALLOWED_ORIGINS_ENV, "*")])).is_err());
        assert!(
            ServerSettings::load_with(lookup_from(&[(ALLOWED_ORIGINS_ENV, "example.com")])).is_err()
        );
        assert!(ServerSettings::load_with(lookup_from(&[(BIND_ENV, "nowhere")])).is_err());
        assert!(ServerSettings::load_with(lookup_from(&[(MAX_UPLOAD_BYTES_ENV, "0")])).is_err());
        assert!(ServerSettings::load_with(lookup_from(&[(MAX_UPLOAD_BYTES_ENV, "ten")])).is_err());
    }
}
