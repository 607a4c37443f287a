//! # 期相模拟服务 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 前端（静态页面，跨域调用）                │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ HTTP (multipart 上传 / JSON 返回, CORS 白名单)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust, axum)                     │
//! │                                                          │
//! │  ┌─ server ───── Router + CORS + 请求日志 + /health      │
//! │  │                                                       │
//! │  ├─ image_handler  POST /process                         │
//! │  │   ├─ loader        类型 / 空文件 / 体积 / 签名          │
//! │  │   ├─ pipeline      解码 + 归一化为 L / RGB             │
//! │  │   ├─ filters       arterial / venous 滤镜              │
//! │  │   └─ encoder       PNG → Data URL                     │
//! │  │                                                       │
//! │  ├─ settings ─── 监听地址 / CORS 白名单 / 上传上限         │
//! │  └─ error ────── AppError → {"detail": ...}              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，所有 HTTP 处理函数的错误返回类型 |
//! | [`image_handler`] | 上传校验、解码、期相滤镜与 PNG Data URL 编码 |
//! | [`server`] | 路由装配、CORS、请求日志、健康检查 |
//! | [`settings`] | JSON 设置文件与环境变量覆盖 |

pub mod error;
pub mod image_handler;
pub mod server;
pub mod settings;
