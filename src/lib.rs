//! # FOFA Export
//!
//! 一个用于 FOFA 资产搜索与批量导出的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - FOFA HTTP 接口，负责请求、重试和响应解析
//! - `SearchApi` - 单页搜索能力，测试中可替换
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `Paginator` - 预览 / 翻页累加
//! - `CsvExporter` - 导出 CSV
//! - `ArchiveBuilder` - 打包 ZIP
//! - `FileCredentialStore` - 读写 API 密钥
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量预览、导出和打包
//! - `orchestrator/single_query` - 单条查询全量导出
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_helpers;

// 重新导出常用类型
pub use app::App;
pub use clients::{FofaClient, SearchApi};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ApiKey, ArtifactLocation, ExportDestination, FieldList, Query, Session};
pub use orchestrator::{BatchProcessor, BatchProgress, SingleQueryReport, SingleQueryRunner};
