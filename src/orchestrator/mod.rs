//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责查询流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量查询处理器
//! - 批量预览（每条查询取 1 条数据）
//! - 批量导出（逐条翻页 + 导出 CSV）
//! - 汇总逐条结果、错误日志和导出文件
//! - 会话模式下打包 ZIP
//!
//! ### `single_query` - 单条查询处理器
//! - 全量获取单条查询（失败页跳过）
//! - 导出 CSV
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor / single_query
//!     ↓
//! services (能力层：paginator / csv_exporter / archive_builder)
//!     ↓
//! clients (FOFA HTTP 客户端)
//! ```

pub mod batch_processor;
pub mod single_query;

// 重新导出主要类型
pub use batch_processor::{BatchProcessor, BatchProgress};
pub use single_query::{SingleQueryReport, SingleQueryRunner};
