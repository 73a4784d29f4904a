//! 批量查询处理器 - 编排层
//!
//! ## 职责
//!
//! 按输入顺序处理多条查询，单条查询的任何失败都只记录为该条的结果，
//! 不会中断整个批次。
//!
//! ## 核心功能
//!
//! 1. **批量预览**：每条查询只取 1 条数据，得到总数并判断是否可导出
//! 2. **批量导出**：预览 → 翻页（遇错中断）→ 导出 CSV
//! 3. **进度汇报**：每条查询边界回调一次，导出过程中按比例折算整体进度
//! 4. **打包**：会话模式下把成功导出的文件打成 ZIP
//!
//! ## 设计特点
//!
//! - **顺序执行**：查询之间、页之间都不并发
//! - **逐条结果**：每条非空查询产生且只产生一个 `BatchItemOutcome`

use crate::clients::SearchApi;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    ApiKey, ArtifactLocation, BatchItemOutcome, BatchReport, FetchOutcome, FieldList,
    PreviewOutcome, Query, ResultSet,
};
use crate::services::{ArchiveBuilder, CsvExporter, PageErrorPolicy, PaginationPlan, Paginator};
use crate::utils::logging::truncate_text;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 批量导出进度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    /// 已完成的查询数
    pub completed: usize,
    pub total: usize,
    /// 整体进度 0.0 ~ 1.0，包含当前查询导出的比例
    pub overall: f64,
}

impl BatchProgress {
    fn at_boundary(completed: usize, total: usize) -> Self {
        let overall = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };
        Self {
            completed,
            total,
            overall,
        }
    }

    /// 第 `index` 条查询导出了 `current/len` 时的整体进度
    fn within(index: usize, total: usize, current: usize, len: usize) -> Self {
        let query_progress = if len == 0 {
            0.0
        } else {
            current as f64 / len as f64
        };
        Self {
            completed: index,
            total,
            overall: (index as f64 + query_progress) / total.max(1) as f64,
        }
    }
}

/// 单条查询被跳过的原因
struct QuerySkip {
    /// 写入错误日志的描述
    detail: String,
    /// 写入结果的错误信息
    error: String,
}

/// 批量处理器
pub struct BatchProcessor {
    paginator: Paginator,
    exporter: CsvExporter,
    limit: u64,
}

impl BatchProcessor {
    pub fn new(api: Arc<dyn SearchApi>, exporter: CsvExporter, config: &Config) -> Self {
        Self::with_policy(api, exporter, config.batch_limit, config.page_delay())
    }

    pub fn with_policy(
        api: Arc<dyn SearchApi>,
        exporter: CsvExporter,
        limit: u64,
        page_delay: Duration,
    ) -> Self {
        Self {
            paginator: Paginator::new(api, page_delay),
            exporter,
            limit,
        }
    }

    /// 批量预览
    ///
    /// 每条查询取 1 条数据获取总数，`0 < total <= 上限` 视为可导出。
    ///
    /// # 返回
    /// (每条非空查询的预览结果, 错误日志)
    pub async fn preview(
        &self,
        key: &ApiKey,
        queries: &[String],
        fields: &FieldList,
    ) -> (Vec<PreviewOutcome>, Vec<String>) {
        let queries = normalize_queries(queries);
        let mut outcomes = Vec::with_capacity(queries.len());
        let mut errors = Vec::new();

        for (i, expr) in queries.iter().enumerate() {
            let query = Query::new(expr.as_str(), fields.clone());
            match self.paginator.preview(key, &query, 1).await {
                Ok(page) => {
                    let total = page.total;
                    outcomes.push(PreviewOutcome {
                        query: expr.clone(),
                        total,
                        error: None,
                        valid: total > 0 && total <= self.limit,
                    });
                }
                Err(e) => {
                    let message = e.user_message();
                    errors.push(format!("查询 {}: {} - 错误: {}", i + 1, expr, message));
                    outcomes.push(PreviewOutcome {
                        query: expr.clone(),
                        total: 0,
                        error: Some(message),
                        valid: false,
                    });
                }
            }
        }

        (outcomes, errors)
    }

    /// 批量导出
    ///
    /// # 参数
    /// - `queries`: 查询列表，空行跳过
    /// - `fields`: 导出字段
    /// - `page_size`: 每页大小
    /// - `progress`: 进度回调
    ///
    /// # 返回
    /// 每条查询的结果、错误日志和成功导出的文件列表
    pub async fn export_batch(
        &self,
        key: &ApiKey,
        queries: &[String],
        fields: &FieldList,
        page_size: u32,
        mut progress: Option<&mut dyn FnMut(BatchProgress)>,
    ) -> BatchReport {
        let queries = normalize_queries(queries);
        let total_queries = queries.len();
        let mut report = BatchReport::default();

        info!("📦 开始批量导出，共 {} 条查询", total_queries);

        for (i, expr) in queries.iter().enumerate() {
            if let Some(cb) = progress.as_deref_mut() {
                cb(BatchProgress::at_boundary(i, total_queries));
            }

            let label = i + 1;
            let query = Query::new(expr.as_str(), fields.clone());

            let set = match self
                .collect_query(key, label, &query, page_size, &mut report.error_log)
                .await
            {
                Ok(set) => set,
                Err(skip) => {
                    warn!("[查询 {}] ⚠️ {}", label, skip.detail);
                    report.error_log.push(format!(
                        "查询 {}: {} - {}",
                        label, expr, skip.detail
                    ));
                    report
                        .outcomes
                        .push(BatchItemOutcome::failure(expr.as_str(), 0, skip.error));
                    continue;
                }
            };

            let record_count = set.len();
            let exported = {
                let mut on_record = |current: usize| {
                    if let Some(cb) = progress.as_deref_mut() {
                        cb(BatchProgress::within(i, total_queries, current, record_count));
                    }
                };
                self.exporter
                    .export(&set.records, &set.fields, expr, Some(&mut on_record))
            };

            match exported {
                Ok(location) => {
                    info!(
                        "[查询 {}] ✓ 导出成功: {}, 记录数: {}",
                        label, location, record_count
                    );
                    report.artifacts.push(location.clone());
                    report
                        .outcomes
                        .push(BatchItemOutcome::success(expr.as_str(), record_count, location));
                }
                Err(e) => {
                    let message = e.user_message();
                    error!("[查询 {}] ❌ 导出失败: {}", label, message);
                    report
                        .error_log
                        .push(format!("查询 {}: {} - 导出失败: {}", label, expr, message));
                    report.outcomes.push(BatchItemOutcome::failure(
                        expr.as_str(),
                        record_count,
                        message,
                    ));
                }
            }
        }

        // 确保进度显示 100%
        if let Some(cb) = progress.as_deref_mut() {
            cb(BatchProgress::at_boundary(total_queries, total_queries));
        }

        report
    }

    /// 把成功导出的文件打包（仅会话模式）
    pub fn bundle(&self, artifacts: &[ArtifactLocation], base_name: &str) -> AppResult<ArtifactLocation> {
        ArchiveBuilder::new(self.exporter.destination()).bundle(artifacts, base_name)
    }

    /// 预览 + 翻页获取一条查询的数据
    async fn collect_query(
        &self,
        key: &ApiKey,
        label: usize,
        query: &Query,
        page_size: u32,
        error_log: &mut Vec<String>,
    ) -> Result<ResultSet, QuerySkip> {
        let preview = self.paginator.preview(key, query, 1).await.map_err(|e| {
            let message = e.user_message();
            QuerySkip {
                detail: format!("预览失败: {}", message),
                error: message,
            }
        })?;

        let total = preview.total;
        if total > self.limit {
            let message = AppError::over_limit(total, self.limit).user_message();
            return Err(QuerySkip {
                detail: message.clone(),
                error: message,
            });
        }
        if total == 0 {
            return Err(QuerySkip {
                detail: "没有找到结果".to_string(),
                error: "没有找到结果".to_string(),
            });
        }

        info!(
            "[查询 {}] 开始导出: {}, 总数据量: {} 条, 分页大小: {}",
            label,
            truncate_text(query.expression(), 80),
            total,
            page_size
        );

        let plan = PaginationPlan {
            page_size,
            limit: self.limit,
            on_page_error: PageErrorPolicy::Abort,
        };
        let outcome = self
            .paginator
            .fetch_all(key, query, plan)
            .await
            .map_err(|e| {
                let message = e.user_message();
                QuerySkip {
                    detail: format!("第1页失败: {}", message),
                    error: message,
                }
            })?;

        match outcome {
            FetchOutcome::Records(set) => {
                for failure in &set.failed_pages {
                    let line = if failure.empty {
                        format!(
                            "查询 {}: {} - 第{}页数据为空，已跳过",
                            label,
                            query.expression(),
                            failure.page
                        )
                    } else {
                        format!(
                            "查询 {}: {} - 第{}页失败，停止翻页: {}",
                            label,
                            query.expression(),
                            failure.page,
                            failure.error
                        )
                    };
                    error_log.push(line);
                }
                Ok(set)
            }
            FetchOutcome::NoResults { .. } => Err(QuerySkip {
                detail: "没有找到结果".to_string(),
                error: "没有找到结果".to_string(),
            }),
        }
    }
}

/// 去掉首尾空白，跳过空行
pub fn normalize_queries(queries: &[String]) -> Vec<String> {
    queries
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExportDestination;
    use crate::test_helpers::{QueryScript, ScriptedApi};

    fn processor(api: &Arc<ScriptedApi>, dir: &std::path::Path) -> BatchProcessor {
        let exporter = CsvExporter::new(ExportDestination::Local {
            dir: dir.to_path_buf(),
        });
        BatchProcessor::with_policy(api.clone(), exporter, 200_000, Duration::ZERO)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_queries() {
        assert_eq!(
            normalize_queries(&strings(&["  a ", "", "   ", "b"])),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn test_preview_classifies_validity() {
        let api = Arc::new(
            ScriptedApi::new()
                .script("small", QueryScript::with_total(10))
                .script("huge", QueryScript::with_total(250_000))
                .script("none", QueryScript::with_total(0))
                .script("broken", QueryScript::with_total(5).preview_error("[820001] 语法错误")),
        );
        let dir = tempfile::tempdir().unwrap();

        let (outcomes, errors) = processor(&api, dir.path())
            .preview(
                &ApiKey::new("k"),
                &strings(&["small", "huge", "", "none", "broken"]),
                &FieldList::default(),
            )
            .await;

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].valid);
        assert_eq!(outcomes[1].total, 250_000);
        assert!(!outcomes[1].valid);
        assert!(!outcomes[2].valid);
        assert_eq!(outcomes[3].error.as_deref(), Some("[820001] 语法错误"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("broken"));
        assert!(api.calls().iter().all(|(_, page, size)| *page == 1 && *size == 1));
    }

    #[tokio::test]
    async fn test_blank_entries_skipped_in_order() {
        let api = Arc::new(
            ScriptedApi::new()
                .script("title=\"X\"", QueryScript::with_total(3))
                .script("port=80", QueryScript::with_total(2)),
        );
        let dir = tempfile::tempdir().unwrap();

        let report = processor(&api, dir.path())
            .export_batch(
                &ApiKey::new("k"),
                &strings(&["title=\"X\"", "", "port=80"]),
                &FieldList::default(),
                100,
                None,
            )
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].query, "title=\"X\"");
        assert_eq!(report.outcomes[1].query, "port=80");
        assert!(report.outcomes.iter().all(|o| o.is_success()));
        assert_eq!(report.outcomes[0].record_count, 3);
        assert_eq!(report.artifacts.len(), 2);
        assert!(report.error_log.is_empty());
    }

    #[tokio::test]
    async fn test_over_limit_query_does_not_stop_batch() {
        let api = Arc::new(
            ScriptedApi::new()
                .script("huge", QueryScript::with_total(250_000))
                .script("ok", QueryScript::with_total(5)),
        );
        let dir = tempfile::tempdir().unwrap();

        let report = processor(&api, dir.path())
            .export_batch(
                &ApiKey::new("k"),
                &strings(&["huge", "ok"]),
                &FieldList::default(),
                100,
                None,
            )
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(!report.outcomes[0].is_success());
        assert!(report.outcomes[0].error().unwrap().contains("数据量过大"));
        assert!(report.outcomes[1].is_success());
        // 超限查询只做了预览
        assert_eq!(api.calls_for("huge"), vec![(1, 1)]);
        assert_eq!(report.error_log.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_become_outcomes() {
        let api = Arc::new(
            ScriptedApi::new()
                .script("bad", QueryScript::with_total(5).preview_error("[-700] Account Invalid"))
                .script("zero", QueryScript::with_total(0))
                .script("first-page-down", QueryScript::with_total(5).failing(1))
                .script("partial", QueryScript::with_total(25).failing(2)),
        );
        let dir = tempfile::tempdir().unwrap();

        let report = processor(&api, dir.path())
            .export_batch(
                &ApiKey::new("k"),
                &strings(&["bad", "zero", "first-page-down", "partial"]),
                &FieldList::default(),
                10,
                None,
            )
            .await;

        let results: Vec<bool> = report.outcomes.iter().map(|o| o.is_success()).collect();
        assert_eq!(results, vec![false, false, false, true]);
        assert_eq!(report.outcomes[0].error(), Some("[-700] Account Invalid"));
        assert_eq!(report.outcomes[1].error(), Some("没有找到结果"));
        // 中断翻页：只保留第 1 页
        assert_eq!(report.outcomes[3].record_count, 10);
        assert_eq!(api.calls_for("partial"), vec![(1, 1), (1, 10), (2, 10)]);
        assert!(report
            .error_log
            .iter()
            .any(|line| line.contains("partial") && line.contains("第2页失败")));
        assert_eq!(report.artifacts.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_logged_separately_and_paging_continues() {
        let api = Arc::new(ScriptedApi::new().script("gap", QueryScript::with_total(25).empty(2)));
        let dir = tempfile::tempdir().unwrap();

        let report = processor(&api, dir.path())
            .export_batch(
                &ApiKey::new("k"),
                &strings(&["gap"]),
                &FieldList::default(),
                10,
                None,
            )
            .await;

        assert!(report.outcomes[0].is_success());
        assert_eq!(report.outcomes[0].record_count, 15);
        assert_eq!(api.calls_for("gap"), vec![(1, 1), (1, 10), (2, 10), (3, 10)]);
        assert_eq!(report.error_log, vec!["查询 1: gap - 第2页数据为空，已跳过".to_string()]);
    }

    #[tokio::test]
    async fn test_progress_boundaries_and_final_signal() {
        let api = Arc::new(
            ScriptedApi::new()
                .script("a", QueryScript::with_total(3))
                .script("b", QueryScript::with_total(0))
                .script("c", QueryScript::with_total(250)),
        );
        let dir = tempfile::tempdir().unwrap();
        let mut events = Vec::new();
        let mut cb = |p: BatchProgress| events.push(p);

        processor(&api, dir.path())
            .export_batch(
                &ApiKey::new("k"),
                &strings(&["a", "", "b", "c"]),
                &FieldList::default(),
                100,
                Some(&mut cb),
            )
            .await;

        let boundaries: Vec<usize> = events
            .iter()
            .filter(|p| p.overall == p.completed as f64 / 3.0)
            .map(|p| p.completed)
            .collect();
        assert!(boundaries.starts_with(&[0]));
        assert!(boundaries.contains(&1));
        assert!(boundaries.contains(&2));
        let last = events.last().unwrap();
        assert_eq!((last.completed, last.total), (3, 3));
        assert_eq!(last.overall, 1.0);
        assert!(events.windows(2).all(|w| w[0].overall <= w[1].overall));
    }

    #[tokio::test]
    async fn test_bundle_requires_session() {
        let api = Arc::new(ScriptedApi::new());
        let dir = tempfile::tempdir().unwrap();

        let result = processor(&api, dir.path()).bundle(&[], "batch_export");
        assert!(result.is_err());
    }
}
