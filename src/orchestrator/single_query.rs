//! 单条查询处理器 - 编排层
//!
//! 不经过批量编排，直接调用分页累加和 CSV 导出：
//! 全量获取（上限 10 万，失败页跳过）→ 导出

use crate::clients::SearchApi;
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{ApiKey, ArtifactLocation, FetchOutcome, PageFailure, PageResult, Query};
use crate::services::{CsvExporter, PageErrorPolicy, PaginationPlan, Paginator};
use std::sync::Arc;
use tracing::{info, warn};

/// 单条查询的处理结果
#[derive(Debug, Clone)]
pub struct SingleQueryReport {
    pub query: String,
    pub total: u64,
    pub record_count: usize,
    pub failed_pages: Vec<PageFailure>,
    /// 没有匹配结果时为 None
    pub artifact: Option<ArtifactLocation>,
}

impl SingleQueryReport {
    pub fn is_no_results(&self) -> bool {
        self.total == 0
    }
}

/// 单条查询处理器
pub struct SingleQueryRunner {
    paginator: Paginator,
    exporter: CsvExporter,
    plan: PaginationPlan,
}

impl SingleQueryRunner {
    pub fn new(api: Arc<dyn SearchApi>, exporter: CsvExporter, config: &Config) -> Self {
        Self {
            paginator: Paginator::new(api, config.page_delay()),
            exporter,
            plan: PaginationPlan {
                page_size: config.page_size,
                limit: config.single_query_limit,
                on_page_error: PageErrorPolicy::Skip,
            },
        }
    }

    /// 快速预览：只取第一页
    pub async fn preview(&self, key: &ApiKey, query: &Query, size: u32) -> AppResult<PageResult> {
        self.paginator.preview(key, query, size).await
    }

    /// 全量获取并导出
    ///
    /// `progress` 的参数为 (已写入序号, 本次导出的记录总数)
    pub async fn run(
        &self,
        key: &ApiKey,
        query: &Query,
        mut progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> AppResult<SingleQueryReport> {
        let set = match self.paginator.fetch_all(key, query, self.plan).await? {
            FetchOutcome::Records(set) => set,
            FetchOutcome::NoResults { .. } => {
                warn!("⚠️ 没有找到匹配的结果: {}", query);
                return Ok(SingleQueryReport {
                    query: query.expression().to_string(),
                    total: 0,
                    record_count: 0,
                    failed_pages: Vec::new(),
                    artifact: None,
                });
            }
        };

        if !set.failed_pages.is_empty() {
            warn!(
                "⚠️ {} 页获取失败，已获取 {}/{} 条",
                set.failed_pages.len(),
                set.len(),
                set.total
            );
        }

        let record_count = set.len();
        let mut on_record = |current: usize| {
            if let Some(cb) = progress.as_deref_mut() {
                cb(current, record_count);
            }
        };
        let artifact = self.exporter.export(
            &set.records,
            &set.fields,
            query.expression(),
            Some(&mut on_record),
        )?;
        info!("✓ 导出完成: {}", artifact);

        Ok(SingleQueryReport {
            query: query.expression().to_string(),
            total: set.total,
            record_count,
            failed_pages: set.failed_pages,
            artifact: Some(artifact),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, BusinessError};
    use crate::models::{ExportDestination, FieldList};
    use crate::test_helpers::{QueryScript, ScriptedApi};

    fn runner(api: &Arc<ScriptedApi>, dir: &std::path::Path) -> SingleQueryRunner {
        let config = Config {
            page_size: 100,
            page_delay_ms: 0,
            ..Config::default()
        };
        let exporter = CsvExporter::new(ExportDestination::Local {
            dir: dir.to_path_buf(),
        });
        SingleQueryRunner::new(api.clone(), exporter, &config)
    }

    #[tokio::test]
    async fn test_run_exports_all_pages() {
        let api = Arc::new(ScriptedApi::new().script("port=80", QueryScript::with_total(250)));
        let dir = tempfile::tempdir().unwrap();

        let report = runner(&api, dir.path())
            .run(
                &ApiKey::new("k"),
                &Query::new("port=80", FieldList::default()),
                None,
            )
            .await
            .unwrap();

        assert_eq!(report.total, 250);
        assert_eq!(report.record_count, 250);
        assert!(report.failed_pages.is_empty());
        let Some(ArtifactLocation::Path(path)) = report.artifact else {
            panic!("expected a local file");
        };
        let lines = std::fs::read_to_string(path).unwrap().lines().count();
        assert_eq!(lines, 251);
    }

    #[tokio::test]
    async fn test_run_progress_reports_record_total() {
        let api = Arc::new(ScriptedApi::new().script("port=443", QueryScript::with_total(250)));
        let dir = tempfile::tempdir().unwrap();

        let mut calls = Vec::new();
        let mut on_progress = |current: usize, total: usize| calls.push((current, total));
        runner(&api, dir.path())
            .run(
                &ApiKey::new("k"),
                &Query::new("port=443", FieldList::default()),
                Some(&mut on_progress),
            )
            .await
            .unwrap();

        assert!(calls.len() <= 101);
        assert!(calls.iter().all(|&(_, total)| total == 250));
        assert_eq!(calls.last().copied(), Some((250, 250)));
    }

    #[tokio::test]
    async fn test_run_no_results_is_not_error() {
        let api = Arc::new(ScriptedApi::new().script("port=1", QueryScript::with_total(0)));
        let dir = tempfile::tempdir().unwrap();

        let report = runner(&api, dir.path())
            .run(
                &ApiKey::new("k"),
                &Query::new("port=1", FieldList::default()),
                None,
            )
            .await
            .unwrap();

        assert!(report.is_no_results());
        assert!(report.artifact.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_over_single_limit() {
        let api = Arc::new(ScriptedApi::new().script("q", QueryScript::with_total(150_000)));
        let dir = tempfile::tempdir().unwrap();

        let err = runner(&api, dir.path())
            .run(&ApiKey::new("k"), &Query::new("q", FieldList::default()), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Business(BusinessError::OverLimit { limit: 100_000, .. })
        ));
        assert_eq!(api.calls().len(), 1);
    }
}
