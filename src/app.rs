use crate::clients::{FofaClient, SearchApi};
use crate::config::Config;
use crate::models::{load_queries, ApiKey, ExportDestination, FieldList, Query, Session};
use crate::orchestrator::{BatchProcessor, BatchProgress, SingleQueryRunner};
use crate::services::{CredentialStore, CsvExporter, FileCredentialStore};
use crate::utils::logging::{log_startup, print_batch_summary, print_preview_table};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    api: Arc<dyn SearchApi>,
    destination: ExportDestination,
    fields: FieldList,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        let api: Arc<dyn SearchApi> = Arc::new(FofaClient::new(&config)?);
        let destination = build_destination(&config)?;
        let fields = FieldList::parse(&config.default_fields);

        Ok(Self {
            config,
            api,
            destination,
            fields,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let key = self.resolve_key()?;

        if let Some(query_file) = &self.config.query_file {
            log_startup("批量导出模式", &self.fields.joined());
            return self.run_batch(&key, Path::new(query_file)).await;
        }

        if let Some(query) = &self.config.query {
            log_startup("单条查询模式", &self.fields.joined());
            return self.run_single(&key, query).await;
        }

        warn!("⚠️ 没有指定 QUERY 或 QUERY_FILE，程序结束");
        Ok(())
    }

    /// 优先使用配置中的密钥并保存，否则从密钥文件读取
    fn resolve_key(&self) -> Result<ApiKey> {
        let store = FileCredentialStore::new(&self.config.key_file);
        let configured = ApiKey::new(self.config.fofa_key.as_str());

        if !configured.is_empty() {
            if let Err(e) = store.save(&configured) {
                warn!("保存密钥失败: {}", e);
            }
            return Ok(configured);
        }

        match store.load()? {
            Some(key) => Ok(key),
            None => bail!("未配置 FOFA API 密钥 (FOFA_KEY 或 {})", self.config.key_file),
        }
    }

    async fn run_single(&self, key: &ApiKey, expr: &str) -> Result<()> {
        let runner = SingleQueryRunner::new(
            self.api.clone(),
            CsvExporter::new(self.destination.clone()),
            &self.config,
        );
        let query = Query::new(expr.trim(), self.fields.clone());

        let mut last_percent = None;
        let mut on_progress = |current: usize, total: usize| {
            // 每 10% 写一次日志
            let percent = (current * 100 / total.max(1)) as u32 / 10 * 10;
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                info!("⏳ 导出进度: {}/{} ({}%)", current, total, percent);
            }
        };

        let report = runner
            .run(key, &query, Some(&mut on_progress))
            .await
            .with_context(|| format!("查询失败: {}", expr))?;

        match &report.artifact {
            Some(artifact) => info!(
                "✅ 共获取 {}/{} 条，已导出: {}",
                report.record_count, report.total, artifact
            ),
            None => info!("没有找到匹配的结果"),
        }
        Ok(())
    }

    async fn run_batch(&self, key: &ApiKey, query_file: &Path) -> Result<()> {
        let queries = load_queries(query_file).await?;
        let processor = BatchProcessor::new(
            self.api.clone(),
            CsvExporter::new(self.destination.clone()),
            &self.config,
        );

        let (previews, preview_errors) = processor.preview(key, &queries, &self.fields).await;
        print_preview_table(&previews);
        for line in &preview_errors {
            warn!("{}", line);
        }

        let mut last_percent = None;
        let mut on_progress = |p: BatchProgress| {
            let percent = (p.overall * 100.0).floor() as u32;
            if last_percent != Some(percent) && percent % 10 == 0 {
                last_percent = Some(percent);
                info!("⏳ 批量进度: {}/{} ({}%)", p.completed, p.total, percent);
            }
        };
        let report = processor
            .export_batch(
                key,
                &queries,
                &self.fields,
                self.config.batch_page_size,
                Some(&mut on_progress),
            )
            .await;

        for line in &report.error_log {
            warn!("{}", line);
        }
        print_batch_summary(&report.outcomes, &self.config.output_log_file);

        if self.destination.session().is_some() && !report.artifacts.is_empty() {
            match processor.bundle(&report.artifacts, "batch_export") {
                Ok(location) => info!("📦 批量压缩包: {}", location),
                Err(e) => error!("❌ 创建 ZIP 失败: {}", e),
            }
        }

        Ok(())
    }
}

fn build_destination(config: &Config) -> Result<ExportDestination> {
    if !config.web_mode {
        return Ok(ExportDestination::Local {
            dir: PathBuf::from(&config.export_dir),
        });
    }

    let session = match &config.session_id {
        Some(id) => Session::create(&config.web_export_root, id.as_str(), &config.download_base_url)?,
        None => Session::generate(&config.web_export_root, &config.download_base_url)?,
    };
    info!("🌐 会话目录: {}", session.dir().display());
    Ok(ExportDestination::Session(session))
}
