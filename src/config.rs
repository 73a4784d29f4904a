use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- FOFA API 配置 ---
    pub fofa_api_url: String,
    pub fofa_key: String,
    /// 密钥文件，FOFA_KEY 为空时从这里读取
    pub key_file: String,
    /// 默认查询字段（逗号分隔）
    pub default_fields: String,
    /// 单条查询全量获取的每页大小
    pub page_size: u32,
    /// 批量导出的每页大小
    pub batch_page_size: u32,
    /// 单条查询全量获取的数据上限
    pub single_query_limit: u64,
    /// 批量导出的数据上限
    pub batch_limit: u64,
    // --- 请求策略 ---
    /// 单次请求的最大尝试次数
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    /// 翻页间隔（限流）
    pub page_delay_ms: u64,
    pub request_timeout_secs: u64,
    // --- 导出配置 ---
    /// 本地模式导出目录
    pub export_dir: String,
    /// Web 模式会话目录的根目录
    pub web_export_root: String,
    /// 下载服务器地址
    pub download_base_url: String,
    /// 是否以 Web 会话模式导出
    pub web_mode: bool,
    pub session_id: Option<String>,
    // --- 运行输入 ---
    pub query: Option<String>,
    /// 批量查询文件（每行一条）
    pub query_file: Option<String>,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fofa_api_url: "https://fofa.info/api/v1/search/all".to_string(),
            fofa_key: String::new(),
            key_file: "fofa_key.txt".to_string(),
            default_fields: "host,ip,port".to_string(),
            page_size: 1000,
            batch_page_size: 10000,
            single_query_limit: 100_000,
            batch_limit: 200_000,
            max_attempts: 3,
            retry_delay_ms: 3000,
            page_delay_ms: 1500,
            request_timeout_secs: 15,
            export_dir: "fofa_results".to_string(),
            web_export_root: "web_exports".to_string(),
            download_base_url: "http://localhost:8551".to_string(),
            web_mode: false,
            session_id: None,
            query: None,
            query_file: None,
            output_log_file: "fofa_export.log".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，缺失的字段使用默认值，环境变量优先
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            fofa_api_url: env_or("FOFA_API_URL", self.fofa_api_url),
            fofa_key: env_or("FOFA_KEY", self.fofa_key),
            key_file: env_or("KEY_FILE", self.key_file),
            default_fields: env_or("FOFA_FIELDS", self.default_fields),
            page_size: env_parse_or("PAGE_SIZE", self.page_size),
            batch_page_size: env_parse_or("BATCH_PAGE_SIZE", self.batch_page_size),
            single_query_limit: env_parse_or("SINGLE_QUERY_LIMIT", self.single_query_limit),
            batch_limit: env_parse_or("BATCH_LIMIT", self.batch_limit),
            max_attempts: env_parse_or("MAX_ATTEMPTS", self.max_attempts),
            retry_delay_ms: env_parse_or("RETRY_DELAY_MS", self.retry_delay_ms),
            page_delay_ms: env_parse_or("PAGE_DELAY_MS", self.page_delay_ms),
            request_timeout_secs: env_parse_or("REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            export_dir: env_or("EXPORT_DIR", self.export_dir),
            web_export_root: env_or("WEB_EXPORT_ROOT", self.web_export_root),
            download_base_url: env_or("DOWNLOAD_BASE_URL", self.download_base_url),
            web_mode: env_parse_or("WEB_MODE", self.web_mode),
            session_id: std::env::var("SESSION_ID").ok().or(self.session_id),
            query: std::env::var("QUERY").ok().or(self.query),
            query_file: std::env::var("QUERY_FILE").ok().or(self.query_file),
            output_log_file: env_or("OUTPUT_LOG_FILE", self.output_log_file),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
