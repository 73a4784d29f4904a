//! FOFA API 客户端
//!
//! 封装单页查询的请求构建、重试和响应分类
use crate::config::Config;
use crate::error::{ApiError, AppResult};
use crate::models::{ApiKey, PageResult, Query, SearchResponse};
use crate::utils::logging::truncate_text;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// 单页查询能力
///
/// 分页层和编排层只依赖这个 trait，不关心具体的 HTTP 实现
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// 获取一页数据
    ///
    /// # 参数
    /// - `key`: API 密钥（每次调用显式传入）
    /// - `query`: 查询语句与字段
    /// - `page`: 页码，从 1 开始
    /// - `size`: 每页大小
    async fn fetch_page(
        &self,
        key: &ApiKey,
        query: &Query,
        page: u32,
        size: u32,
    ) -> AppResult<PageResult>;
}

/// FOFA HTTP 客户端
pub struct FofaClient {
    http: reqwest::Client,
    api_url: String,
    max_attempts: usize,
    retry_delay: Duration,
}

impl FofaClient {
    /// 创建新的 FOFA 客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_endpoint(
            &config.fofa_api_url,
            config.max_attempts,
            config.retry_delay(),
            config.request_timeout(),
        )
    }

    /// 使用自定义地址和重试策略创建
    pub fn with_endpoint(
        api_url: impl Into<String>,
        max_attempts: usize,
        retry_delay: Duration,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            max_attempts: max_attempts.max(1),
            retry_delay,
        })
    }

    /// 发送一次请求并分类响应
    async fn send_once(
        &self,
        key: &ApiKey,
        query: &Query,
        page: u32,
        size: u32,
    ) -> Result<PageResult, ApiError> {
        let qbase64 = STANDARD.encode(query.expression().as_bytes());
        let fields = query.fields().joined();
        let page = page.to_string();
        let size = size.to_string();

        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("key", key.as_str()),
                ("qbase64", qbase64.as_str()),
                ("fields", fields.as_str()),
                ("page", page.as_str()),
                ("size", size.as_str()),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            if ApiError::is_retryable_status(status) {
                return Err(ApiError::Request {
                    message: format!("HTTP {}", status),
                    retryable: true,
                });
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::BadStatus {
                status,
                body: truncate_text(&body, 200),
            });
        }

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            debug!("响应解析失败: {}", e);
            ApiError::Decode
        })?;

        if parsed.error {
            let message = parsed.errmsg.unwrap_or_else(|| "未知错误".to_string());
            return Err(ApiError::Remote(message));
        }

        Ok(PageResult::from_response(parsed, query.fields().as_slice()))
    }
}

#[async_trait]
impl SearchApi for FofaClient {
    async fn fetch_page(
        &self,
        key: &ApiKey,
        query: &Query,
        page: u32,
        size: u32,
    ) -> AppResult<PageResult> {
        // 页码从 1 开始
        let page = page.max(1);
        info!(
            "正在查询: {}, 字段: {}, 页码: {}, 每页: {}",
            truncate_text(query.expression(), 80),
            query.fields().joined(),
            page,
            size
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(key, query, page, size).await {
                Ok(result) => {
                    info!(
                        "成功获取第 {} 页数据，共 {} 条记录",
                        page,
                        result.records.len()
                    );
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "请求失败，将在 {} 毫秒后重试 (第 {}/{} 次): {}",
                        self.retry_delay.as_millis(),
                        attempt,
                        self.max_attempts,
                        e
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) if e.is_retryable() => {
                    let err = ApiError::Transport {
                        attempts: attempt,
                        message: e.to_string(),
                    };
                    error!("{}", err);
                    return Err(err.into());
                }
                Err(e) => {
                    error!("API错误: {}", e);
                    return Err(e.into());
                }
            }
        }
    }
}
