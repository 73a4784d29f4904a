//! 单元测试共用的脚本化 SearchApi

use crate::clients::SearchApi;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{ApiKey, PageResult, Query};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// 单条查询的脚本
#[derive(Debug, Clone, Default)]
pub struct QueryScript {
    pub total: u64,
    /// 预览（size=1）直接报错
    pub preview_error: Option<String>,
    /// 这些页返回传输错误
    pub failing_pages: HashSet<u32>,
    /// 这些页返回空结果
    pub empty_pages: HashSet<u32>,
}

impl QueryScript {
    pub fn with_total(total: u64) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn failing(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn empty(mut self, page: u32) -> Self {
        self.empty_pages.insert(page);
        self
    }

    pub fn preview_error(mut self, message: &str) -> Self {
        self.preview_error = Some(message.to_string());
        self
    }
}

/// 记录每次调用 (查询, 页码, 每页大小)
#[derive(Default)]
pub struct ScriptedApi {
    scripts: HashMap<String, QueryScript>,
    calls: Mutex<Vec<(String, u32, u32)>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, query: &str, script: QueryScript) -> Self {
        self.scripts.insert(query.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<(String, u32, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, query: &str) -> Vec<(u32, u32)> {
        self.calls()
            .into_iter()
            .filter(|(q, _, _)| q == query)
            .map(|(_, page, size)| (page, size))
            .collect()
    }
}

#[async_trait]
impl SearchApi for ScriptedApi {
    async fn fetch_page(
        &self,
        _key: &ApiKey,
        query: &Query,
        page: u32,
        size: u32,
    ) -> AppResult<PageResult> {
        self.calls
            .lock()
            .unwrap()
            .push((query.expression().to_string(), page, size));

        let script = self
            .scripts
            .get(query.expression())
            .ok_or_else(|| AppError::Api(ApiError::Remote("unknown query".to_string())))?;

        if size == 1 {
            if let Some(message) = &script.preview_error {
                return Err(AppError::Api(ApiError::Remote(message.clone())));
            }
        }
        if script.failing_pages.contains(&page) {
            return Err(AppError::Api(ApiError::Transport {
                attempts: 3,
                message: format!("page {} down", page),
            }));
        }

        let fields = query.fields().as_slice().to_vec();
        let start = (page as u64 - 1) * size as u64;
        let count = if script.empty_pages.contains(&page) {
            0
        } else {
            script.total.saturating_sub(start).min(size as u64)
        };
        let records = (0..count)
            .map(|i| {
                fields
                    .iter()
                    .map(|f| json!(format!("{}-{}", f, start + i)))
                    .collect()
            })
            .collect();

        Ok(PageResult {
            total: script.total,
            fields,
            records,
        })
    }
}
