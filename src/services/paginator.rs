//! 分页累加服务 - 业务能力层
//!
//! 对单条查询反复翻页，直到取完所有页或触发上限

use crate::clients::SearchApi;
use crate::error::{AppError, AppResult};
use crate::models::{ApiKey, FetchOutcome, PageFailure, PageResult, Query, ResultSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// 单页失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageErrorPolicy {
    /// 记录并跳过该页，继续后续页
    Skip,
    /// 记录并停止翻页，保留已获取的数据
    Abort,
}

/// 一次全量获取的参数
#[derive(Debug, Clone, Copy)]
pub struct PaginationPlan {
    pub page_size: u32,
    /// 总数超过该值直接拒绝
    pub limit: u64,
    pub on_page_error: PageErrorPolicy,
}

/// 分页累加器
#[derive(Clone)]
pub struct Paginator {
    api: Arc<dyn SearchApi>,
    page_delay: Duration,
}

impl Paginator {
    pub fn new(api: Arc<dyn SearchApi>, page_delay: Duration) -> Self {
        Self { api, page_delay }
    }

    /// 只取第一页
    pub async fn preview(&self, key: &ApiKey, query: &Query, size: u32) -> AppResult<PageResult> {
        self.api.fetch_page(key, query, 1, size.max(1)).await
    }

    /// 获取查询的全部数据
    ///
    /// 先取第 1 页得到总数和字段顺序：
    /// - 第 1 页失败直接返回错误
    /// - 总数超过上限返回超限错误，不再翻页
    /// - 总数为 0 返回 `NoResults`
    ///
    /// 其余页按顺序获取，每页之前等待固定间隔。单页失败按策略跳过或中断，
    /// 因此最终记录数可能少于总数。
    pub async fn fetch_all(
        &self,
        key: &ApiKey,
        query: &Query,
        plan: PaginationPlan,
    ) -> AppResult<FetchOutcome> {
        let page_size = plan.page_size.max(1);
        let first = self.api.fetch_page(key, query, 1, page_size).await?;

        let total = first.total;
        if total > plan.limit {
            warn!("数据量过大: {} 条，超过 {} 条限制", total, plan.limit);
            return Err(AppError::over_limit(total, plan.limit));
        }
        if total == 0 {
            info!("没有找到匹配的结果: {}", query);
            return Ok(FetchOutcome::NoResults {
                fields: first.fields,
            });
        }

        let total_pages = total_pages(total, page_size);
        let mut set = ResultSet {
            total,
            fields: first.fields,
            records: first.records,
            failed_pages: Vec::new(),
        };

        for page in 2..=total_pages {
            sleep(self.page_delay).await;

            match self.api.fetch_page(key, query, page, page_size).await {
                Ok(page_data) if page_data.records.is_empty() => {
                    warn!("第 {} 页数据为空，跳过该页", page);
                    set.failed_pages.push(PageFailure {
                        page,
                        error: "数据为空".to_string(),
                        empty: true,
                    });
                }
                Ok(page_data) => set.records.extend(page_data.records),
                Err(e) => {
                    error!("获取第 {} 页数据失败: {}", page, e);
                    set.failed_pages.push(PageFailure {
                        page,
                        error: e.user_message(),
                        empty: false,
                    });
                    if plan.on_page_error == PageErrorPolicy::Abort {
                        warn!("停止翻页，已获取 {} 条记录", set.records.len());
                        break;
                    }
                }
            }
        }

        info!(
            "全量数据获取完成，共 {} 条记录 (总数 {})",
            set.records.len(),
            total
        );
        Ok(FetchOutcome::Records(set))
    }
}

/// ceil(total / page_size)
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX)
}
