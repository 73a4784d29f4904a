use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从文本文件加载批量查询，每行一条，保留空行由编排层跳过
pub async fn load_queries(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取查询文件: {}", path.display()))?;

    let queries: Vec<String> = content.lines().map(str::to_string).collect();
    tracing::info!(
        "从 {} 加载 {} 行查询",
        path.file_name().unwrap_or_default().to_string_lossy(),
        queries.len()
    );

    Ok(queries)
}
