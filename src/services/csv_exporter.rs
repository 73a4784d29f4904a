//! CSV 导出服务 - 业务能力层
//!
//! 把一条查询的结果写成 CSV，每行末尾附加原始查询语句

use crate::error::{AppError, AppResult, BusinessError};
use crate::models::page::render_value;
use crate::models::{ArtifactLocation, ExportDestination, Record};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info};

/// 附加在表头末尾的查询列名
pub const QUERY_COLUMN: &str = "fofa_query";

/// 进度回调的最大次数（不含最后一次）
const MAX_PROGRESS_UPDATES: usize = 100;

/// 同名文件存在时最多尝试的序号数
const MAX_NAME_ATTEMPTS: usize = 1000;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// CSV 导出器
#[derive(Debug, Clone)]
pub struct CsvExporter {
    destination: ExportDestination,
}

impl CsvExporter {
    pub fn new(destination: ExportDestination) -> Self {
        Self { destination }
    }

    pub fn destination(&self) -> &ExportDestination {
        &self.destination
    }

    /// 导出记录
    ///
    /// # 参数
    /// - `records`: 记录列表，不能为空
    /// - `fields`: 表头字段，记录按位置对齐
    /// - `query`: 原始查询语句，作为最后一列写入每一行
    /// - `progress`: 进度回调，参数为已写入的记录序号；最多回调约 100 次，最后一次一定是记录总数
    ///
    /// # 返回
    /// 本地模式返回文件路径，会话模式返回下载地址
    pub fn export(
        &self,
        records: &[Record],
        fields: &[String],
        query: &str,
        mut progress: Option<&mut dyn FnMut(usize)>,
    ) -> AppResult<ArtifactLocation> {
        if records.is_empty() {
            return Err(BusinessError::EmptyInput.into());
        }

        let dir = self.destination.dir();
        std::fs::create_dir_all(dir).map_err(|e| AppError::io(dir.display().to_string(), e))?;

        let (path, file) = create_unique_file(dir, &artifact_stem(query), "csv")?;
        let path_str = path.display().to_string();

        let result = write_rows(file, records, fields, query, &mut progress);
        if let Err(e) = result {
            error!("导出CSV失败: {}", e);
            return Err(AppError::csv(path_str, e));
        }

        // 确保进度显示 100%
        if let Some(cb) = progress.as_deref_mut() {
            cb(records.len());
        }

        info!("数据已成功导出到: {} ({} 条)", path_str, records.len());
        Ok(self.destination.location_for(path))
    }
}

fn write_rows(
    file: File,
    records: &[Record],
    fields: &[String],
    query: &str,
    progress: &mut Option<&mut dyn FnMut(usize)>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(file);

    let mut header: Vec<&str> = fields.iter().map(String::as_str).collect();
    header.push(QUERY_COLUMN);
    writer.write_record(&header)?;

    let stride = progress_stride(records.len());
    for (i, record) in records.iter().enumerate() {
        let mut row: Vec<String> = (0..fields.len())
            .map(|col| record.get(col).map(render_value).unwrap_or_default())
            .collect();
        row.push(query.to_string());
        writer.write_record(&row)?;

        if i % stride == 0 {
            if let Some(cb) = progress.as_deref_mut() {
                cb(i);
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// 回调间隔，保证中间回调不超过 100 次
pub fn progress_stride(total: usize) -> usize {
    total.div_ceil(MAX_PROGRESS_UPDATES).max(1)
}

/// `fofa_search_{时间戳}_{查询摘要}`
fn artifact_stem(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!(
        "fofa_search_{}_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        hash
    )
}

/// 以 create-new 方式创建 `{stem}_{seq}.{ext}`，已存在则换下一个序号，从不覆盖已有文件
pub(crate) fn create_unique_file(dir: &Path, stem: &str, ext: &str) -> AppResult<(PathBuf, File)> {
    let mut last_err = None;
    for _ in 0..MAX_NAME_ATTEMPTS {
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{}_{}.{}", stem, seq, ext));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => last_err = Some(e),
            Err(e) => return Err(AppError::io(path.display().to_string(), e)),
        }
    }
    let err = last_err.unwrap_or_else(|| std::io::Error::from(ErrorKind::AlreadyExists));
    Err(AppError::io(dir.join(stem).display().to_string(), err))
}
