//! 压缩包打包服务 - 业务能力层
//!
//! 把会话目录中导出的多个 CSV 打成一个 ZIP，供下载服务器提供下载

use crate::error::{AppError, AppResult, BusinessError};
use crate::models::{ArtifactLocation, ExportDestination, Session};
use crate::services::csv_exporter::create_unique_file;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// ZIP 打包器
pub struct ArchiveBuilder<'a> {
    destination: &'a ExportDestination,
}

impl<'a> ArchiveBuilder<'a> {
    pub fn new(destination: &'a ExportDestination) -> Self {
        Self { destination }
    }

    /// 打包导出文件
    ///
    /// # 参数
    /// - `artifacts`: 文件路径或下载地址；下载地址按文件名在会话目录中查找
    /// - `base_name`: 压缩包名前缀
    ///
    /// # 返回
    /// 压缩包的下载地址。不存在的文件会被跳过；一个文件都没加进去时返回空包错误。
    pub fn bundle(
        &self,
        artifacts: &[ArtifactLocation],
        base_name: &str,
    ) -> AppResult<ArtifactLocation> {
        let session = self
            .destination
            .session()
            .ok_or(BusinessError::UnsupportedMode)?;

        let stem = format!(
            "{}_{}",
            base_name,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let (zip_path, file) = create_unique_file(session.dir(), &stem, "zip")?;
        let zip_str = zip_path.display().to_string();

        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut entry_names = HashSet::new();
        for artifact in artifacts {
            let Some(source) = resolve(session, artifact) else {
                warn!("无法解析文件位置: {}", artifact);
                continue;
            };
            if !source.is_file() {
                warn!("文件不存在: {}", source.display());
                continue;
            }

            let arcname = source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !entry_names.insert(arcname.clone()) {
                warn!("压缩包中已有同名文件，跳过: {}", source.display());
                continue;
            }
            zip.start_file(arcname.as_str(), options)
                .map_err(|e| AppError::zip(zip_str.clone(), e))?;
            let mut input =
                File::open(&source).map_err(|e| AppError::io(source.display().to_string(), e))?;
            std::io::copy(&mut input, &mut zip).map_err(|e| AppError::io(zip_str.clone(), e))?;
            info!("已添加文件到压缩包: {} -> {}", source.display(), arcname);
        }

        zip.finish().map_err(|e| AppError::zip(zip_str.clone(), e))?;

        check_archive(&zip_path)?;

        let file_name = zip_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(ArtifactLocation::Locator(session.locator(&file_name)))
    }
}

/// 下载地址取最后一段在会话目录中查找，路径原样使用
fn resolve(session: &Session, artifact: &ArtifactLocation) -> Option<PathBuf> {
    match artifact {
        ArtifactLocation::Path(path) => Some(path.clone()),
        ArtifactLocation::Locator(_) => artifact.file_name().map(|name| session.dir().join(name)),
    }
}

/// 事后检查生成的压缩包：没生成、或者没有任何条目都算失败
fn check_archive(zip_path: &Path) -> AppResult<()> {
    let zip_str = zip_path.display().to_string();
    let size = match std::fs::metadata(zip_path) {
        Ok(meta) => meta.len(),
        Err(_) => {
            error!("压缩包文件未创建");
            return Err(BusinessError::ArchiveNotCreated.into());
        }
    };

    let file = File::open(zip_path).map_err(|e| AppError::io(zip_str.clone(), e))?;
    let entries = ZipArchive::new(file)
        .map_err(|e| AppError::zip(zip_str.clone(), e))?
        .len();

    if size == 0 || entries == 0 {
        error!("创建的压缩包为空");
        // 空包是本次刚创建的，删除它不影响已有文件
        if let Err(e) = std::fs::remove_file(zip_path) {
            warn!("删除空压缩包失败 {}: {}", zip_str, e);
        }
        return Err(BusinessError::EmptyArchive.into());
    }

    info!("压缩包创建成功，大小: {} 字节，共 {} 个文件", size, entries);
    Ok(())
}
