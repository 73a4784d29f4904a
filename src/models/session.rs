//! 会话与导出位置
//!
//! Web 模式下每个会话拥有独立的导出目录，下载服务器按
//! `base_url/{session_id}/{filename}` 提供文件

use crate::error::{AppError, AppResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// 导出会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    dir: PathBuf,
    base_url: String,
}

impl Session {
    /// 创建会话并确保会话目录存在
    pub fn create(
        root: impl AsRef<Path>,
        id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> AppResult<Self> {
        let id = id.into();
        let dir = root.as_ref().join(&id);
        std::fs::create_dir_all(&dir).map_err(|e| AppError::io(dir.display().to_string(), e))?;

        Ok(Self {
            id,
            dir,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 以随机 ID 创建会话
    pub fn generate(root: impl AsRef<Path>, base_url: impl Into<String>) -> AppResult<Self> {
        Self::create(root, uuid::Uuid::new_v4().simple().to_string(), base_url)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 构建下载地址
    pub fn locator(&self, file_name: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.id, file_name)
    }
}

/// 导出目标
#[derive(Debug, Clone)]
pub enum ExportDestination {
    /// 本地目录，返回文件路径
    Local { dir: PathBuf },
    /// 会话目录，返回下载地址
    Session(Session),
}

impl ExportDestination {
    pub fn dir(&self) -> &Path {
        match self {
            ExportDestination::Local { dir } => dir,
            ExportDestination::Session(session) => session.dir(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            ExportDestination::Session(session) => Some(session),
            ExportDestination::Local { .. } => None,
        }
    }

    /// 文件写入后对外暴露的位置
    pub fn location_for(&self, path: PathBuf) -> ArtifactLocation {
        match self {
            ExportDestination::Local { .. } => ArtifactLocation::Path(path),
            ExportDestination::Session(session) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                ArtifactLocation::Locator(session.locator(&file_name))
            }
        }
    }
}

/// 导出产物的位置：本地路径或下载地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Path(PathBuf),
    Locator(String),
}

impl ArtifactLocation {
    /// 产物的文件名（下载地址取最后一段）
    pub fn file_name(&self) -> Option<String> {
        match self {
            ArtifactLocation::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
            ArtifactLocation::Locator(url) => url
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactLocation::Path(path) => write!(f, "{}", path.display()),
            ArtifactLocation::Locator(url) => write!(f, "{}", url),
        }
    }
}
