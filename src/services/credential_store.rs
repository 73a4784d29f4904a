//! API 密钥存储
//!
//! 加密存储由外部组件负责，这里只定义存取接口和一个文件实现

use crate::error::{AppError, AppResult};
use crate::models::ApiKey;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 密钥存取接口
pub trait CredentialStore {
    /// 读取密钥，不存在时返回 `None`
    fn load(&self) -> AppResult<Option<ApiKey>>;
    fn save(&self, key: &ApiKey) -> AppResult<()>;
}

/// 单文件密钥存储
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> AppResult<Option<ApiKey>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let key = ApiKey::new(content);
                if key.is_empty() {
                    warn!("密钥文件为空: {}", self.path.display());
                    Ok(None)
                } else {
                    Ok(Some(key))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::io(self.path.display().to_string(), e)),
        }
    }

    fn save(&self, key: &ApiKey) -> AppResult<()> {
        let path_str = self.path.display().to_string();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AppError::io(path_str.clone(), e))?;
        }
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| AppError::io(path_str.clone(), e))?;

        // mode 只对新建文件生效，已存在的文件需要收紧权限
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| AppError::io(path_str.clone(), e))?;
        }
        file.write_all(key.as_str().as_bytes())
            .map_err(|e| AppError::io(path_str.clone(), e))?;

        info!("API密钥已保存到 {}", path_str);
        Ok(())
    }
}
