use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 业务逻辑错误
    #[error("{0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（连接错误、超时、429/5xx），已用尽重试次数
    #[error("达到最大重试次数 {attempts}，请求失败: {message}")]
    Transport { attempts: usize, message: String },
    /// 单次网络请求失败（尚未判断是否重试）
    #[error("请求出错: {message}")]
    Request {
        message: String,
        retryable: bool,
    },
    /// 服务器拒绝请求（不可重试的 HTTP 状态码）
    #[error("服务器返回状态码 {status}: {body}")]
    BadStatus { status: u16, body: String },
    /// API 返回 error=true
    #[error("{0}")]
    Remote(String),
    /// JSON 解析失败
    #[error("无法解析API返回的JSON数据")]
    Decode,
}

impl ApiError {
    /// 是否为可重试的网络层错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Request { retryable: true, .. })
    }

    /// 是否为可重试的 HTTP 状态码
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // 请求地址里带着 key 参数，不能出现在错误信息中
        let err = err.without_url();
        let retryable = err.is_timeout()
            || err.is_connect()
            || err.is_request()
            || err
                .status()
                .map(|s| ApiError::is_retryable_status(s.as_u16()))
                .unwrap_or(false);
        ApiError::Request {
            message: err.to_string(),
            retryable,
        }
    }
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 结果总数超过上限
    #[error("数据量过大: {total} 条，超过 {limit} 条限制，请缩小查询范围")]
    OverLimit { total: u64, limit: u64 },
    /// 没有可导出的数据
    #[error("没有数据可导出")]
    EmptyInput,
    /// 非会话模式不支持打包
    #[error("仅 Web 模式支持批量 ZIP")]
    UnsupportedMode,
    /// 压缩包中没有任何文件
    #[error("创建的压缩包为空，没有有效文件可添加")]
    EmptyArchive,
    /// 压缩包文件没有生成
    #[error("压缩包文件创建失败")]
    ArchiveNotCreated,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读写文件失败
    #[error("读写文件失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// CSV 写入失败
    #[error("写入CSV失败 ({path}): {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// ZIP 写入失败
    #[error("写入ZIP失败 ({path}): {source}")]
    Zip {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("配置文件解析失败 {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读写错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::Io {
            path: path.into(),
            source,
        })
    }

    /// 创建 CSV 写入错误
    pub fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        AppError::File(FileError::Csv {
            path: path.into(),
            source,
        })
    }

    /// 创建 ZIP 写入错误
    pub fn zip(path: impl Into<String>, source: zip::result::ZipError) -> Self {
        AppError::File(FileError::Zip {
            path: path.into(),
            source,
        })
    }

    /// 创建超限错误
    pub fn over_limit(total: u64, limit: u64) -> Self {
        AppError::Business(BusinessError::OverLimit { total, limit })
    }

    /// 面向用户的错误消息（不带分类前缀）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(e) => e.to_string(),
            AppError::Business(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_status() {
        for status in [429, 500, 502, 503, 504] {
            assert!(ApiError::is_retryable_status(status));
        }
        assert!(!ApiError::is_retryable_status(400));
        assert!(!ApiError::is_retryable_status(401));
        assert!(!ApiError::is_retryable_status(404));
    }

    #[test]
    fn test_over_limit_message_names_limit() {
        let err = AppError::over_limit(250_000, 200_000);
        let msg = err.user_message();
        assert!(msg.contains("250000"));
        assert!(msg.contains("200000"));
        assert!(msg.contains("数据量过大"));
    }

    #[test]
    fn test_transport_message_names_attempts() {
        let err = ApiError::Transport {
            attempts: 3,
            message: "503".to_string(),
        };
        assert!(err.to_string().contains("3"));
        assert!(!err.is_retryable());
    }
}
