use crate::models::session::ArtifactLocation;

/// 批量预览中单条查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOutcome {
    pub query: String,
    pub total: u64,
    pub error: Option<String>,
    /// 0 < total <= 上限
    pub valid: bool,
}

/// 批量导出中单条查询的结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemOutcome {
    pub query: String,
    pub record_count: usize,
    pub result: Result<ArtifactLocation, String>,
}

impl BatchItemOutcome {
    pub fn success(query: impl Into<String>, record_count: usize, artifact: ArtifactLocation) -> Self {
        Self {
            query: query.into(),
            record_count,
            result: Ok(artifact),
        }
    }

    pub fn failure(query: impl Into<String>, record_count: usize, error: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            record_count,
            result: Err(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn artifact(&self) -> Option<&ArtifactLocation> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}

/// 批量导出的汇总
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// 每条非空查询一项，顺序与输入一致
    pub outcomes: Vec<BatchItemOutcome>,
    pub error_log: Vec<String>,
    /// 成功导出的文件，用于打包
    pub artifacts: Vec<ArtifactLocation>,
}
