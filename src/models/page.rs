use serde::Deserialize;
use serde_json::Value;

/// 一条记录，按位置与字段列表对齐，值可能为 null
pub type Record = Vec<Value>;

/// FOFA API 原始响应
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub errmsg: Option<String>,
    /// 查询命中的总数
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub results: Vec<Value>,
}

/// 单页查询结果
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// 查询命中的总数
    pub total: u64,
    /// 实际返回的字段顺序
    pub fields: Vec<String>,
    pub records: Vec<Record>,
}

impl PageResult {
    /// 由 API 响应构建；只请求一个字段时 API 会直接返回标量，统一包装成单列记录
    pub fn from_response(response: SearchResponse, requested: &[String]) -> Self {
        let fields = response
            .fields
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| requested.to_vec());
        let records = response
            .results
            .into_iter()
            .map(|row| match row {
                Value::Array(values) => values,
                scalar => vec![scalar],
            })
            .collect();

        Self {
            total: response.size,
            fields,
            records,
        }
    }
}

/// 翻页失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page: u32,
    pub error: String,
    /// 该页请求成功但没有数据（不会中断翻页）
    pub empty: bool,
}

/// 单条查询全部页面合并后的结果
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub total: u64,
    pub fields: Vec<String>,
    pub records: Vec<Record>,
    /// 获取失败的页（跳过或中断）
    pub failed_pages: Vec<PageFailure>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 是否拿到了全部记录
    pub fn is_complete(&self) -> bool {
        self.records.len() as u64 >= self.total
    }
}

/// 全量获取的结果：有数据，或明确的“没有找到匹配的结果”
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Records(ResultSet),
    NoResults { fields: Vec<String> },
}

impl FetchOutcome {
    pub fn record_count(&self) -> usize {
        match self {
            FetchOutcome::Records(set) => set.len(),
            FetchOutcome::NoResults { .. } => 0,
        }
    }
}

/// 把单元格值转换成 CSV 文本，null 为空串
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
