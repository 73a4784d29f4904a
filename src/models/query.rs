use serde::{Deserialize, Serialize};
use std::fmt;

/// 未指定字段时使用的默认字段
pub const DEFAULT_FIELDS: &[&str] = &["host", "ip", "port"];

/// FOFA API 密钥
///
/// Debug 输出不会泄露密钥内容
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey(***)")
    }
}

/// 有序的查询字段列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldList(Vec<String>);

impl FieldList {
    /// 解析逗号分隔的字段，空白项会被忽略
    pub fn parse(raw: &str) -> Self {
        let fields: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        Self::from_vec(fields)
    }

    pub fn from_vec(fields: Vec<String>) -> Self {
        if fields.is_empty() {
            Self::default()
        } else {
            Self(fields)
        }
    }

    /// 请求参数格式：`host,ip,port`
    pub fn joined(&self) -> String {
        self.0.join(",")
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldList {
    fn default() -> Self {
        Self(DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect())
    }
}

/// 一条查询：查询语句 + 字段列表，提交后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    expression: String,
    fields: FieldList,
}

impl Query {
    pub fn new(expression: impl Into<String>, fields: FieldList) -> Self {
        Self {
            expression: expression.into(),
            fields,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn fields(&self) -> &FieldList {
        &self.fields
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_list_parse() {
        let fields = FieldList::parse(" host, ip ,,port ");
        assert_eq!(fields.as_slice(), &["host", "ip", "port"]);
        assert_eq!(fields.joined(), "host,ip,port");
    }

    #[test]
    fn test_field_list_blank_falls_back() {
        assert_eq!(FieldList::parse(" , "), FieldList::default());
    }

    #[test]
    fn test_api_key_debug_redacted() {
        let key = ApiKey::new(" secret ");
        assert_eq!(key.as_str(), "secret");
        assert!(!format!("{:?}", key).contains("secret"));
    }
}
