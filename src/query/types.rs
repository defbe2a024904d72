// query/types.rs - 过滤规则相关类型定义
//! 定义输入值、规则描述符与命令链的结构

use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// 单个输入值（通常来自请求参数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InputValue {
    /// 显式的空值
    Null,
    /// 标量值，可能是逗号拼接的多个值
    Text(String),
    /// 数组值
    List(Vec<String>),
}

impl InputValue {
    /// 值是否"已设置且非 null"（谓词执行前的存在性判断）
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Null)
    }

    /// 值是否为空（null、空字符串、空数组）
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// 标量值
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// 转换为值集合：数组原样返回，标量按逗号拆分
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Self::Null => Vec::new(),
            Self::Text(text) => text.split(',').map(str::to_string).collect(),
            Self::List(items) => items.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for InputValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde_json::Value;

        fn scalar_text(value: Value) -> Option<String> {
            match value {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
                _ => None,
            }
        }

        match Value::deserialize(deserializer)? {
            // 顶层空字符串按 null 处理，与请求层的空串转换一致
            Value::Null => Ok(Self::Null),
            Value::String(s) if s.is_empty() => Ok(Self::Null),
            Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    scalar_text(item)
                        .ok_or_else(|| D::Error::custom("array items must be scalar values"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Object(_) => Err(D::Error::custom("nested objects are not supported")),
            scalar => scalar_text(scalar)
                .map(Self::Text)
                .ok_or_else(|| D::Error::custom("unsupported input value")),
        }
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for InputValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for InputValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

/// 输入值映射：字段名 -> 原始值
///
/// 预处理命令与字段重命名都会原地改写其中的条目。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputValues(HashMap<String, InputValue>);

impl InputValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 对象解析
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn get(&self, field: &str) -> Option<&InputValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<InputValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<InputValue> {
        self.0.remove(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InputValue)> {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for InputValues
where
    K: Into<String>,
    V: Into<InputValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// 命令链中的单个命令（按前缀符号分类）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `$op` 选择谓词操作符
    Operator(String),
    /// `#relation` 在关联关系的子查询中应用谓词
    Relation(String),
    /// `@alias` 将当前字段重命名为别名
    Alias(String),
    /// 无前缀：预处理命令（或操作符简写）
    Bare(String),
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Self::Operator(name) | Self::Relation(name) | Self::Alias(name) | Self::Bare(name) => {
                name
            }
        }
    }
}

/// 解析后的规则描述符 `field[:commandChain]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// 原始描述符字符串（用于错误报告）
    pub raw: String,
    /// 字段名
    pub field: String,
    /// 有序命令链
    pub chain: Vec<Command>,
}

/// 有序的规则描述符集合：任意键 -> 描述符字符串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDescriptorSet {
    entries: Vec<(String, String)>,
}

impl FilterDescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, descriptor: impl Into<String>) {
        self.entries.push((key.into(), descriptor.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 以序号作为键
impl<S: Into<String>> FromIterator<S> for FilterDescriptorSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .enumerate()
                .map(|(i, d)| (i.to_string(), d.into()))
                .collect(),
        }
    }
}

impl<const N: usize> From<[&str; N]> for FilterDescriptorSet {
    fn from(descriptors: [&str; N]) -> Self {
        descriptors.into_iter().collect()
    }
}
