// 配置模块 - 默认操作符与字段规则表
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::engine::{FilterError, FilterResult};
use crate::query::{DEFAULT_KEY, rule_key};

/// 配置文件路径
const CONFIG_FILE: &str = "./filter.toml";

/// 默认操作符
const DEFAULT_OPERATOR: &str = "$eq";

// ============== 配置读取接口 ==============

/// 配置读取能力
///
/// 使用的键：`filter.default`（全局默认命令链）与 `filter.rule.<field>`（字段默认命令链）。
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// 扁平键值表，便于测试与嵌入
impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

// ============== 配置结构体 ==============

#[derive(Debug, Deserialize, Clone, Default)]
struct ConfigFile {
    #[serde(default)]
    filter: FilterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// 全局默认操作符，如 `$eq`
    #[serde(default = "default_operator")]
    pub default: String,
    /// 字段 -> 默认命令链
    #[serde(default)]
    pub rule: HashMap<String, String>,
}

fn default_operator() -> String {
    DEFAULT_OPERATOR.to_string()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default: default_operator(),
            rule: HashMap::new(),
        }
    }
}

impl ConfigSource for FilterConfig {
    fn get(&self, key: &str) -> Option<String> {
        if key == DEFAULT_KEY {
            return Some(self.default.clone());
        }
        key.strip_prefix(&rule_key(""))
            .and_then(|field| self.rule.get(field))
            .cloned()
    }
}

// ============== 配置加载 ==============

impl FilterConfig {
    /// 从配置文件加载，失败则使用默认配置
    pub fn load() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_else(|e| {
            tracing::warn!(path = CONFIG_FILE, error = %e, "Failed to load filter config, using defaults");
            Self::default()
        })
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> FilterResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| FilterError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// 解析 TOML 文本
    pub fn from_toml_str(content: &str) -> FilterResult<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| FilterError::Config(e.to_string()))?;
        Ok(file.filter)
    }

    /// 生成默认配置文件
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> FilterResult<()> {
        let default_content = include_str!("../filter.toml");
        fs::write(path.as_ref(), default_content)
            .map_err(|e| FilterError::Config(format!("{}: {}", path.as_ref().display(), e)))
    }

    pub fn with_default(mut self, operator: impl Into<String>) -> Self {
        self.default = operator.into();
        self
    }

    pub fn with_rule(mut self, field: impl Into<String>, chain: impl Into<String>) -> Self {
        self.rule.insert(field.into(), chain.into());
        self
    }
}

// ============== 全局配置实例 ==============

/// 全局配置实例 (懒加载)
pub static CONFIG: Lazy<FilterConfig> = Lazy::new(|| {
    let config = FilterConfig::load();
    tracing::debug!(default = %config.default, rules = config.rule.len(), "Filter config loaded");
    config
});
