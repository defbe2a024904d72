// engine/core.rs - 过滤引擎核心
//! 描述符解析 -> 预处理 -> 操作符解析 -> 谓词执行

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigSource;
use crate::preprocess::{BuiltinPreprocess, Preprocessor};
use crate::query::{
    BuiltinOperator, Command, Descriptor, FilterDescriptorSet, InputValues, OperatorHandler, Query,
    parse_descriptor, DEFAULT_KEY,
};
use crate::registry::{Binding, Registry};

/// 查找对象的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Relation,
    Preprocess,
    Operator,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Relation => "relation",
            Self::Preprocess => "preprocessor",
            Self::Operator => "operator",
        };
        f.write_str(name)
    }
}

/// 过滤错误类型
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid filter format '{descriptor}': {reason}")]
    InvalidFormat { descriptor: String, reason: String },

    #[error("{kind} '{name}' not found in {searched}")]
    NotFound {
        kind: LookupKind,
        name: String,
        searched: String,
    },

    #[error("Invalid argument for '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("'{name}' is registered as {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: LookupKind,
        found: LookupKind,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type FilterResult<T> = Result<T, FilterError>;

const HANDLER_SOURCES: &str = "registry and built-ins";

/// 单次过滤调用的上下文
///
/// 保存 `@alias` 建立的重命名表，作用于同一次调用的后续描述符。
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    renames: HashMap<String, String>,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_alias(&mut self, field: impl Into<String>, alias: impl Into<String>) {
        self.renames.insert(field.into(), alias.into());
    }

    pub fn alias_of(&self, field: &str) -> Option<&str> {
        self.renames.get(field).map(String::as_str)
    }

    pub fn renames(&self) -> &HashMap<String, String> {
        &self.renames
    }
}

/// 命令链解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// 实际读写的字段（重命名后）
    pub field: String,
    /// 操作符名称（不含 `$`）
    pub operator: String,
    /// 关联关系（`#relation`）
    pub relation: Option<String>,
    /// 是否发生了重命名
    pub renamed: bool,
}

enum BareCommand {
    Preprocess(Arc<dyn Preprocessor>),
    Operator,
}

/// 过滤引擎
pub struct FilterEngine {
    pub(crate) registry: Registry,
    pub(crate) config: Arc<dyn ConfigSource>,
}

impl FilterEngine {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &dyn ConfigSource {
        self.config.as_ref()
    }

    /// 将描述符集合逐条应用到查询上
    ///
    /// 重命名与预处理会改写 `input`。任一描述符失败即中止，
    /// 此时查询中已追加的条件不做回滚。
    pub fn apply_filters(
        &self,
        query: &mut dyn Query,
        input: &mut InputValues,
        descriptors: &FilterDescriptorSet,
    ) -> FilterResult<()> {
        let mut ctx = FilterContext::new();
        self.apply_filters_with(&mut ctx, query, input, descriptors)
    }

    /// 同 [`apply_filters`](Self::apply_filters)，重命名表由调用方持有
    pub fn apply_filters_with(
        &self,
        ctx: &mut FilterContext,
        query: &mut dyn Query,
        input: &mut InputValues,
        descriptors: &FilterDescriptorSet,
    ) -> FilterResult<()> {
        for (key, raw) in descriptors.iter() {
            let descriptor = parse_descriptor(raw, self.config.as_ref())?;
            let resolution = self.resolve(ctx, &*query, input, descriptor)?;
            tracing::trace!(key, descriptor = raw, ?resolution, "Descriptor resolved");
            self.execute(query, input, &resolution)?;
        }
        Ok(())
    }

    /// 单遍扫描命令链
    ///
    /// 预处理命令在扫描过程中按顺序立即执行。
    pub fn resolve(
        &self,
        ctx: &mut FilterContext,
        entity: &dyn Query,
        input: &mut InputValues,
        descriptor: Descriptor,
    ) -> FilterResult<Resolution> {
        let Descriptor { mut field, chain, .. } = descriptor;

        let mut commands = Vec::with_capacity(chain.len());
        for command in chain {
            match command {
                Command::Alias(alias) => ctx.bind_alias(field.clone(), alias),
                other => commands.push(other),
            }
        }

        let mut renamed = false;
        if let Some(alias) = ctx.alias_of(&field) {
            if let Some(value) = input.get(&field).filter(|v| !v.is_empty()).cloned() {
                let alias = alias.to_string();
                tracing::trace!(from = %field, to = %alias, "Field renamed");
                input.insert(alias.clone(), value);
                field = alias;
                renamed = true;
            }
        }

        let mut relation = None;
        let mut selector = None;
        for command in commands {
            tracing::trace!(field = %field, ?command, "Command");
            match command {
                Command::Operator(name) => selector = Some(name),
                Command::Relation(name) => {
                    if !entity.has_relation(&name) {
                        return Err(FilterError::NotFound {
                            kind: LookupKind::Relation,
                            name,
                            searched: format!("entity '{}'", entity.entity_name()),
                        });
                    }
                    relation = Some(name);
                }
                Command::Bare(name) => match self.classify_bare(&name)? {
                    BareCommand::Preprocess(preprocessor) => {
                        preprocessor.preprocess(&field, input)?;
                    }
                    BareCommand::Operator => selector = Some(name),
                },
                Command::Alias(_) => {}
            }
        }

        let operator = match selector {
            Some(operator) => operator,
            None => self.default_operator()?,
        };

        Ok(Resolution {
            field,
            operator,
            relation,
            renamed,
        })
    }

    /// 执行谓词：值为 null 或缺失时跳过
    pub fn execute(
        &self,
        query: &mut dyn Query,
        input: &InputValues,
        resolution: &Resolution,
    ) -> FilterResult<()> {
        let handler = self.resolve_operator(&resolution.operator)?;
        let field = resolution.field.as_str();

        if !input.get(field).is_some_and(|v| v.is_present()) {
            tracing::debug!(field, operator = %resolution.operator, "No input value, filter skipped");
            return Ok(());
        }

        match &resolution.relation {
            Some(relation) => {
                query.where_has(relation, &mut |sub: &mut dyn Query| {
                    handler.apply(sub, field, input)
                })?;
            }
            None => handler.apply(query, field, input)?,
        }

        tracing::debug!(
            field,
            operator = %resolution.operator,
            relation = resolution.relation.as_deref(),
            "Filter applied"
        );
        Ok(())
    }

    /// 操作符：注册表优先，其次内置
    pub fn resolve_operator(&self, name: &str) -> FilterResult<Arc<dyn OperatorHandler>> {
        match self.registry.lookup(name) {
            Some(Binding::Operator(handler)) => Ok(handler),
            Some(binding) => Err(FilterError::TypeMismatch {
                name: name.to_string(),
                expected: LookupKind::Operator,
                found: binding.kind(),
            }),
            None => BuiltinOperator::from_name(name)
                .map(|op| Arc::new(op) as Arc<dyn OperatorHandler>)
                .ok_or_else(|| FilterError::NotFound {
                    kind: LookupKind::Operator,
                    name: name.to_string(),
                    searched: HANDLER_SOURCES.to_string(),
                }),
        }
    }

    /// 预处理器：注册表优先，其次内置
    pub fn resolve_preprocess(&self, name: &str) -> FilterResult<Arc<dyn Preprocessor>> {
        match self.registry.lookup(name) {
            Some(Binding::Preprocess(preprocessor)) => Ok(preprocessor),
            Some(binding) => Err(FilterError::TypeMismatch {
                name: name.to_string(),
                expected: LookupKind::Preprocess,
                found: binding.kind(),
            }),
            None => BuiltinPreprocess::from_name(name)
                .map(|p| Arc::new(p) as Arc<dyn Preprocessor>)
                .ok_or_else(|| FilterError::NotFound {
                    kind: LookupKind::Preprocess,
                    name: name.to_string(),
                    searched: HANDLER_SOURCES.to_string(),
                }),
        }
    }

    /// 无前缀命令：已知的预处理器优先；否则若是已知操作符，按 `$op` 处理
    fn classify_bare(&self, name: &str) -> FilterResult<BareCommand> {
        match self.registry.lookup(name) {
            Some(Binding::Preprocess(preprocessor)) => Ok(BareCommand::Preprocess(preprocessor)),
            Some(Binding::Operator(_)) => Ok(BareCommand::Operator),
            None if BuiltinPreprocess::from_name(name).is_some() => {
                self.resolve_preprocess(name).map(BareCommand::Preprocess)
            }
            None if BuiltinOperator::from_name(name).is_some() => Ok(BareCommand::Operator),
            None => self.resolve_preprocess(name).map(BareCommand::Preprocess),
        }
    }

    /// 全局默认操作符（`filter.default`，须为单个 `$op`）
    fn default_operator(&self) -> FilterResult<String> {
        let raw = self
            .config
            .get(DEFAULT_KEY)
            .ok_or_else(|| FilterError::Config(format!("'{}' is not set", DEFAULT_KEY)))?;
        let operator = raw.strip_prefix('$').unwrap_or(&raw);
        if operator.is_empty() || operator.contains('|') {
            return Err(FilterError::Config(format!(
                "'{}' must name a single operator, got '{}'",
                DEFAULT_KEY, raw
            )));
        }
        Ok(operator.to_string())
    }
}
