// registry.rs - 处理器注册表
// 调用方注册的操作符与预处理器，解析时优先于内置实现

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::engine::{FilterResult, LookupKind};
use crate::preprocess::{FnPreprocessor, Preprocessor};
use crate::query::{FnOperator, InputValues, OperatorHandler, Query};

/// 注册项
#[derive(Clone)]
pub enum Binding {
    Operator(Arc<dyn OperatorHandler>),
    Preprocess(Arc<dyn Preprocessor>),
}

impl Binding {
    pub fn kind(&self) -> LookupKind {
        match self {
            Self::Operator(_) => LookupKind::Operator,
            Self::Preprocess(_) => LookupKind::Preprocess,
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Binding::{:?}", self.kind())
    }
}

/// 处理器注册表 - 线程安全，读多写少
///
/// 名称 -> 处理器，后注册的覆盖先注册的，不支持删除。
/// 操作符与预处理器共享同一个命名空间。
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    bindings: HashMap<String, Binding>,
}

/// 进程级注册表
static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

impl Registry {
    /// 创建独立的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级共享注册表
    pub fn global() -> Registry {
        Registry::clone(&GLOBAL_REGISTRY)
    }

    /// 注册（或覆盖）操作符
    pub fn register_operator(&self, name: impl Into<String>, handler: impl OperatorHandler + 'static) {
        self.bind(name.into(), Binding::Operator(Arc::new(handler)));
    }

    /// 以闭包注册操作符
    pub fn register_operator_fn<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut dyn Query, &str, &InputValues) -> FilterResult<()> + Send + Sync + 'static,
    {
        self.register_operator(name, FnOperator(f));
    }

    /// 注册（或覆盖）预处理器
    pub fn register_preprocess(&self, name: impl Into<String>, preprocessor: impl Preprocessor + 'static) {
        self.bind(name.into(), Binding::Preprocess(Arc::new(preprocessor)));
    }

    /// 以闭包注册预处理器
    pub fn register_preprocess_fn<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&str, &mut InputValues) -> FilterResult<()> + Send + Sync + 'static,
    {
        self.register_preprocess(name, FnPreprocessor(f));
    }

    fn bind(&self, name: String, binding: Binding) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(name = %name, kind = ?binding.kind(), "Handler registered");
        inner.bindings.insert(name, binding);
    }

    /// 按名称查找
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.bindings.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.bindings.contains_key(name)
    }

    /// 已注册的名称（排序后）
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = inner.bindings.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
