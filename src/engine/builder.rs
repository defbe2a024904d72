// engine/builder.rs - 过滤引擎构建器
//! 使用 Builder 模式构建 FilterEngine

use std::sync::Arc;

use crate::config::{CONFIG, ConfigSource, FilterConfig};
use crate::query::DEFAULT_KEY;
use crate::registry::Registry;

use super::core::{FilterEngine, FilterError, FilterResult};

/// 过滤引擎构建器
#[derive(Default)]
pub struct FilterEngineBuilder {
    config: Option<Arc<dyn ConfigSource>>,
    registry: Option<Registry>,
}

impl FilterEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置配置（默认使用全局 `CONFIG`）
    pub fn with_config(mut self, config: impl ConfigSource + 'static) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// 设置共享配置
    pub fn with_shared_config(mut self, config: Arc<dyn ConfigSource>) -> Self {
        self.config = Some(config);
        self
    }

    /// 设置注册表（默认使用进程级注册表）
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 构建过滤引擎
    pub fn build(self) -> FilterResult<FilterEngine> {
        // 获取或创建配置
        let config = self
            .config
            .unwrap_or_else(|| Arc::new(FilterConfig::clone(&CONFIG)) as Arc<dyn ConfigSource>);

        if config.get(DEFAULT_KEY).is_none() {
            return Err(FilterError::Config(format!("'{}' is not set", DEFAULT_KEY)));
        }

        let registry = self.registry.unwrap_or_else(Registry::global);

        Ok(FilterEngine { registry, config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use std::collections::HashMap;

    #[test]
    fn test_builder() {
        let registry = Registry::new();
        registry.register_operator_fn("noop", |_, _, _| Ok(()));

        let engine = FilterEngineBuilder::new()
            .with_config(FilterConfig::default())
            .with_registry(registry)
            .build()
            .unwrap();

        assert!(engine.registry().contains("noop"));
        assert_eq!(engine.config().get("filter.default").as_deref(), Some("$eq"));
    }

    #[test]
    fn test_builder_with_shared_config() {
        let config: Arc<dyn ConfigSource> =
            Arc::new(FilterConfig::default().with_default("$like"));

        let engine = FilterEngineBuilder::new()
            .with_shared_config(Arc::clone(&config))
            .with_registry(Registry::new())
            .build()
            .unwrap();

        assert_eq!(Arc::strong_count(&config), 2);
        assert_eq!(engine.config().get(DEFAULT_KEY).as_deref(), Some("$like"));
    }

    #[test]
    fn test_builder_requires_default_operator() {
        let result = FilterEngineBuilder::new()
            .with_config(HashMap::<String, String>::new())
            .with_registry(Registry::new())
            .build();

        assert!(matches!(result, Err(FilterError::Config(_))));
    }
}
