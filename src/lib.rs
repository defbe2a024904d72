// src/lib.rs
//! 规则驱动的查询过滤
//!
//! 用简短的规则字符串（如 `age:$gte`、`status`、`created_at:halfOpenDate|$halfOpen`）
//! 描述"哪些字段可以过滤、如何过滤"，并据此在查询对象上追加条件。

pub mod config;
pub mod engine;
pub mod preprocess;
pub mod query;
pub mod registry;
pub mod schema;

pub use config::{CONFIG, ConfigSource, FilterConfig};
pub use engine::{FilterContext, FilterEngine, FilterEngineBuilder, FilterError, FilterResult, LookupKind, Resolution};
pub use preprocess::{BuiltinPreprocess, Preprocessor};
pub use query::{
    BuiltinOperator, Comparison, FilterDescriptorSet, InputValue, InputValues, OperatorHandler, Query, SqlQuery,
};
pub use registry::{Binding, Registry};
pub use schema::{Entity, EntitySchema, Relation};
