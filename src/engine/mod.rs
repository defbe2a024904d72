// engine/mod.rs - 过滤引擎
//! 将规则描述符集合应用到查询对象上

pub mod core;
pub mod builder;

pub use self::core::*;
pub use self::builder::*;
