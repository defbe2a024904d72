// query/mod.rs - 规则查询模块
//! 规则描述符解析、查询构建接口与内置谓词

mod parser;
pub mod builder;
pub mod filter;
pub mod types;

pub use parser::*;
pub use builder::*;
pub use filter::*;
pub use types::*;
