// query/parser.rs - 规则描述符解析器
//! 将规则字符串拆分为字段与有序命令链
//!
//! 支持的语法:
//! - 字段 + 命令链: `age:$gte`、`created_at:halfOpenDate|$halfOpen`
//! - 仅字段: `status`（命令链取自配置 `filter.rule.status`，否则取 `filter.default`）
//! - 命令前缀:
//!   - `$op`       选择谓词操作符
//!   - `#relation` 在关联关系子查询中应用
//!   - `@alias`    字段重命名
//!   - 无前缀      预处理命令

use super::types::{Command, Descriptor};
use crate::config::ConfigSource;
use crate::engine::{FilterError, FilterResult};

/// 配置键：全局默认命令链
pub const DEFAULT_KEY: &str = "filter.default";

/// 配置键：字段默认命令链
pub fn rule_key(field: &str) -> String {
    format!("filter.rule.{}", field)
}

/// 解析单个描述符
///
/// 只按 `:` 拆分一次；没有命令链时从配置中查找。
/// 这里只拒绝空命令，名称是否可解析由引擎判断。
pub fn parse_descriptor(descriptor: &str, config: &dyn ConfigSource) -> FilterResult<Descriptor> {
    let (field, chain) = match descriptor.split_once(':') {
        Some((field, chain)) => (field, chain.to_string()),
        None => {
            let chain = config
                .get(&rule_key(descriptor))
                .or_else(|| config.get(DEFAULT_KEY))
                .ok_or_else(|| FilterError::InvalidFormat {
                    descriptor: descriptor.to_string(),
                    reason: "no command chain given or configured".to_string(),
                })?;
            (descriptor, chain)
        }
    };

    let field = field.trim_start_matches('#');
    if field.is_empty() {
        return Err(FilterError::InvalidFormat {
            descriptor: descriptor.to_string(),
            reason: "empty field name".to_string(),
        });
    }

    let chain = parse_chain(descriptor, &chain)?;

    Ok(Descriptor {
        raw: descriptor.to_string(),
        field: field.to_string(),
        chain,
    })
}

/// 拆分并分类命令链，任何空命令段都是格式错误
fn parse_chain(descriptor: &str, chain: &str) -> FilterResult<Vec<Command>> {
    chain
        .split('|')
        .map(|segment| parse_command(descriptor, segment))
        .collect()
}

fn parse_command(descriptor: &str, segment: &str) -> FilterResult<Command> {
    if segment.is_empty() {
        return Err(FilterError::InvalidFormat {
            descriptor: descriptor.to_string(),
            reason: "empty command".to_string(),
        });
    }

    let mut chars = segment.chars();
    let sigil = chars.next();
    let name = chars.as_str();

    let command = match sigil {
        Some('$') => Command::Operator(name.to_string()),
        Some('#') => Command::Relation(name.to_string()),
        Some('@') => Command::Alias(name.to_string()),
        _ => return Ok(Command::Bare(segment.to_string())),
    };

    // 只有前缀符号、没有名称
    if command.name().is_empty() {
        return Err(FilterError::InvalidFormat {
            descriptor: descriptor.to_string(),
            reason: format!("command '{}' has no name", segment),
        });
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> HashMap<String, String> {
        HashMap::from([
            ("filter.default".to_string(), "$eq".to_string()),
            (
                "filter.rule.created_at".to_string(),
                "halfOpenDate|$halfOpen".to_string(),
            ),
        ])
    }

    #[test]
    fn test_parse_explicit_chain() {
        let descriptor = parse_descriptor("title:@name|#author|$like", &config()).unwrap();
        assert_eq!(descriptor.field, "title");
        assert_eq!(
            descriptor.chain,
            vec![
                Command::Alias("name".to_string()),
                Command::Relation("author".to_string()),
                Command::Operator("like".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_uses_field_rule() {
        let descriptor = parse_descriptor("created_at", &config()).unwrap();
        assert_eq!(
            descriptor.chain,
            vec![
                Command::Bare("halfOpenDate".to_string()),
                Command::Operator("halfOpen".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_falls_back_to_default() {
        let descriptor = parse_descriptor("status", &config()).unwrap();
        assert_eq!(descriptor.chain, vec![Command::Operator("eq".to_string())]);
    }

    #[test]
    fn test_parse_strips_relation_marker_from_field() {
        let descriptor = parse_descriptor("#body:$like", &config()).unwrap();
        assert_eq!(descriptor.field, "body");
    }

    #[test]
    fn test_empty_command_is_invalid() {
        for raw in ["age:", "age:$gte|", "age:|$gte", "age:halfOpenDate||$halfOpen"] {
            let err = parse_descriptor(raw, &config()).unwrap_err();
            match err {
                FilterError::InvalidFormat { descriptor, .. } => assert_eq!(descriptor, raw),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_sigil_without_name_is_invalid() {
        for raw in ["age:$", "age:#|$eq", "age:@"] {
            assert!(matches!(
                parse_descriptor(raw, &config()),
                Err(FilterError::InvalidFormat { .. })
            ));
        }
    }

    #[test]
    fn test_names_are_not_validated() {
        let descriptor = parse_descriptor("p:$2d|trim ws|App\\Upper|$gte:x", &config()).unwrap();
        let names: Vec<&str> = descriptor.chain.iter().map(Command::name).collect();
        assert_eq!(names, vec!["2d", "trim ws", "App\\Upper", "gte:x"]);
        assert_eq!(descriptor.chain[1], Command::Bare("trim ws".to_string()));
    }

    #[test]
    fn test_missing_configuration() {
        let empty: HashMap<String, String> = HashMap::new();
        assert!(matches!(
            parse_descriptor("status", &empty),
            Err(FilterError::InvalidFormat { .. })
        ));
    }
}
