// query/filter.rs - 内置谓词库
//! 将字段值转换为对查询对象的条件调用

use super::builder::{Comparison, Query, escape_like_pattern};
use super::types::{InputValue, InputValues};
use crate::engine::{FilterError, FilterResult};

/// 谓词处理器：读取 `input[field]` 并在查询上追加条件
pub trait OperatorHandler: Send + Sync {
    fn apply(&self, query: &mut dyn Query, field: &str, input: &InputValues) -> FilterResult<()>;
}

/// 闭包形式的处理器
pub struct FnOperator<F>(pub F);

impl<F> OperatorHandler for FnOperator<F>
where
    F: Fn(&mut dyn Query, &str, &InputValues) -> FilterResult<()> + Send + Sync,
{
    fn apply(&self, query: &mut dyn Query, field: &str, input: &InputValues) -> FilterResult<()> {
        (self.0)(query, field, input)
    }
}

/// 内置操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    In,
    NotIn,
    Between,
    HalfOpen,
}

const BUILTIN_OPERATORS: &[(&str, BuiltinOperator)] = &[
    ("eq", BuiltinOperator::Eq),
    ("neq", BuiltinOperator::Neq),
    ("lt", BuiltinOperator::Lt),
    ("lte", BuiltinOperator::Lte),
    ("gt", BuiltinOperator::Gt),
    ("gte", BuiltinOperator::Gte),
    ("like", BuiltinOperator::Like),
    ("in", BuiltinOperator::In),
    ("notIn", BuiltinOperator::NotIn),
    ("between", BuiltinOperator::Between),
    ("halfOpen", BuiltinOperator::HalfOpen),
];

impl BuiltinOperator {
    pub fn from_name(name: &str) -> Option<Self> {
        BUILTIN_OPERATORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
    }

    pub fn name(&self) -> &'static str {
        BUILTIN_OPERATORS
            .iter()
            .find(|(_, op)| op == self)
            .map(|(n, _)| *n)
            .unwrap_or_default()
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        BUILTIN_OPERATORS.iter().map(|(n, _)| *n)
    }

    fn comparison(&self) -> Option<Comparison> {
        match self {
            Self::Eq => Some(Comparison::Eq),
            Self::Neq => Some(Comparison::Neq),
            Self::Lt => Some(Comparison::Lt),
            Self::Lte => Some(Comparison::Lte),
            Self::Gt => Some(Comparison::Gt),
            Self::Gte => Some(Comparison::Gte),
            _ => None,
        }
    }
}

impl OperatorHandler for BuiltinOperator {
    fn apply(&self, query: &mut dyn Query, field: &str, input: &InputValues) -> FilterResult<()> {
        let value = input.get(field).ok_or_else(|| FilterError::InvalidArgument {
            field: field.to_string(),
            reason: "no input value".to_string(),
        })?;

        if let Some(op) = self.comparison() {
            query.where_cmp(field, op, scalar(field, value, self.name())?);
            return Ok(());
        }

        match self {
            Self::Like => {
                let pattern = format!("%{}%", escape_like_pattern(scalar(field, value, "like")?));
                query.where_cmp(field, Comparison::Like, &pattern);
            }
            Self::In => {
                query.where_in(field, &value.to_list());
            }
            Self::NotIn => {
                query.where_not_in(field, &value.to_list());
            }
            Self::Between => {
                let (low, high) = bounds(field, value, "between")?;
                query.where_between(field, &low, &high);
            }
            Self::HalfOpen => {
                let (low, high) = bounds(field, value, "halfOpen")?;
                query
                    .where_cmp(field, Comparison::Gte, &low)
                    .where_cmp(field, Comparison::Lt, &high);
            }
            _ => {}
        }
        Ok(())
    }
}

fn scalar<'v>(field: &str, value: &'v InputValue, operator: &str) -> FilterResult<&'v str> {
    value.as_text().ok_or_else(|| FilterError::InvalidArgument {
        field: field.to_string(),
        reason: format!("'{}' expects a single value", operator),
    })
}

/// 区间上下界：数组或逗号分隔，必须恰好两个
fn bounds(field: &str, value: &InputValue, operator: &str) -> FilterResult<(String, String)> {
    let mut items = value.to_list();
    if items.len() != 2 {
        return Err(FilterError::InvalidArgument {
            field: field.to_string(),
            reason: format!(
                "'{}' expects exactly two values as an array or comma separated, got {}",
                operator,
                items.len()
            ),
        });
    }
    let high = items.pop().unwrap_or_default();
    let low = items.pop().unwrap_or_default();
    Ok((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SqlQuery;
    use crate::schema::EntitySchema;
    use std::sync::Arc;

    fn apply(op: BuiltinOperator, value: InputValue) -> FilterResult<SqlQuery> {
        let mut query = SqlQuery::new(Arc::new(EntitySchema::new("users")));
        let input: InputValues = [("f", value)].into_iter().collect();
        op.apply(&mut query, "f", &input)?;
        Ok(query)
    }

    #[test]
    fn test_names_round_trip() {
        for name in BuiltinOperator::names() {
            assert_eq!(BuiltinOperator::from_name(name).unwrap().name(), name);
        }
        assert_eq!(BuiltinOperator::from_name("notIn"), Some(BuiltinOperator::NotIn));
        assert_eq!(BuiltinOperator::from_name("contains"), None);
    }

    #[test]
    fn test_comparisons() {
        let cases = [
            (BuiltinOperator::Eq, "users.f = ?"),
            (BuiltinOperator::Neq, "users.f != ?"),
            (BuiltinOperator::Lt, "users.f < ?"),
            (BuiltinOperator::Lte, "users.f <= ?"),
            (BuiltinOperator::Gt, "users.f > ?"),
            (BuiltinOperator::Gte, "users.f >= ?"),
        ];
        for (op, sql) in cases {
            let query = apply(op, "5".into()).unwrap();
            assert_eq!(query.to_sql(), sql);
            assert_eq!(query.params(), ["5"]);
        }
    }

    #[test]
    fn test_comparison_rejects_list() {
        let err = apply(BuiltinOperator::Eq, vec!["1", "2"].into()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidArgument { ref field, .. } if field == "f"));
    }

    #[test]
    fn test_like_wraps_and_escapes() {
        let query = apply(BuiltinOperator::Like, "50%_off".into()).unwrap();
        assert_eq!(query.to_sql(), "users.f LIKE ? ESCAPE '\\'");
        assert_eq!(query.params(), ["%50\\%\\_off%"]);
    }

    #[test]
    fn test_in_scalar_matches_list() {
        let scalar = apply(BuiltinOperator::In, "1,2,3".into()).unwrap();
        let list = apply(BuiltinOperator::In, vec!["1", "2", "3"].into()).unwrap();
        assert_eq!(scalar.to_sql(), "users.f IN (?, ?, ?)");
        assert_eq!(scalar.to_sql(), list.to_sql());
        assert_eq!(scalar.params(), list.params());

        let scalar = apply(BuiltinOperator::NotIn, "1,2,3".into()).unwrap();
        let list = apply(BuiltinOperator::NotIn, vec!["1", "2", "3"].into()).unwrap();
        assert_eq!(scalar.to_sql(), "users.f NOT IN (?, ?, ?)");
        assert_eq!(scalar.params(), list.params());
    }

    #[test]
    fn test_between_scalar_matches_list() {
        let scalar = apply(BuiltinOperator::Between, "1,9".into()).unwrap();
        let list = apply(BuiltinOperator::Between, vec!["1", "9"].into()).unwrap();
        assert_eq!(scalar.to_sql(), "users.f BETWEEN ? AND ?");
        assert_eq!(scalar.params(), ["1", "9"]);
        assert_eq!(scalar.params(), list.params());
    }

    #[test]
    fn test_half_open() {
        let query = apply(BuiltinOperator::HalfOpen, vec!["2024-01-01", "2024-01-06"].into()).unwrap();
        assert_eq!(query.to_sql(), "users.f >= ? AND users.f < ?");
        assert_eq!(query.params(), ["2024-01-01", "2024-01-06"]);
    }

    #[test]
    fn test_half_open_requires_two_bounds() {
        for value in [InputValue::from("1,2,3"), InputValue::from("1")] {
            let err = apply(BuiltinOperator::HalfOpen, value).unwrap_err();
            assert!(matches!(err, FilterError::InvalidArgument { ref field, .. } if field == "f"));
        }
    }
}
