// query/builder.rs - 查询构建能力
//! 谓词最终作用的查询对象接口，以及一个生成参数化 SQL 的参考实现

use std::sync::Arc;

use crate::engine::{FilterError, FilterResult, LookupKind};
use crate::schema::{Entity, EntitySchema};

/// 比较操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
        }
    }
}

/// 关联子查询的作用域回调
pub type Scope<'s> = dyn FnMut(&mut dyn Query) -> FilterResult<()> + 's;

/// 查询对象（由宿主提供）
///
/// 所有方法都在原查询上追加条件并返回同一个查询，便于链式组合。
/// 通过 [`Entity`] 暴露目标实体的关联关系信息。
pub trait Query: Entity {
    fn where_cmp(&mut self, field: &str, op: Comparison, value: &str) -> &mut dyn Query;

    fn where_in(&mut self, field: &str, values: &[String]) -> &mut dyn Query;

    fn where_not_in(&mut self, field: &str, values: &[String]) -> &mut dyn Query;

    /// 闭区间 `[low, high]`
    fn where_between(&mut self, field: &str, low: &str, high: &str) -> &mut dyn Query;

    /// 只保留至少有一条关联记录满足 `scope` 中条件的行
    fn where_has(&mut self, relation: &str, scope: &mut Scope<'_>) -> FilterResult<()>;
}

/// 转义 LIKE 元字符（%, _, \）
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// 参数化 SQL 条件构建器
///
/// 条件以 `AND` 连接，参数按插入顺序收集，列名带表名前缀。
#[derive(Debug, Clone)]
pub struct SqlQuery {
    schema: Arc<EntitySchema>,
    clauses: Vec<String>,
    params: Vec<String>,
}

impl SqlQuery {
    pub fn new(schema: Arc<EntitySchema>) -> Self {
        Self {
            schema,
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// 已收集的条件片段
    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    /// 已收集的参数（与 `?` 占位符一一对应）
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// 生成 WHERE 子句内容（无条件时为 `1=1`）
    pub fn to_sql(&self) -> String {
        if self.clauses.is_empty() {
            "1=1".to_string()
        } else {
            self.clauses.join(" AND ")
        }
    }

    fn column(&self, field: &str) -> String {
        format!("{}.{}", self.schema.table, field)
    }

    fn push_list(&mut self, field: &str, values: &[String], negated: bool) {
        if values.is_empty() {
            // 空集合：IN 恒假，NOT IN 恒真
            self.clauses
                .push(if negated { "1=1" } else { "1=0" }.to_string());
            return;
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        let keyword = if negated { "NOT IN" } else { "IN" };
        self.clauses.push(format!(
            "{} {} ({})",
            self.column(field),
            keyword,
            placeholders
        ));
        self.params.extend(values.iter().cloned());
    }
}

impl Entity for SqlQuery {
    fn entity_name(&self) -> &str {
        self.schema.entity_name()
    }

    fn has_relation(&self, name: &str) -> bool {
        self.schema.has_relation(name)
    }
}

impl Query for SqlQuery {
    fn where_cmp(&mut self, field: &str, op: Comparison, value: &str) -> &mut dyn Query {
        let column = self.column(field);
        let clause = match op {
            Comparison::Like => format!("{} LIKE ? ESCAPE '\\'", column),
            _ => format!("{} {} ?", column, op.as_sql()),
        };
        self.clauses.push(clause);
        self.params.push(value.to_string());
        self
    }

    fn where_in(&mut self, field: &str, values: &[String]) -> &mut dyn Query {
        self.push_list(field, values, false);
        self
    }

    fn where_not_in(&mut self, field: &str, values: &[String]) -> &mut dyn Query {
        self.push_list(field, values, true);
        self
    }

    fn where_between(&mut self, field: &str, low: &str, high: &str) -> &mut dyn Query {
        self.clauses
            .push(format!("{} BETWEEN ? AND ?", self.column(field)));
        self.params.push(low.to_string());
        self.params.push(high.to_string());
        self
    }

    fn where_has(&mut self, relation: &str, scope: &mut Scope<'_>) -> FilterResult<()> {
        let rel = self
            .schema
            .relation(relation)
            .ok_or_else(|| FilterError::NotFound {
                kind: LookupKind::Relation,
                name: relation.to_string(),
                searched: format!("entity '{}'", self.schema.entity_name()),
            })?;

        let mut sub = SqlQuery::new(Arc::new(EntitySchema::new(&rel.table)));
        scope(&mut sub)?;

        let mut clause = format!(
            "EXISTS (SELECT 1 FROM {rt} WHERE {rt}.{fk} = {t}.{lk}",
            rt = rel.table,
            fk = rel.foreign_key,
            t = self.schema.table,
            lk = self.schema.local_key(rel),
        );
        for inner in &sub.clauses {
            clause.push_str(" AND ");
            clause.push_str(inner);
        }
        clause.push(')');

        self.clauses.push(clause);
        self.params.extend(sub.params);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Relation;

    fn posts() -> SqlQuery {
        let schema = EntitySchema::new("posts")
            .with_relation("comments", Relation::has_many("comments", "post_id"));
        SqlQuery::new(Arc::new(schema))
    }

    #[test]
    fn test_fluent_comparisons() {
        let mut query = posts();
        query
            .where_cmp("created_at", Comparison::Gte, "2024-01-01")
            .where_cmp("created_at", Comparison::Lt, "2024-01-02");

        assert_eq!(
            query.to_sql(),
            "posts.created_at >= ? AND posts.created_at < ?"
        );
        assert_eq!(query.params(), ["2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn test_in_and_empty_sets() {
        let mut query = posts();
        query.where_in("id", &["1".to_string(), "2".to_string()]);
        query.where_in("id", &[]);
        query.where_not_in("id", &[]);

        assert_eq!(query.clauses(), ["posts.id IN (?, ?)", "1=0", "1=1"]);
        assert_eq!(query.params(), ["1", "2"]);
    }

    #[test]
    fn test_where_has_renders_exists() {
        let mut query = posts();
        query
            .where_has("comments", &mut |sub: &mut dyn Query| {
                sub.where_cmp("body", Comparison::Like, "%rust%");
                Ok(())
            })
            .unwrap();

        assert_eq!(
            query.to_sql(),
            "EXISTS (SELECT 1 FROM comments WHERE comments.post_id = posts.id AND comments.body LIKE ? ESCAPE '\\')"
        );
        assert_eq!(query.params(), ["%rust%"]);
    }

    #[test]
    fn test_where_has_uses_entity_keys() {
        let schema = EntitySchema::new("posts")
            .with_name("Post")
            .with_primary_key("uuid")
            .with_relation("comments", Relation::has_many("comments", "post_uuid"))
            .with_relation(
                "revisions",
                Relation::has_many("revisions", "post_slug").with_local_key("slug"),
            );
        let mut query = SqlQuery::new(Arc::new(schema));
        query
            .where_has("comments", &mut |_: &mut dyn Query| Ok(()))
            .unwrap();
        query
            .where_has("revisions", &mut |_: &mut dyn Query| Ok(()))
            .unwrap();

        assert_eq!(
            query.clauses(),
            [
                "EXISTS (SELECT 1 FROM comments WHERE comments.post_uuid = posts.uuid)",
                "EXISTS (SELECT 1 FROM revisions WHERE revisions.post_slug = posts.slug)",
            ]
        );

        let err = query
            .where_has("tags", &mut |_: &mut dyn Query| Ok(()))
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::NotFound { searched, .. } if searched == "entity 'Post'"
        ));
    }

    #[test]
    fn test_where_has_unknown_relation() {
        let mut query = posts();
        let result = query.where_has("tags", &mut |_: &mut dyn Query| Ok(()));
        assert!(matches!(result, Err(FilterError::NotFound { .. })));
    }

    #[test]
    fn test_escape_like_pattern() {
        assert_eq!(escape_like_pattern("100%_\\test"), "100\\%\\_\\\\test");
    }
}
