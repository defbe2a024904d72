// schema/mod.rs - 实体结构定义模块
//! 目标实体及其关联关系，用于校验 `#relation` 命令

mod relation;

pub use relation::*;

use std::collections::HashMap;

use serde::Deserialize;

/// 实体自省能力
pub trait Entity {
    /// 实体名称（用于错误信息）
    fn entity_name(&self) -> &str;

    /// 是否存在同名的关联关系访问器
    fn has_relation(&self, name: &str) -> bool;
}

/// 实体结构：表名、主键与关联关系
#[derive(Debug, Clone, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub relations: HashMap<String, Relation>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl EntitySchema {
    /// 以表名创建（实体名与表名相同）
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            name: table.clone(),
            table,
            primary_key: default_primary_key(),
            relations: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// 关联关系在本实体一侧的连接键
    pub fn local_key<'a>(&'a self, relation: &'a Relation) -> &'a str {
        relation.local_key.as_deref().unwrap_or(self.primary_key.as_str())
    }
}

impl Entity for EntitySchema {
    fn entity_name(&self) -> &str {
        &self.name
    }

    fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_from_toml() {
        let schema: EntitySchema = toml::from_str(
            r#"
            name = "Post"
            table = "posts"

            [relations.comments]
            table = "comments"
            foreign_key = "post_id"
            "#,
        )
        .unwrap();

        assert_eq!(schema.primary_key, "id");
        assert_eq!(schema.entity_name(), "Post");
        assert!(schema.has_relation("comments"));
        assert!(!schema.has_relation("tags"));

        let comments = schema.relation("comments").unwrap();
        assert_eq!(comments.local_key, None);
        assert_eq!(schema.local_key(comments), "id");
    }

    #[test]
    fn test_local_key_follows_primary_key() {
        let schema = EntitySchema::new("posts")
            .with_name("Post")
            .with_primary_key("uuid")
            .with_relation("comments", Relation::has_many("comments", "post_uuid"))
            .with_relation(
                "revisions",
                Relation::has_many("revisions", "post_slug").with_local_key("slug"),
            );

        assert_eq!(schema.entity_name(), "Post");
        assert_eq!(schema.table, "posts");
        assert_eq!(schema.local_key(schema.relation("comments").unwrap()), "uuid");
        assert_eq!(schema.local_key(schema.relation("revisions").unwrap()), "slug");
    }
}
