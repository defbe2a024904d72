// schema/relation.rs - 关联关系定义

use serde::Deserialize;

/// 一对多关联：`related.foreign_key = owner.local_key`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Relation {
    /// 关联表名
    pub table: String,
    /// 关联表中指向本实体的外键
    pub foreign_key: String,
    /// 本实体中被引用的键，未设置时使用本实体主键
    #[serde(default)]
    pub local_key: Option<String>,
}

impl Relation {
    pub fn has_many(table: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            foreign_key: foreign_key.into(),
            local_key: None,
        }
    }

    pub fn with_local_key(mut self, key: impl Into<String>) -> Self {
        self.local_key = Some(key.into());
        self
    }
}
