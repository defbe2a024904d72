// main.rs
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use rule_filter::{
    EntitySchema, FilterDescriptorSet, FilterEngineBuilder, InputValues, Relation, SqlQuery,
};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_env_filter(filter)
        .init();

    let engine = FilterEngineBuilder::new().build()?;
    let schema = Arc::new(
        EntitySchema::new("posts")
            .with_relation("comments", Relation::has_many("comments", "post_id")),
    );

    println!("--- 规则过滤演示 (posts, 关联: comments) ---");
    println!(" 输入格式: <描述符...> -- <JSON 输入>");
    println!(" 例如: age:$gte created_at title:#comments|$like -- {{\"age\": 18, \"created_at\": \"2024-01-01\", \"title\": \"rust\"}}");
    println!(" 输入 'quit' 退出");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if line == "quit" || line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let (rules, json) = line.split_once("--").unwrap_or((line, "{}"));
        let descriptors: FilterDescriptorSet = rules.split_whitespace().collect();
        let mut input = match InputValues::from_json(json.trim()) {
            Ok(input) => input,
            Err(e) => {
                println!("输入解析出错: {}", e);
                continue;
            }
        };

        let mut query = SqlQuery::new(schema.clone());
        match engine.apply_filters(&mut query, &mut input, &descriptors) {
            Ok(()) => {
                println!(" WHERE {}", query.to_sql());
                println!(" 参数: {:?}", query.params());
            }
            Err(e) => println!("过滤出错: {}", e),
        }
    }

    Ok(())
}
