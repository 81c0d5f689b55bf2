#![allow(dead_code)]

use rusqlite::Connection;
use skillbase_core::{CoreConfig, NewSkill, SkillBase, Tokenizer};
use std::sync::{Arc, OnceLock};

/// Dictionary load is the slow part of setup; share one per test binary.
pub fn shared_tokenizer() -> Arc<Tokenizer> {
    static TOKENIZER: OnceLock<Arc<Tokenizer>> = OnceLock::new();
    Arc::clone(TOKENIZER.get_or_init(|| Arc::new(Tokenizer::new())))
}

pub fn test_app() -> SkillBase {
    SkillBase::with_tokenizer(CoreConfig::default(), shared_tokenizer()).unwrap()
}

pub fn new_skill(name: &str, description: &str) -> NewSkill {
    NewSkill::new(name, description)
}

pub fn count_rows(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}
