mod common;

use common::{count_rows, new_skill, shared_tokenizer};
use skillbase_core::search::index::indexed_terms;
use skillbase_core::{AppError, CoreConfig, SkillBase, SkillRepository};
use std::fs;
use tempfile::TempDir;

fn file_config(dir: &TempDir) -> CoreConfig {
    let mut config = CoreConfig::default();
    config.db.path = dir.path().join("data").join("skillbase.db");
    config
}

#[test]
fn start_migrates_configured_store_from_toml() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("store").join("skills.db");
    let config_path = dir.path().join("skillbase.toml");
    fs::write(
        &config_path,
        format!(
            "[db]\npath = {:?}\n\n[cache]\ntag_ttl_secs = 60\n",
            db_path.display().to_string()
        ),
    )
    .unwrap();

    let config = CoreConfig::load(&config_path).unwrap();
    assert_eq!(config.cache.tag_ttl_secs, 60);

    let app = SkillBase::start(config).unwrap();
    assert!(db_path.exists());

    let conn = app.open_connection().unwrap();
    let skills = app.skill_service(&conn);
    skills.create_skill(&new_skill("pdf", "merge pdf files")).unwrap();
    let hits = skills.search_matches("PDF", None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].match_count, 1);

    drop(conn);
    app.shutdown();
}

#[test]
fn start_rejects_invalid_config_and_missing_dictionary() {
    let dir = TempDir::new().unwrap();

    let mut config = file_config(&dir);
    config.cache.tag_ttl_secs = 0;
    assert!(matches!(SkillBase::start(config), Err(AppError::Config(_))));

    let mut config = file_config(&dir);
    config.tokenizer.dictionary = Some(dir.path().join("missing.txt"));
    assert!(matches!(SkillBase::start(config), Err(AppError::Tokenizer(_))));
}

#[test]
fn data_survives_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let app = SkillBase::with_tokenizer(file_config(&dir), shared_tokenizer()).unwrap();

    let conn = app.open_connection().unwrap();
    let created = app
        .skill_service(&conn)
        .create_skill(&new_skill("csv", "convert csv tables"))
        .unwrap();
    drop(conn);

    let conn = app.open_connection().unwrap();
    let hits = app.skill_service(&conn).search_skills("tables").unwrap();
    assert_eq!(hits, vec![created]);
}

#[test]
fn concurrent_writers_keep_index_consistent() {
    let dir = TempDir::new().unwrap();
    let app = SkillBase::with_tokenizer(file_config(&dir), shared_tokenizer()).unwrap();
    drop(app.open_connection().unwrap());

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let app = &app;
            scope.spawn(move || {
                let conn = app.open_connection().unwrap();
                let service = app.skill_service(&conn);
                for index in 0..5 {
                    let mut skill = service
                        .create_skill(&new_skill(
                            &format!("worker{worker}-skill{index}"),
                            "shared draft",
                        ))
                        .unwrap();
                    skill.description = format!("shared final worker{worker}");
                    service.update_skill(&skill).unwrap();
                }
            });
        }
    });

    let conn = app.open_connection().unwrap();
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM skills;"), 20);
    assert_eq!(
        count_rows(&conn, "SELECT COUNT(*) FROM skill_tokens WHERE term = 'draft';"),
        0
    );

    let repo = app.skill_repo(&conn);
    let hits = repo.search_skills("shared final").unwrap();
    assert_eq!(hits.len(), 20);
    for hit in &hits {
        assert_eq!(hit.match_count, 2);
        assert_eq!(
            indexed_terms(&conn, hit.skill.id).unwrap(),
            app.tokenizer().tokenize(&hit.skill.indexed_text())
        );
    }
    let ids = hits.iter().map(|hit| hit.skill.id).collect::<Vec<_>>();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}
