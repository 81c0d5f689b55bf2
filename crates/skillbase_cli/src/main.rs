//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `skillbase_core` linkage.
//! - Run one tokenize or search round-trip against a configured store.
//!
//! Usage:
//! - `skillbase` prints health and version.
//! - `skillbase tokenize <text>` prints the extracted terms.
//! - `skillbase [--config <file>] search [keyword]` prints ranked hits.

use skillbase_core::{CoreConfig, SkillBase, Tokenizer};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1).collect::<Vec<_>>();
    let config_path = match take_config_flag(&mut args) {
        Ok(path) => path,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let result = match args.first().map(String::as_str) {
        None => {
            println!("skillbase_core ping={}", skillbase_core::ping());
            println!("skillbase_core version={}", skillbase_core::core_version());
            Ok(())
        }
        Some("tokenize") => tokenize(&args[1..].join(" ")),
        Some("search") => search(config_path, &args[1..].join(" ")),
        Some(other) => Err(format!("unknown command `{other}`; expected tokenize|search")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn take_config_flag(args: &mut Vec<String>) -> Result<Option<PathBuf>, String> {
    let Some(index) = args.iter().position(|arg| arg == "--config") else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        return Err("--config requires a file path".to_string());
    }
    let path = args.remove(index + 1);
    args.remove(index);
    Ok(Some(PathBuf::from(path)))
}

fn tokenize(text: &str) -> Result<(), String> {
    let tokenizer = Tokenizer::new();
    for term in tokenizer.tokenize(text) {
        println!("{term}");
    }
    Ok(())
}

fn search(config_path: Option<PathBuf>, keyword: &str) -> Result<(), String> {
    let config = CoreConfig::load_with_env(config_path.as_deref()).map_err(|err| err.to_string())?;
    let app = SkillBase::start(config).map_err(|err| err.to_string())?;
    let conn = app.open_connection().map_err(|err| err.to_string())?;

    let hits = app
        .skill_service(&conn)
        .search_matches(keyword, None)
        .map_err(|err| err.to_string())?;
    for hit in &hits {
        println!(
            "{}\t{}\t{}\t{}",
            hit.match_count, hit.skill.id, hit.skill.name, hit.skill.description
        );
    }
    println!("hits={}", hits.len());

    drop(conn);
    app.shutdown();
    Ok(())
}
