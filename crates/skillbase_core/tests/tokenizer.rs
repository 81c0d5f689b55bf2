mod common;

use common::shared_tokenizer;
use skillbase_core::{DictionarySource, Tokenizer, TokenizerError};
use std::collections::BTreeSet;
use std::io::Write;

fn terms(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn latin_text_is_lowercased_and_deduplicated() {
    let tokenizer = shared_tokenizer();
    assert_eq!(
        tokenizer.tokenize("Merge PDF files, merge pdf FILES"),
        terms(&["files", "merge", "pdf"])
    );
}

#[test]
fn casing_never_changes_the_term_set() {
    let tokenizer = shared_tokenizer();
    assert_eq!(
        tokenizer.tokenize("Convert PDF To Markdown"),
        tokenizer.tokenize("convert pdf to markdown")
    );
}

#[test]
fn punctuation_and_whitespace_only_input_yields_no_terms() {
    let tokenizer = shared_tokenizer();
    assert!(tokenizer.tokenize("").is_empty());
    assert!(tokenizer.tokenize("   \t\n ").is_empty());
    assert!(tokenizer.tokenize("!!! ... ，。").is_empty());
}

#[test]
fn cjk_text_is_segmented_by_dictionary_words() {
    let tokenizer = shared_tokenizer();
    let extracted = tokenizer.tokenize("我来到北京清华大学");
    assert!(extracted.contains("北京"), "{extracted:?}");
    assert!(extracted.contains("清华大学"), "{extracted:?}");
}

#[test]
fn mixed_script_text_keeps_both_scripts() {
    let tokenizer = shared_tokenizer();
    let extracted = tokenizer.tokenize("PDF 文档 工具");
    for term in ["pdf", "文档", "工具"] {
        assert!(extracted.contains(term), "missing {term} in {extracted:?}");
    }
}

#[test]
fn tokenize_is_deterministic() {
    let tokenizer = shared_tokenizer();
    let text = "Skill 搜索 with 中文 and English";
    assert_eq!(tokenizer.tokenize(text), tokenizer.tokenize(text));
}

#[test]
fn custom_dictionary_file_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "技能库 100 n").unwrap();
    writeln!(file, "搜索 100 v").unwrap();
    file.flush().unwrap();

    let tokenizer = Tokenizer::with_dictionary(file.path()).unwrap();
    assert_eq!(
        tokenizer.dictionary_source(),
        &DictionarySource::File(file.path().to_path_buf())
    );
    assert!(tokenizer.tokenize("技能库搜索").contains("技能库"));
}

#[test]
fn missing_dictionary_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Tokenizer::with_dictionary(dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, TokenizerError::Open { .. }));
}

#[test]
fn default_tokenizer_uses_embedded_dictionary() {
    assert_eq!(
        Tokenizer::from_dictionary_path(None)
            .unwrap()
            .dictionary_source(),
        &DictionarySource::Embedded
    );
}
