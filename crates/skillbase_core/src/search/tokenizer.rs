//! Dictionary-backed term extraction for skill text and search queries.
//!
//! # Responsibility
//! - Segment mixed Latin/CJK text into normalized, de-duplicated terms.
//! - Load the segmentation dictionary once, at construction.
//!
//! # Invariants
//! - `tokenize` is pure: identical input yields the identical term set.
//! - Terms are lower-case, trimmed, non-empty and contain at least one
//!   alphanumeric character.
//! - The dictionary is never mutated after construction.

use jieba_rs::Jieba;
use log::{error, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Where the segmentation dictionary was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionarySource {
    /// Dictionary compiled into the segmenter crate.
    Embedded,
    /// User-supplied dictionary file in `word [freq] [tag]` line format.
    File(PathBuf),
}

/// Dictionary could not be loaded. Fatal at startup.
#[derive(Debug)]
pub enum TokenizerError {
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidDictionary {
        path: PathBuf,
        message: String,
    },
}

impl Display for TokenizerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => write!(
                f,
                "cannot open tokenizer dictionary `{}`: {source}",
                path.display()
            ),
            Self::InvalidDictionary { path, message } => write!(
                f,
                "invalid tokenizer dictionary `{}`: {message}",
                path.display()
            ),
        }
    }
}

impl Error for TokenizerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::InvalidDictionary { .. } => None,
        }
    }
}

/// Immutable segmenter shared by the index adapter and the search ranker.
pub struct Tokenizer {
    jieba: Jieba,
    source: DictionarySource,
}

impl Tokenizer {
    /// Builds a tokenizer over the embedded dictionary.
    pub fn new() -> Self {
        let started_at = Instant::now();
        let jieba = Jieba::new();
        info!(
            "event=tokenizer_load module=search status=ok source=embedded duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Self {
            jieba,
            source: DictionarySource::Embedded,
        }
    }

    /// Builds a tokenizer over a custom dictionary file.
    ///
    /// The file replaces the embedded dictionary entirely.
    pub fn with_dictionary(path: impl AsRef<Path>) -> Result<Self, TokenizerError> {
        let path = path.as_ref();
        let started_at = Instant::now();

        let file = File::open(path).map_err(|source| {
            error!(
                "event=tokenizer_load module=search status=error source=file error_code=dict_open_failed"
            );
            TokenizerError::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let mut reader = BufReader::new(file);
        let jieba = Jieba::with_dict(&mut reader).map_err(|err| {
            error!(
                "event=tokenizer_load module=search status=error source=file error_code=dict_invalid"
            );
            TokenizerError::InvalidDictionary {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        })?;

        info!(
            "event=tokenizer_load module=search status=ok source=file duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(Self {
            jieba,
            source: DictionarySource::File(path.to_path_buf()),
        })
    }

    /// Builds from an optional dictionary path, falling back to the embedded one.
    pub fn from_dictionary_path(path: Option<&Path>) -> Result<Self, TokenizerError> {
        match path {
            Some(path) => Self::with_dictionary(path),
            None => Ok(Self::new()),
        }
    }

    pub fn dictionary_source(&self) -> &DictionarySource {
        &self.source
    }

    /// Splits `text` into its normalized term set.
    ///
    /// Lower-casing happens before segmentation so casing can never change
    /// where words are cut.
    pub fn tokenize(&self, text: &str) -> BTreeSet<String> {
        let lowered = text.to_lowercase();
        self.jieba
            .cut(&lowered, true)
            .into_iter()
            .map(str::trim)
            .filter(|token| is_term(token))
            .map(str::to_string)
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Tokenizer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

fn is_term(token: &str) -> bool {
    !token.is_empty() && token.chars().any(char::is_alphanumeric)
}
