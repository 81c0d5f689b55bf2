//! Skill search subsystem.
//!
//! # Responsibility
//! - Tokenize skill text and queries (`tokenizer`).
//! - Maintain the term → skill inverted index inside the store (`index`).
//! - Rank skills by token overlap (`ranker`).
//!
//! Search results are always computed live; nothing here is cached.

pub mod index;
pub mod ranker;
pub mod tokenizer;
