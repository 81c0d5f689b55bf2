//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Map repository failures to caller-facing service errors.

pub mod skill_service;
pub mod tag_service;
pub mod task_service;
