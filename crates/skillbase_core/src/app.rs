//! Application context wiring the core together.
//!
//! # Responsibility
//! - Turn a validated `CoreConfig` into the long-lived collaborators: the
//!   tokenizer, the tag and project caches and the invalidator.
//! - Hand out per-request connections, repositories and services.
//!
//! # Invariants
//! - Startup fails fast on invalid config, an unloadable dictionary or an
//!   unmigratable store.
//! - Connections are never shared between requests; the context itself is
//!   `Send + Sync`.

use crate::cache::{ProjectCache, TagCache};
use crate::config::{ConfigError, CoreConfig};
use crate::db::{open_db, DbError, DbResult};
use crate::invalidation::Invalidator;
use crate::logging::{init_logging, LoggingError};
use crate::repo::skill_repo::SqliteSkillRepository;
use crate::repo::tag_repo::SqliteTagRepository;
use crate::repo::task_repo::SqliteTaskRepository;
use crate::search::tokenizer::{Tokenizer, TokenizerError};
use crate::service::skill_service::SkillService;
use crate::service::tag_service::TagService;
use crate::service::task_service::TaskService;
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type AppResult<T> = Result<T, AppError>;

/// Startup failure of the application context.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Logging(LoggingError),
    Tokenizer(TokenizerError),
    Db(DbError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Tokenizer(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Tokenizer(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for AppError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<TokenizerError> for AppError {
    fn from(value: TokenizerError) -> Self {
        Self::Tokenizer(value)
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Long-lived core context. Build once at startup, share by reference.
#[derive(Debug)]
pub struct SkillBase {
    config: CoreConfig,
    tokenizer: Arc<Tokenizer>,
    invalidator: Invalidator,
}

impl SkillBase {
    /// Validates `config`, initializes logging when configured, loads the
    /// tokenizer and migrates the store once.
    pub fn start(config: CoreConfig) -> AppResult<Self> {
        config.validate()?;
        init_logging(&config.log)?;
        let tokenizer = Tokenizer::from_dictionary_path(config.tokenizer.dictionary.as_deref())?;
        let app = Self::with_tokenizer(config, Arc::new(tokenizer))?;

        // Migrations run on open; the connection itself is not kept.
        drop(app.open_connection()?);
        info!(
            "event=app_start module=app status=ok db_path={}",
            app.config.db.path.display()
        );
        Ok(app)
    }

    /// Builds a context around an already loaded tokenizer.
    ///
    /// Does not touch the store or the logger.
    pub fn with_tokenizer(config: CoreConfig, tokenizer: Arc<Tokenizer>) -> AppResult<Self> {
        config.validate()?;
        let tags = Arc::new(TagCache::new(config.cache.tag_max_entries));
        let projects = Arc::new(ProjectCache::new(config.cache.project_max_entries));
        Ok(Self {
            invalidator: Invalidator::new(tags, projects),
            tokenizer,
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    /// Opens a fresh connection to the configured store for one request.
    pub fn open_connection(&self) -> DbResult<Connection> {
        open_db(&self.config.db.path)
    }

    pub fn skill_repo<'a>(&'a self, conn: &'a Connection) -> SqliteSkillRepository<'a> {
        SqliteSkillRepository::new(conn, &self.tokenizer)
    }

    pub fn tag_repo<'a>(&'a self, conn: &'a Connection) -> SqliteTagRepository<'a> {
        SqliteTagRepository::new(conn, &self.invalidator, self.config.cache.tag_ttl())
    }

    pub fn task_repo<'a>(&'a self, conn: &'a Connection) -> SqliteTaskRepository<'a> {
        SqliteTaskRepository::new(conn, &self.invalidator, self.config.cache.project_ttl())
    }

    pub fn skill_service<'a>(&'a self, conn: &'a Connection) -> SkillService<SqliteSkillRepository<'a>> {
        SkillService::new(self.skill_repo(conn))
    }

    pub fn tag_service<'a>(&'a self, conn: &'a Connection) -> TagService<SqliteTagRepository<'a>> {
        TagService::new(self.tag_repo(conn))
    }

    pub fn task_service<'a>(&'a self, conn: &'a Connection) -> TaskService<SqliteTaskRepository<'a>> {
        TaskService::new(self.task_repo(conn))
    }

    /// Drops every cached entry and releases the context.
    pub fn shutdown(self) {
        self.invalidator.tag_cache().clear();
        self.invalidator.project_cache().clear();
        info!("event=app_stop module=app status=ok");
    }
}
