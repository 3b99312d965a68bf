use std::sync::Arc;

use phonedesk_agent::{
    AgentRuntime, CompletionError, CompletionProvider, DialogueError, OpenAiChatClient,
    SessionStore,
};
use phonedesk_core::config::AppConfig;
use phonedesk_db::connection::{open_record_database, ConnectError};
use phonedesk_db::{DbPool, SqlRecordStore};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub sessions: Arc<SessionStore>,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Database(#[from] ConnectError),
    #[error("completion client could not be built: {0}")]
    Completion(#[from] CompletionError),
    #[error("dialogue runtime could not be built: {0}")]
    Dialogue(#[from] DialogueError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = ?config.llm.provider,
        llm_model = %config.llm.model,
        "starting application bootstrap"
    );

    let db_pool = open_record_database(&config.database).await?;
    info!(
        event_name = "system.bootstrap.database_ready",
        correlation_id = "bootstrap",
        "record database connected and migrated"
    );

    let completion: Arc<dyn CompletionProvider> =
        Arc::new(OpenAiChatClient::from_config(&config.llm)?);
    let sessions = Arc::new(SessionStore::new());
    let runtime = AgentRuntime::with_defaults(
        Arc::clone(&sessions),
        completion,
        Arc::new(SqlRecordStore::new(db_pool.clone())),
        &config.dialogue,
    )?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        max_turns = config.dialogue.max_turns,
        completion_timeout_secs = config.dialogue.completion_timeout_secs,
        "dialogue runtime initialized"
    );

    Ok(Application { config, db_pool, sessions, runtime: Arc::new(runtime) })
}
