use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use studybuddy::cli::{Args, Command};
use studybuddy::config::Config;
use studybuddy::embedding::EmbeddingEngine;
use studybuddy::index::store::{DocumentStore, QdrantStore};
use studybuddy::index::DocumentIndexer;
use studybuddy::llm::{ChatModel, GigaChatClient, TokenCache};
use studybuddy::orchestrator::Orchestrator;
use studybuddy::rag::{RagAnswer, RagSession};
use studybuddy::session::SessionStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load()?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_bot(&config).await,
        Command::Index { file, user } => {
            let store = build_store(&config)?;
            let indexer =
                DocumentIndexer::new(store, config.rag.chunk_size, config.rag.chunk_overlap);
            let report = indexer.index(&file, user).await?;
            println!(
                "Indexed {} chars into {} chunks for user {}",
                report.text_len, report.chunks, user
            );
            Ok(())
        }
        Command::Ask { question, user } => {
            let store = build_store(&config)?;
            let model = build_model(&config)?;
            let mut session = RagSession::open(
                user,
                store,
                model,
                config.rag.retriever_k,
                config.rag.memory_token_limit,
            )
            .await?;

            match session.ask(&question).await? {
                RagAnswer::Answer(text) => println!("{}", text),
                RagAnswer::NoAnswer => println!("В конспекте нет данных по этому вопросу."),
            }
            Ok(())
        }
        Command::Config => {
            println!("Config file: {}", Config::config_path()?.display());
            let missing = config.missing_secrets();
            if missing.is_empty() {
                println!("All required secrets are set.");
            } else {
                println!("Missing secrets: {}", missing.join(", "));
            }
            Ok(())
        }
    }
}

async fn run_bot(config: &Config) -> Result<()> {
    config.validate()?;

    let model = build_model(config)?;
    let store = build_store(config)?;

    let sessions = Arc::new(SessionStore::new(
        Arc::clone(&store),
        Arc::clone(&model),
        config.rag.retriever_k,
        config.rag.memory_token_limit,
    ));
    let indexer = DocumentIndexer::new(
        Arc::clone(&store),
        config.rag.chunk_size,
        config.rag.chunk_overlap,
    );
    let orchestrator = Arc::new(Orchestrator::new(sessions, indexer, model));

    let token = config
        .telegram
        .bot_token
        .as_deref()
        .context("TELEGRAM_BOT_TOKEN is not set")?;
    let bot = Arc::new(studybuddy::bot::TelegramBot::new(token, orchestrator));

    tracing::info!("studybuddy starting");
    bot.run().await?;
    Ok(())
}

fn build_model(config: &Config) -> Result<Arc<dyn ChatModel>> {
    let auth_key = config
        .gigachat
        .auth_key
        .as_deref()
        .context("GIGACHAT_AUTH_KEY is not set")?;
    let client_secret = config
        .gigachat
        .client_secret
        .as_deref()
        .context("GIGACHAT_CLIENT_SECRET is not set")?;

    let tokens = Arc::new(TokenCache::new(
        &config.gigachat.auth_url,
        auth_key,
        client_secret,
        &config.gigachat.scope,
    )?);
    Ok(Arc::new(GigaChatClient::new(&config.gigachat, tokens)?))
}

fn build_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    tracing::info!(model = %config.rag.embedding_model, "loading embedding model");
    let embeddings = Arc::new(EmbeddingEngine::new(&config.rag.embedding_model)?);
    Ok(Arc::new(QdrantStore::new(
        &config.rag.qdrant_url,
        embeddings,
    )?))
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "studybuddy=info",
        1 => "studybuddy=debug",
        _ => "studybuddy=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
