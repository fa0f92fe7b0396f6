use lexrag::cli::{Cli, Commands, ConfigAction, ReplCommand};
use lexrag::config::Config;
use lexrag::document::{load_directory, DocumentType};
use lexrag::error::{LexragError, Result};
use lexrag::knowledge::{BuildReport, KnowledgeBaseBuilder, KnowledgeBaseService};
use lexrag::providers::{select_embedding_provider, select_relevance_scorer};
use lexrag::retrieval::{QueryContext, RankedPassage, RetrievalOrchestrator};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Index { dir, doc_type } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_index(&config, &dir, doc_type).await?;
        }
        Commands::Query {
            dir,
            query,
            doc_type,
            fast,
            expand,
            limit,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            let context = QueryContext {
                expand,
                top_n: limit,
                ..if fast {
                    QueryContext::fast()
                } else {
                    QueryContext::default()
                }
            };
            cmd_query(&config, &dir, doc_type, &query, &context, json).await?;
        }
        Commands::Repl { dir, doc_type } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_repl(&config, &dir, doc_type).await?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "lexrag=debug" } else { "lexrag=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load documents, select providers and build the knowledge base
async fn build_engine(
    config: &Config,
    dir: &Path,
    doc_type: DocumentType,
) -> Result<(RetrievalOrchestrator, BuildReport)> {
    let (embedding_variant, embedder) = select_embedding_provider(&config.embedding);
    let (relevance_variant, scorer) = select_relevance_scorer(&config.reranking);
    tracing::info!(
        "Providers: embedding {}, relevance {}",
        embedding_variant,
        relevance_variant
    );

    let documents = load_directory(dir, doc_type)?;
    if documents.is_empty() {
        tracing::warn!("No .txt or .md documents found in {:?}", dir);
    }

    let service = Arc::new(KnowledgeBaseService::new(KnowledgeBaseBuilder::new(
        config, embedder,
    )?));
    let knowledge_base = service.build(documents).await?;
    let report = knowledge_base.build_report.clone();

    let orchestrator = RetrievalOrchestrator::new(service, scorer, config)?;
    Ok((orchestrator, report))
}

async fn cmd_index(config: &Config, dir: &Path, doc_type: DocumentType) -> Result<()> {
    let (orchestrator, report) = build_engine(config, dir, doc_type).await?;

    println!("✓ Knowledge base built in {}ms", report.duration_ms);
    println!("  Documents: {}", report.documents);
    println!("  Chunks:    {}", report.chunks);
    println!("  Dense:     {}", report.dense_indexed);
    println!("  Sparse:    {}", report.sparse_indexed);

    if !report.failures.is_empty() {
        println!("\n⚠ {} indexing failures:", report.failures.len());
        for failure in &report.failures {
            println!(
                "  {} ({:?}): {}",
                failure.chunk_id, failure.stage, failure.reason
            );
        }
    }

    if let Some(stats) = orchestrator.knowledge().stats().await {
        println!("\nVocabulary:    {} terms", stats.vocabulary_size);
        println!("Entities:      {}", stats.entities);
        println!("Relationships: {}", stats.relationships);
        if let Some(model) = stats.embedding_model {
            println!("Embeddings:    {}", model);
        }
    }

    Ok(())
}

async fn cmd_query(
    config: &Config,
    dir: &Path,
    doc_type: DocumentType,
    query: &str,
    context: &QueryContext,
    json: bool,
) -> Result<()> {
    let (orchestrator, _) = build_engine(config, dir, doc_type).await?;
    let report = orchestrator.retrieve_detailed(query, Some(context)).await?;

    if json {
        let output = serde_json::to_string_pretty(&report).map_err(|e| LexragError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    if report.degraded.any() {
        println!(
            "⚠ Degraded signals: dense={}, relevance={}\n",
            report.degraded.dense, report.degraded.relevance
        );
    }
    print_passages(&report.passages);
    Ok(())
}

fn print_passages(passages: &[RankedPassage]) {
    if passages.is_empty() {
        println!("No matching passages");
        return;
    }

    for (rank, passage) in passages.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} / {} ({})",
            rank + 1,
            passage.final_score,
            passage.document_id,
            passage.section_type,
            passage.chunk_id
        );
        println!("   {}\n", passage.preview(200).replace('\n', " "));
    }
}

async fn cmd_repl(config: &Config, dir: &Path, doc_type: DocumentType) -> Result<()> {
    let (orchestrator, report) = build_engine(config, dir, doc_type).await?;
    println!(
        "✓ {} chunks from {} documents. Type a question, :help for commands.",
        report.chunks, report.documents
    );

    let mut hints: HashMap<String, String> = HashMap::new();
    let mut context = QueryContext::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"lexrag> ").await.map_err(io_error)?;
        stdout.flush().await.map_err(io_error)?;

        let Some(line) = lines.next_line().await.map_err(io_error)? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => {
                println!("  <question>                   search the documents");
                println!("  :feedback <chunk_id> [0..1]  rate a passage or show its score");
                println!("  :set <hint>=<value>          fast, document_type, expand, top_n");
                println!("  :entities <doc_id> [type]    list extracted entities");
                println!("  :history                     recent queries");
                println!("  :stats                       show retrieval statistics");
                println!("  :quit                        leave");
            }
            ReplCommand::Stats => {
                let stats = orchestrator.get_retrieval_stats().await;
                match serde_json::to_string_pretty(&stats) {
                    Ok(output) => println!("{}", output),
                    Err(e) => println!("Failed to serialize stats: {}", e),
                }
            }
            ReplCommand::History => {
                for entry in orchestrator.recent_queries(10).await {
                    println!(
                        "  {} {} ({} results)",
                        entry.timestamp.format("%H:%M:%S"),
                        entry.query,
                        entry.result_count()
                    );
                }
            }
            ReplCommand::Feedback { chunk_id, score: None } => {
                let value = orchestrator.feedback_for(&chunk_id).await;
                println!("  Feedback for {}: {:.3}", chunk_id, value);
            }
            ReplCommand::Feedback {
                chunk_id,
                score: Some(score),
            } => match orchestrator.update_feedback(&chunk_id, score).await {
                Some(value) => println!("✓ Feedback for {} is now {:.3}", chunk_id, value),
                None => println!("Ignored non-numeric feedback score"),
            },
            ReplCommand::Set { key, value } => {
                hints.insert(key, value);
                context = QueryContext::from_hints(&hints);
                println!(
                    "  mode={:?} document_type={:?} expand={} top_n={:?}",
                    context.mode, context.document_type, context.expand, context.top_n
                );
            }
            ReplCommand::Entities {
                document_id,
                entity_type,
            } => print_entities(&orchestrator, &document_id, entity_type.as_deref()).await,
            ReplCommand::Query(query) => {
                match orchestrator.retrieve_and_rerank(&query, Some(&context)).await {
                    Ok(passages) => print_passages(&passages),
                    Err(e) => println!("✗ {}", e),
                }
            }
            ReplCommand::Unknown(input) => println!("Unknown command: {}", input),
        }
    }

    Ok(())
}

async fn print_entities(
    orchestrator: &RetrievalOrchestrator,
    document_id: &str,
    entity_type: Option<&str>,
) {
    let Some(knowledge_base) = orchestrator.knowledge().snapshot().await else {
        println!("Knowledge base not built");
        return;
    };
    let Some(record) = knowledge_base.record(document_id) else {
        println!("Unknown document: {}", document_id);
        return;
    };

    let entities: Vec<_> = match entity_type {
        Some(entity_type) => record.entities_of_type(entity_type).collect(),
        None => record.entities.iter().collect(),
    };
    if entities.is_empty() {
        println!("No entities");
    }
    for entity in entities {
        println!(
            "  {:<16} {:<24} ({:.2}, {})",
            entity.entity_type, entity.value, entity.confidence, entity.chunk_id
        );
    }
}

fn io_error(e: std::io::Error) -> LexragError {
    LexragError::Io {
        source: e,
        context: "Terminal I/O failed".to_string(),
    }
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            let output = toml::to_string_pretty(&config)?;
            println!("{}", output);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Profiles: {}", config.profiles.len());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LexragError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'lexrag config init' to create one."
        );
        let mut config = Config::default();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        return Ok(config);
    }

    match profile {
        Some(profile) => Config::load_with_profile(&path, &profile),
        None => Config::load(&path),
    }
}
