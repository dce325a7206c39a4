use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use doc_qa_core::{
    load_documents, load_uploads_from_dir, split_documents, CharacterNgramEmbedder, Embedder,
    GroqGenerator, QaPipeline, VectorIndex,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Where the built index is persisted between invocations.
    #[arg(long, default_value = "index.json")]
    index_path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Replace,
    Append,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a folder of PDFs and persist the searchable index.
    Ingest {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: String,

        /// Replace the persisted index or append this batch to it.
        #[arg(long, value_enum, default_value_t = Mode::Replace)]
        mode: Mode,
    },
    /// Ask a question against the persisted index.
    Ask {
        /// The question to answer.
        #[arg(long)]
        question: String,

        /// Groq API key for answer generation.
        #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
        groq_api_key: String,

        /// Generation model.
        #[arg(long, default_value = doc_qa_core::DEFAULT_GENERATION_MODEL)]
        model: String,

        /// Sampling temperature for generation.
        #[arg(long, default_value = "0.7")]
        temperature: f32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let embedder = CharacterNgramEmbedder::default();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-qa boot"
    );

    match cli.command {
        Command::Ingest { folder, mode } => {
            let files = load_uploads_from_dir(Path::new(&folder)).await?;
            let report = load_documents(&files)?;

            if !report.skipped_files.is_empty() {
                warn!(
                    "skipped_files={} for folder={}",
                    report.skipped_files.len(),
                    folder
                );
                for skipped in &report.skipped_files {
                    warn!(filename = %skipped.filename, reason = %skipped.reason, "skipped pdf");
                }
            }

            if report.documents.is_empty() {
                println!("0 chunks ingested (all files were skipped)");
                return Ok(());
            }

            let chunks = split_documents(&report.documents, Default::default())?;
            let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
            let embeddings = embedder
                .embed_batch(&texts)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let chunk_count = chunks.len();
            let mut index = VectorIndex::build(chunks, embeddings)?;

            if matches!(mode, Mode::Append) && cli.index_path.exists() {
                let mut existing = VectorIndex::load(&cli.index_path)?;
                existing.absorb(index);
                index = existing;
            }

            index.save(&cli.index_path)?;
            println!(
                "{} chunks ingested ({} total in index) at {}",
                chunk_count,
                index.len(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask {
            question,
            groq_api_key,
            model,
            temperature,
        } => {
            let generator = GroqGenerator::new(groq_api_key)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?
                .with_model(model)
                .with_temperature(temperature);

            let pipeline = QaPipeline::new(embedder, generator);
            if cli.index_path.exists() {
                pipeline.install_index(VectorIndex::load(&cli.index_path)?).await;
                info!(index_path = %cli.index_path.display(), "loaded persisted index");
            } else {
                warn!(
                    index_path = %cli.index_path.display(),
                    "no persisted index found, answering without document context"
                );
            }

            let answer = pipeline.ask(&question).await;
            println!("{answer}");
        }
    }

    Ok(())
}
