use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use kb_retrieval_core::{
    index_records, ingest_folder, read_jsonl, write_jsonl, CategoryMap, CorpusBuild,
    IngestionOptions, SearchCoordinator, SearchError, SearchQuery, SqliteFtsStore,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kb-retrieval", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database holding the full-text index
    #[arg(long, env = "KB_DB_PATH", default_value = "data/knowledge.db")]
    db: PathBuf,

    /// Full-text table name shared by the index builder and the retriever
    #[arg(long, env = "KB_INDEX_TABLE", default_value = "chunks_fts")]
    table: String,

    /// Maximum chunk size in characters
    #[arg(long, env = "KB_CHUNK_MAX_CHARS", default_value = "1500")]
    max_chars: usize,

    /// Characters carried over from the previous chunk (0 disables overlap)
    #[arg(long, env = "KB_CHUNK_OVERLAP_CHARS", default_value = "200")]
    overlap_chars: usize,

    /// Document category as NAME=LABEL, where NAME is a file name or stem
    #[arg(long = "category", value_parser = parse_category)]
    categories: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk a folder of PDFs into a JSONL export.
    Chunk {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
        /// Output JSONL file.
        #[arg(long, default_value = "data/chunks.jsonl")]
        out: PathBuf,
    },
    /// Rebuild the full-text index from a JSONL export.
    Index {
        /// JSONL file produced by `chunk`.
        #[arg(long, default_value = "data/chunks.jsonl")]
        chunks: PathBuf,
    },
    /// Chunk a folder of PDFs, export the chunks and rebuild the index.
    Build {
        #[arg(long)]
        folder: PathBuf,
        #[arg(long, default_value = "data/chunks.jsonl")]
        out: PathBuf,
    },
    /// Query the index.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of results to return.
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Restrict results to sources matching this LIKE pattern.
        #[arg(long)]
        source: Option<String>,
        /// Print the response as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the number of indexed chunks.
    Stats,
}

fn parse_category(raw: &str) -> Result<(String, String), String> {
    let (name, label) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=LABEL, got {raw:?}"))?;
    let (name, label) = (name.trim(), label.trim());
    if name.is_empty() || label.is_empty() {
        return Err(format!("expected NAME=LABEL, got {raw:?}"));
    }
    Ok((name.to_string(), label.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "kb-retrieval boot"
    );

    let store = SqliteFtsStore::new(&cli.db, &cli.table)?;
    let options = IngestionOptions {
        chunk_max_chars: cli.max_chars,
        chunk_overlap_chars: cli.overlap_chars,
        ..IngestionOptions::default()
    };
    let categories = CategoryMap::from_iter(cli.categories.iter().cloned());

    match cli.command {
        Command::Chunk { folder, out } => {
            let build = chunk_folder(&folder, &options, categories)?;
            write_jsonl(&out, &build.records)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("{} chunks written to {}", build.records.len(), out.display());
        }
        Command::Index { chunks } => {
            let records =
                read_jsonl(&chunks).with_context(|| format!("reading {}", chunks.display()))?;
            let rows = index_records(&store, &records).await?;
            println!("{rows} chunks indexed into {} ({})", cli.db.display(), cli.table);
        }
        Command::Build { folder, out } => {
            let build = chunk_folder(&folder, &options, categories)?;
            write_jsonl(&out, &build.records)
                .with_context(|| format!("writing {}", out.display()))?;
            let rows = index_records(&store, &build.records).await?;
            println!(
                "{rows} chunks exported to {} and indexed into {} at {}",
                out.display(),
                cli.db.display(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Search {
            query,
            top_k,
            source,
            json,
        } => {
            let mut search_query = SearchQuery::new(query, top_k);
            search_query.source_filter = source;

            let coordinator = SearchCoordinator::new(store);
            let result = coordinator.search(&search_query).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }

            println!("query: {}", result.query);
            if let Some(error) = &result.error {
                warn!(%error, "search degraded");
                println!("error: {error}");
            }
            for (position, hit) in result.results.iter().enumerate() {
                println!(
                    "[{}] rank={:.4} chunk={} source={} page={}",
                    position + 1,
                    hit.rank,
                    hit.chunk_id,
                    hit.source,
                    hit.page
                );
                if let Some(section) = &hit.section_title {
                    println!("  section={section}");
                }
                println!("  chunk_text:\n{}", hit.text);
            }
        }
        Command::Stats => match store.count() {
            Ok(rows) => println!("{rows} chunks in {} ({})", cli.db.display(), cli.table),
            Err(SearchError::IndexMissing(details)) => println!("index not found: {details}"),
            Err(error) => return Err(error.into()),
        },
    }

    Ok(())
}

fn chunk_folder(
    folder: &Path,
    options: &IngestionOptions,
    categories: CategoryMap,
) -> anyhow::Result<CorpusBuild> {
    if categories.is_empty() {
        debug!("no category assignments, documents are labelled by stem");
    } else {
        info!(assignments = categories.len(), "category map loaded");
    }

    let build = ingest_folder(folder, options, categories)
        .with_context(|| format!("building corpus from {}", folder.display()))?;

    for document in &build.documents {
        info!(
            document = %document.file_name,
            checksum = document.checksum.as_deref().unwrap_or("-"),
            pages = document.pages,
            skipped_pages = document.skipped_pages,
            chunks = document.chunks,
            "document summary"
        );
    }
    info!(folder = %folder.display(), chunk_count = build.records.len(), "corpus built");

    Ok(build)
}

#[cfg(test)]
mod tests {
    use super::parse_category;

    #[test]
    fn category_assignments_need_both_sides() {
        assert_eq!(
            parse_category("resep.pdf = kuliner"),
            Ok(("resep.pdf".to_string(), "kuliner".to_string()))
        );
        assert!(parse_category("resep.pdf").is_err());
        assert!(parse_category("=kuliner").is_err());
    }
}
