pub mod chunking;
pub mod error;
pub mod export;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod sections;
pub mod store;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_by_paragraph, normalize_whitespace, ChunkingConfig};
pub use error::{CorpusError, SearchError};
pub use export::{read_jsonl, to_jsonl_string, write_jsonl};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{
    digest_file, discover_pdf_files, index_records, ingest_folder, CategoryMap, CorpusBuild,
    CorpusBuilder, DocumentSummary, SourceDocument,
};
pub use models::{
    ChunkRecord, Citation, HeadingContext, IngestionOptions, MatchTier, SearchHit, SearchQuery,
    SearchResult,
};
pub use orchestrator::SearchCoordinator;
pub use query::{QueryProcessor, QueryTables};
pub use sections::{SectionBlock, SectionSegmenter};
pub use store::{MatchRequest, StoreHit};
pub use stores::{SqliteFtsStore, DEFAULT_INDEX_TABLE};
pub use traits::KeywordIndex;
