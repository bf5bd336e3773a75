use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error in {document}: {details}")]
    PdfParse { document: String, details: String },

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("documents {first} and {second} share the stem {stem}")]
    DuplicateDocument {
        stem: String,
        first: String,
        second: String,
    },

    #[error("no pdf files found in {0}")]
    NoDocuments(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("chunk export error at line {line}: {source}")]
    Export {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("index build failed: {0}")]
    Index(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("index not found: {0}")]
    IndexMissing(String),

    #[error("query rejected by the full-text store: {0}")]
    QuerySyntax(String),

    #[error("invalid index table name: {0}")]
    InvalidTableName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("search request failed: {0}")]
    Request(String),
}

pub type Result<T, E = CorpusError> = std::result::Result<T, E>;
