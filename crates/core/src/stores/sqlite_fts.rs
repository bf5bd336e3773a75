use crate::models::{ChunkRecord, HeadingContext};
use crate::store::{MatchRequest, StoreHit};
use crate::traits::KeywordIndex;
use crate::SearchError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_INDEX_TABLE: &str = "chunks_fts";

/// SQLite FTS5 table holding one row per chunk. Every call opens its own
/// connection, so concurrent searches share nothing but the file.
#[derive(Debug, Clone)]
pub struct SqliteFtsStore {
    path: PathBuf,
    table: String,
}

impl SqliteFtsStore {
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>) -> Result<Self, SearchError> {
        let table = table.into();
        let valid = table
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid {
            return Err(SearchError::InvalidTableName(table));
        }

        Ok(Self {
            path: path.into(),
            table,
        })
    }

    pub fn with_default_table(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: DEFAULT_INDEX_TABLE.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Drops and recreates the table inside one transaction, so readers see
    /// either the previous index or the complete new one.
    pub fn rebuild(&self, records: &[ChunkRecord]) -> Result<usize, SearchError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let table = &self.table;
        let mut conn = Connection::open(&self.path)?;
        let tx = conn.transaction()?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE VIRTUAL TABLE {table} USING fts5(
                chunk,
                source,
                page UNINDEXED,
                section_title,
                category,
                chunk_id UNINDEXED,
                h1,
                h2,
                h3,
                tokenize = 'unicode61'
             );"
        ))?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {table} (chunk, source, page, section_title, category, chunk_id, h1, h2, h3)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ))?;

            for record in records {
                insert.execute(params![
                    record.text,
                    record.source,
                    i64::from(record.page),
                    record.section_title,
                    record.category,
                    record.id,
                    record.heading.h1,
                    record.heading.h2,
                    record.heading.h3,
                ])?;
            }
        }

        tx.commit()?;
        info!(
            path = %self.path.display(),
            table = %self.table,
            rows = records.len(),
            "full-text index rebuilt"
        );
        Ok(records.len())
    }

    pub fn count(&self) -> Result<usize, SearchError> {
        let conn = self.open_read_only()?;
        let rows: i64 = conn
            .query_row(&format!("SELECT count(*) FROM {}", self.table), [], |row| {
                row.get(0)
            })
            .map_err(|error| self.classify(error))?;
        Ok(usize::try_from(rows).unwrap_or_default())
    }

    pub fn query(&self, request: &MatchRequest<'_>) -> Result<Vec<StoreHit>, SearchError> {
        let conn = self.open_read_only()?;
        let table = &self.table;
        let sql = format!(
            "SELECT chunk, source, CAST(page AS INTEGER), section_title, category, chunk_id,
                    h1, h2, h3, bm25({table}) AS score
             FROM {table}
             WHERE {table} MATCH ?1 AND (?3 IS NULL OR source LIKE ?3)
             ORDER BY score
             LIMIT ?2"
        );

        let limit = i64::try_from(request.limit).unwrap_or(i64::MAX);
        let pattern = request.source_filter.map(like_pattern);

        let mut statement = conn.prepare(&sql).map_err(|error| self.classify(error))?;
        let rows = statement
            .query_map(params![request.expression, limit, pattern], read_hit)
            .map_err(|error| self.classify(error))?;

        let hits = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| self.classify(error))?;
        Ok(hits)
    }

    fn open_read_only(&self) -> Result<Connection, SearchError> {
        if !self.path.is_file() {
            return Err(SearchError::IndexMissing(self.path.display().to_string()));
        }

        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }

    fn classify(&self, error: rusqlite::Error) -> SearchError {
        let message = error.to_string();

        if message.contains("no such table") {
            return SearchError::IndexMissing(format!(
                "table {} in {}",
                self.table,
                self.path.display()
            ));
        }

        let rejected_expression = message.starts_with("fts5:")
            || message.contains("syntax error")
            || message.contains("no such column")
            || message.contains("unterminated string")
            || message.contains("unknown special query");

        if rejected_expression {
            SearchError::QuerySyntax(message)
        } else {
            SearchError::Sqlite(error)
        }
    }
}

#[async_trait]
impl KeywordIndex for SqliteFtsStore {
    async fn rebuild_index(&self, records: &[ChunkRecord]) -> Result<usize, SearchError> {
        let store = self.clone();
        let records = records.to_vec();
        tokio::task::spawn_blocking(move || store.rebuild(&records))
            .await
            .map_err(|error| SearchError::Request(error.to_string()))?
    }

    async fn search_keyword(
        &self,
        request: &MatchRequest<'_>,
    ) -> Result<Vec<StoreHit>, SearchError> {
        let store = self.clone();
        let expression = request.expression.to_string();
        let source_filter = request.source_filter.map(str::to_string);
        let limit = request.limit;

        tokio::task::spawn_blocking(move || {
            store.query(&MatchRequest {
                expression: &expression,
                limit,
                source_filter: source_filter.as_deref(),
            })
        })
        .await
        .map_err(|error| SearchError::Request(error.to_string()))?
    }
}

/// A filter without LIKE wildcards matches anywhere in the source name.
fn like_pattern(filter: &str) -> String {
    if filter.contains(['%', '_']) {
        filter.to_string()
    } else {
        format!("%{filter}%")
    }
}

fn read_hit(row: &Row<'_>) -> rusqlite::Result<StoreHit> {
    let page: Option<i64> = row.get(2)?;

    Ok(StoreHit {
        record: ChunkRecord {
            text: row.get(0)?,
            source: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            page: page
                .and_then(|page| u32::try_from(page).ok())
                .filter(|page| *page >= 1)
                .unwrap_or(1),
            section_title: row.get(3)?,
            category: row.get(4)?,
            id: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            heading: HeadingContext {
                h1: row.get(6)?,
                h2: row.get(7)?,
                h3: row.get(8)?,
            },
        },
        rank: row.get(9)?,
    })
}
