use crate::chunking::{char_len, chunk_by_paragraph, normalize_whitespace, ChunkingConfig};
use crate::error::CorpusError;
use crate::extractor::{LopdfExtractor, PageText, PdfExtractor};
use crate::models::{ChunkRecord, IngestionOptions};
use crate::sections::SectionSegmenter;
use crate::traits::KeywordIndex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Static document-name to category table. Lookups try the file name, then
/// the stem, and fall back to the stem itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    entries: BTreeMap<String, String>,
}

impl CategoryMap {
    pub fn category_for(&self, file_name: &str) -> String {
        let stem = document_stem(file_name);
        self.entries
            .get(file_name)
            .or_else(|| self.entries.get(&stem))
            .cloned()
            .unwrap_or(stem)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, category)| (name.into(), category.into()))
                .collect(),
        }
    }
}

/// Page texts of one source document as handed over by the extractor.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub checksum: Option<String>,
    pub pages: Vec<PageText>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub file_name: String,
    pub checksum: Option<String>,
    pub pages: usize,
    pub skipped_pages: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone)]
pub struct CorpusBuild {
    pub records: Vec<ChunkRecord>,
    pub documents: Vec<DocumentSummary>,
}

pub struct CorpusBuilder {
    config: ChunkingConfig,
    segmenter: SectionSegmenter,
    categories: CategoryMap,
}

impl CorpusBuilder {
    pub fn new(options: &IngestionOptions, categories: CategoryMap) -> Result<Self, CorpusError> {
        options.validate()?;

        Ok(Self {
            config: ChunkingConfig::from(options),
            segmenter: SectionSegmenter::new(options.heading_regex)?,
            categories,
        })
    }

    /// Builds the corpus for every PDF under `folder`. Any document that
    /// cannot be read aborts the whole build.
    pub fn build_folder<E: PdfExtractor>(
        &self,
        folder: &Path,
        extractor: &E,
    ) -> Result<CorpusBuild, CorpusError> {
        let files = discover_pdf_files(folder)?;

        if files.is_empty() {
            return Err(CorpusError::NoDocuments(folder.display().to_string()));
        }

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| CorpusError::MissingFileName(path.display().to_string()))?
                .to_string();

            documents.push(SourceDocument {
                checksum: Some(digest_file(&path)?),
                pages: extractor.extract_pages(&path)?,
                file_name,
            });
        }

        self.build_documents(documents)
    }

    pub fn build_documents(
        &self,
        mut documents: Vec<SourceDocument>,
    ) -> Result<CorpusBuild, CorpusError> {
        documents.sort_by(|left, right| left.file_name.cmp(&right.file_name));

        let mut stems = HashMap::<String, String>::new();
        for document in &documents {
            let stem = document_stem(&document.file_name);
            if let Some(first) = stems.insert(stem.clone(), document.file_name.clone()) {
                return Err(CorpusError::DuplicateDocument {
                    stem,
                    first,
                    second: document.file_name.clone(),
                });
            }
        }

        let mut records = Vec::new();
        let mut summaries = Vec::with_capacity(documents.len());

        for document in &documents {
            let (document_records, summary) = self.build_document(document);
            info!(
                document = %summary.file_name,
                pages = summary.pages,
                skipped_pages = summary.skipped_pages,
                chunks = summary.chunks,
                "document chunked"
            );
            records.extend(document_records);
            summaries.push(summary);
        }

        Ok(CorpusBuild {
            records,
            documents: summaries,
        })
    }

    pub fn build_document(&self, document: &SourceDocument) -> (Vec<ChunkRecord>, DocumentSummary) {
        let stem = document_stem(&document.file_name);
        let category = self.categories.category_for(&document.file_name);

        let mut records = Vec::new();
        let mut skipped_pages = 0;

        for page in &document.pages {
            let page_number = page.number.max(1);
            let normalized = normalize_whitespace(&page.text);
            if normalized.is_empty() {
                debug!(document = %document.file_name, page = page_number, "skipping empty page");
                skipped_pages += 1;
                continue;
            }

            let blocks = self.segmenter.segment(&normalized);
            for (block_index, block) in blocks.into_iter().enumerate() {
                if block.body.is_empty() {
                    continue;
                }

                let pieces = if char_len(&block.body) <= self.config.max_chars {
                    vec![block.body.clone()]
                } else {
                    chunk_by_paragraph(&block.body, self.config)
                };

                for (chunk_index, text) in pieces.into_iter().enumerate() {
                    records.push(ChunkRecord {
                        id: make_chunk_id(&stem, page_number, block_index + 1, chunk_index + 1),
                        text,
                        source: document.file_name.clone(),
                        category: Some(category.clone()),
                        page: page_number,
                        section_title: block.heading.section_title(),
                        heading: block.heading.clone(),
                    });
                }
            }
        }

        let summary = DocumentSummary {
            file_name: document.file_name.clone(),
            checksum: document.checksum.clone(),
            pages: document.pages.len(),
            skipped_pages,
            chunks: records.len(),
        };

        (records, summary)
    }
}

pub fn discover_pdf_files(folder: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder) {
        let entry = entry.map_err(|error| CorpusError::Io(error.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    Ok(files)
}

pub fn digest_file(path: &Path) -> Result<String, CorpusError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn ingest_folder(
    folder: &Path,
    options: &IngestionOptions,
    categories: CategoryMap,
) -> Result<CorpusBuild, CorpusError> {
    CorpusBuilder::new(options, categories)?.build_folder(folder, &LopdfExtractor)
}

/// Replaces the index contents with `records`. Store failures surface as
/// `CorpusError::Index`.
pub async fn index_records<K>(index: &K, records: &[ChunkRecord]) -> Result<usize, CorpusError>
where
    K: KeywordIndex + ?Sized,
{
    let rows = index.rebuild_index(records).await?;
    info!(rows, "index rebuilt from corpus");
    Ok(rows)
}

fn document_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
        .to_string()
}

fn make_chunk_id(stem: &str, page: u32, block: usize, chunk: usize) -> String {
    format!("{stem}_p{page:03}_b{block:02}_c{chunk:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::SqliteFtsStore;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    struct FakeExtractor;

    impl PdfExtractor for FakeExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, CorpusError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.starts_with("broken") {
                return Err(CorpusError::PdfParse {
                    document: name.to_string(),
                    details: "bad xref".to_string(),
                });
            }
            Ok(vec![page(1, &format!("# {name}\n\nisi dokumen"))])
        }
    }

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    fn document(file_name: &str, pages: Vec<PageText>) -> SourceDocument {
        SourceDocument {
            file_name: file_name.to_string(),
            checksum: None,
            pages,
        }
    }

    fn builder(max_chars: usize) -> CorpusBuilder {
        let options = IngestionOptions {
            chunk_max_chars: max_chars,
            chunk_overlap_chars: 0,
            ..IngestionOptions::default()
        };
        let categories = CategoryMap::from_iter([("resep.pdf", "kuliner")]);
        CorpusBuilder::new(&options, categories).expect("valid options")
    }

    #[test]
    fn records_carry_provenance_and_deterministic_ids() -> Result<(), Box<dyn std::error::Error>> {
        let documents = vec![
            document(
                "resep.pdf",
                vec![
                    page(1, "# Rempah\n\nPala\n\n## Pala\n\nBiji pala kering."),
                    page(2, "   \n\n  "),
                    page(3, "Catatan tanpa judul."),
                ],
            ),
            document("budidaya.pdf", vec![page(1, "Tanam bibit.")]),
        ];

        let build = builder(1_500).build_documents(documents)?;
        let ids: Vec<&str> = build.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "budidaya_p001_b01_c01",
                "resep_p001_b01_c01",
                "resep_p001_b02_c01",
                "resep_p003_b01_c01",
            ]
        );

        let pala = &build.records[2];
        assert_eq!(pala.text, "Biji pala kering.");
        assert_eq!(pala.source, "resep.pdf");
        assert_eq!(pala.category.as_deref(), Some("kuliner"));
        assert_eq!(pala.page, 1);
        assert_eq!(pala.heading.h1.as_deref(), Some("Rempah"));
        assert_eq!(pala.heading.h2.as_deref(), Some("Pala"));
        assert_eq!(pala.section_title.as_deref(), Some("Pala"));

        let untitled = &build.records[3];
        assert!(untitled.heading.is_empty());
        assert_eq!(untitled.section_title, None);

        assert_eq!(build.records[0].category.as_deref(), Some("budidaya"));
        assert_eq!(build.documents[1].skipped_pages, 1);
        assert_eq!(build.documents[1].chunks, 3);
        Ok(())
    }

    #[test]
    fn oversized_blocks_are_chunked() -> Result<(), Box<dyn std::error::Error>> {
        let body = "satu dua tiga\n\nempat lima enam\n\ntujuh delapan";
        let build = builder(20).build_documents(vec![document("a.pdf", vec![page(4, body)])])?;

        let ids: Vec<&str> = build.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a_p004_b01_c01", "a_p004_b01_c02", "a_p004_b01_c03"]);
        assert!(build.records.iter().all(|r| r.text.chars().count() <= 20));
        Ok(())
    }

    #[test]
    fn duplicate_stems_are_rejected() {
        let documents = vec![
            document("a.pdf", vec![page(1, "x")]),
            document("a.PDF", vec![page(1, "y")]),
        ];
        assert!(matches!(
            builder(100).build_documents(documents),
            Err(CorpusError::DuplicateDocument { .. })
        ));
    }

    #[test]
    fn category_lookup_falls_back_to_stem() {
        let categories = CategoryMap::from_iter([("panduan", "manual"), ("resep.pdf", "kuliner")]);
        assert_eq!(categories.category_for("panduan.pdf"), "manual");
        assert_eq!(categories.category_for("resep.pdf"), "kuliner");
        assert_eq!(categories.category_for("lain.pdf"), "lain");
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        fs::write(base.join("notes.txt"), b"ignored")?;

        let files = discover_pdf_files(base)?;
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file_path = dir.path().join("a.pdf");
        fs::write(&file_path, b"abc")?;

        let first = digest_file(&file_path)?;
        let second = digest_file(&file_path)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn build_fails_without_pdfs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = builder(100).build_folder(dir.path(), &FakeExtractor);
        assert!(matches!(result, Err(CorpusError::NoDocuments(_))));
        Ok(())
    }

    #[test]
    fn one_unreadable_pdf_aborts_the_build() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.pdf"), b"%PDF-1.4")?;
        fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4\n%broken")?;

        let result = builder(100).build_folder(dir.path(), &FakeExtractor);
        assert!(matches!(result, Err(CorpusError::PdfParse { .. })));
        Ok(())
    }

    #[test]
    fn folder_build_records_checksums() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("b.pdf"), b"%PDF-1.4 b")?;
        fs::write(dir.path().join("a.pdf"), b"%PDF-1.4 a")?;

        let build = builder(100).build_folder(dir.path(), &FakeExtractor)?;
        assert_eq!(build.records.len(), 2);
        assert_eq!(build.records[0].heading.h1.as_deref(), Some("a.pdf"));
        assert_eq!(
            build.documents[0].checksum.as_deref(),
            Some(digest_file(&dir.path().join("a.pdf"))?.as_str())
        );
        Ok(())
    }

    #[tokio::test]
    async fn failed_index_rebuild_is_a_corpus_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let blocker = dir.path().join("data");
        fs::write(&blocker, b"not a directory")?;
        let store = SqliteFtsStore::with_default_table(blocker.join("kb.db"));

        let build = builder(100).build_documents(vec![document("a.pdf", vec![page(1, "isi")])])?;
        let result = index_records(&store, &build.records).await;

        assert!(matches!(result, Err(CorpusError::Index(_))));
        Ok(())
    }

    #[tokio::test]
    async fn corpus_records_index_into_the_store() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = SqliteFtsStore::with_default_table(dir.path().join("kb.db"));

        let build = builder(100).build_documents(vec![document("a.pdf", vec![page(1, "isi")])])?;
        assert_eq!(index_records(&store, &build.records).await?, 1);
        assert_eq!(store.count()?, 1);
        Ok(())
    }
}
