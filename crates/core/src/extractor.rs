use crate::error::CorpusError;
use lopdf::Document;
use std::path::Path;

/// Raw extracted text of one page; `number` is 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, CorpusError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, CorpusError> {
        let parse_error = |details: String| CorpusError::PdfParse {
            document: path.display().to_string(),
            details,
        };

        let document = Document::load(path).map_err(|error| parse_error(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| parse_error(format!("page {page_no}: {error}")))?;

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, CorpusError> {
    LopdfExtractor.extract_pages(path)
}
