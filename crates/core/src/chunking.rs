use crate::models::IngestionOptions;

const PARAGRAPH_BREAK: &str = "\n\n";

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
        }
    }
}

/// Cleans extracted page text: every whitespace run inside a line (including
/// non-breaking spaces) becomes one space and each line is trimmed. Lines
/// holding only whitespace count as blank, runs of blank lines collapse to a
/// single paragraph break, and the result is trimmed.
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut output = String::with_capacity(unified.len());
    let mut pending_blank = false;

    for line in unified.split('\n') {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            pending_blank = true;
            continue;
        }

        if !output.is_empty() {
            output.push_str(if pending_blank { PARAGRAPH_BREAK } else { "\n" });
        }
        output.push_str(&line);
        pending_blank = false;
    }

    output
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Packs paragraphs into chunks of at most `max_chars` characters. A paragraph
/// that alone exceeds the limit is emitted whole as its own chunk.
pub fn chunk_by_paragraph(text: &str, config: ChunkingConfig) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let paragraphs = normalized
        .split(PARAGRAPH_BREAK)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty());

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        if current.is_empty() {
            current.push_str(paragraph);
            continue;
        }

        if char_len(&current) + PARAGRAPH_BREAK.len() + char_len(paragraph) <= config.max_chars {
            current.push_str(PARAGRAPH_BREAK);
            current.push_str(paragraph);
            continue;
        }

        let seed = overlap_seed(&current, paragraph, config);
        chunks.push(std::mem::take(&mut current));

        if let Some(tail) = seed {
            current.push_str(&tail);
            current.push_str(PARAGRAPH_BREAK);
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Trailing context carried into the next chunk, shortened to whatever room
/// the next paragraph leaves under the size limit.
fn overlap_seed(flushed: &str, next_paragraph: &str, config: ChunkingConfig) -> Option<String> {
    let room = config
        .max_chars
        .saturating_sub(PARAGRAPH_BREAK.len() + char_len(next_paragraph));
    let take = config.overlap_chars.min(room);
    if take == 0 {
        return None;
    }

    let skip = char_len(flushed).saturating_sub(take);
    let tail: String = flushed.chars().skip(skip).collect();
    let tail = tail.trim_start();

    (!tail.is_empty()).then(|| tail.to_string())
}
