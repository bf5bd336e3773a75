use crate::error::CorpusError;
use crate::models::HeadingContext;
use regex::Regex;

/// Heading-delimited span of a page and the heading context active over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBlock {
    pub heading: HeadingContext,
    pub body: String,
}

#[derive(Debug, Clone, Copy)]
struct HeadingMarker<'a> {
    level: usize,
    title: &'a str,
    start: usize,
    end: usize,
}

/// Splits page text on heading lines. The pattern must capture the marker run
/// in group 1 (its length is the level) and the title in group 2.
#[derive(Debug, Clone)]
pub struct SectionSegmenter {
    heading_re: Regex,
}

impl SectionSegmenter {
    pub fn new(heading_regex: &str) -> Result<Self, CorpusError> {
        Ok(Self {
            heading_re: Regex::new(heading_regex)?,
        })
    }

    pub fn segment(&self, text: &str) -> Vec<SectionBlock> {
        let markers = self.markers(text);

        let Some(first) = markers.first() else {
            return vec![SectionBlock {
                heading: HeadingContext::default(),
                body: text.trim().to_string(),
            }];
        };

        let mut blocks = Vec::with_capacity(markers.len() + 1);

        let preamble = text[..first.start].trim();
        if !preamble.is_empty() {
            blocks.push(SectionBlock {
                heading: HeadingContext::default(),
                body: preamble.to_string(),
            });
        }

        let bodies = markers.iter().enumerate().map(|(index, marker)| {
            let end = markers
                .get(index + 1)
                .map_or(text.len(), |next| next.start);
            text[marker.end..end].trim()
        });

        blocks.extend(markers.iter().zip(bodies).scan(
            HeadingContext::default(),
            |context, (marker, body)| {
                *context = context.enter(marker.level, marker.title);
                Some(SectionBlock {
                    heading: context.clone(),
                    body: body.to_string(),
                })
            },
        ));

        blocks
    }

    fn markers<'a>(&self, text: &'a str) -> Vec<HeadingMarker<'a>> {
        self.heading_re
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let level = captures.get(1)?.as_str().chars().count();
                let title = captures.get(2)?.as_str().trim();
                Some(HeadingMarker {
                    level,
                    title,
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .filter(|marker| (1..=3).contains(&marker.level) && !marker.title.is_empty())
            .collect()
    }
}
