use std::collections::BTreeSet;

const DEFAULT_STOPWORDS: &[&str] = &[
    // indonesian function words
    "yang", "dan", "dari", "untuk", "dengan", "pada", "dalam", "atau", "ini", "itu", "ada",
    "adalah", "apa", "apakah", "bagaimana", "gimana", "kenapa", "mengapa", "kapan", "dimana",
    "saya", "aku", "kamu", "anda", "kami", "kita", "mereka", "juga", "akan", "sudah", "belum",
    "bisa", "mau", "ingin", "tolong", "dong", "deh", "sih", "nya", "tentang", "mengenai",
    // english function words
    "the", "and", "for", "with", "what", "how", "does", "are", "was", "this", "that", "about",
    "please",
    // filler
    "jelaskan", "sebutkan", "tanya", "mohon", "kak", "min",
];

const DEFAULT_SUBSTITUTIONS: &[(&str, &str)] = &[
    // abbreviations
    ("hrg", "harga"),
    ("jml", "jumlah"),
    ("tgl", "tanggal"),
    ("thn", "tahun"),
    ("ket", "keterangan"),
    // synonyms
    ("resep", "cara membuat"),
    ("manfaat", "khasiat"),
    ("khasiat", "manfaat"),
    ("harga", "biaya"),
    ("cengkih", "cengkeh"),
    ("cengkeh", "cengkih"),
    ("budidaya", "penanaman"),
    ("petani", "pekebun"),
    // spacing
    ("kayumanis", "kayu manis"),
    ("kayu manis", "kayumanis"),
    ("minyakatsiri", "minyak atsiri"),
    ("minyak atsiri", "minyakatsiri"),
];

/// Immutable lookup tables driving query cleanup and variant generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTables {
    pub stopwords: BTreeSet<String>,
    pub substitutions: Vec<(String, String)>,
    pub min_token_chars: usize,
    pub max_variants: usize,
}

impl Default for QueryTables {
    fn default() -> Self {
        Self {
            stopwords: DEFAULT_STOPWORDS.iter().map(|word| (*word).to_string()).collect(),
            substitutions: DEFAULT_SUBSTITUTIONS
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
            min_token_chars: 3,
            max_variants: 6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryProcessor {
    tables: QueryTables,
}

impl QueryProcessor {
    pub fn new(tables: QueryTables) -> Self {
        Self { tables }
    }

    /// Lowercased content tokens joined by single spaces; empty when nothing
    /// survives the length and stopword filters.
    pub fn clean(&self, query: &str) -> String {
        let lowered = query.to_lowercase();
        word_tokens(&lowered)
            .filter(|token| token.chars().count() >= self.tables.min_token_chars)
            .filter(|token| !self.tables.stopwords.contains(*token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Ordered, duplicate-free variants, closest to the cleaned query first. Never
    /// empty: falls back to the raw query when cleaning leaves nothing.
    pub fn variants(&self, query: &str) -> Vec<String> {
        let base = self.clean(query);
        if base.is_empty() {
            return vec![query.to_string()];
        }

        let limit = self.tables.max_variants.max(1);
        let mut variants = vec![base.clone()];

        for (from, to) in &self.tables.substitutions {
            if variants.len() >= limit {
                break;
            }
            if from.is_empty() || phrase_starts(&base, to).next().is_some() {
                continue;
            }

            let Some(candidate) = replace_phrase(&base, from, to) else {
                continue;
            };
            if candidate != base && !variants.contains(&candidate) {
                variants.push(candidate);
            }
        }

        variants
    }

    /// `term1* OR term2* ...` over the variant's tokens that are long enough;
    /// `None` when no token qualifies.
    pub fn prefix_or_expression(&self, variant: &str) -> Option<String> {
        let lowered = variant.to_lowercase();
        let terms: Vec<String> = word_tokens(&lowered)
            .filter(|token| token.chars().count() >= self.tables.min_token_chars)
            .map(|token| format!("{token}*"))
            .collect();

        if terms.is_empty() {
            None
        } else {
            Some(terms.join(" OR "))
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn word_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|token| !token.is_empty())
}

/// Byte offsets where `phrase` occurs as whole words, so `ket` never matches
/// inside `paket` or `keterangan`.
fn phrase_starts<'a>(text: &'a str, phrase: &'a str) -> impl Iterator<Item = usize> + 'a {
    text.match_indices(phrase)
        .map(|(start, _)| start)
        .filter(move |&start| {
            let before = text[..start].chars().next_back();
            let after = text[start + phrase.len()..].chars().next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
}

/// Replaces every whole-word occurrence of `from`; `None` when there is none.
fn replace_phrase(text: &str, from: &str, to: &str) -> Option<String> {
    let mut replaced = String::with_capacity(text.len() + to.len());
    let mut cursor = 0;
    let mut found = false;

    for start in phrase_starts(text, from) {
        replaced.push_str(&text[cursor..start]);
        replaced.push_str(to);
        cursor = start + from.len();
        found = true;
    }

    if !found {
        return None;
    }
    replaced.push_str(&text[cursor..]);
    Some(replaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(substitutions: &[(&str, &str)], max_variants: usize) -> QueryTables {
        QueryTables {
            stopwords: ["apa", "yang"].iter().map(|w| w.to_string()).collect(),
            substitutions: substitutions
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            min_token_chars: 3,
            max_variants,
        }
    }

    #[test]
    fn cleaning_drops_short_tokens_stopwords_and_punctuation() {
        let processor = QueryProcessor::new(tables(&[], 4));
        assert_eq!(processor.clean("Apa resep PALA yang enak, ya?"), "resep pala enak");
    }

    #[test]
    fn variants_follow_table_order_after_the_base() {
        let processor = QueryProcessor::new(tables(
            &[("resep", "cara membuat"), ("xyz", "unused"), ("pala", "nutmeg")],
            4,
        ));

        assert_eq!(
            processor.variants("resep pala"),
            vec!["resep pala", "cara membuat pala", "resep nutmeg"]
        );
    }

    #[test]
    fn duplicate_variants_are_skipped() {
        let processor = QueryProcessor::new(tables(
            &[("aaa", "ccc"), ("bbb", "ccc"), ("ccc", "ccc")],
            5,
        ));
        assert_eq!(processor.variants("aaa"), vec!["aaa", "ccc"]);
        assert_eq!(processor.variants("ccc"), vec!["ccc"]);
    }

    #[test]
    fn variant_count_is_capped_keeping_the_earliest() {
        let processor = QueryProcessor::new(tables(
            &[("one", "1st"), ("two", "2nd"), ("six", "6th")],
            3,
        ));
        assert_eq!(
            processor.variants("one two six"),
            vec!["one two six", "1st two six", "one 2nd six"]
        );
    }

    #[test]
    fn unusable_query_falls_back_to_the_raw_text() {
        let processor = QueryProcessor::default();
        assert_eq!(processor.variants("Apa ya?"), vec!["Apa ya?"]);
    }

    #[test]
    fn default_tables_expand_spacing_variants() {
        let processor = QueryProcessor::default();
        let variants = processor.variants("manfaat kayumanis");
        assert_eq!(variants[0], "manfaat kayumanis");
        assert!(variants.contains(&"khasiat kayumanis".to_string()));
        assert!(variants.contains(&"manfaat kayu manis".to_string()));
    }

    #[test]
    fn substitutions_only_replace_whole_words() {
        let processor = QueryProcessor::default();

        assert_eq!(
            processor.variants("keterangan harga"),
            vec!["keterangan harga", "keterangan biaya"]
        );
        assert_eq!(
            processor.variants("paket resep"),
            vec!["paket resep", "paket cara membuat"]
        );
        assert_eq!(processor.variants("peresepan dokter"), vec!["peresepan dokter"]);
        assert_eq!(
            processor.variants("ket harga"),
            vec!["ket harga", "keterangan harga", "ket biaya"]
        );

        for query in ["keterangan harga", "paket resep", "peresepan dokter"] {
            for variant in processor.variants(query) {
                assert!(!variant.contains("keteranganerangan"), "{variant:?}");
                assert!(!variant.contains("paketerangan"), "{variant:?}");
                assert!(!variant.contains("pecara"), "{variant:?}");
            }
        }
    }

    #[test]
    fn substitution_is_skipped_when_its_target_is_already_present() {
        let processor = QueryProcessor::new(tables(&[("manfaat", "khasiat")], 4));
        assert_eq!(
            processor.variants("khasiat dan manfaat"),
            vec!["khasiat dan manfaat"]
        );
    }

    #[test]
    fn multi_word_phrases_match_on_word_boundaries() {
        assert_eq!(
            replace_phrase("minyak atsiri pala", "minyak atsiri", "minyakatsiri"),
            Some("minyakatsiri pala".to_string())
        );
        assert_eq!(replace_phrase("aminyak atsiri", "minyak atsiri", "x"), None);
        assert_eq!(replace_phrase("ket ket", "ket", "k"), Some("k k".to_string()));
    }

    #[test]
    fn prefix_or_expression_uses_long_terms_only() {
        let processor = QueryProcessor::default();
        assert_eq!(
            processor.prefix_or_expression("resep pala asdkjasd"),
            Some("resep* OR pala* OR asdkjasd*".to_string())
        );
        assert_eq!(processor.prefix_or_expression("a bc"), None);
    }
}
