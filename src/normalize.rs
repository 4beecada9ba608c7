//! Text cleanup applied to post bodies before classification and reporting.

use regex::Regex;
use std::collections::HashSet;

/// NLTK's English stopword list.
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've", "you'll",
    "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself", "she", "she's",
    "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them", "their", "theirs",
    "themselves", "what", "which", "who", "whom", "this", "that", "that'll", "these", "those", "am",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having", "do", "does",
    "did", "doing", "a", "an", "the", "and", "but", "if", "or", "because", "as", "until", "while",
    "of", "at", "by", "for", "with", "about", "against", "between", "into", "through", "during",
    "before", "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just", "don",
    "don't", "should", "should've", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "aren't", "couldn", "couldn't", "didn", "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn",
    "hasn't", "haven", "haven't", "isn", "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't",
    "needn", "needn't", "shan", "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren",
    "weren't", "won", "won't", "wouldn", "wouldn't",
];

#[derive(Clone, Debug, Default)]
pub struct NormalizerConfig {
    pub stopwords: HashSet<String>,
}

impl NormalizerConfig {
    pub fn english() -> Self {
        Self { stopwords: ENGLISH_STOPWORDS.iter().map(|s| s.to_string()).collect() }
    }

    /// Replace the stopword set. Entries are lowercased so they match normalized tokens.
    pub fn with_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords = words.into_iter().map(|s| s.as_ref().trim().to_lowercase()).collect();
        self
    }

    /// Add to the current stopword set.
    pub fn extend_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords.extend(words.into_iter().map(|s| s.as_ref().trim().to_lowercase()));
        self
    }
}

pub struct TextNormalizer {
    config: NormalizerConfig,
    url_re: Regex,
    digits_re: Regex,
}

impl TextNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            url_re: Regex::new(r"http\S+").expect("static regex"),
            digits_re: Regex::new(r"\d+").expect("static regex"),
        }
    }

    pub fn english() -> Self {
        Self::new(NormalizerConfig::english())
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// lowercase → strip URLs → strip ASCII punctuation → strip digit runs →
    /// drop stopwords → single-space join. `None` yields `""`.
    ///
    /// Stripping punctuation or digits can glue a new `http…` run together
    /// (`ht.tps` → `https`), so URLs are stripped once more before tokenizing;
    /// that keeps the output a fixed point of `normalize`.
    pub fn normalize(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else { return String::new() };
        let lowered = raw.to_lowercase();
        let no_urls = self.url_re.replace_all(&lowered, "");
        let no_punct: String = no_urls.chars().filter(|c| !c.is_ascii_punctuation()).collect();
        let no_digits = self.digits_re.replace_all(&no_punct, "");
        let cleaned = self.url_re.replace_all(&no_digits, "");

        let mut out = String::with_capacity(cleaned.len());
        for tok in cleaned.split_whitespace() {
            if self.config.stopwords.contains(tok) {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(tok);
        }
        out
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::english()
    }
}
