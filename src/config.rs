use crate::classify::{DEFAULT_EMOTION_MODEL, DEFAULT_SENTIMENT_MODEL, MAX_INPUT_CHARS};
use crate::report::{DEFAULT_CUTOFF_YEAR, DEFAULT_TOP_WORDS};
use crate::util::{dedup_case_insensitive, default_subreddits, normalize_source_name};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    // collection
    pub subreddits: Vec<String>,   // queried in this order
    pub posts_per_source: usize,   // "top of all time" results per community
    pub save_every: usize,         // flush the store every N new posts
    pub item_delay: Duration,      // pause after each new post
    pub raw_path: PathBuf,         // collected posts (store)

    // enrichment
    pub enriched_path: PathBuf,    // export destination
    pub sentiment_model: String,
    pub emotion_model: String,
    pub max_chars: usize,          // classifier input clamp, <= MAX_INPUT_CHARS
    pub extra_stopwords: Vec<String>,

    // reporting
    pub report_path: PathBuf,
    pub cutoff_year: u16,          // "before" bucket is year < cutoff_year
    pub top_words: usize,

    pub progress: bool,            // show progress bars
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            subreddits: default_subreddits(),
            posts_per_source: 300,
            save_every: 300,
            item_delay: Duration::from_millis(1000),
            raw_path: PathBuf::from("reddit_mental_health_posts.csv"),

            enriched_path: PathBuf::from("reddit_with_sentiment_emotion.csv"),
            sentiment_model: DEFAULT_SENTIMENT_MODEL.to_string(),
            emotion_model: DEFAULT_EMOTION_MODEL.to_string(),
            max_chars: MAX_INPUT_CHARS,
            extra_stopwords: Vec::new(),

            report_path: PathBuf::from("reddit_analysis_report.json"),
            cutoff_year: DEFAULT_CUTOFF_YEAR,
            top_words: DEFAULT_TOP_WORDS,

            progress: true,
        }
    }
}

impl PipelineOptions {
    pub fn with_subreddits<I, S>(mut self, subs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.subreddits = subs.into_iter().map(|s| normalize_source_name(s.as_ref())).collect();
        dedup_case_insensitive(&mut self.subreddits);
        self
    }
    pub fn with_posts_per_source(mut self, n: usize) -> Self {
        self.posts_per_source = n.max(1);
        self
    }
    pub fn with_save_every(mut self, n: usize) -> Self {
        self.save_every = n.max(1);
        self
    }
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }
    pub fn with_raw_path(mut self, p: impl AsRef<Path>) -> Self {
        self.raw_path = p.as_ref().to_path_buf();
        self
    }
    pub fn with_enriched_path(mut self, p: impl AsRef<Path>) -> Self {
        self.enriched_path = p.as_ref().to_path_buf();
        self
    }
    pub fn with_models(mut self, sentiment: impl Into<String>, emotion: impl Into<String>) -> Self {
        self.sentiment_model = sentiment.into();
        self.emotion_model = emotion.into();
        self
    }
    pub fn with_max_chars(mut self, n: usize) -> Self {
        self.max_chars = n.clamp(1, MAX_INPUT_CHARS);
        self
    }
    pub fn with_extra_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_stopwords = words.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_report_path(mut self, p: impl AsRef<Path>) -> Self {
        self.report_path = p.as_ref().to_path_buf();
        self
    }
    pub fn with_cutoff_year(mut self, year: u16) -> Self {
        self.cutoff_year = year;
        self
    }
    pub fn with_top_words(mut self, n: usize) -> Self {
        self.top_words = n;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}
