mod config;
mod date;
mod util;
mod progress;

mod record;
mod table;
mod store;
mod fetch;

mod normalize;
mod classify;
mod enrich;
mod report;

mod pipeline;

pub use crate::config::PipelineOptions;
pub use crate::date::{format_epoch_utc, parse_created_utc, CalendarFields, YearMonth};
pub use crate::pipeline::MoodPipeline;

pub use crate::record::{full_text, EnrichedRecord, Record, ENRICHED_COLUMNS, RECORD_COLUMNS};
pub use crate::table::{
    export_enriched, read_enriched, read_raw_rows, read_records, read_rows, write_records, write_rows, TableWriter,
};
pub use crate::store::{merge_by_id, unseen_by_id, PostStore, StoreSummary};
pub use crate::fetch::{
    collect_sources, paginate, parse_listing, CollectSummary, FetchError, ListingPage, PostSource, RedditClient,
    RedditCredentials,
};

pub use crate::normalize::{NormalizerConfig, TextNormalizer};
pub use crate::classify::{
    top_prediction, ClassificationError, ClassificationResult, ClassifierBackend, ClassifierKind, ClassifierService,
    Emotion, HfInferenceClient, Label, RawPrediction, Sentiment, DEFAULT_EMOTION_MODEL, DEFAULT_SENTIMENT_MODEL,
    MAX_INPUT_CHARS,
};
pub use crate::enrich::{enrich_file, enrich_records, with_calendar, EnrichSummary};
pub use crate::report::{
    build_report, report_file, write_report, Distribution, Engagement, Report, ReportAccumulator,
    DEFAULT_CUTOFF_YEAR, DEFAULT_TOP_WORDS,
};

// Expose progress helpers.
pub use crate::progress::{make_count_progress, ProgressScope};

// Expose tracing setup and text helpers to the binary.
pub use crate::util::{
    default_subreddits, init_tracing_once, merge_extra_subreddits, replace_file_atomic_backoff, truncate_chars,
};
