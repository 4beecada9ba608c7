use crate::classify::{ClassifierBackend, ClassifierService, HfInferenceClient};
use crate::config::PipelineOptions;
use crate::enrich::{enrich_file, EnrichSummary};
use crate::fetch::{collect_sources, CollectSummary, PostSource, RedditClient, RedditCredentials};
use crate::normalize::{NormalizerConfig, TextNormalizer};
use crate::progress::ProgressScope;
use crate::report::{report_file, Report};
use crate::store::{PostStore, StoreSummary};
use crate::util::{init_tracing_once, merge_extra_subreddits};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

/// Chaining facade over `PipelineOptions` with the three batch stages.
#[derive(Clone, Debug, Default)]
pub struct MoodPipeline {
    pub(crate) opts: PipelineOptions,
}

impl MoodPipeline {
    pub fn new() -> Self {
        Self { opts: PipelineOptions::default() }
    }

    pub fn from_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn subreddits<I, S>(mut self, subs: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> { self.opts = self.opts.with_subreddits(subs); self }
    pub fn posts_per_source(mut self, n: usize) -> Self { self.opts = self.opts.with_posts_per_source(n); self }
    pub fn save_every(mut self, n: usize) -> Self { self.opts = self.opts.with_save_every(n); self }
    pub fn item_delay(mut self, delay: Duration) -> Self { self.opts = self.opts.with_item_delay(delay); self }
    pub fn raw_path(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_raw_path(p); self }
    pub fn enriched_path(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_enriched_path(p); self }
    pub fn models(mut self, sentiment: impl Into<String>, emotion: impl Into<String>) -> Self { self.opts = self.opts.with_models(sentiment, emotion); self }
    pub fn max_chars(mut self, n: usize) -> Self { self.opts = self.opts.with_max_chars(n); self }
    pub fn extra_stopwords<I, S>(mut self, words: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_extra_stopwords(words); self }
    pub fn report_path(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_report_path(p); self }
    pub fn cutoff_year(mut self, year: u16) -> Self { self.opts = self.opts.with_cutoff_year(year); self }
    pub fn top_words(mut self, n: usize) -> Self { self.opts = self.opts.with_top_words(n); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }

    /// Convenience: append communities listed in `RSENT_EXTRA_SUBREDDITS`.
    pub fn include_env_subreddits(mut self) -> Self {
        merge_extra_subreddits(&mut self.opts.subreddits);
        self
    }

    // -------- collection --------

    /// Collect from the live API using credentials from the environment.
    pub fn collect(&self) -> Result<(CollectSummary, StoreSummary)> {
        let creds = RedditCredentials::from_env().context("reddit credentials")?;
        let mut client = RedditClient::new(creds);
        self.collect_with(&mut client)
    }

    /// Collect from any `PostSource` into the raw store, flushing periodically
    /// and once more at the end.
    pub fn collect_with<S: PostSource + ?Sized>(&self, source: &mut S) -> Result<(CollectSummary, StoreSummary)> {
        init_tracing_once();
        let o = &self.opts;
        let mut store = PostStore::open(&o.raw_path, o.save_every);

        let pb = ProgressScope::count_if(o.progress, "Sources", o.subreddits.len() as u64);
        let summary = collect_sources(source, &o.subreddits, o.posts_per_source, o.item_delay, &mut store, Some(&pb));
        pb.finish("Sources done");

        let store_summary = store.finish()?;
        if store_summary.admitted > 0 {
            tracing::info!(
                "Final save complete. New posts added: {} ({} total in {})",
                store_summary.admitted,
                store_summary.persisted,
                o.raw_path.display()
            );
        } else {
            tracing::info!("No new data collected.");
        }
        if !summary.sources_failed.is_empty() {
            tracing::warn!("Sources with errors: {}", summary.sources_failed.join(", "));
        }
        Ok((summary, store_summary))
    }

    // -------- enrichment --------

    pub fn normalizer(&self) -> TextNormalizer {
        TextNormalizer::new(NormalizerConfig::english().extend_stopwords(&self.opts.extra_stopwords))
    }

    /// Wrap `backend` with this pipeline's model ids and input clamp.
    pub fn classifier<B: ClassifierBackend>(&self, backend: B) -> ClassifierService<B> {
        ClassifierService::new(backend)
            .with_models(self.opts.sentiment_model.clone(), self.opts.emotion_model.clone())
            .with_max_chars(self.opts.max_chars)
    }

    /// Enrich using the hosted inference API configured from the environment.
    pub fn enrich(&self) -> Result<EnrichSummary> {
        let backend = HfInferenceClient::from_env().context("inference credentials")?;
        let classifier = self.classifier(backend);
        self.enrich_with(&classifier)
    }

    pub fn enrich_with<B: ClassifierBackend>(&self, classifier: &ClassifierService<B>) -> Result<EnrichSummary> {
        init_tracing_once();
        let summary = enrich_file(
            &self.opts.raw_path,
            &self.opts.enriched_path,
            &self.normalizer(),
            classifier,
            self.opts.progress,
        )?;
        tracing::info!(
            "All processing complete. {} of {} rows written to {}",
            summary.rows_out,
            summary.rows_in,
            self.opts.enriched_path.display()
        );
        Ok(summary)
    }

    // -------- reporting --------

    pub fn report(&self) -> Result<Report> {
        init_tracing_once();
        report_file(&self.opts.enriched_path, &self.opts.report_path, self.opts.cutoff_year, self.opts.top_words)
    }
}
