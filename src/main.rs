use anyhow::Result;
use clap::{Parser, Subcommand};
use rsent::{init_tracing_once, MoodPipeline};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rsent", version, about = "Collect Reddit posts, label sentiment/emotion, summarize")]
struct Cli {
    /// Hide progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch top posts per community into the raw table (resumable, deduplicated by id)
    Collect {
        /// Raw table to create or extend
        #[arg(long, env = "RSENT_RAW", default_value = "reddit_mental_health_posts.csv")]
        output: PathBuf,
        /// Communities to query, in order (defaults to the built-in list)
        #[arg(long, value_delimiter = ',')]
        subreddits: Vec<String>,
        #[arg(long, default_value_t = 300)]
        posts_per_source: usize,
        /// Flush to disk every N new posts
        #[arg(long, default_value_t = 300)]
        save_every: usize,
        /// Pause after each new post, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    /// Clean text, classify sentiment and emotion, export the enriched table
    Enrich {
        #[arg(long, env = "RSENT_RAW", default_value = "reddit_mental_health_posts.csv")]
        input: PathBuf,
        #[arg(long, env = "RSENT_ENRICHED", default_value = "reddit_with_sentiment_emotion.csv")]
        output: PathBuf,
        #[arg(long, env = "RSENT_SENTIMENT_MODEL", default_value = rsent::DEFAULT_SENTIMENT_MODEL)]
        sentiment_model: String,
        #[arg(long, env = "RSENT_EMOTION_MODEL", default_value = rsent::DEFAULT_EMOTION_MODEL)]
        emotion_model: String,
        /// Additional stopwords, comma separated
        #[arg(long, value_delimiter = ',')]
        stopwords: Vec<String>,
    },
    /// Summarize the enriched table into a JSON report
    Report {
        #[arg(long, env = "RSENT_ENRICHED", default_value = "reddit_with_sentiment_emotion.csv")]
        input: PathBuf,
        #[arg(long, default_value = "reddit_analysis_report.json")]
        output: PathBuf,
        #[arg(long, default_value_t = rsent::DEFAULT_CUTOFF_YEAR)]
        cutoff_year: u16,
        #[arg(long, default_value_t = rsent::DEFAULT_TOP_WORDS)]
        top_words: usize,
    },
}

fn main() -> Result<()> {
    init_tracing_once();
    let cli = Cli::parse();
    let base = MoodPipeline::new().progress(!cli.no_progress);

    match cli.command {
        Command::Collect { output, subreddits, posts_per_source, save_every, delay_ms } => {
            let mut p = base
                .raw_path(&output)
                .posts_per_source(posts_per_source)
                .save_every(save_every)
                .item_delay(Duration::from_millis(delay_ms));
            if !subreddits.is_empty() {
                p = p.subreddits(&subreddits);
            }
            let (summary, store) = p.include_env_subreddits().collect()?;
            println!(
                "{} sources ok, {} failed; {} fetched, {} new; {} rows in {}",
                summary.sources_ok,
                summary.sources_failed.len(),
                summary.fetched,
                summary.admitted,
                store.persisted.max(store.preexisting),
                output.display()
            );
        }
        Command::Enrich { input, output, sentiment_model, emotion_model, stopwords } => {
            let summary = base
                .raw_path(&input)
                .enriched_path(&output)
                .models(sentiment_model, emotion_model)
                .extra_stopwords(stopwords)
                .enrich()?;
            println!(
                "Output saved to {}: {} rows ({} dropped for bad timestamps)",
                output.display(),
                summary.rows_out,
                summary.rows_dropped
            );
        }
        Command::Report { input, output, cutoff_year, top_words } => {
            let report = base
                .enriched_path(&input)
                .report_path(&output)
                .cutoff_year(cutoff_year)
                .top_words(top_words)
                .report()?;
            println!("Report over {} rows saved to {}", report.rows, output.display());
        }
    }
    Ok(())
}
