//! Row types for the raw and enriched tables.

use crate::classify::{Emotion, Sentiment};
use crate::date::{CalendarFields, YearMonth};
use serde::{Deserialize, Deserializer, Serialize};

/// Column order of the raw table.
pub const RECORD_COLUMNS: [&str; 8] = ["id", "subreddit", "title", "text", "score", "created_utc", "num_comments", "url"];

/// Column order of the enriched table.
pub const ENRICHED_COLUMNS: [&str; 16] = [
    "id", "subreddit", "title", "text", "score", "created_utc", "num_comments", "url",
    "clean_text", "full_text", "sentiment", "emotion", "year", "month", "day", "year_month",
];

/// One collected post. Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score: i64,
    #[serde(default)]
    pub created_utc: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub num_comments: i64,
    #[serde(default)]
    pub url: String,
}

/// A post plus cleaned text, labels and calendar columns.
/// Field order is the exported column order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub text: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub score: i64,
    pub created_utc: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub num_comments: i64,
    pub url: String,
    pub clean_text: String,
    pub full_text: String,
    pub sentiment: Sentiment,
    pub emotion: Emotion,
    pub year: u16,
    pub month: u8,
    pub day: String,
    pub year_month: YearMonth,
}

impl EnrichedRecord {
    pub fn new(
        record: Record,
        clean_text: String,
        sentiment: Sentiment,
        emotion: Emotion,
        calendar: CalendarFields,
    ) -> Self {
        let full_text = full_text(&record.title, &clean_text);
        Self {
            id: record.id,
            subreddit: record.subreddit,
            title: record.title,
            text: record.text,
            score: record.score,
            created_utc: record.created_utc,
            num_comments: record.num_comments,
            url: record.url,
            clean_text,
            full_text,
            sentiment,
            emotion,
            year: calendar.year,
            month: calendar.month,
            day: calendar.day_string(),
            year_month: calendar.year_month,
        }
    }
}

/// Title and cleaned body joined by one space; the classifiers read this.
pub fn full_text(title: &str, clean_text: &str) -> String {
    let mut s = String::with_capacity(title.len() + clean_text.len() + 1);
    s.push_str(title);
    s.push(' ');
    s.push_str(clean_text);
    s
}

/// Spreadsheet round-trips turn integers into `12.0` or blanks; accept both.
fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let s = String::deserialize(d)?;
    let t = s.trim();
    if t.is_empty() {
        return Ok(0);
    }
    if let Ok(n) = t.parse::<i64>() {
        return Ok(n);
    }
    t.parse::<f64>()
        .map(|f| f as i64)
        .map_err(|_| serde::de::Error::custom(format!("not an integer: {t}")))
}
