//! Post fetching: the `PostSource` seam, the Reddit OAuth client behind it,
//! and the per-source collection loop that feeds the store.

use crate::date::format_epoch_utc;
use crate::progress::ProgressScope;
use crate::record::Record;
use crate::store::PostStore;
use crate::util::truncate_chars;
use anyhow::{anyhow, Result};
use base64::Engine;
use serde::Deserialize;
use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Reddit caps a listing page at 100 children.
const MAX_PAGE: usize = 100;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("r/{subreddit}: authentication failed: {reason}")]
    Auth { subreddit: String, reason: String },
    #[error("r/{subreddit}: request failed: {reason}")]
    Http { subreddit: String, reason: String },
    #[error("r/{subreddit}: unexpected response: {reason}")]
    Decode { subreddit: String, reason: String },
    #[error("r/{subreddit}: could not store post: {reason}")]
    Sink { subreddit: String, reason: String },
}

/// Anything that can list a community's top posts of all time.
pub trait PostSource {
    /// Stream up to `limit` posts from `subreddit` into `on_post`, in the
    /// source's ranking order. Returns how many posts were handed over.
    fn for_each_post(
        &mut self,
        subreddit: &str,
        limit: usize,
        on_post: &mut dyn FnMut(Record) -> Result<()>,
    ) -> Result<usize, FetchError>;
}

// ----------------- Reddit listing payloads -----------------

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    kind: String,
    data: ListingPost,
}

#[derive(Debug, Deserialize)]
struct ListingPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    url: Option<String>,
}

impl ListingPost {
    fn into_record(self, subreddit: &str) -> Record {
        Record {
            id: self.id,
            subreddit: subreddit.to_string(),
            title: self.title,
            text: self.selftext,
            score: self.score,
            // An unusable epoch leaves the field blank; enrichment drops such rows.
            created_utc: format_epoch_utc(self.created_utc).unwrap_or_default(),
            num_comments: self.num_comments,
            url: self.url.unwrap_or_default(),
        }
    }
}

/// One decoded page of a search listing.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub records: Vec<Record>,
    pub after: Option<String>,
}

/// Decode a listing body; only `t3` (link/post) children become records,
/// labelled with the configured `subreddit` name.
pub fn parse_listing(body: &str, subreddit: &str) -> Result<ListingPage, serde_json::Error> {
    let listing: Listing = serde_json::from_str(body)?;
    let records = listing
        .data
        .children
        .into_iter()
        .filter(|c| c.kind == "t3")
        .map(|c| c.data.into_record(subreddit))
        .collect();
    Ok(ListingPage { records, after: listing.data.after.filter(|a| !a.is_empty()) })
}

// ----------------- Reddit OAuth client -----------------

#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl RedditCredentials {
    /// `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`, `REDDIT_USER_AGENT`.
    pub fn from_env() -> Result<Self> {
        let var = |k: &str| -> Result<String> {
            std::env::var(k)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{k} is not set"))
        };
        Ok(Self {
            client_id: var("REDDIT_CLIENT_ID")?,
            client_secret: var("REDDIT_CLIENT_SECRET")?,
            user_agent: var("REDDIT_USER_AGENT")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_ttl")]
    expires_in: u64,
}

fn default_token_ttl() -> u64 {
    3600
}

/// Read-only, application-only OAuth client.
pub struct RedditClient {
    agent: ureq::Agent,
    creds: RedditCredentials,
    auth_url: String,
    api_base: String,
    token: Option<(String, Instant)>,
}

impl RedditClient {
    pub const AUTH_URL: &'static str = "https://www.reddit.com/api/v1/access_token";
    pub const API_BASE: &'static str = "https://oauth.reddit.com";

    pub fn new(creds: RedditCredentials) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        Self {
            agent: config.into(),
            creds,
            auth_url: Self::AUTH_URL.to_string(),
            api_base: Self::API_BASE.to_string(),
            token: None,
        }
    }

    pub fn with_endpoints(mut self, auth_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.api_base = api_base.into();
        self
    }

    fn bearer(&mut self, subreddit: &str) -> Result<String, FetchError> {
        if let Some((tok, expires)) = &self.token {
            if Instant::now() < *expires {
                return Ok(tok.clone());
            }
        }
        let auth_err = |reason: String| FetchError::Auth { subreddit: subreddit.to_string(), reason };

        let basic = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.creds.client_id, self.creds.client_secret));
        let mut resp = self
            .agent
            .post(&self.auth_url)
            .header("Authorization", format!("Basic {basic}"))
            .header("User-Agent", self.creds.user_agent.as_str())
            .send_form([("grant_type", "client_credentials")])
            .map_err(|e| auth_err(e.to_string()))?;
        let tok: TokenResponse = resp.body_mut().read_json().map_err(|e| auth_err(e.to_string()))?;

        // Refresh a minute early.
        let ttl = Duration::from_secs(tok.expires_in.saturating_sub(60).max(1));
        self.token = Some((tok.access_token.clone(), Instant::now() + ttl));
        tracing::debug!("Obtained API token (ttl {}s)", ttl.as_secs());
        Ok(tok.access_token)
    }

    fn search_page(&mut self, subreddit: &str, page: usize, after: Option<&str>) -> Result<ListingPage, FetchError> {
        let token = self.bearer(subreddit)?;
        let http_err = |reason: String| FetchError::Http { subreddit: subreddit.to_string(), reason };

        let url = format!("{}/r/{}/search", self.api_base.trim_end_matches('/'), subreddit);
        let mut req = self
            .agent
            .get(&url)
            .header("Authorization", format!("bearer {token}"))
            .header("User-Agent", self.creds.user_agent.as_str())
            .query("q", "*")
            .query("restrict_sr", "on")
            .query("sort", "top")
            .query("t", "all")
            .query("raw_json", "1")
            .query("limit", page.to_string());
        if let Some(a) = after {
            req = req.query("after", a);
        }
        let mut resp = req.call().map_err(|e| http_err(e.to_string()))?;
        let body = resp.body_mut().read_to_string().map_err(|e| http_err(e.to_string()))?;
        parse_listing(&body, subreddit).map_err(|e| FetchError::Decode { subreddit: subreddit.to_string(), reason: e.to_string() })
    }
}

impl PostSource for RedditClient {
    fn for_each_post(
        &mut self,
        subreddit: &str,
        limit: usize,
        on_post: &mut dyn FnMut(Record) -> Result<()>,
    ) -> Result<usize, FetchError> {
        paginate(subreddit, limit, |size, after| self.search_page(subreddit, size, after), on_post)
    }
}

/// Drive a cursor-paginated listing: each page asks for
/// `min(limit - yielded, 100)` posts, and paging stops at `limit`, on an empty
/// page, or when the listing has no further cursor. Returns the posts yielded.
pub fn paginate(
    subreddit: &str,
    limit: usize,
    mut fetch_page: impl FnMut(usize, Option<&str>) -> Result<ListingPage, FetchError>,
    on_post: &mut dyn FnMut(Record) -> Result<()>,
) -> Result<usize, FetchError> {
    let mut yielded = 0usize;
    let mut after: Option<String> = None;
    while yielded < limit {
        let page = fetch_page((limit - yielded).min(MAX_PAGE), after.as_deref())?;
        let got = page.records.len();
        for rec in page.records {
            on_post(rec).map_err(|e| FetchError::Sink { subreddit: subreddit.to_string(), reason: format!("{e:#}") })?;
            yielded += 1;
            if yielded >= limit {
                break;
            }
        }
        match page.after {
            Some(next) if got > 0 => after = Some(next),
            _ => break,
        }
    }
    Ok(yielded)
}

// ----------------- collection loop -----------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub sources_ok: usize,
    pub sources_failed: Vec<String>,
    /// Posts handed over by the source, duplicates included.
    pub fetched: usize,
    /// Posts new to the store.
    pub admitted: usize,
}

/// Walk `subreddits` in order, admitting each post into `store`. A failing
/// source is logged and skipped; posts it already yielded are kept. After each
/// newly admitted post the loop sleeps `item_delay` (rate limit).
pub fn collect_sources<S: PostSource + ?Sized>(
    source: &mut S,
    subreddits: &[String],
    limit: usize,
    item_delay: Duration,
    store: &mut PostStore,
    progress: Option<&ProgressScope>,
) -> CollectSummary {
    let mut summary = CollectSummary::default();

    for sub in subreddits {
        tracing::info!("Fetching from r/{}...", sub);
        let admitted_before = store.admitted();
        let mut fetched = 0usize;

        let outcome = source.for_each_post(sub, limit, &mut |rec: Record| -> Result<()> {
            fetched += 1;
            let stamp = rec.created_utc.clone();
            let title = truncate_chars(&rec.title, 60).to_string();
            if store.admit(rec)? {
                tracing::debug!("{} | {}...", stamp, title);
                if !item_delay.is_zero() {
                    sleep(item_delay);
                }
            }
            Ok(())
        });

        let admitted = store.admitted() - admitted_before;
        summary.fetched += fetched;
        summary.admitted += admitted;
        match outcome {
            Ok(_) => {
                summary.sources_ok += 1;
                tracing::info!("r/{}: {} fetched, {} new", sub, fetched, admitted);
            }
            Err(e) => {
                tracing::error!("Error fetching from r/{}: {} ({} new posts kept)", sub, e, admitted);
                summary.sources_failed.push(sub.clone());
            }
        }
        if let Some(pb) = progress {
            pb.inc_items(1);
        }
    }
    summary
}
