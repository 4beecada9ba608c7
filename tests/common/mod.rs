#![allow(dead_code)]

use rsent::{ClassificationError, ClassifierBackend, FetchError, PostSource, RawPrediction, Record};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

/// Fresh scratch directory that outlives the test (kept for post-mortem on failure).
pub fn scratch_dir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

pub fn post(id: &str, subreddit: &str, title: &str, text: &str, created_utc: &str) -> Record {
    Record {
        id: id.to_string(),
        subreddit: subreddit.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        score: 10,
        created_utc: created_utc.to_string(),
        num_comments: 2,
        url: format!("https://reddit.com/r/{subreddit}/comments/{id}"),
    }
}

/// In-memory `PostSource`. Each community has a fixed list of posts and can
/// optionally fail after yielding a number of them.
#[derive(Default)]
pub struct FakeSource {
    posts: HashMap<String, Vec<Record>>,
    fail_after: HashMap<String, usize>,
    pub calls: Vec<String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(mut self, sub: &str, posts: Vec<Record>) -> Self {
        self.posts.insert(sub.to_string(), posts);
        self
    }

    pub fn failing_after(mut self, sub: &str, n: usize) -> Self {
        self.fail_after.insert(sub.to_string(), n);
        self
    }
}

impl PostSource for FakeSource {
    fn for_each_post(
        &mut self,
        subreddit: &str,
        limit: usize,
        on_post: &mut dyn FnMut(Record) -> anyhow::Result<()>,
    ) -> Result<usize, FetchError> {
        self.calls.push(subreddit.to_string());
        let posts = self.posts.get(subreddit).cloned().unwrap_or_default();
        let fail_at = self.fail_after.get(subreddit).copied();
        let mut n = 0;
        for p in posts.into_iter().take(limit) {
            if fail_at == Some(n) {
                return Err(FetchError::Http { subreddit: subreddit.to_string(), reason: "503 Service Unavailable".into() });
            }
            on_post(p).map_err(|e| FetchError::Sink { subreddit: subreddit.to_string(), reason: e.to_string() })?;
            n += 1;
        }
        if fail_at == Some(n) {
            return Err(FetchError::Http { subreddit: subreddit.to_string(), reason: "503 Service Unavailable".into() });
        }
        Ok(n)
    }
}

/// Keyword-driven stand-in for the hosted models. Records every call.
/// - "boom" anywhere in the text → backend error
/// - "weird" → a label outside both vocabularies
/// - "great"/"happy" → positive / joy
/// - "sad"/"alone" → negative / sadness
/// - otherwise → neutral / neutral
#[derive(Default)]
pub struct FakeBackend {
    pub calls: RefCell<Vec<(String, String)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(_, t)| t.clone()).collect()
    }
}

impl ClassifierBackend for FakeBackend {
    fn top_label(&self, model: &str, text: &str) -> Result<RawPrediction, ClassificationError> {
        self.calls.borrow_mut().push((model.to_string(), text.to_string()));
        let is_sentiment = model.contains("sentiment");
        let lower = text.to_lowercase();
        if lower.contains("boom") {
            return Err(ClassificationError::Backend { model: model.to_string(), reason: "index out of range".into() });
        }
        let label = if lower.contains("weird") {
            "LABEL_9"
        } else if lower.contains("great") || lower.contains("happy") {
            if is_sentiment { "LABEL_2" } else { "joy" }
        } else if lower.contains("sad") || lower.contains("alone") {
            if is_sentiment { "LABEL_0" } else { "sadness" }
        } else if is_sentiment {
            "LABEL_1"
        } else {
            "neutral"
        };
        Ok(RawPrediction { label: label.to_string(), score: 0.9 })
    }
}
