//! Sentiment/emotion classification behind one call.
//!
//! `ClassifierService::classify` reports every failure as a `ClassificationError`;
//! `label_or_neutral` is the policy layer that turns any of them into the
//! `neutral` sentinel so a single bad post never stops a batch.

use crate::util::truncate_chars;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Longest span (in characters) handed to either model.
pub const MAX_INPUT_CHARS: usize = 512;

pub const DEFAULT_SENTIMENT_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment";
pub const DEFAULT_EMOTION_MODEL: &str = "j-hartmann/emotion-english-distilroberta-base";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassifierKind {
    Sentiment,
    Emotion,
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKind::Sentiment => f.write_str("sentiment"),
            ClassifierKind::Emotion => f.write_str("emotion"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }

    /// The sentiment model reports `LABEL_0..2`; named labels are accepted too.
    pub fn from_model_label(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "label_0" | "negative" | "neg" => Some(Sentiment::Negative),
            "label_1" | "neutral" | "neu" => Some(Sentiment::Neutral),
            "label_2" | "positive" | "pos" => Some(Sentiment::Positive),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Disgust,
    Fear,
    Joy,
    Neutral,
    Sadness,
    Surprise,
}

impl Emotion {
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Anger => "anger",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Joy => "joy",
            Emotion::Neutral => "neutral",
            Emotion::Sadness => "sadness",
            Emotion::Surprise => "surprise",
        }
    }

    pub fn from_model_label(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "anger" => Some(Emotion::Anger),
            "disgust" => Some(Emotion::Disgust),
            "fear" => Some(Emotion::Fear),
            "joy" => Some(Emotion::Joy),
            "neutral" => Some(Emotion::Neutral),
            "sadness" => Some(Emotion::Sadness),
            "surprise" => Some(Emotion::Surprise),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    Sentiment(Sentiment),
    Emotion(Emotion),
}

impl Label {
    pub fn neutral(kind: ClassifierKind) -> Self {
        match kind {
            ClassifierKind::Sentiment => Label::Sentiment(Sentiment::Neutral),
            ClassifierKind::Emotion => Label::Emotion(Emotion::Neutral),
        }
    }

    pub fn parse(kind: ClassifierKind, raw: &str) -> Option<Self> {
        match kind {
            ClassifierKind::Sentiment => Sentiment::from_model_label(raw).map(Label::Sentiment),
            ClassifierKind::Emotion => Emotion::from_model_label(raw).map(Label::Emotion),
        }
    }

    pub fn kind(self) -> ClassifierKind {
        match self {
            Label::Sentiment(_) => ClassifierKind::Sentiment,
            Label::Emotion(_) => ClassifierKind::Emotion,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Sentiment(s) => s.as_str(),
            Label::Emotion(e) => e.as_str(),
        }
    }

    pub fn sentiment(self) -> Option<Sentiment> {
        match self {
            Label::Sentiment(s) => Some(s),
            Label::Emotion(_) => None,
        }
    }

    pub fn emotion(self) -> Option<Emotion> {
        match self {
            Label::Emotion(e) => Some(e),
            Label::Sentiment(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    pub confidence: f64,
    /// True when the label is the sentinel substituted for a failed call.
    pub fallback: bool,
}

impl ClassificationResult {
    pub fn fallback(kind: ClassifierKind) -> Self {
        Self { label: Label::neutral(kind), confidence: 0.0, fallback: true }
    }
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("nothing to classify")]
    EmptyInput,
    #[error("model '{model}' returned no labels")]
    EmptyResult { model: String },
    #[error("model '{model}' returned label '{label}' outside the {kind} vocabulary")]
    UnknownLabel { model: String, label: String, kind: ClassifierKind },
    #[error("model '{model}' request failed: {reason}")]
    Backend { model: String, reason: String },
}

/// Best label reported by a model for one span of text.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPrediction {
    pub label: String,
    pub score: f64,
}

/// A model host that maps text to its single best label.
pub trait ClassifierBackend {
    fn top_label(&self, model: &str, text: &str) -> Result<RawPrediction, ClassificationError>;
}

impl<T: ClassifierBackend + ?Sized> ClassifierBackend for &T {
    fn top_label(&self, model: &str, text: &str) -> Result<RawPrediction, ClassificationError> {
        (**self).top_label(model, text)
    }
}

/// Pick the highest-scoring entry from an inference response. Handles both the
/// flat `[{label, score}, ..]` and the nested `[[{label, score}, ..]]` shapes.
pub fn top_prediction(body: &Value) -> Option<RawPrediction> {
    let entries = match body.as_array()?.first()? {
        Value::Array(inner) => inner.as_slice(),
        Value::Object(_) => body.as_array()?.as_slice(),
        _ => return None,
    };
    entries
        .iter()
        .filter_map(|e| {
            let label = e.get("label")?.as_str()?.to_string();
            let score = e.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0);
            Some(RawPrediction { label, score })
        })
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

/// Hosted inference (Hugging Face Inference API compatible).
pub struct HfInferenceClient {
    agent: ureq::Agent,
    endpoint: String,
    token: Option<String>,
}

impl HfInferenceClient {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api-inference.huggingface.co/models";

    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(120)))
            .build();
        Self { agent: config.into(), endpoint: endpoint.into(), token: token.filter(|t| !t.trim().is_empty()) }
    }

    /// `HF_INFERENCE_ENDPOINT` (optional) and `HF_API_TOKEN` (required).
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(std::env::var("HF_INFERENCE_ENDPOINT").ok(), std::env::var("HF_API_TOKEN").ok())
    }

    /// Fails when `token` is missing or blank; an unset endpoint means the public API.
    pub fn from_vars(endpoint: Option<String>, token: Option<String>) -> anyhow::Result<Self> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("HF_API_TOKEN is not set"))?;
        let endpoint = endpoint
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_ENDPOINT.to_string());
        Ok(Self::new(endpoint, Some(token)))
    }
}

impl ClassifierBackend for HfInferenceClient {
    fn top_label(&self, model: &str, text: &str) -> Result<RawPrediction, ClassificationError> {
        let backend_err = |reason: String| ClassificationError::Backend { model: model.to_string(), reason };

        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), model);
        let mut req = self.agent.post(&url);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let payload = serde_json::json!({ "inputs": text, "options": { "wait_for_model": true } });
        let mut resp = req.send_json(&payload).map_err(|e| backend_err(e.to_string()))?;
        let body: Value = resp.body_mut().read_json().map_err(|e| backend_err(e.to_string()))?;

        if let Some(msg) = body.get("error").and_then(|m| m.as_str()) {
            return Err(backend_err(msg.to_string()));
        }
        top_prediction(&body).ok_or_else(|| ClassificationError::EmptyResult { model: model.to_string() })
    }
}

/// Both classifiers with their model ids and the input clamp.
pub struct ClassifierService<B> {
    backend: B,
    sentiment_model: String,
    emotion_model: String,
    max_chars: usize,
}

impl<B: ClassifierBackend> ClassifierService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sentiment_model: DEFAULT_SENTIMENT_MODEL.to_string(),
            emotion_model: DEFAULT_EMOTION_MODEL.to_string(),
            max_chars: MAX_INPUT_CHARS,
        }
    }

    pub fn with_models(mut self, sentiment: impl Into<String>, emotion: impl Into<String>) -> Self {
        self.sentiment_model = sentiment.into();
        self.emotion_model = emotion.into();
        self
    }

    /// Never exceeds `MAX_INPUT_CHARS`.
    pub fn with_max_chars(mut self, n: usize) -> Self {
        self.max_chars = n.clamp(1, MAX_INPUT_CHARS);
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn model_for(&self, kind: ClassifierKind) -> &str {
        match kind {
            ClassifierKind::Sentiment => &self.sentiment_model,
            ClassifierKind::Emotion => &self.emotion_model,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn classify(&self, text: &str, kind: ClassifierKind) -> Result<ClassificationResult, ClassificationError> {
        let span = truncate_chars(text, self.max_chars);
        if span.trim().is_empty() {
            return Err(ClassificationError::EmptyInput);
        }
        let model = self.model_for(kind);
        let raw = self.backend.top_label(model, span)?;
        let label = Label::parse(kind, &raw.label).ok_or_else(|| ClassificationError::UnknownLabel {
            model: model.to_string(),
            label: raw.label.clone(),
            kind,
        })?;
        Ok(ClassificationResult { label, confidence: raw.score, fallback: false })
    }

    /// Any classification failure becomes the `neutral` sentinel.
    pub fn label_or_neutral(&self, text: &str, kind: ClassifierKind) -> ClassificationResult {
        match self.classify(text, kind) {
            Ok(res) => res,
            Err(err) => {
                tracing::debug!("{} fallback to neutral: {}", kind, err);
                ClassificationResult::fallback(kind)
            }
        }
    }
}
