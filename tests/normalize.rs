use rsent::{NormalizerConfig, TextNormalizer};

/// The canonical cleanup: lowercase, URL removed, "!" stripped, "i" dropped as a stopword.
#[test]
fn cleans_mixed_case_url_and_punctuation() {
    let n = TextNormalizer::english();
    assert_eq!(n.normalize(Some("I feel GREAT today! http://x.co")), "feel great today");
}

/// Missing text is not an error; it cleans to the empty string.
#[test]
fn missing_text_is_empty() {
    let n = TextNormalizer::english();
    assert_eq!(n.normalize(None), "");
    assert_eq!(n.normalize(Some("")), "");
    assert_eq!(n.normalize(Some("   \n\t ")), "");
}

/// Digit runs vanish (including inside words), whitespace collapses to single spaces.
#[test]
fn strips_digits_and_collapses_whitespace() {
    let n = TextNormalizer::english();
    assert_eq!(n.normalize(Some("Day 42   of   therapy\n\nweek3")), "day therapy week");
}

/// Apostrophes are punctuation, so "don't" becomes "dont" (not in the list) while
/// plain stopwords like "the"/"and"/"is" are removed.
#[test]
fn stopwords_checked_after_punctuation_strip() {
    let n = TextNormalizer::english();
    assert_eq!(n.normalize(Some("The panic is real and I don't know")), "panic real dont know");
}

/// A second pass never changes already-normalized text, including inputs where
/// stripping punctuation or digits glues a new `http…` run together.
#[test]
fn normalization_is_idempotent() {
    let n = TextNormalizer::english();
    let samples = [
        "I feel GREAT today! http://x.co",
        "ht.tps and ht3tp4s://nope",
        "Check https://example.com/a?b=1 (and www.site.org) NOW!!!",
        "Ünïcödé ÄNGST — 2020 was a year…",
        "Σ ΟΔΥΣΣΕΥΣ ends in sigma",
        "she's been there; they're not. 100% sure",
        "",
        "http",
        "xhttp.y",
    ];
    for s in samples {
        let once = n.normalize(Some(s));
        let twice = n.normalize(Some(&once));
        assert_eq!(once, twice, "not stable for {s:?}");
    }
}

/// Custom stopword sets replace the default list; extensions add to it.
#[test]
fn custom_and_extended_stopwords() {
    let only_feel = TextNormalizer::new(NormalizerConfig::english().with_stopwords(["Feel"]));
    assert_eq!(only_feel.normalize(Some("I feel fine")), "i fine");

    let extended = TextNormalizer::new(NormalizerConfig::english().extend_stopwords(["today"]));
    assert_eq!(extended.normalize(Some("I feel great today")), "feel great");
}
