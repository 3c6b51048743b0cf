use anyhow::Result;
use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

static EN_STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

// Words that carry no topical signal when comparing titles or issue keys.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it", "of",
    "on", "or", "over", "the", "to", "was", "were", "with",
];

/// Unicode normalization, lowercase, punctuation to spaces, single spacing.
pub fn normalize_text(text: &str) -> String {
    text.nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && !c.is_whitespace(), " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized, stemmed tokens with stopwords removed.
pub fn stemmed_tokens(text: &str) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .map(|token| EN_STEMMER.stem(token).to_string())
        .collect()
}

/// Jaccard overlap of the stemmed token sets of two strings.
pub fn token_jaccard(a: &str, b: &str) -> f32 {
    let left: HashSet<String> = stemmed_tokens(a).into_iter().collect();
    let right: HashSet<String> = stemmed_tokens(b).into_iter().collect();
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count() as f32;
    let total = left.union(&right).count() as f32;
    shared / total
}

/// Calculate cosine similarity directly between two vectors
pub fn cosine_similarity(vec1: &[f32], vec2: &[f32]) -> Result<f32> {
    if vec1.len() != vec2.len() {
        return Err(anyhow::anyhow!(
            "Vector dimensions don't match: {} vs {}",
            vec1.len(),
            vec2.len()
        ));
    }

    let mag1: f32 = vec1.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag2: f32 = vec2.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag1 < 0.001 || mag2 < 0.001 {
        return Err(anyhow::anyhow!("Zero magnitude vector detected"));
    }

    let dot_product: f32 = vec1.iter().zip(vec2.iter()).map(|(a, b)| a * b).sum();
    Ok(dot_product / (mag1 * mag2))
}

/// Hex SHA-256 of the normalized text; equal for content that differs only
/// in case, punctuation or spacing.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cuts `text` to at most `max_chars` characters without splitting a grapheme.
/// Returns the text and whether anything was cut.
pub fn truncate_graphemes(text: &str, max_chars: usize) -> (String, bool) {
    let mut out = String::new();
    let mut count = 0;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        if count + len > max_chars {
            return (out, true);
        }
        out.push_str(grapheme);
        count += len;
    }
    (out, false)
}

/// Host of a URL without a leading `www.`, or the raw string when it does not parse.
pub fn source_host(raw_url: &str) -> String {
    match Url::parse(raw_url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.trim_start_matches("www.").to_string())
            .unwrap_or_else(|| raw_url.to_string()),
        Err(_) => raw_url.trim().to_string(),
    }
}
