use std::collections::HashSet;
use strsim::normalized_levenshtein;

use crate::config::AnalyzerConfig;
use crate::dataset::Article;
use crate::util::{content_hash, normalize_text, truncate_graphemes};

/// Leading characters compared when looking for near-duplicate articles.
const LEADING_TEXT_CHARS: usize = 300;

/// The article text handed to the synthesis engine for one story.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisContext {
    pub text: String,
    /// Articles that made it into `text`, in the order they appear.
    pub article_ids: Vec<i64>,
    pub duplicates_removed: usize,
    /// Whether any article body was cut or any article left out for space.
    pub truncated: bool,
}

fn leading_text(article: &Article) -> String {
    let normalized = normalize_text(body(article));
    truncate_graphemes(&normalized, LEADING_TEXT_CHARS).0
}

fn body(article: &Article) -> &str {
    if article.content.trim().is_empty() {
        &article.summary
    } else {
        &article.content
    }
}

fn render(article: &Article, max_chars: usize) -> (String, bool) {
    let (text, cut) = truncate_graphemes(body(article).trim(), max_chars);
    let block = format!(
        "[Article {}] {}\nSource: {} | Published: {}\n{}{}\n",
        article.id,
        article.title.trim(),
        article.source_host(),
        article.publish_date.format("%Y-%m-%d %H:%M UTC"),
        text,
        if cut { " [...]" } else { "" }
    );
    (block, cut)
}

/// Builds a bounded context from `articles`. The result depends only on the
/// articles and `config`, never on input order.
pub fn build_context(articles: &[&Article], config: &AnalyzerConfig) -> SynthesisContext {
    let mut ordered: Vec<&Article> = articles.to_vec();
    ordered.sort_by(|a, b| a.publish_date.cmp(&b.publish_date).then(a.id.cmp(&b.id)));

    let mut hashes = HashSet::new();
    let mut kept: Vec<(&Article, String)> = Vec::new();
    let mut duplicates_removed = 0;
    for article in ordered {
        let leading = leading_text(article);
        // Articles without a body have nothing to compare; only their titles differ.
        if leading.is_empty() {
            kept.push((article, leading));
            continue;
        }
        if !hashes.insert(content_hash(body(article))) {
            duplicates_removed += 1;
            continue;
        }
        let near_duplicate = kept.iter().any(|(_, other)| {
            !other.is_empty()
                && normalized_levenshtein(&leading, other) >= config.near_duplicate_threshold
        });
        if near_duplicate {
            duplicates_removed += 1;
            continue;
        }
        kept.push((article, leading));
    }

    let mut truncated = kept.len() > config.max_context_articles;
    let mut text = String::new();
    let mut used = 0;
    let mut article_ids = Vec::new();
    for (article, _) in kept.into_iter().take(config.max_context_articles) {
        let (block, cut) = render(article, config.max_article_chars);
        let len = block.chars().count();
        // The first article always goes in so the engine has something to work with.
        if !article_ids.is_empty() && used + len > config.context_char_budget {
            truncated = true;
            break;
        }
        truncated |= cut;
        used += len;
        text.push_str(&block);
        text.push('\n');
        article_ids.push(article.id);
    }

    SynthesisContext {
        text,
        article_ids,
        duplicates_removed,
        truncated,
    }
}
