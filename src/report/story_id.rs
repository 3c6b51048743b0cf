use std::collections::{HashMap, HashSet};

use crate::util::normalize_text;

/// Lowercase title with every run of non-alphanumerics collapsed to one hyphen.
pub fn slugify(title: &str) -> String {
    normalize_text(title)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Story IDs for one batch, in input order. Titles whose slug collides are
/// salted with their input index; an empty slug becomes `story-{index}`.
pub fn assign_story_ids<S: AsRef<str>>(titles: &[S]) -> Vec<String> {
    let slugs: Vec<String> = titles.iter().map(|t| slugify(t.as_ref())).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for slug in &slugs {
        *counts.entry(slug.as_str()).or_default() += 1;
    }

    let mut used = HashSet::new();
    let mut ids = Vec::with_capacity(slugs.len());
    for (index, slug) in slugs.iter().enumerate() {
        let mut candidate = if slug.is_empty() {
            format!("story-{}", index)
        } else if counts.get(slug.as_str()).copied().unwrap_or(0) > 1 {
            format!("{}-{}", slug, index)
        } else {
            slug.clone()
        };
        // A salted ID can still equal another title's plain slug.
        while !used.insert(candidate.clone()) {
            candidate = format!("{}-{}", candidate, index);
        }
        ids.push(candidate);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Port Strike: Day 3!"), "port-strike-day-3");
        assert_eq!(slugify("  Café   owners  "), "cafe-owners");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_collisions_are_salted_with_index() {
        let ids = assign_story_ids(&["Port strike", "Election", "port STRIKE", "???"]);
        assert_eq!(ids, vec!["port-strike-0", "election", "port-strike-2", "story-3"]);
    }

    #[test]
    fn test_salted_ids_never_collide_with_plain_slugs() {
        let ids = assign_story_ids(&["a 1", "a", "a"]);
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(ids[0], "a-1");
    }
}
