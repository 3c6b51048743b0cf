use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use strsim::normalized_levenshtein;

use super::types::{Claim, Contradiction, IssueClaim};
use crate::util::{normalize_text, stemmed_tokens};

/// Statements at least this similar say the same thing even when tagged with
/// different entities.
const SAME_STATEMENT_SIMILARITY: f64 = 0.90;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "denied", "denies", "deny", "false", "without", "neither",
    "nor",
];

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("number pattern is valid"));

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|nov|dec";

// Calendar references: ISO dates, "March 3", "3rd of March" and years 1900-2100.
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b\d{{4}}-\d{{2}}-\d{{2}}\b|\b(?:{m})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?\b|\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:of\s+)?(?:{m})\b|\b(?:19\d{{2}}|20\d{{2}}|2100)\b",
        m = MONTHS
    ))
    .expect("date pattern is valid")
});

/// Grouping key for an issue label: normalized, stemmed, stopwords dropped,
/// tokens sorted. "Death tolls" and "the toll of deaths" share a key.
pub fn issue_key(issue: &str) -> String {
    let tokens: BTreeSet<String> = stemmed_tokens(issue).into_iter().collect();
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

fn source_key(claim: &Claim) -> String {
    claim.source.trim().to_lowercase()
}

/// Quantities stated in `statement`, ignoring dates and years.
fn numbers(statement: &str) -> BTreeSet<String> {
    let undated = DATE.replace_all(statement, " ");
    NUMBER
        .find_iter(&undated)
        .map(|m| m.as_str().replace(',', ""))
        .collect()
}

fn is_negated(statement: &str) -> bool {
    let lower = statement.to_lowercase();
    if lower.contains("n't") || lower.contains("n\u{2019}t") {
        return true;
    }
    normalize_text(&lower)
        .split_whitespace()
        .any(|token| NEGATIONS.contains(&token))
}

/// Two claims conflict when they come from different sources and either
/// state different quantities, disagree on polarity, or name different entities
/// in statements that are not near-identical.
pub fn claims_conflict(a: &Claim, b: &Claim) -> bool {
    if source_key(a) == source_key(b) {
        return false;
    }

    let left_numbers = numbers(&a.statement);
    let right_numbers = numbers(&b.statement);
    // Each side must state a quantity the other does not; an extra figure
    // on one side alone is added detail, not disagreement.
    if left_numbers.difference(&right_numbers).next().is_some()
        && right_numbers.difference(&left_numbers).next().is_some()
    {
        return true;
    }
    if is_negated(&a.statement) != is_negated(&b.statement) {
        return true;
    }

    match (&a.entity, &b.entity) {
        (Some(x), Some(y)) if normalize_text(x) != normalize_text(y) => {
            let similarity =
                normalized_levenshtein(&normalize_text(&a.statement), &normalize_text(&b.statement));
            similarity < SAME_STATEMENT_SIMILARITY
        }
        _ => false,
    }
}

fn claim_identity(claim: &Claim) -> (String, String) {
    (source_key(claim), normalize_text(&claim.statement))
}

/// Groups claims by issue and keeps, for every group with at least one
/// conflicting pair, the claims involved in a conflict. Output follows the
/// order in which issues and claims first appear.
pub fn detect_contradictions(claims: &[IssueClaim]) -> Vec<Contradiction> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&IssueClaim>> = HashMap::new();
    for claim in claims {
        let key = issue_key(&claim.issue);
        if key.is_empty() {
            continue;
        }
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(claim);
    }

    let mut contradictions = Vec::new();
    for key in order {
        let Some(group) = groups.get(&key) else {
            continue;
        };

        let mut involved = vec![false; group.len()];
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                if claims_conflict(&group[i].claim, &group[j].claim) {
                    involved[i] = true;
                    involved[j] = true;
                }
            }
        }
        if !involved.iter().any(|&x| x) {
            continue;
        }

        let mut seen = HashSet::new();
        let conflicting_claims: Vec<Claim> = group
            .iter()
            .zip(involved)
            .filter(|(_, involved)| *involved)
            .map(|(c, _)| c.claim.clone())
            .filter(|c| seen.insert(claim_identity(c)))
            .collect();

        contradictions.push(Contradiction {
            issue: group[0].issue.trim().to_string(),
            conflicting_claims,
        });
    }
    contradictions
}

/// Folds contradictions the synthesis step reported itself into the detected
/// ones. Entries with the same issue key become one, keeping every distinct claim.
pub fn merge_contradictions(
    detected: Vec<Contradiction>,
    supplied: Vec<Contradiction>,
) -> Vec<Contradiction> {
    let mut merged: Vec<Contradiction> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for contradiction in detected.into_iter().chain(supplied) {
        let key = issue_key(&contradiction.issue);
        match index.get(&key) {
            Some(&at) => {
                let existing = &mut merged[at];
                let mut seen: HashSet<(String, String)> =
                    existing.conflicting_claims.iter().map(claim_identity).collect();
                for claim in contradiction.conflicting_claims {
                    if seen.insert(claim_identity(&claim)) {
                        existing.conflicting_claims.push(claim);
                    }
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(contradiction);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_contradiction;

    fn claim(issue: &str, source: &str, statement: &str, entity: Option<&str>) -> IssueClaim {
        IssueClaim {
            issue: issue.to_string(),
            claim: Claim {
                source: source.to_string(),
                statement: statement.to_string(),
                entity: entity.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_issue_key_ignores_form() {
        assert_eq!(issue_key("Death tolls"), issue_key("the toll of deaths"));
        assert_ne!(issue_key("death toll"), issue_key("cause of fire"));
    }

    #[test]
    fn test_different_numbers_conflict() {
        let claims = vec![
            claim("death toll", "Reuters", "At least 12 people died in the collapse", None),
            claim("Death Tolls", "AP", "Officials confirmed 15 deaths", None),
            claim("cause", "AP", "Heavy rain weakened the supports", None),
        ];
        let found = detect_contradictions(&claims);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].issue, "death toll");
        assert_eq!(found[0].conflicting_claims.len(), 2);
        assert!(validate_contradiction(&found[0], "c").is_empty());
    }

    #[test]
    fn test_dates_and_extra_detail_do_not_conflict() {
        Lazy::force(&NUMBER);
        Lazy::force(&DATE);
        let dated = vec![
            claim("death toll", "Reuters", "12 people died", None),
            claim("death toll", "AP", "On March 3, officials confirmed 12 people died", None),
            claim("death toll", "BBC", "12 people died in the 2024 collapse, 2024-03-03", None),
            claim("death toll", "DW", "12 people died and 40 were injured", None),
        ];
        assert!(detect_contradictions(&dated).is_empty());

        let disputed = vec![
            claim("death toll", "Reuters", "On 3rd of March 12 people died", None),
            claim("death toll", "AP", "On March 3, officials confirmed 15 people died", None),
        ];
        assert_eq!(detect_contradictions(&disputed).len(), 1);
    }

    #[test]
    fn test_same_source_or_agreement_is_not_a_conflict() {
        let same_source = vec![
            claim("death toll", "Reuters", "12 people died", None),
            claim("death toll", " reuters", "15 people died", None),
        ];
        assert!(detect_contradictions(&same_source).is_empty());

        let agreement = vec![
            claim("death toll", "Reuters", "12 people died", None),
            claim("death toll", "AP", "Rescuers say 12 people died.", None),
            claim("death toll", "BBC", "A dozen people were killed", None),
        ];
        assert!(detect_contradictions(&agreement).is_empty());
    }

    #[test]
    fn test_polarity_and_entity_conflicts() {
        let denial = vec![
            claim("responsibility", "Ministry", "The contractor was responsible for the failure", None),
            claim("responsibility", "Contractor Weekly", "The contractor was not responsible for any failure", None),
        ];
        assert_eq!(detect_contradictions(&denial).len(), 1);

        let blame = vec![
            claim("who is to blame", "Daily A", "Officials blamed the operator", Some("Operator")),
            claim("who is to blame", "Daily B", "The regulator is facing blame", Some("Regulator")),
        ];
        assert_eq!(detect_contradictions(&blame).len(), 1);
    }

    #[test]
    fn test_merge_dedupes_by_issue_key() {
        let detected = detect_contradictions(&[
            claim("death toll", "Reuters", "12 died", None),
            claim("death toll", "AP", "15 died", None),
        ]);
        let supplied = vec![
            Contradiction {
                issue: "Death tolls".to_string(),
                conflicting_claims: vec![
                    Claim {
                        source: "AP".to_string(),
                        statement: "15 died".to_string(),
                        entity: None,
                    },
                    Claim {
                        source: "BBC".to_string(),
                        statement: "20 died".to_string(),
                        entity: None,
                    },
                ],
            },
            Contradiction {
                issue: "cause".to_string(),
                conflicting_claims: vec![],
            },
        ];
        let merged = merge_contradictions(detected, supplied);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].conflicting_claims.len(), 3);
        assert_eq!(merged[1].issue, "cause");
    }
}
