//! Answer extraction and label normalization
//!
//! Model output is free text that should contain one `<xml>...</xml>` answer
//! block with comma-separated taxonomy tokens. [`ResponseNormalizer`] finds
//! that block, or salvages something usable when the wrapper is missing, and
//! turns it into a [`LabelSet`].
//!
//! Salvage is lossy: it keeps only `[a-zA-Z0-9_,\-\s]` from the whole
//! response and treats the residue as the answer body. Prose that survives
//! stripping is split into tokens that are then dropped for not being labels,
//! so a chatty response without a block usually normalizes to an empty set
//! rather than failing.

use regex::Regex;
use secdb_core::{Label, LabelSet, Result, NONE_SENTINEL};

const OPEN_TAG: &str = "<xml>";
const CLOSE_TAG: &str = "</xml>";

/// Separates a label from a trailing qualifier, e.g. `network_identifiers: usernames`
const QUALIFIER_SEPARATOR: char = ':';

/// Normalization failed: nothing resembling an answer was present
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("no valid <xml>...</xml> answer returned")]
    NoAnswer,
}

/// A normalized model answer
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnswer {
    /// The answer re-wrapped as `<xml>inner</xml>`
    pub raw_answer: String,

    /// Labels parsed from the answer body
    pub labels: LabelSet,

    /// True when no well-formed block was found and the text was salvaged
    pub salvaged: bool,
}

/// Extracts and repairs answer blocks from raw model output
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    block_regex: Regex,
    fence_regex: Regex,
    salvage_regex: Regex,
}

impl ResponseNormalizer {
    /// Create a new normalizer
    pub fn new() -> Result<Self> {
        Ok(Self {
            block_regex: Regex::new(r"(?is)<xml>.*?</xml>").map_err(|e| {
                secdb_core::Error::classifier(format!("Failed to compile answer block regex: {}", e))
            })?,
            fence_regex: Regex::new(r"^`+|`+$").map_err(|e| {
                secdb_core::Error::classifier(format!("Failed to compile fence regex: {}", e))
            })?,
            salvage_regex: Regex::new(r"[^a-zA-Z0-9_,\-\s]").map_err(|e| {
                secdb_core::Error::classifier(format!("Failed to compile salvage regex: {}", e))
            })?,
        })
    }

    /// Find the first `<xml>...</xml>` span in `text`
    pub fn extract_block<'a>(&self, text: &'a str) -> Option<&'a str> {
        if text.is_empty() {
            return None;
        }
        self.block_regex.find(text).map(|m| m.as_str().trim())
    }

    /// Return `candidate` unchanged when it is already wrapped, otherwise
    /// salvage its alphanumeric residue into a wrapped answer.
    pub fn sanitize(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }

        if is_wrapped(candidate) {
            return Some(candidate.to_string());
        }

        let unfenced = self.fence_regex.replace_all(candidate, "");
        let unfenced = unfenced.trim();
        let residue = self.salvage_regex.replace_all(unfenced, "");
        let residue = residue.trim();
        if residue.is_empty() {
            None
        } else {
            Some(format!("{}{}{}", OPEN_TAG, residue, CLOSE_TAG))
        }
    }

    /// Normalize raw model output into a label set
    pub fn normalize(&self, raw: &str) -> std::result::Result<NormalizedAnswer, NormalizeError> {
        let (raw_answer, salvaged) = match self.extract_block(raw).and_then(|b| self.sanitize(b)) {
            Some(block) => (block, false),
            None => (self.sanitize(raw).ok_or(NormalizeError::NoAnswer)?, true),
        };

        let labels = parse_label_tokens(inner_content(&raw_answer));

        Ok(NormalizedAnswer {
            raw_answer,
            labels,
            salvaged,
        })
    }
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new().expect("Failed to create response normalizer")
    }
}

/// Parse a stored ground-truth taxonomy field.
///
/// Missing, null, or non-string values yield the empty set.
pub fn parse_ground_truth(value: Option<&serde_json::Value>) -> LabelSet {
    match value {
        Some(serde_json::Value::String(raw)) => parse_label_tokens(raw),
        _ => LabelSet::new(),
    }
}

/// Parse comma-separated taxonomy tokens.
///
/// Case-insensitive. Unknown tokens are dropped. A `none` token empties the
/// result and stops parsing.
pub fn parse_label_tokens(content: &str) -> LabelSet {
    let mut labels = LabelSet::new();
    if content.trim().is_empty() {
        return labels;
    }

    for part in content.split(',') {
        let token = normalize_token(part);
        if token.is_empty() {
            continue;
        }
        if token == NONE_SENTINEL {
            return LabelSet::new();
        }
        if let Some(label) = Label::from_token(&token) {
            labels.insert(label);
        }
    }

    labels
}

/// Lowercase, strip a `label: qualifier` suffix, keep only `[a-z_]`
fn normalize_token(part: &str) -> String {
    let lowered = part.trim().to_lowercase();

    if let Some((head, _qualifier)) = lowered.split_once(QUALIFIER_SEPARATOR) {
        let head = letters_only(head);
        if head == NONE_SENTINEL || Label::from_token(&head).is_some() {
            return head;
        }
    }

    letters_only(&lowered)
}

fn letters_only(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_lowercase() || *c == '_')
        .collect()
}

fn is_wrapped(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.len() >= OPEN_TAG.len() + CLOSE_TAG.len()
        && lower.starts_with(OPEN_TAG)
        && lower.ends_with(CLOSE_TAG)
}

fn inner_content(wrapped: &str) -> &str {
    wrapped
        .get(OPEN_TAG.len()..wrapped.len() - CLOSE_TAG.len())
        .unwrap_or("")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(labels: &[Label]) -> LabelSet {
        labels.iter().copied().collect()
    }

    #[test]
    fn test_well_formed_block() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer.normalize("<xml>credentials,pii</xml>").unwrap();

        assert_eq!(answer.raw_answer, "<xml>credentials,pii</xml>");
        assert_eq!(answer.labels, set(&[Label::Credentials, Label::Pii]));
        assert!(!answer.salvaged);
    }

    #[test]
    fn test_case_and_spacing_insensitive() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let a = normalizer.normalize("<xml>credentials,pii</xml>").unwrap();
        let b = normalizer.normalize("<XML>PII, Credentials</XML>").unwrap();
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_block_inside_prose() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let raw = "Let me think.\n\nThe comment contains a password.\n<xml>credentials</xml>\nDone.";
        let answer = normalizer.normalize(raw).unwrap();
        assert_eq!(answer.labels, set(&[Label::Credentials]));
        assert_eq!(answer.raw_answer, "<xml>credentials</xml>");
    }

    #[test]
    fn test_first_block_wins() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer
            .normalize("<xml>pii</xml> or maybe <xml>conflict</xml>")
            .unwrap();
        assert_eq!(answer.labels, set(&[Label::Pii]));
    }

    #[test]
    fn test_sentinel_is_exclusive() {
        let normalizer = ResponseNormalizer::new().unwrap();
        assert!(normalizer.normalize("<xml>none</xml>").unwrap().labels.is_empty());
        assert!(normalizer
            .normalize("<xml>pii,none,credentials</xml>")
            .unwrap()
            .labels
            .is_empty());
    }

    #[test]
    fn test_unknown_tokens_dropped() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer.normalize("<xml>pii, secrets, toxicity</xml>").unwrap();
        assert_eq!(answer.labels, set(&[Label::Pii]));
    }

    #[test]
    fn test_empty_block_is_empty_set_without_error() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer.normalize("<xml></xml>").unwrap();
        assert!(answer.labels.is_empty());
        assert!(!answer.salvaged);
    }

    #[test]
    fn test_qualified_label() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer
            .normalize("<xml>network_identifiers: usernames, pii</xml>")
            .unwrap();
        assert_eq!(answer.labels, set(&[Label::NetworkIdentifiers, Label::Pii]));
    }

    #[test]
    fn test_duplicates_collapsed_in_first_seen_order() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer.normalize("<xml>pii,credentials,PII</xml>").unwrap();
        assert_eq!(answer.labels.joined(), "pii,credentials");
    }

    #[test]
    fn test_salvage_missing_wrapper() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer.normalize("```credentials, pii```").unwrap();
        assert!(answer.salvaged);
        assert_eq!(answer.raw_answer, "<xml>credentials, pii</xml>");
        assert_eq!(answer.labels, set(&[Label::Credentials, Label::Pii]));
    }

    #[test]
    fn test_salvage_bare_sentinel() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer.normalize("none").unwrap();
        assert!(answer.salvaged);
        assert!(answer.labels.is_empty());
    }

    #[test]
    fn test_salvaged_prose_yields_empty_set() {
        let normalizer = ResponseNormalizer::new().unwrap();
        let answer = normalizer
            .normalize("I cannot determine this with certainty.")
            .unwrap();
        assert!(answer.salvaged);
        assert!(answer.labels.is_empty());
    }

    #[test]
    fn test_garbage_fails() {
        let normalizer = ResponseNormalizer::new().unwrap();
        assert_eq!(normalizer.normalize(""), Err(NormalizeError::NoAnswer));
        assert_eq!(normalizer.normalize("   \n "), Err(NormalizeError::NoAnswer));
        assert_eq!(normalizer.normalize("<>!!?? ``` {}"), Err(NormalizeError::NoAnswer));
    }

    #[test]
    fn test_ground_truth_parsing() {
        let value = serde_json::json!("credentials, Network_Identifiers");
        assert_eq!(
            parse_ground_truth(Some(&value)),
            set(&[Label::Credentials, Label::NetworkIdentifiers])
        );

        let none = serde_json::json!("none");
        assert!(parse_ground_truth(Some(&none)).is_empty());
    }

    #[test]
    fn test_ground_truth_missing_or_non_string() {
        assert!(parse_ground_truth(None).is_empty());
        assert!(parse_ground_truth(Some(&serde_json::Value::Null)).is_empty());
        assert!(parse_ground_truth(Some(&serde_json::json!(42))).is_empty());
        assert!(parse_ground_truth(Some(&serde_json::json!(["pii"]))).is_empty());
        assert!(parse_ground_truth(Some(&serde_json::json!("   "))).is_empty());
    }
}
