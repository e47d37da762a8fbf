//! The closed classification taxonomy
//!
//! Five labels may be assigned to a comment. The `none` sentinel is not a
//! label: it is represented by an empty [`LabelSet`] and is never combined
//! with other labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire spelling of the "no label applies" sentinel
pub const NONE_SENTINEL: &str = "none";

/// A single classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Secrets and payment authentication data
    #[serde(rename = "credentials")]
    Credentials,

    /// Usernames, IPs, hostnames and other account/machine identifiers
    #[serde(rename = "network_identifiers")]
    NetworkIdentifiers,

    /// Personally identifiable information
    #[serde(rename = "pii")]
    Pii,

    /// Explicit disagreement among co-authors
    #[serde(rename = "conflict")]
    Conflict,

    /// Formal review workflow content
    #[serde(rename = "peerreview")]
    PeerReview,
}

impl Label {
    /// All labels in canonical order
    pub const ALL: [Label; 5] = [
        Label::Credentials,
        Label::NetworkIdentifiers,
        Label::Pii,
        Label::Conflict,
        Label::PeerReview,
    ];

    /// Wire name of this label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::NetworkIdentifiers => "network_identifiers",
            Self::Pii => "pii",
            Self::Conflict => "conflict",
            Self::PeerReview => "peerreview",
        }
    }

    /// Short column name used in progress lines
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Credentials => "cred",
            Self::NetworkIdentifiers => "netid",
            Self::Pii => "pii",
            Self::Conflict => "conf",
            Self::PeerReview => "prrev",
        }
    }

    /// Exact match against a wire name. The sentinel is not a label.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.as_str() == token)
    }

    /// Position of this label within [`Label::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A duplicate-free collection of labels.
///
/// Insertion order is kept for display, but equality is set equality.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Label>", into = "Vec<Label>")]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    /// Create an empty set (the `none` answer)
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label, returning false if it was already present
    pub fn insert(&mut self, label: Label) -> bool {
        if self.labels.contains(&label) {
            return false;
        }
        self.labels.push(label);
        true
    }

    pub fn contains(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Labels in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = Label> + '_ {
        self.labels.iter().copied()
    }

    /// Labels present in both sets, in `self`'s order
    pub fn intersection(&self, other: &LabelSet) -> LabelSet {
        self.iter().filter(|l| other.contains(*l)).collect()
    }

    /// Labels present in `self` but not in `other`
    pub fn difference(&self, other: &LabelSet) -> LabelSet {
        self.iter().filter(|l| !other.contains(*l)).collect()
    }

    /// Order-insensitive equality
    pub fn same_labels(&self, other: &LabelSet) -> bool {
        self.len() == other.len() && self.iter().all(|l| other.contains(l))
    }

    /// Comma-joined wire names, e.g. `credentials,pii`
    pub fn joined(&self) -> String {
        self.labels
            .iter()
            .map(Label::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl PartialEq for LabelSet {
    fn eq(&self, other: &Self) -> bool {
        self.same_labels(other)
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for label in iter {
            set.insert(label);
        }
        set
    }
}

impl From<Vec<Label>> for LabelSet {
    fn from(labels: Vec<Label>) -> Self {
        labels.into_iter().collect()
    }
}

impl From<LabelSet> for Vec<Label> {
    fn from(set: LabelSet) -> Self {
        set.labels
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str(NONE_SENTINEL)
        } else {
            f.write_str(&self.joined())
        }
    }
}
