//! Classification prompt construction

use secdb_core::{ChatMessage, Result};
use std::path::Path;

/// Built-in instruction preamble: reviewer role, taxonomy, and output rules
pub const DEFAULT_PREAMBLE: &str = r#"
You are a careful content reviewer for a scientific journal. You receive a single comment string (no other context).
Your task is to classify ONLY what is explicitly present in the comment text. Do not guess or infer hidden data.

## Taxonomy (multi-label allowed)
- credentials: Real authentication material (SECRETS) or payment authentication data (unmasked). Examples: passwords/passphrases, API keys/tokens, bearer tokens, client secrets, private keys, database connection strings with embedded passwords, payment card PAN, card expiry, CVV/CVC/CID.
- network_identifiers: System/network identifiers used to identify accounts or machines, not secrets. Examples: usernames, user IDs, IP addresses, hostnames, workstation IDs, MAC addresses, ports.
- pii: Personally identifiable information such as a person's name, email address, phone number, or physical address.
- conflict: Explicit disagreement, debate, or argument **among co-authors themselves** (e.g., disputes about content, tone, style, or direction of the paper). Do NOT include disagreements with reviewers here
- peerreview: Content that is part of the formal review workflow (reviewer/AC/PC comments, meta-reviews, rebuttals, responses to reviewers, and camera-ready change requests). Also covers author planning/strategy about how to respond to reviewers, even if critical of them.
- none: No issues per the above categories.

## Key rules
1) Masked/redacted/placeholder values (e.g., "<***.***.***.***>", "X.X.X.X", "REDACTED") -> none, if no other sensitive data is included.
2) Generic tool/log scaffolding alone (HTTP methods/paths/status, timestamps, user-agents like "curl/8.4") -> none, unless a user/account OR concrete asset ID /session_token is also present.
3) **Do NOT mark credentials** for mere identifiers. Usernames, IPs, hostnames, workstation IDs, ports, and URLs are **network_identifiers**, not credentials.
4) **Credentials requires explicit secrets or payment auth data.**
5) **Payment card data -> credentials.** If a name/email/phone is also present, include **pii** too.
6) **Emails**: email addresses are considered pii and may also serve as network_identifiers when used as account names. At a minimum, treat an email address as PII if it belongs to an identifiable individual, as opposed to a generic or shared address (e.g., info@ibm.com)
7) **Publication / Citation Information is not PII.** When names/titles appear purely as bibliographic metadata (author names, article titles, journal/conference names, DOIs, affiliations, volume/issue/pages, arXiv/ISBN/ISSN), classify as **none** (unless other sensitive indicators like personal emails/phones/addresses also appear).
8) **IPs, ports, or URLs** on their own, when they do not represent information leakage (e.g., values from RFC examples or documentation), should not be classified as network_identifiers.
9) **URLs/Domains or file paths** that are non-sensitive should be ignored and classified as none, provided no other sensitive indicators are present (e.g session token).
10) Conflict applies only to explicit author-author disagreement. If text shows author disagreement with reviewers, classify as peerreview instead.
11) If nothing matches, return **none**.
12) Apply a category only if it is 100% certain from the text itself. If there is any doubt or ambiguity, do not apply that label. If no category can be applied with full certainty, return <xml>none</xml>.
13) Sensitive elements may be hidden inside LaTeX, code, other irrelevant text segment. Only classify when the sensitive content itself is explicit; do not confuse normal markup, equations, or citations with sensitive data.
14) Output format is STRICT: return only <xml>...</xml> with comma-separated labels, e.g. <xml>credentials,pii</xml> or <xml>none</xml>. No extra text.


Now analyze this comment:
"#;

/// Delimiter placed around the comment in inline mode
const COMMENT_FENCE: &str = "---";

/// How the preamble and comment are laid out in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Single user message: preamble, fenced comment
    #[default]
    Inline,
    /// Preamble as the system message, bare comment as the user message
    System,
}

/// Builds the chat messages for one classification request
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    preamble: String,
    mode: PromptMode,
}

impl PromptTemplate {
    pub fn new(preamble: impl Into<String>, mode: PromptMode) -> Self {
        Self {
            preamble: preamble.into(),
            mode,
        }
    }

    /// Load the preamble from a file
    pub fn from_file(path: impl AsRef<Path>, mode: PromptMode) -> Result<Self> {
        let path = path.as_ref();
        let preamble = std::fs::read_to_string(path).map_err(|e| {
            secdb_core::Error::config(format!(
                "Failed to read prompt preamble {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(preamble, mode))
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn mode(&self) -> PromptMode {
        self.mode
    }

    /// Messages for classifying `comment`
    pub fn build_messages(&self, comment: &str) -> Vec<ChatMessage> {
        match self.mode {
            PromptMode::Inline => vec![ChatMessage::user(format!(
                "{}\n{}\n{}\n{}",
                self.preamble, COMMENT_FENCE, comment, COMMENT_FENCE
            ))],
            PromptMode::System => vec![
                ChatMessage::system(self.preamble.clone()),
                ChatMessage::user(comment),
            ],
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PREAMBLE, PromptMode::Inline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_layout() {
        let template = PromptTemplate::new("RULES", PromptMode::Inline);
        let messages = template.build_messages("the admin password was hunter2");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(
            messages[0].content,
            "RULES\n---\nthe admin password was hunter2\n---"
        );
    }

    #[test]
    fn test_system_layout() {
        let template = PromptTemplate::new("RULES", PromptMode::System);
        let messages = template.build_messages("hello");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("RULES"));
        assert_eq!(messages[1], ChatMessage::user("hello"));
    }

    #[test]
    fn test_default_preamble_lists_every_label() {
        let template = PromptTemplate::default();
        for label in secdb_core::Label::ALL {
            assert!(template.preamble().contains(label.as_str()));
        }
        assert!(template.preamble().contains("<xml>none</xml>"));
    }

    #[test]
    fn test_missing_preamble_file() {
        let err = PromptTemplate::from_file("/nonexistent/preamble.md", PromptMode::Inline)
            .unwrap_err();
        assert!(matches!(err, secdb_core::Error::Config(_)));
    }
}
