//! Label normalisation and the target-derived matcher.
//!
//! Everything here is pure: a target label goes in, comparison tokens come out.

use std::collections::BTreeSet;

/// Words that distinguish variants of the same model family
pub const MODIFIERS: [&str; 3] = ["pro", "instant", "thinking"];

/// Lowercase and split on anything that is not a letter or digit
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"GPT‑5.2  Thinking"` becomes `"gpt 5 2 thinking"`
pub fn normalize_label(text: &str) -> String {
    tokenize(text).join(" ")
}

/// The first run of numeric tokens, joined with dots.
///
/// The run starts at the first token beginning with a digit (`"4o"`, `"5"`)
/// and continues through purely numeric tokens, so `gpt-5-2-thinking` has
/// version `5.2`.
pub fn detect_version(tokens: &[String]) -> Option<String> {
    let start = tokens.iter().position(|t| t.starts_with(|c: char| c.is_ascii_digit()))?;
    let mut parts = vec![tokens[start].as_str()];
    parts.extend(
        tokens[start + 1..]
            .iter()
            .take_while(|t| t.chars().all(|c| c.is_ascii_digit()))
            .map(String::as_str),
    );
    Some(parts.join("."))
}

pub fn detect_modifiers(tokens: &[String]) -> BTreeSet<&'static str> {
    tokens
        .iter()
        .filter_map(|token| match token.as_str() {
            "pro" => Some("pro"),
            "instant" => Some("instant"),
            "thinking" | "think" => Some("thinking"),
            _ => None,
        })
        .collect()
}

/// Comparison tokens derived from one target label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMatcher {
    pub target: String,
    pub normalized: String,
    pub tokens: Vec<String>,

    /// Token sequences an identifier attribute may end with, e.g.
    /// `[gpt, 5, 2, thinking]` and `[5, 2, thinking]`
    pub identifier_variants: Vec<Vec<String>>,

    pub version: Option<String>,
    pub modifiers: BTreeSet<&'static str>,
}

impl SelectionMatcher {
    pub fn new(target: &str) -> Self {
        let tokens = tokenize(target);

        let mut identifier_variants = Vec::new();
        if !tokens.is_empty() {
            identifier_variants.push(tokens.clone());
        }
        if tokens.len() > 1 && matches!(tokens[0].as_str(), "gpt" | "chatgpt") {
            identifier_variants.push(tokens[1..].to_vec());
        }

        Self {
            target: target.to_string(),
            normalized: tokens.join(" "),
            version: detect_version(&tokens),
            modifiers: detect_modifiers(&tokens),
            identifier_variants,
            tokens,
        }
    }

    /// Whether a control label shows this target: same version (when the
    /// target names one), the same modifier set, and every other target word.
    pub fn satisfied_by(&self, label: &str) -> bool {
        let label_tokens = tokenize(label);
        if label_tokens.is_empty() || self.tokens.is_empty() {
            return false;
        }

        if let Some(version) = &self.version {
            if detect_version(&label_tokens).as_deref() != Some(version.as_str()) {
                return false;
            }
        }

        if detect_modifiers(&label_tokens) != self.modifiers {
            return false;
        }

        let version_tokens: BTreeSet<String> = self
            .version
            .as_deref()
            .map(|v| v.split('.').map(str::to_string).collect())
            .unwrap_or_default();

        self.tokens
            .iter()
            .filter(|t| !version_tokens.contains(*t) && !MODIFIERS.contains(&t.as_str()) && t.as_str() != "think")
            .all(|t| label_tokens.iter().any(|l| l == t || l.ends_with(t.as_str())))
    }
}
