use crate::selector::matcher::{SelectionMatcher, detect_modifiers, detect_version, tokenize};
use serde::{Deserialize, Serialize};

/// Points awarded or deducted when ranking menu entries against a target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringWeights {
    /// Normalised entry text equals the target
    pub exact_label: i32,

    /// Entry text starts with the target
    pub prefix_label: i32,

    /// Target appears as whole words inside the entry text
    pub substring_label: i32,

    /// Entry text is a leading part of the target
    pub reverse_prefix_label: i32,

    /// Identifier attribute ends with a target variant
    pub exact_identifier: i32,

    /// Identifier attribute contains a target variant
    pub partial_identifier: i32,

    /// Per target word present in the text or identifier
    pub token_bonus: i32,

    /// Per target word absent from both
    pub missing_token_penalty: i32,

    /// Per modifier present on only one side
    pub modifier_penalty: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            exact_label: 100,
            prefix_label: 70,
            substring_label: 50,
            reverse_prefix_label: 40,
            exact_identifier: 110,
            partial_identifier: 60,
            token_bonus: 5,
            missing_token_penalty: 15,
            modifier_penalty: 40,
        }
    }
}

/// One entry of an open menu, as collected from the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCandidate {
    pub index: usize,

    #[serde(default)]
    pub label: String,

    /// Test id, value or element id, when present
    #[serde(default)]
    pub identifier: Option<String>,

    /// Opens a nested menu instead of selecting
    #[serde(default)]
    pub submenu: bool,

    #[serde(default)]
    pub selected: bool,

    #[serde(default)]
    pub disabled: bool,
}

impl MenuCandidate {
    pub fn new(index: usize, label: impl Into<String>) -> Self {
        Self { index, label: label.into(), ..Default::default() }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn as_submenu(mut self) -> Self {
        self.submenu = true;
        self
    }

    pub fn as_selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub candidate: MenuCandidate,
    pub score: i32,
    pub identifier_match: bool,
    pub normalized_text: String,
    pub version: Option<String>,
}

enum IdentifierMatch {
    Exact,
    Partial,
    None,
}

fn match_identifier(identifier: &[String], variants: &[Vec<String>]) -> IdentifierMatch {
    if identifier.is_empty() {
        return IdentifierMatch::None;
    }
    if variants.iter().any(|v| identifier.ends_with(v)) {
        return IdentifierMatch::Exact;
    }
    if variants.iter().any(|v| !v.is_empty() && identifier.windows(v.len()).any(|w| w == v.as_slice())) {
        return IdentifierMatch::Partial;
    }
    IdentifierMatch::None
}

/// Whole-word containment on normalised (space-joined) text
fn contains_words(haystack: &str, needle: &str) -> bool {
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

/// Score one entry, or `None` when it can never be the target.
///
/// Excluded outright: disabled entries, entries whose version conflicts with
/// the target's, and submenu openers that carry no version.
pub fn score_candidate(
    candidate: &MenuCandidate,
    matcher: &SelectionMatcher,
    weights: &ScoringWeights,
) -> Option<ScoredCandidate> {
    if candidate.disabled {
        return None;
    }

    let text = tokenize(&candidate.label);
    let identifier = candidate.identifier.as_deref().map(tokenize).unwrap_or_default();
    let version = detect_version(&text).or_else(|| detect_version(&identifier));

    if let (Some(wanted), Some(found)) = (&matcher.version, &version) {
        if wanted != found {
            return None;
        }
    }
    if candidate.submenu && version.is_none() {
        return None;
    }

    let normalized = text.join(" ");
    let target = matcher.normalized.as_str();
    let mut score = 0;

    if !target.is_empty() && !normalized.is_empty() {
        if normalized == target {
            score += weights.exact_label;
        } else if normalized.starts_with(&format!("{} ", target)) {
            score += weights.prefix_label;
        } else if contains_words(&normalized, target) {
            score += weights.substring_label;
        } else if format!("{} ", target).starts_with(&format!("{} ", normalized)) {
            score += weights.reverse_prefix_label;
        }
    }

    let identifier_match = match match_identifier(&identifier, &matcher.identifier_variants) {
        IdentifierMatch::Exact => {
            score += weights.exact_identifier;
            true
        }
        IdentifierMatch::Partial => {
            score += weights.partial_identifier;
            true
        }
        IdentifierMatch::None => false,
    };

    for token in &matcher.tokens {
        if text.contains(token) || identifier.contains(token) {
            score += weights.token_bonus;
        } else if matcher.tokens.len() > 1 {
            score -= weights.missing_token_penalty;
        }
    }

    let mut modifiers = detect_modifiers(&text);
    modifiers.extend(detect_modifiers(&identifier));
    let extra = modifiers.difference(&matcher.modifiers).count();
    // A submenu opener stands for its whole family, so only what it adds counts
    let missing = if candidate.submenu { 0 } else { matcher.modifiers.difference(&modifiers).count() };
    score -= (extra + missing) as i32 * weights.modifier_penalty;

    Some(ScoredCandidate { candidate: candidate.clone(), score, identifier_match, normalized_text: normalized, version })
}

/// Positive-scoring entries, best first.
///
/// Ties go to identifier matches, then to the entry listed first.
pub fn rank(candidates: &[MenuCandidate], matcher: &SelectionMatcher, weights: &ScoringWeights) -> Vec<ScoredCandidate> {
    let mut ranked: Vec<ScoredCandidate> = candidates
        .iter()
        .filter_map(|c| score_candidate(c, matcher, weights))
        .filter(|scored| scored.score > 0)
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.identifier_match.cmp(&a.identifier_match))
            .then(a.candidate.index.cmp(&b.candidate.index))
    });
    ranked
}
