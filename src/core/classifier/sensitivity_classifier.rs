// Sensitivity classifier - core logic for scoring user-submitted text.
//
// This classifier handles:
// - Direct keyword matching (case-insensitive substring)
// - Normalization for digit/homoglyph/punctuation obfuscation ("fr33 m0ney")
// - A phonetic fold for common transliterations ("kasino")
//
// NO storage dependencies here - classification is pure and never fails.
// Empty input or zero matches is a normal outcome (Safe), not an error.

use super::keyword_tables::{Category, KeywordTables};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ============================================================================
// RESULT MODELS
// ============================================================================

/// How policy-violating a piece of text looks.
///
/// Ordering matters: later variants are strictly more severe, so the decision
/// engine can compare levels directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityLevel {
    Safe,
    Low,
    Medium,
    High,
    /// Reserved for ban-worthy content. `classify` never emits this level;
    /// it exists so the strategy table and outcome mapping stay total.
    Extreme,
}

impl std::fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensitivityLevel::Safe => write!(f, "safe"),
            SensitivityLevel::Low => write!(f, "low"),
            SensitivityLevel::Medium => write!(f, "medium"),
            SensitivityLevel::High => write!(f, "high"),
            SensitivityLevel::Extreme => write!(f, "extreme"),
        }
    }
}

/// What the moderation pipeline should do for a given severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationStrategy {
    pub auto_approve_eligible: bool,
    pub needs_human_review: bool,
    pub notify_moderators: bool,
    pub ban_user: bool,
}

impl SensitivityLevel {
    /// Lookup table mapping severity tier to handling strategy.
    pub fn strategy(&self) -> ModerationStrategy {
        match self {
            SensitivityLevel::Safe => ModerationStrategy {
                auto_approve_eligible: true,
                needs_human_review: false,
                notify_moderators: false,
                ban_user: false,
            },
            SensitivityLevel::Low => ModerationStrategy {
                auto_approve_eligible: false,
                needs_human_review: true,
                notify_moderators: false,
                ban_user: false,
            },
            SensitivityLevel::Medium => ModerationStrategy {
                auto_approve_eligible: false,
                needs_human_review: true,
                notify_moderators: true,
                ban_user: false,
            },
            SensitivityLevel::High => ModerationStrategy {
                auto_approve_eligible: false,
                needs_human_review: true,
                notify_moderators: true,
                ban_user: false,
            },
            SensitivityLevel::Extreme => ModerationStrategy {
                auto_approve_eligible: false,
                needs_human_review: true,
                notify_moderators: true,
                ban_user: true,
            },
        }
    }

    pub fn is_safe(&self) -> bool {
        *self == SensitivityLevel::Safe
    }
}

/// Result of classifying one piece of text. Ephemeral - never persisted.
#[derive(Debug, Clone)]
pub struct SensitivityResult {
    pub level: SensitivityLevel,
    /// The literal table terms that matched (deduplicated across passes).
    pub matched_terms: BTreeSet<String>,
    /// The categories those terms belong to.
    pub categories: BTreeSet<Category>,
}

impl SensitivityResult {
    fn safe() -> Self {
        Self {
            level: SensitivityLevel::Safe,
            matched_terms: BTreeSet::new(),
            categories: BTreeSet::new(),
        }
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Fold a single character to the Latin letter it visually or phonetically
/// stands in for. Returns None for characters that carry no signal
/// (whitespace, punctuation, emoji) - those are stripped entirely.
fn fold_char(c: char) -> Option<char> {
    match c {
        'a'..='z' => Some(c),
        // Digit substitutes
        '0' => Some('o'),
        '1' => Some('l'),
        '2' => Some('z'),
        '3' => Some('e'),
        '4' => Some('a'),
        '5' => Some('s'),
        '6' => Some('g'),
        '7' => Some('t'),
        '8' => Some('b'),
        '9' => Some('g'),
        // Symbol substitutes
        '@' => Some('a'),
        '$' => Some('s'),
        '!' => Some('i'),
        '€' => Some('e'),
        '£' => Some('l'),
        '¢' => Some('c'),
        // Cyrillic homoglyphs commonly pasted to dodge filters
        'а' => Some('a'),
        'е' => Some('e'),
        'о' => Some('o'),
        'с' => Some('c'),
        'р' => Some('p'),
        'у' => Some('y'),
        'х' => Some('x'),
        'і' => Some('i'),
        'ѕ' => Some('s'),
        _ => None,
    }
}

/// Strip whitespace/punctuation and fold look-alike characters.
/// "f.r 3 e  m0ney!" becomes "freemoney".
fn normalize(lowered: &str) -> String {
    lowered.chars().filter_map(fold_char).collect()
}

/// Curated syllable substitutions covering common slang transliterations.
/// Applied to normalized text AND normalized terms, so "kasino" and "casino"
/// fold to the same string.
const PHONETIC_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("ph", "f"),
    ("ck", "k"),
    ("qu", "kw"),
    ("kn", "n"),
    ("wh", "w"),
    ("gg", "g"),
    ("c", "k"),
    ("z", "s"),
];

fn phonetic_fold(normalized: &str) -> String {
    let mut folded = normalized.to_string();
    for (from, to) in PHONETIC_SUBSTITUTIONS {
        folded = folded.replace(from, to);
    }
    folded
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// A table term with its precomputed normalized and phonetic forms.
#[derive(Debug, Clone)]
struct TermEntry {
    category: Category,
    raw: String,
    normalized: String,
    phonetic: String,
}

/// Scores free text against the keyword tables.
pub struct SensitivityClassifier {
    entries: Vec<TermEntry>,
}

impl SensitivityClassifier {
    /// Build a classifier from the given tables, precomputing the folded
    /// form of every term so each classification is just substring scans.
    pub fn new(tables: KeywordTables) -> Self {
        let mut entries = Vec::new();
        for table in &tables.categories {
            for term in &table.terms {
                let raw = term.to_lowercase();
                if raw.is_empty() {
                    continue;
                }
                let normalized = normalize(&raw);
                let phonetic = phonetic_fold(&normalized);
                entries.push(TermEntry {
                    category: table.category,
                    raw,
                    normalized,
                    phonetic,
                });
            }
        }
        Self { entries }
    }

    /// Classify a piece of text.
    ///
    /// Severity policy:
    /// - any match in the illegal or abuse categories => High
    /// - else more than 2 matched terms within one category => Medium
    /// - else any match at all => Low
    /// - no matches => Safe
    pub fn classify(&self, text: &str) -> SensitivityResult {
        if text.is_empty() {
            return SensitivityResult::safe();
        }

        let lowered = text.to_lowercase();
        let normalized = normalize(&lowered);
        let phonetic = phonetic_fold(&normalized);

        let mut matched_terms = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut per_category: HashMap<Category, usize> = HashMap::new();

        for entry in &self.entries {
            let hit = lowered.contains(&entry.raw)
                || (!entry.normalized.is_empty() && normalized.contains(&entry.normalized))
                || (!entry.phonetic.is_empty() && phonetic.contains(&entry.phonetic));

            if hit && matched_terms.insert(entry.raw.clone()) {
                categories.insert(entry.category);
                *per_category.entry(entry.category).or_insert(0) += 1;
            }
        }

        if matched_terms.is_empty() {
            return SensitivityResult::safe();
        }

        let level = if categories.contains(&Category::Illegal)
            || categories.contains(&Category::Abuse)
        {
            SensitivityLevel::High
        } else if per_category.values().any(|&count| count > 2) {
            SensitivityLevel::Medium
        } else {
            SensitivityLevel::Low
        };

        SensitivityResult {
            level,
            matched_terms,
            categories,
        }
    }
}

impl Default for SensitivityClassifier {
    fn default() -> Self {
        Self::new(KeywordTables::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
