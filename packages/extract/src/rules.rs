//! Ordered "first accepting rule wins" rule chains.
//!
//! A [`Rule`] pairs a pattern with a transformer (captures → candidate)
//! and a validator (candidate → accept?). A [`RuleChain`] evaluates its
//! rules in order and stops at the first accepted candidate. Each rule only
//! looks at the first match of its pattern; a rejected candidate moves the
//! chain on to the next rule.

use regex::{Captures, Regex, RegexBuilder};

use crate::ExtractError;

type Transform<T> = Box<dyn Fn(&Captures<'_>) -> Option<T> + Send + Sync>;
type Validate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Compiles `pattern` case-insensitively.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidPattern`] if `pattern` is not a valid
/// regular expression.
pub fn compile(pattern: &str) -> Result<Regex, ExtractError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ExtractError::InvalidPattern {
            pattern: pattern.to_owned(),
            message: e.to_string(),
        })
}

/// One pattern with its transformer and validator.
pub struct Rule<T> {
    name: &'static str,
    pattern: Regex,
    transform: Transform<T>,
    validate: Validate<T>,
}

impl<T> std::fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

impl<T> Rule<T> {
    /// Creates a rule that accepts every candidate its transformer yields.
    pub fn new(
        name: &'static str,
        pattern: Regex,
        transform: impl Fn(&Captures<'_>) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            pattern,
            transform: Box::new(transform),
            validate: Box::new(|_| true),
        }
    }

    /// Replaces the validator.
    #[must_use]
    pub fn validate(mut self, validate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.validate = Box::new(validate);
        self
    }

    /// Rule name used in logs and audit notes.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// An accepted candidate and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<T> {
    /// The accepted value.
    pub value: T,
    /// Name of the rule that produced it.
    pub rule: &'static str,
    /// Byte offset of the whole pattern match.
    pub start: usize,
    /// Byte offset just past the whole pattern match.
    pub end: usize,
}

/// An ordered list of rules for one field.
#[derive(Debug)]
pub struct RuleChain<T> {
    rules: Vec<Rule<T>>,
}

impl<T: std::fmt::Debug> RuleChain<T> {
    /// Creates a chain from rules in priority order.
    #[must_use]
    pub const fn new(rules: Vec<Rule<T>>) -> Self {
        Self { rules }
    }

    /// Evaluates the rules in order and returns the first accepted
    /// candidate.
    pub fn first_match(&self, text: &str) -> Option<RuleMatch<T>> {
        for rule in &self.rules {
            let Some(caps) = rule.pattern.captures(text) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let Some(value) = (rule.transform)(&caps) else {
                log::debug!("Rule {}: match {:?} yielded no candidate", rule.name, whole.as_str());
                continue;
            };
            if !(rule.validate)(&value) {
                log::debug!("Rule {}: rejected candidate {value:?}", rule.name);
                continue;
            }
            log::debug!("Rule {}: accepted {value:?}", rule.name);
            return Some(RuleMatch {
                value,
                rule: rule.name,
                start: whole.start(),
                end: whole.end(),
            });
        }
        None
    }

    /// Number of rules in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` for a chain without rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Parses a capture group as an integer after stripping `,` and `.`
/// thousands separators.
#[must_use]
pub fn parse_grouped_number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    let raw = caps.get(group)?.as_str();
    let digits: String = raw.chars().filter(|c| !matches!(c, ',' | '.')).collect();
    digits.parse().ok()
}

/// Returns capture group `group` as an owned string.
#[must_use]
pub fn group_text(caps: &Captures<'_>, group: usize) -> Option<String> {
    caps.get(group).map(|m| m.as_str().to_owned())
}
