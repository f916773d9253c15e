//! Picks the configured aircraft model a listing describes.
//!
//! Three passes run in order, each across every known model before the
//! next pass starts:
//!
//! 1. the full model name appears verbatim (longest name wins)
//! 2. models containing "excel" need the word "excel" plus another of
//!    their tokens, which separates the Citation Excel family from text
//!    that only says "excellent"
//! 3. at least 60% of the model name's significant tokens appear (highest
//!    coverage wins, ties broken by name)

use std::sync::LazyLock;

use regex::Regex;

static EXCEL_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexcel\b").expect("valid regex"));

const STOPWORDS: &[&str] = &["-", "master", "for", "sale"];

const MIN_TOKEN_COVERAGE: f64 = 0.6;

/// No configured model matches the listing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No configured aircraft model matches the document (known models: {})", .known_models.join(", "))]
pub struct IdentificationError {
    /// Every model name that was considered.
    pub known_models: Vec<String>,
}

fn significant_tokens(model: &str) -> Vec<String> {
    model
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > 2 && !STOPWORDS.contains(t))
        .map(str::to_owned)
        .collect()
}

fn token_present(text: &str, token: &str) -> bool {
    if token == "excel" {
        EXCEL_WORD.is_match(text)
    } else {
        text.contains(token)
    }
}

fn exact_name(text: &str, models: &[&str]) -> Option<String> {
    models
        .iter()
        .filter(|m| !m.trim().is_empty() && text.contains(&m.to_lowercase()))
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
        .map(|m| (*m).to_owned())
}

fn excel_family(text: &str, models: &[&str]) -> Option<String> {
    if !EXCEL_WORD.is_match(text) {
        return None;
    }
    models
        .iter()
        .find(|m| {
            let tokens = significant_tokens(m);
            tokens.iter().any(|t| t == "excel")
                && tokens
                    .iter()
                    .any(|t| t != "excel" && token_present(text, t))
        })
        .map(|m| (*m).to_owned())
}

#[allow(clippy::cast_precision_loss)]
fn token_coverage(text: &str, models: &[&str]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for model in models {
        let tokens = significant_tokens(model);
        if tokens.is_empty() {
            continue;
        }
        let present = tokens.iter().filter(|t| token_present(text, t)).count();
        let ratio = present as f64 / tokens.len() as f64;
        log::debug!("Model {model}: {present}/{} significant tokens present", tokens.len());
        if ratio >= MIN_TOKEN_COVERAGE && best.is_none_or(|(r, _)| ratio > r) {
            best = Some((ratio, *model));
        }
    }
    best.map(|(_, m)| m.to_owned())
}

/// Identifies which of `models` the lowercase `text` describes.
///
/// # Errors
///
/// Returns [`IdentificationError`] listing every known model if no pass
/// finds a match.
pub fn identify_model(text: &str, models: &[&str]) -> Result<String, IdentificationError> {
    let mut sorted: Vec<&str> = models.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let found = exact_name(text, &sorted)
        .inspect(|m| log::info!("Identified {m} by exact name"))
        .or_else(|| {
            excel_family(text, &sorted).inspect(|m| log::info!("Identified {m} by excel family"))
        })
        .or_else(|| {
            token_coverage(text, &sorted).inspect(|m| log::info!("Identified {m} by token coverage"))
        });

    found.ok_or_else(|| {
        log::warn!("No aircraft model identified among {} known models", sorted.len());
        IdentificationError {
            known_models: sorted.iter().map(|m| (*m).to_owned()).collect(),
        }
    })
}
