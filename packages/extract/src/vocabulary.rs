//! Extraction vocabularies that vary between listing conventions.
//!
//! Seat words, the plausible seat range, the lavatory suffix, seat
//! configuration abbreviations, and the engine/APU program tables are
//! plain data. [`ExtractionRules::default`] carries the built-in set; a
//! JSON document can replace any part of it.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ExtractError;
use crate::rules::compile;

/// A set of alternative patterns mapped to one canonical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternValue {
    /// Case-insensitive regular expressions; any match selects `value`.
    pub patterns: Vec<String>,
    /// Canonical value written to the sheet.
    pub value: String,
}

impl PatternValue {
    fn new(patterns: &[&str], value: &str) -> Self {
        Self {
            patterns: patterns.iter().map(|p| (*p).to_owned()).collect(),
            value: value.to_owned(),
        }
    }
}

/// Data-driven extraction vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Spelled-out seat counts.
    pub seat_words: BTreeMap<String, u32>,
    /// Smallest plausible seat count.
    pub min_seats: u32,
    /// Largest plausible seat count.
    pub max_seats: u32,
    /// Appended to the seat count when a lavatory is mentioned nearby.
    pub lavatory_suffix: String,
    /// Seat configuration abbreviations; every matching entry contributes.
    pub seat_configurations: Vec<PatternValue>,
    /// Engine maintenance programs; first match wins.
    pub engine_programs: Vec<PatternValue>,
    /// APU maintenance programs; first match wins.
    pub apu_programs: Vec<PatternValue>,
    /// Tried when no APU program matched.
    pub apu_fallback: Option<PatternValue>,
    /// APU value when nothing matched.
    pub apu_none: String,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        let seat_words = [
            "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
            "eleven", "twelve",
        ]
        .iter()
        .zip(1..)
        .map(|(word, n)| ((*word).to_owned(), n))
        .collect();

        Self {
            seat_words,
            min_seats: 1,
            max_seats: 20,
            lavatory_suffix: " + BLTD LAV".to_owned(),
            seat_configurations: vec![
                PatternValue::new(&["forward.*?club.*?aft.*?club"], "DOUBLE CLB"),
                PatternValue::new(&["four.*?place club"], "4 PLC CLB"),
                PatternValue::new(&["lavatory"], "LAV"),
                PatternValue::new(&["executive"], "EXEC"),
                PatternValue::new(&[r"\bdivans?\b"], "DIVAN"),
                PatternValue::new(&[r"\b(?:forward|fwd)[\s-]+facing\b"], "FWD FACING"),
                PatternValue::new(&[r"\baft[\s-]+facing\b"], "AFT FACING"),
                PatternValue::new(
                    &[
                        "fwd.*?cabin.*?four.*?executive.*?club.*?aft.*?cabin.*?four.*?executive.*?club",
                        "four.*?executive.*?club.*?seats.*?four.*?executive.*?club.*?seats",
                    ],
                    "DOUBLE CLB",
                ),
                PatternValue::new(
                    &["belted.*?toilet", "belted.*?lav", "aft.*?lavatory.*?belted"],
                    "BLTD LAV",
                ),
            ],
            engine_programs: vec![
                PatternValue::new(&["corporate care enhanced"], "CORPORATE CARE ENHANCED"),
                PatternValue::new(&["msp gold"], "MSP GOLD"),
                PatternValue::new(&["jssi"], "JSSI"),
            ],
            apu_programs: vec![
                PatternValue::new(&["msp gold.*apu", "apu.*msp gold"], "MSP GOLD"),
                PatternValue::new(&["honeywell msp", "msp program"], "MSP"),
                PatternValue::new(&["jssi"], "JSSI"),
                PatternValue::new(&["auxiliary power unit"], "AUX ADV"),
            ],
            apu_fallback: Some(PatternValue::new(&["apu.*msp", "msp.*apu"], "MSP GOLD")),
            apu_none: "NONE".to_owned(),
        }
    }
}

impl ExtractionRules {
    /// Parses a rules document; omitted keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Rules`] if the document is not valid JSON
    /// of the expected shape.
    pub fn from_json_str(json: &str) -> Result<Self, ExtractError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a rules file.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Io`] if the file cannot be read, or
    /// [`ExtractError::Rules`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        let json = std::fs::read_to_string(path)?;
        let rules = Self::from_json_str(&json)?;
        log::info!("Loaded extraction rules from {}", path.display());
        Ok(rules)
    }

    /// Looks up a seat count token, either digits or a spelled word.
    #[must_use]
    pub fn seat_count(&self, token: &str) -> Option<u32> {
        let token = token.trim().to_lowercase();
        token
            .parse()
            .ok()
            .or_else(|| self.seat_words.get(&token).copied())
    }
}

/// A compiled [`PatternValue`] table.
#[derive(Debug, Clone)]
pub struct PatternTable {
    entries: Vec<(Vec<Regex>, String)>,
}

impl PatternTable {
    /// Compiles every pattern of `entries`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidPattern`] for the first pattern that
    /// does not compile.
    pub fn compile(entries: &[PatternValue]) -> Result<Self, ExtractError> {
        let entries = entries
            .iter()
            .map(|entry| {
                let patterns = entry
                    .patterns
                    .iter()
                    .map(|p| compile(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((patterns, entry.value.clone()))
            })
            .collect::<Result<Vec<_>, ExtractError>>()?;
        Ok(Self { entries })
    }

    /// Value of the first entry with a matching pattern.
    #[must_use]
    pub fn first(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(patterns, _)| patterns.iter().any(|p| p.is_match(text)))
            .map(|(_, value)| value.as_str())
    }

    /// Values of every entry with a matching pattern, deduplicated in
    /// table order.
    #[must_use]
    pub fn all(&self, text: &str) -> Vec<&str> {
        let mut found: Vec<&str> = Vec::new();
        for (patterns, value) in &self.entries {
            if patterns.iter().any(|p| p.is_match(text)) && !found.contains(&value.as_str()) {
                found.push(value);
            }
        }
        found
    }
}
