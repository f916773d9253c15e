//! Rule chains for the core fields.
//!
//! Every chain runs against the lowercase listing text. Numeric chains
//! carry a plausibility guard because listings are full of unrelated
//! numbers (prices, dates, tail numbers).

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

use crate::ExtractError;
use crate::rules::{Rule, RuleChain, RuleMatch, compile, group_text, parse_grouped_number};
use crate::vocabulary::ExtractionRules;

/// Plausible airframe and engine hours.
pub const HOURS_RANGE: RangeInclusive<u32> = 100..=50_000;

/// Plausible paint and interior completion years.
pub const REFURBISH_YEAR_RANGE: RangeInclusive<u32> = 1990..=2030;

/// Hour figure, with or without thousands separators.
const HOURS: &str = r"(\d{1,3}(?:[,.]\d{3})+|\d{1,6})";

/// Hour figure of at least three digits.
const LONG_HOURS: &str = r"(\d{1,3}(?:[,.]\d{3})+|\d{3,6})";

const CHARACTERS_AROUND_SEATS: usize = 200;

fn constant(pattern: &str) -> Regex {
    compile(pattern).expect("valid regex")
}

fn hours_rule(name: &'static str, pattern: &str) -> Rule<u32> {
    Rule::new(name, constant(pattern), |caps| parse_grouped_number(caps, 1))
        .validate(|h| HOURS_RANGE.contains(h))
}

fn year_rule(name: &'static str, pattern: &str, range: RangeInclusive<u32>) -> Rule<u32> {
    Rule::new(name, constant(pattern), |caps| {
        caps.get(1).and_then(|m| m.as_str().parse().ok())
    })
    .validate(move |y| range.contains(y))
}

pub static SERIAL_NUMBER: LazyLock<RuleChain<String>> = LazyLock::new(|| {
    let candidate = |caps: &regex::Captures<'_>| {
        group_text(caps, 1).map(|s| s.trim_end_matches('-').to_uppercase())
    };
    let valid = |s: &String| s.len() >= 3 && s.chars().any(|c| c.is_ascii_digit());

    RuleChain::new(vec![
        Rule::new(
            "serial number label",
            constant(r"serial\s*(?:number|no\.?|#)?\s*[:#]?\s*([a-z0-9][a-z0-9-]{1,15})"),
            candidate,
        )
        .validate(valid),
        Rule::new(
            "s/n label",
            constant(r"\bs/n\s*[:#]?\s*([a-z0-9][a-z0-9-]{1,15})"),
            candidate,
        )
        .validate(valid),
        Rule::new(
            "msn label",
            constant(r"\bmsn\s*[:#]?\s*([a-z0-9][a-z0-9-]{1,15})"),
            candidate,
        )
        .validate(valid),
        Rule::new(
            "bare serial",
            constant(r"\b(\d{3}[a-z]{0,2}-\d{3,4}|[a-z]{1,3}\d{0,3}-\d{3,4})\b"),
            candidate,
        )
        .validate(valid),
    ])
});

pub static YEAR_MODEL: LazyLock<RuleChain<u32>> = LazyLock::new(|| {
    RuleChain::new(vec![
        year_rule(
            "year and model label",
            r"year\s+(?:and|&)\s+model[:\s]*((?:19|20)\d{2})",
            1900..=2099,
        ),
        year_rule(
            "year before family",
            r"\b((?:19|20)\d{2})\s+(?:phenom|citation|lear)",
            1900..=2099,
        ),
        year_rule(
            "year on family line",
            r"\b((?:19|20)\d{2})\b.*?(?:lear|citation|phenom|model)",
            1900..=2099,
        ),
    ])
});

pub static TOTAL_HOURS: LazyLock<RuleChain<u32>> = LazyLock::new(|| {
    RuleChain::new(vec![
        hours_rule(
            "total time label",
            &format!(
                r"(?:total\s+time\s+since\s+new|total\s+time|hours\s+since\s+new|total\s+hours|ttsn)\s*[:\-]?\s*{HOURS}"
            ),
        ),
        hours_rule("snew suffix", &format!(r"{HOURS}\s+snew")),
        hours_rule(
            "airframe hours",
            &format!(r"(?s)airframe.*?{HOURS}\s*(?:total\s*)?hours?"),
        ),
    ])
});

pub static ENGINE_OVERHAUL: LazyLock<RuleChain<u32>> = LazyLock::new(|| {
    RuleChain::new(vec![
        hours_rule("tsoh label", &format!(r"tsoh\s*[:\-]?\s*{LONG_HOURS}")),
        hours_rule(
            "since overhaul label",
            &format!(r"since\s+(?:major\s+)?overhaul\s*[:\-]?\s*{LONG_HOURS}"),
        ),
        hours_rule(
            "hours since overhaul",
            &format!(r"{LONG_HOURS}\s*(?:hours\s+)?(?:smoh|tsoh|since\s+(?:major\s+)?overhaul)"),
        ),
        hours_rule(
            "engine total hours",
            &format!(r"(?s)engines?\b.*?{LONG_HOURS}\s*total\s*hours?"),
        ),
        hours_rule("ttaf suffix", &format!(r"{LONG_HOURS}\s+ttaf")),
    ])
});

pub static PAINT_YEAR: LazyLock<RuleChain<u32>> = LazyLock::new(|| {
    RuleChain::new(vec![
        year_rule("exterior then year", r"exterior.*?\b(\d{4})\b", REFURBISH_YEAR_RANGE),
        year_rule("paint then year", r"paint.*?\b(\d{4})\b", REFURBISH_YEAR_RANGE),
        year_rule("year then paint", r"\b(\d{4})\b.*?paint", REFURBISH_YEAR_RANGE),
    ])
});

pub static INTERIOR_YEAR: LazyLock<RuleChain<u32>> = LazyLock::new(|| {
    RuleChain::new(vec![
        year_rule("interior then year", r"interior.*?\b(\d{4})\b", REFURBISH_YEAR_RANGE),
        year_rule(
            "refurbishment then year",
            r"refurbish(?:ment|ed)?.*?\b(\d{4})\b",
            REFURBISH_YEAR_RANGE,
        ),
    ])
});

pub static AVIONICS_MODEL: LazyLock<RuleChain<String>> = LazyLock::new(|| {
    let atg = |caps: &regex::Captures<'_>| group_text(caps, 1).map(|n| format!("ATG-{n}"));
    RuleChain::new(vec![
        Rule::new("gogo atg", constant(r"gogo\s+atg[-\s]?(\d{4})"), atg),
        Rule::new("atg", constant(r"\batg[-\s]?(\d{4})"), atg),
        Rule::new("avance", constant(r"avance[-\s]?l(\d+)"), |caps| {
            group_text(caps, 1).map(|n| format!("AVANCE-L{n}"))
        }),
    ])
});

static ENGINE_START: LazyLock<Regex> = LazyLock::new(|| constant(r"\bengines?\b"));

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    constant(
        r"\n\s*(?:avionics|interior|exterior|airframe|apu|maintenance|inspection|equipment|features|cabin)\b",
    )
});

static LAVATORY: LazyLock<Regex> = LazyLock::new(|| {
    constant(r"lavatory|lav\b|belted\s+lav|bltd\s+lav|belted\s+toilet")
});

/// The engine section: from the first mention of "engine" to the next
/// line that starts a different section, or the end of the text.
#[must_use]
pub fn engine_section(text: &str) -> Option<&str> {
    let start = ENGINE_START.find(text)?.start();
    let rest = &text[start..];
    let end = SECTION_HEADER
        .find(&rest[1..])
        .map_or(rest.len(), |m| m.start() + 1);
    Some(&rest[..end])
}

/// Engine overhaul hours, searched in the engine section first and then
/// the whole text.
#[must_use]
pub fn engine_overhaul(text: &str) -> Option<RuleMatch<u32>> {
    if let Some(section) = engine_section(text)
        && let Some(found) = ENGINE_OVERHAUL.first_match(section)
    {
        log::debug!("Engine overhaul found inside engine section");
        return Some(found);
    }
    ENGINE_OVERHAUL.first_match(text)
}

/// Seat count rules built from the configured seat vocabulary.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidPattern`] if a pattern fails to compile.
pub fn seat_chain(rules: &ExtractionRules) -> Result<RuleChain<u32>, ExtractError> {
    let words = rules
        .seat_words
        .keys()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    let count = if words.is_empty() {
        r"\d{1,2}".to_owned()
    } else {
        format!(r"\d{{1,2}}|{words}")
    };
    let counted_seats = format!(r"\b({count})\s+(?:passenger\s+)?seats\b");
    let labelled_count = format!(r"\b(?:passengers?|seats?)\s*[:\-]?\s*({count})\b");

    let patterns = vec![
        ("word with digits passenger", r"(\w+)\s+\(\d+\)\s+passenger".to_owned()),
        ("passengers", r"(\d+)\s+passengers?".to_owned()),
        ("seating for", r"seating\s+for\s+(\w+)".to_owned()),
        (
            "dash passenger configuration",
            r"(\d+)\s*[–-]\s*passenger\s+configuration".to_owned(),
        ),
        ("counted seats", counted_seats),
        ("labelled count", labelled_count),
    ];

    let seats = rules.min_seats..=rules.max_seats;
    patterns
        .into_iter()
        .map(|(name, pattern)| {
            let vocabulary = rules.clone();
            let seats = seats.clone();
            Ok(Rule::new(name, compile(&pattern)?, move |caps| {
                caps.get(1).and_then(|m| vocabulary.seat_count(m.as_str()))
            })
            .validate(move |n| seats.contains(n)))
        })
        .collect::<Result<Vec<_>, ExtractError>>()
        .map(RuleChain::new)
}

/// Returns `true` if a lavatory is mentioned within the seat context
/// window around `[start, end)`.
#[must_use]
pub fn lavatory_near(text: &str, start: usize, end: usize) -> bool {
    let from = floor_char_boundary(text, start.saturating_sub(CHARACTERS_AROUND_SEATS));
    let to = ceil_char_boundary(text, end.saturating_add(CHARACTERS_AROUND_SEATS));
    LAVATORY.is_match(&text[from..to])
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
