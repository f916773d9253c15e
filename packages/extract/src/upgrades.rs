//! Y/N upgrade detection.
//!
//! Most upgrades are flagged when any of their configured keywords occurs
//! in the text. Prebuy and inspection upgrades are stricter: listings are
//! full of boilerplate like "subject to inspection", so only specific
//! phrasings count for them.

use std::sync::LazyLock;

use broker_sheet_config_models::UpgradeConfig;
use broker_sheet_extract_models::UpgradeFlag;
use regex::Regex;

use crate::rules::compile;

/// How an upgrade is detected, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeKind {
    /// Prebuy inspection; specific phrasings only.
    Prebuy,
    /// Other inspections; specific inspection types only.
    Inspection,
    /// Keyword match with name-based fallbacks.
    Keyword,
}

impl UpgradeKind {
    /// Classifies an upgrade by name.
    #[must_use]
    pub fn of(name: &str) -> Self {
        let upper = name.to_uppercase();
        if upper.contains("PREBUY") || upper.contains("PRE-BUY") || upper.contains("PRE_BUY") {
            Self::Prebuy
        } else if upper.contains("INSPECTION") {
            Self::Inspection
        } else {
            Self::Keyword
        }
    }
}

fn constants(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| compile(p).expect("valid regex"))
        .collect()
}

static PREBUY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    constants(&[
        r"prebuy\s+inspection",
        r"pre-buy\s+inspection",
        r"pre\s*buy\s+inspection",
        r"prebuy\s+completed",
        r"fresh\s+prebuy",
        r"recent\s+prebuy",
    ])
});

static INSPECTION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    constants(&[
        r"annual\s+inspection",
        r"100\s*hour\s+inspection",
        r"maintenance\s+inspection",
        r"airworthiness\s+inspection",
        r"conformity\s+inspection",
        r"records\s+inspection",
        r"aircraft\s+inspection",
    ])
});

static AHRS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"attitude.*heading.*reference").expect("valid regex"));

static FDR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"flight.*data.*recorder").expect("valid regex"));

static TCAS_7_1: LazyLock<Regex> =
    LazyLock::new(|| compile(r"tcas.*7\.1|7\.1.*upgrade|change.*7\.1").expect("valid regex"));

/// What flagged an upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// The resulting flag.
    pub flag: UpgradeFlag,
    /// The pattern or keyword that matched, if any.
    pub evidence: Option<String>,
}

impl Detection {
    const fn no() -> Self {
        Self {
            flag: UpgradeFlag::No,
            evidence: None,
        }
    }

    fn yes(evidence: &str) -> Self {
        Self {
            flag: UpgradeFlag::Yes,
            evidence: Some(evidence.to_owned()),
        }
    }
}

fn first_hit(patterns: &[Regex], text: &str) -> Option<Detection> {
    patterns
        .iter()
        .find(|p| p.is_match(text))
        .map(|p| Detection::yes(p.as_str()))
}

/// Tests one keyword, as a case-insensitive regex when it compiles and as
/// a literal substring otherwise.
#[must_use]
pub fn keyword_matches(keyword: &str, text: &str) -> bool {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return false;
    }
    compile(keyword).map_or_else(
        |_| text.contains(&keyword.to_lowercase()),
        |re| re.is_match(text),
    )
}

/// Detects the upgrade `name` in `text`.
#[must_use]
pub fn detect(name: &str, upgrade: &UpgradeConfig, text: &str) -> Detection {
    let detection = match UpgradeKind::of(name) {
        UpgradeKind::Prebuy => first_hit(&PREBUY, text),
        UpgradeKind::Inspection => first_hit(&INSPECTION, text),
        UpgradeKind::Keyword => upgrade
            .keywords
            .iter()
            .find(|k| keyword_matches(k, text))
            .map(|k| Detection::yes(k))
            .or_else(|| fallback(name, text)),
    };

    let detection = detection.unwrap_or_else(Detection::no);
    log::debug!(
        "Upgrade {name}: {} ({})",
        detection.flag,
        detection.evidence.as_deref().unwrap_or("no match")
    );
    detection
}

fn fallback(name: &str, text: &str) -> Option<Detection> {
    let upper = name.to_uppercase();
    let pattern: &Regex = if upper.contains("AHRS") {
        &*AHRS
    } else if upper.contains("FDR") {
        &*FDR
    } else if upper.contains("7.1") {
        &*TCAS_7_1
    } else {
        return None;
    };
    pattern.is_match(text).then(|| Detection::yes(pattern.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade(keywords: &[&str]) -> UpgradeConfig {
        UpgradeConfig {
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
            row: 40,
        }
    }

    #[test]
    fn classifies_by_name() {
        assert_eq!(UpgradeKind::of("PREBUY_INSPECTION"), UpgradeKind::Prebuy);
        assert_eq!(UpgradeKind::of("Pre-Buy"), UpgradeKind::Prebuy);
        assert_eq!(UpgradeKind::of("ANNUAL_INSPECTION"), UpgradeKind::Inspection);
        assert_eq!(UpgradeKind::of("WIFI"), UpgradeKind::Keyword);
    }

    #[test]
    fn keyword_upgrade_matches_any_keyword() {
        let wifi = upgrade(&["wifi", "wi-fi"]);
        assert_eq!(detect("WIFI", &wifi, "cabin wi-fi installed").flag, UpgradeFlag::Yes);
        assert_eq!(detect("WIFI", &wifi, "no connectivity").flag, UpgradeFlag::No);
    }

    #[test]
    fn prebuy_ignores_bare_inspection_boilerplate() {
        let prebuy = upgrade(&["inspection"]);
        let boilerplate = "aircraft subject to inspection and verification by buyer";
        assert_eq!(detect("PREBUY_INSPECTION", &prebuy, boilerplate).flag, UpgradeFlag::No);
        assert_eq!(
            detect("PREBUY_INSPECTION", &prebuy, "fresh prebuy by textron").flag,
            UpgradeFlag::Yes
        );
    }

    #[test]
    fn inspection_requires_specific_phrasing() {
        let inspection = upgrade(&["inspection"]);
        assert_eq!(
            detect("INSPECTION", &inspection, "subject to inspection").flag,
            UpgradeFlag::No
        );
        assert_eq!(
            detect("INSPECTION", &inspection, "fresh annual inspection").flag,
            UpgradeFlag::Yes
        );
    }

    #[test]
    fn name_based_fallbacks() {
        let none = upgrade(&["ahrs"]);
        assert_eq!(
            detect("AHRS", &none, "dual attitude and heading reference systems").flag,
            UpgradeFlag::Yes
        );
        assert_eq!(
            detect("FDR", &upgrade(&["fdr"]), "flight data recorder installed").flag,
            UpgradeFlag::Yes
        );
        assert_eq!(
            detect("TCAS_7.1", &upgrade(&["tcas ii 7.1"]), "change 7.1 complied").flag,
            UpgradeFlag::Yes
        );
    }

    #[test]
    fn invalid_keyword_regex_matches_literally() {
        assert!(keyword_matches("g1000 (nxi", "garmin g1000 (nxi upgrade"));
        assert!(!keyword_matches("g1000 (nxi", "garmin g3000"));
    }
}
