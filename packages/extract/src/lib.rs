#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Model identification and field extraction for broker listings.
//!
//! Both stages operate on the lowercase text produced by the PDF crate:
//!
//! - [`identify_model`] picks the configured model a listing describes
//! - [`FieldExtractor::extract`] runs the per-field rule chains and the
//!   upgrade detectors, producing an [`ExtractedRecord`]
//!
//! Extraction never fails for a missing field. Fields without an accepted
//! candidate are simply absent from the record and noted as such.

pub mod fields;
pub mod identify;
pub mod rules;
pub mod upgrades;
pub mod vocabulary;

use broker_sheet_config_models::{CoreField, ModelConfiguration};
use broker_sheet_extract_models::{ExtractedRecord, NoteKind, UpgradeFlag, upgrade_key};

pub use identify::{IdentificationError, identify_model};
pub use vocabulary::{ExtractionRules, PatternTable, PatternValue};

use crate::rules::{RuleChain, RuleMatch};

/// Errors raised while preparing extraction rules.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A pattern is not a valid regular expression.
    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it failed to compile.
        message: String,
    },

    /// A rules document could not be parsed.
    #[error("Rules error: {0}")]
    Rules(#[from] serde_json::Error),

    /// A rules file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compiled extraction vocabulary plus the fixed rule chains.
#[derive(Debug)]
pub struct FieldExtractor {
    seats: RuleChain<u32>,
    lavatory_suffix: String,
    seat_configurations: PatternTable,
    engine_programs: PatternTable,
    apu_programs: PatternTable,
    apu_fallback: PatternTable,
    apu_none: String,
}

impl FieldExtractor {
    /// Compiles `rules`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidPattern`] if any vocabulary pattern
    /// does not compile.
    pub fn new(rules: &ExtractionRules) -> Result<Self, ExtractError> {
        Ok(Self {
            seats: fields::seat_chain(rules)?,
            lavatory_suffix: rules.lavatory_suffix.clone(),
            seat_configurations: PatternTable::compile(&rules.seat_configurations)?,
            engine_programs: PatternTable::compile(&rules.engine_programs)?,
            apu_programs: PatternTable::compile(&rules.apu_programs)?,
            apu_fallback: PatternTable::compile(rules.apu_fallback.as_slice())?,
            apu_none: rules.apu_none.clone(),
        })
    }

    /// Extracts every core field and configured upgrade from `text`.
    #[must_use]
    pub fn extract(&self, text: &str, config: &ModelConfiguration) -> ExtractedRecord {
        let mut record = ExtractedRecord::default();

        record.serial_number = found(
            &mut record,
            "serial_number",
            fields::SERIAL_NUMBER.first_match(text),
        );
        record.year_model = found(
            &mut record,
            CoreField::YearModel.as_ref(),
            fields::YEAR_MODEL.first_match(text),
        );
        record.total_hours = found(
            &mut record,
            CoreField::TotalHours.as_ref(),
            fields::TOTAL_HOURS.first_match(text),
        );
        engine_overhaul_or_total(text, &mut record);
        self.extract_programs(text, config, &mut record);
        self.extract_seats(text, &mut record);
        record.paint_exterior_year = found(
            &mut record,
            CoreField::PaintExteriorYear.as_ref(),
            fields::PAINT_YEAR.first_match(text),
        );
        record.interior_year = found(
            &mut record,
            CoreField::InteriorYear.as_ref(),
            fields::INTERIOR_YEAR.first_match(text),
        );

        for (name, upgrade) in &config.upgrades {
            let detection = upgrades::detect(name, upgrade, text);
            let key = upgrade_key(name);
            match &detection.evidence {
                Some(evidence) => {
                    record.note(key, NoteKind::Found, format!("matched {evidence:?}"));
                }
                None => record.note(key, NoteKind::NotFound, "no keyword matched, flagged N"),
            }
            record.upgrades.insert(name.clone(), detection.flag);
        }

        log::info!(
            "Extracted {} core fields and {} upgrades ({} flagged Y)",
            record.present_fields().len(),
            record.upgrades.len(),
            record
                .upgrades
                .values()
                .filter(|f| **f == UpgradeFlag::Yes)
                .count()
        );

        record
    }

    fn extract_programs(
        &self,
        text: &str,
        config: &ModelConfiguration,
        record: &mut ExtractedRecord,
    ) {
        let field = CoreField::EngineProgram.to_string();
        match self.engine_programs.first(text) {
            Some(program) => {
                record.note(&field, NoteKind::Found, program);
                record.engine_program = Some(program.to_owned());
            }
            None => record.note(&field, NoteKind::NotFound, "no program keyword"),
        }

        if config.maps(CoreField::ApuProgram) {
            let field = CoreField::ApuProgram.to_string();
            if let Some(program) = self.apu_programs.first(text) {
                record.note(&field, NoteKind::Found, program);
                record.apu_program = Some(program.to_owned());
            } else if let Some(program) = self.apu_fallback.first(text) {
                record.note(&field, NoteKind::Found, format!("{program} (fallback)"));
                record.apu_program = Some(program.to_owned());
            } else {
                record.note(&field, NoteKind::Defaulted, self.apu_none.as_str());
                record.apu_program = Some(self.apu_none.clone());
            }
        }

        if config.maps(CoreField::AvionicsSection) {
            let field = CoreField::AvionicsSection.to_string();
            if let Some(found) = fields::AVIONICS_MODEL.first_match(text) {
                record.note(&field, NoteKind::Found, found.value.as_str());
                record.avionics_section = Some(found.value);
            } else {
                record.note(&field, NoteKind::Defaulted, "NONE");
                record.avionics_section = Some("NONE".to_owned());
            }
        }
    }

    fn extract_seats(&self, text: &str, record: &mut ExtractedRecord) {
        let field = CoreField::NumberOfSeats.to_string();
        if let Some(found) = self.seats.first_match(text) {
            let suffix = if fields::lavatory_near(text, found.start, found.end) {
                self.lavatory_suffix.as_str()
            } else {
                ""
            };
            let seats = format!("{} SEATS{suffix}", found.value);
            record.note(&field, NoteKind::Found, format!("{seats} (rule: {})", found.rule));
            record.number_of_seats = Some(seats);
        } else {
            record.note(&field, NoteKind::NotFound, "no seat count");
        }

        let field = CoreField::SeatConfiguration.to_string();
        let parts = self.seat_configurations.all(text);
        if parts.is_empty() {
            record.note(&field, NoteKind::NotFound, "no configuration keywords");
        } else {
            let configuration = parts.join(",");
            record.note(&field, NoteKind::Found, configuration.as_str());
            record.seat_configuration = Some(configuration);
        }
    }
}

fn engine_overhaul_or_total(text: &str, record: &mut ExtractedRecord) {
    let field = CoreField::EngineOverhaul.to_string();
    if let Some(found) = fields::engine_overhaul(text) {
        record.note(&field, NoteKind::Found, format!("{} (rule: {})", found.value, found.rule));
        record.engine_overhaul = Some(found.value);
    } else if let Some(total) = record.total_hours {
        log::debug!("Engine overhaul not found, using total hours {total}");
        record.note(&field, NoteKind::Defaulted, format!("{total} (total hours)"));
        record.engine_overhaul = Some(total);
    } else {
        record.note(&field, NoteKind::NotFound, "no rule matched and no total hours");
    }
}

fn found<T: std::fmt::Display>(
    record: &mut ExtractedRecord,
    field: &str,
    candidate: Option<RuleMatch<T>>,
) -> Option<T> {
    match candidate {
        Some(m) => {
            record.note(field, NoteKind::Found, format!("{} (rule: {})", m.value, m.rule));
            Some(m.value)
        }
        None => {
            record.note(field, NoteKind::NotFound, "no rule matched");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use broker_sheet_config_models::UpgradeConfig;
    use broker_sheet_extract_models::UpgradeFlag;

    use super::*;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(&ExtractionRules::default()).unwrap()
    }

    fn config(fields: &[(CoreField, u32)]) -> ModelConfiguration {
        ModelConfiguration {
            row_mappings: fields.iter().copied().collect(),
            upgrades: BTreeMap::new(),
            avionics_section: None,
        }
    }

    #[test]
    fn extracts_year_and_total_hours() {
        let record = extractor().extract(
            "2015 citation excel total time since new: 1,234 hours",
            &config(&[(CoreField::YearModel, 3), (CoreField::TotalHours, 4)]),
        );
        assert_eq!(record.year_model, Some(2015));
        assert_eq!(record.total_hours, Some(1234));
    }

    #[test]
    fn engine_overhaul_defaults_to_total_hours() {
        let record = extractor().extract(
            "2012 phenom 300\ntotal time: 3,400\nengines\npw535e on esp",
            &config(&[(CoreField::TotalHours, 4), (CoreField::EngineOverhaul, 5)]),
        );
        assert_eq!(record.total_hours, Some(3400));
        assert_eq!(record.engine_overhaul, Some(3400));
        assert!(record.unresolved_notes().any(|n| {
            n.field == "engine_overhaul" && n.kind == NoteKind::Defaulted
        }));
    }

    #[test]
    fn apu_is_none_when_mapped_and_unmatched() {
        let text = "2015 citation excel";
        let record = extractor().extract(text, &config(&[(CoreField::ApuProgram, 7)]));
        assert_eq!(record.apu_program.as_deref(), Some("NONE"));

        let record = extractor().extract(text, &config(&[]));
        assert_eq!(record.apu_program, None);
    }

    #[test]
    fn apu_program_table_and_fallback() {
        let mapped = config(&[(CoreField::ApuProgram, 7)]);
        let record = extractor().extract("apu enrolled on msp gold", &mapped);
        assert_eq!(record.apu_program.as_deref(), Some("MSP GOLD"));
        let record = extractor().extract("apu covered by msp", &mapped);
        assert_eq!(record.apu_program.as_deref(), Some("MSP GOLD"));
        let record = extractor().extract("apu on jssi", &mapped);
        assert_eq!(record.apu_program.as_deref(), Some("JSSI"));
    }

    #[test]
    fn avionics_model_is_always_populated_when_mapped() {
        let mapped = config(&[(CoreField::AvionicsSection, 30)]);
        let record = extractor().extract("gogo atg-5000 installed", &mapped);
        assert_eq!(record.avionics_section.as_deref(), Some("ATG-5000"));
        let record = extractor().extract("garmin g1000", &mapped);
        assert_eq!(record.avionics_section.as_deref(), Some("NONE"));
    }

    #[test]
    fn seats_with_lavatory_and_configuration() {
        let record = extractor().extract(
            "eight (8) passenger cabin with forward club and aft club seating, belted lavatory",
            &config(&[]),
        );
        assert_eq!(record.number_of_seats.as_deref(), Some("8 SEATS + BLTD LAV"));
        assert_eq!(record.seat_configuration.as_deref(), Some("DOUBLE CLB,LAV,BLTD LAV"));
    }

    #[test]
    fn labelled_seat_count_with_divan() {
        let record = extractor().extract(
            "interior\npassengers: 7\nthree-place divan, two aft facing seats",
            &config(&[]),
        );
        assert_eq!(record.number_of_seats.as_deref(), Some("7 SEATS"));
        assert_eq!(record.seat_configuration.as_deref(), Some("DIVAN,AFT FACING"));
    }

    #[test]
    fn engine_program_first_table_entry_wins() {
        let record = extractor().extract("engines on msp gold and jssi", &config(&[]));
        assert_eq!(record.engine_program.as_deref(), Some("MSP GOLD"));
    }

    #[test]
    fn upgrades_get_exactly_one_flag_each() {
        let mut model = config(&[]);
        model.upgrades.insert(
            "WIFI".to_owned(),
            UpgradeConfig {
                keywords: vec!["wifi".to_owned()],
                row: 40,
            },
        );
        model.upgrades.insert(
            "PREBUY_INSPECTION".to_owned(),
            UpgradeConfig {
                keywords: vec!["inspection".to_owned()],
                row: 50,
            },
        );

        let record = extractor().extract("wifi installed. subject to inspection.", &model);
        assert_eq!(record.upgrade("WIFI"), Some(UpgradeFlag::Yes));
        assert_eq!(record.upgrade("PREBUY_INSPECTION"), Some(UpgradeFlag::No));
        assert_eq!(record.upgrades.len(), 2);
    }

    #[test]
    fn missing_fields_are_absent_and_noted() {
        let record = extractor().extract("nothing useful here", &config(&[]));
        assert_eq!(record.year_model, None);
        assert_eq!(record.total_hours, None);
        assert_eq!(record.engine_overhaul, None);
        assert!(record.unresolved_notes().any(|n| n.field == "total_hours"));
    }

    #[test]
    fn custom_rules_change_vocabulary() {
        let rules = ExtractionRules::from_json_str(r#"{"lavatory_suffix": " + LAV"}"#).unwrap();
        let record = FieldExtractor::new(&rules)
            .unwrap()
            .extract("9 passengers, belted lav", &config(&[]));
        assert_eq!(record.number_of_seats.as_deref(), Some("9 SEATS + LAV"));
    }
}
