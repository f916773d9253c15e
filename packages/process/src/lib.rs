#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end processing of broker listing PDFs.
//!
//! A [`Pipeline`] ties the stages together for one configuration
//! registry:
//!
//! 1. extract lowercase text from the PDF
//! 2. identify the aircraft model (or take the caller's override)
//! 3. extract the model's configured fields and upgrades
//! 4. place the serial and write the record into the workbook
//!
//! Several PDFs aimed at one workbook are chained with
//! [`Pipeline::process_batch`]: the output of each document is the input
//! of the next, and a failing document is reported without stopping the
//! batch.

pub mod progress;

use broker_sheet_config::ConfigRegistry;
use broker_sheet_config_models::ModelConfiguration;
use broker_sheet_extract::{FieldExtractor, IdentificationError, identify_model};
use broker_sheet_extract_models::ExtractedRecord;
use broker_sheet_pdf::PdfError;
use broker_sheet_update::{
    BrokerColumnInfo, ProtectedRowViolation, UpdateError, UpdatePlan, UpdateRequest,
    locate_in_workbook, update_workbook,
};
use broker_sheet_workbook::{Workbook, WorkbookError};

use crate::progress::ProgressCallback;

/// Errors raised while processing a listing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The PDF yielded no usable text.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// No configured model matches the listing.
    #[error("Identification error: {0}")]
    Identification(#[from] IdentificationError),

    /// The requested model has no configuration.
    #[error("No configuration for aircraft model: {0}")]
    UnknownModel(String),

    /// Neither the caller nor the listing supplied a serial number.
    #[error("No serial number given and none found in the document")]
    MissingSerial,

    /// The workbook could not be read.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// The workbook could not be updated.
    #[error("Update error: {0}")]
    Update(#[from] UpdateError),
}

/// Caller-supplied details of one listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingOptions<'a> {
    /// Broker name for newly inserted columns.
    pub broker: &'a str,
    /// Serial number; overrides the one found in the document.
    pub serial: Option<&'a str>,
    /// Sheet receiving new columns.
    pub sheet: Option<&'a str>,
    /// Aircraft model; skips identification.
    pub model: Option<&'a str>,
}

/// A listing's identified model and extracted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Configured model name the listing was matched to.
    pub model: String,
    /// Values extracted with that model's configuration.
    pub record: ExtractedRecord,
}

/// What happened to one listing.
#[derive(Debug, Clone)]
pub struct ListingSummary {
    /// Configured model name.
    pub model: String,
    /// Serial number used to place the column.
    pub serial: String,
    /// Extracted values.
    pub record: ExtractedRecord,
    /// Sheet, column, and whether the column was updated or inserted.
    pub placement: BrokerColumnInfo,
    /// `"<field> - Row <n>: <value>"` for every cell written.
    pub updates: Vec<String>,
    /// Fields whose configured row was the serial row and were skipped.
    pub violations: Vec<ProtectedRowViolation>,
}

/// A processed listing and the workbook it produced.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// What was written and where.
    pub summary: ListingSummary,
    /// The updated workbook.
    pub updated: Vec<u8>,
    /// Byte-identical copy of the input workbook.
    pub backup: Vec<u8>,
}

/// A named PDF.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name, usually the file name.
    pub name: String,
    /// Raw PDF bytes.
    pub bytes: Vec<u8>,
}

/// Outcome of one document in a batch.
#[derive(Debug)]
pub struct DocumentReport {
    /// The document's name.
    pub name: String,
    /// Summary on success; the stage that failed otherwise.
    pub result: Result<ListingSummary, ProcessError>,
}

/// Result of a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Workbook after the last successful document.
    pub updated: Vec<u8>,
    /// The batch's input workbook.
    pub backup: Vec<u8>,
    /// One report per input document, in input order.
    pub documents: Vec<DocumentReport>,
}

impl BatchOutcome {
    /// Number of documents that were written.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|d| d.result.is_ok()).count()
    }
}

/// Processes listings against one configuration registry.
#[derive(Debug)]
pub struct Pipeline<'a> {
    registry: &'a ConfigRegistry,
    extractor: FieldExtractor,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub const fn new(registry: &'a ConfigRegistry, extractor: FieldExtractor) -> Self {
        Self {
            registry,
            extractor,
        }
    }

    /// Returns the configuration of `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::UnknownModel`] if the registry has none.
    pub fn config(&self, model: &str) -> Result<&'a ModelConfiguration, ProcessError> {
        self.registry
            .get(model)
            .ok_or_else(|| ProcessError::UnknownModel(model.to_owned()))
    }

    /// Identifies the model of the lowercase `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Identification`] if no model matches.
    pub fn identify(&self, text: &str) -> Result<String, ProcessError> {
        Ok(identify_model(text, &self.registry.model_names())?)
    }

    /// Identifies the model (unless `model` is given) and extracts its
    /// fields from the lowercase `text`.
    ///
    /// # Errors
    ///
    /// * [`ProcessError::Identification`] if no model matches
    /// * [`ProcessError::UnknownModel`] if `model` is not configured
    pub fn analyze(&self, text: &str, model: Option<&str>) -> Result<Analysis, ProcessError> {
        let model = match model {
            Some(model) => model.to_owned(),
            None => self.identify(text)?,
        };
        let config = self.config(&model)?;
        let record = self.extractor.extract(text, config);

        for note in record.unresolved_notes() {
            log::info!("{model}: {note}");
        }

        Ok(Analysis { model, record })
    }

    /// Analyzes the lowercase `text` and writes it into the xlsx
    /// `workbook`.
    ///
    /// # Errors
    ///
    /// Returns any analysis error, [`ProcessError::MissingSerial`] if no
    /// serial is available, or [`ProcessError::Update`] if the workbook
    /// cannot be updated. On error no workbook bytes are produced.
    pub fn update(
        &self,
        text: &str,
        workbook: &[u8],
        options: &ListingOptions<'_>,
    ) -> Result<ProcessedDocument, ProcessError> {
        let Analysis { model, record } = self.analyze(text, options.model)?;
        let serial = resolve_serial(options.serial, &record)?;
        let config = self.config(&model)?;

        let outcome = update_workbook(
            workbook,
            &UpdateRequest {
                serial: &serial,
                broker: options.broker,
                sheet: options.sheet,
                record: &record,
                config,
            },
        )?;

        Ok(ProcessedDocument {
            summary: ListingSummary {
                model,
                serial,
                record,
                placement: outcome.placement,
                updates: outcome.updates,
                violations: outcome.violations,
            },
            updated: outcome.updated,
            backup: outcome.backup,
        })
    }

    /// Plans the writes for the lowercase `text` without changing the
    /// workbook.
    ///
    /// # Errors
    ///
    /// Returns any analysis error, [`ProcessError::MissingSerial`], or
    /// [`ProcessError::Workbook`] if the workbook cannot be read.
    pub fn plan(
        &self,
        text: &str,
        workbook: &[u8],
        options: &ListingOptions<'_>,
    ) -> Result<UpdatePlan, ProcessError> {
        let Analysis { model, record } = self.analyze(text, options.model)?;
        let serial = resolve_serial(options.serial, &record)?;
        let config = self.config(&model)?;

        let workbook = Workbook::from_bytes(workbook)?;
        let placement = locate_in_workbook(&workbook, &serial, options.sheet)?;

        Ok(UpdatePlan::build(
            &record,
            config,
            &placement,
            &model,
            options.broker,
            &serial,
        ))
    }

    /// Extracts the PDF's text and writes it into `workbook`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Pdf`] if the PDF has no text, otherwise the
    /// errors of [`Pipeline::update`].
    pub fn process_document(
        &self,
        pdf: &[u8],
        workbook: &[u8],
        options: &ListingOptions<'_>,
    ) -> Result<ProcessedDocument, ProcessError> {
        let text = broker_sheet_pdf::extract_text(pdf)?;
        self.update(&text, workbook, options)
    }

    /// Processes `documents` in order against one workbook.
    ///
    /// An explicit serial in `options` applies to every document.
    pub fn process_batch(
        &self,
        documents: &[Document],
        workbook: &[u8],
        options: &ListingOptions<'_>,
        progress: &dyn ProgressCallback,
    ) -> BatchOutcome {
        self.run_batch(
            documents,
            |document| Ok(broker_sheet_pdf::extract_text(&document.bytes)?),
            workbook,
            options,
            progress,
        )
    }

    fn run_batch(
        &self,
        documents: &[Document],
        text_of: impl Fn(&Document) -> Result<String, ProcessError>,
        workbook: &[u8],
        options: &ListingOptions<'_>,
        progress: &dyn ProgressCallback,
    ) -> BatchOutcome {
        progress.set_total(documents.len() as u64);

        let backup = workbook.to_vec();
        let mut current = workbook.to_vec();
        let mut reports = Vec::with_capacity(documents.len());

        for document in documents {
            progress.set_message(format!("Processing {}", document.name));

            let result = text_of(document).and_then(|text| self.update(&text, &current, options));
            let result = match result {
                Ok(processed) => {
                    log::info!(
                        "{}: {} updates for {} ({})",
                        document.name,
                        processed.summary.updates.len(),
                        processed.summary.model,
                        processed.summary.serial
                    );
                    current = processed.updated;
                    Ok(processed.summary)
                }
                Err(e) => {
                    log::warn!("{}: {e}", document.name);
                    Err(e)
                }
            };

            reports.push(DocumentReport {
                name: document.name.clone(),
                result,
            });
            progress.inc(1);
        }

        let outcome = BatchOutcome {
            updated: current,
            backup,
            documents: reports,
        };
        progress.finish(format!(
            "Processed {}/{} documents",
            outcome.succeeded(),
            documents.len()
        ));
        outcome
    }
}

fn resolve_serial(explicit: Option<&str>, record: &ExtractedRecord) -> Result<String, ProcessError> {
    explicit
        .or(record.serial_number.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or(ProcessError::MissingSerial)
}
