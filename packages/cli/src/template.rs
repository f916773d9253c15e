//! `analyze-template`: bootstraps a model configuration from a template
//! workbook, optionally confirming every row with the operator.

use std::collections::BTreeMap;
use std::path::Path;

use broker_sheet_config::ConfigRegistry;
use broker_sheet_config::template::{TemplateAnalysis, analyze_template};
use broker_sheet_config_models::{
    AvionicsSection, CoreField, ModelConfiguration, SERIAL_ROW, UpgradeConfig,
};
use broker_sheet_workbook::Workbook;
use dialoguer::{Confirm, Input};

/// Runs the analysis and saves the configuration when `output` is given.
pub fn run(
    workbook: &Path,
    output: Option<&Path>,
    interactive: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let analysis = analyze_template(&Workbook::open(workbook)?)?;
    print_analysis(&analysis);

    let (model, configuration) = if interactive {
        review(&analysis)?
    } else {
        (analysis.aircraft_model.clone(), analysis.to_configuration(None))
    };
    configuration.validate()?;

    let Some(output) = output else {
        println!();
        let mut registry = ConfigRegistry::new();
        registry.insert(model, configuration);
        println!("{}", registry.to_json_pretty()?);
        return Ok(());
    };

    let mut registry = if output.exists() {
        let (existing, rejected) = ConfigRegistry::load(output)?;
        for entry in &rejected {
            log::warn!("Dropping rejected configuration {entry} from {}", output.display());
        }
        existing
    } else {
        ConfigRegistry::new()
    };
    if registry.insert(model.clone(), configuration).is_some() {
        log::info!("Replacing existing configuration for {model}");
    }
    registry.save(output)?;
    println!("Saved configuration for {model} to {}", output.display());
    Ok(())
}

fn print_analysis(analysis: &TemplateAnalysis) {
    println!("Model: {}", analysis.aircraft_model);
    println!("Sheet: {}", analysis.sheet_name);
    println!();
    println!("{:<22} {:>4}  LABEL", "FIELD", "ROW");
    println!("{}", "-".repeat(60));
    for (field, detected) in &analysis.fields {
        println!("{:<22} {:>4}  {}", field.to_string(), detected.row, detected.label);
    }
    for field in analysis.missing_fields() {
        println!("{:<22} {:>4}  (not found)", field.to_string(), "-");
    }

    if !analysis.upgrades.is_empty() {
        println!();
        println!("{:<22} {:>4}  LABEL", "UPGRADE", "ROW");
        println!("{}", "-".repeat(60));
        for (name, detected) in &analysis.upgrades {
            println!("{name:<22} {:>4}  {}", detected.row, detected.label);
        }
    }
}

/// Prompts for a row; an empty answer means "not mapped".
fn prompt_row(prompt: &str, current: Option<u32>) -> Result<Option<u32>, dialoguer::Error> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .default(current.map(|r| r.to_string()).unwrap_or_default())
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), String> {
            if input.trim().is_empty() {
                return Ok(());
            }
            match input.trim().parse::<u32>() {
                Ok(row) if row > SERIAL_ROW => Ok(()),
                Ok(_) => Err(format!("Row must be greater than {SERIAL_ROW}")),
                Err(_) => Err("Enter a row number".to_owned()),
            }
        })
        .interact_text()?;

    Ok(answer.trim().parse().ok())
}

/// Walks the operator through every field, upgrade, and the avionics
/// block.
fn review(
    analysis: &TemplateAnalysis,
) -> Result<(String, ModelConfiguration), Box<dyn std::error::Error>> {
    let model: String = Input::new()
        .with_prompt("Aircraft model name")
        .default(analysis.aircraft_model.clone())
        .interact_text()?;

    let proposed = analysis.to_configuration(None);

    let mut row_mappings = BTreeMap::new();
    for field in CoreField::all() {
        let prompt = format!("Row for {field} (empty to skip)");
        if let Some(row) = prompt_row(&prompt, proposed.row_for(*field))? {
            row_mappings.insert(*field, row);
        }
    }

    let mut upgrades = BTreeMap::new();
    for (name, upgrade) in &proposed.upgrades {
        let keep = Confirm::new()
            .with_prompt(format!(
                "Keep upgrade {name} (row {}, keywords {:?})?",
                upgrade.row, upgrade.keywords
            ))
            .default(true)
            .interact()?;
        if keep {
            upgrades.insert(name.clone(), upgrade.clone());
        }
    }

    while Confirm::new()
        .with_prompt("Add another upgrade?")
        .default(false)
        .interact()?
    {
        let name: String = Input::new().with_prompt("Upgrade name").interact_text()?;
        let Some(row) = prompt_row("Row", None)? else {
            continue;
        };
        let keywords: String = Input::new()
            .with_prompt("Keywords (comma separated)")
            .default(name.to_lowercase())
            .interact_text()?;
        upgrades.insert(
            name.trim().to_uppercase().replace(' ', "_"),
            UpgradeConfig {
                keywords: keywords
                    .split(',')
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
                row,
            },
        );
    }

    let mut avionics_section = None;
    if Confirm::new()
        .with_prompt("Configure an avionics section?")
        .default(false)
        .interact()?
        && let (Some(start), Some(end)) =
            (prompt_row("First avionics row", None)?, prompt_row("Last avionics row", None)?)
    {
        avionics_section = Some(AvionicsSection { start, end });
    }

    Ok((
        model,
        ModelConfiguration {
            row_mappings,
            upgrades,
            avionics_section,
        },
    ))
}
