use std::io::{self, Write};

use chrono::Utc;
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::converter::ConversionResults;
use crate::model::{ArrayDesign, ExpressionExperiment};

#[derive(Debug, Serialize)]
pub struct ConversionSummary {
    pub converted_at: String,
    pub input: String,
    pub output: Option<String>,
    pub experiments: Vec<ExperimentSummary>,
    pub array_designs: Vec<ArrayDesignSummary>,
}

#[derive(Debug, Serialize)]
pub struct ExperimentSummary {
    pub short_name: String,
    pub name: String,
    pub bio_materials: usize,
    pub bio_assays: usize,
    pub factors: usize,
    pub quantitation_types: usize,
    pub raw_vectors: usize,
}

#[derive(Debug, Serialize)]
pub struct ArrayDesignSummary {
    pub short_name: String,
    pub technology: String,
    pub primary_taxon: Option<String>,
    pub composite_sequences: usize,
}

impl ConversionSummary {
    pub fn new(input: impl Into<String>, output: Option<String>, results: &ConversionResults) -> Self {
        Self {
            converted_at: Utc::now().to_rfc3339(),
            input: input.into(),
            output,
            experiments: results.experiments.iter().map(ExperimentSummary::from).collect(),
            array_designs: results
                .array_designs
                .iter()
                .map(ArrayDesignSummary::from)
                .collect(),
        }
    }
}

impl From<&ExpressionExperiment> for ExperimentSummary {
    fn from(experiment: &ExpressionExperiment) -> Self {
        Self {
            short_name: experiment.short_name.clone(),
            name: experiment.name.clone(),
            bio_materials: experiment.bio_materials.len(),
            bio_assays: experiment.bio_assays.len(),
            factors: experiment.experimental_design.factors.len(),
            quantitation_types: experiment.quantitation_types.len(),
            raw_vectors: experiment.raw_vectors.len(),
        }
    }
}

impl From<&ArrayDesign> for ArrayDesignSummary {
    fn from(design: &ArrayDesign) -> Self {
        Self {
            short_name: design.short_name.clone(),
            technology: design.technology.to_string(),
            primary_taxon: design
                .primary_taxon
                .as_ref()
                .map(|taxon| taxon.scientific_name.clone()),
            composite_sequences: design.composite_sequences.len(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &ConversionSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_config(resolved: &ResolvedConfig) -> io::Result<()> {
        Self::print_json(resolved)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
