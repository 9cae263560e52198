//! Parsed GEO submission records, as produced by an upstream SOFT/MINiML parser.
//!
//! These types are the converter's input. They are plain data: cross references between
//! records (sample to platform, dataset to platform) are by accession.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::{ExperimentType, ReplicationType, SeriesType, VariableType};

/// One top-level input to the converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GeoRecord {
    Platform(GeoPlatform),
    Series(GeoSeries),
    Dataset(DatasetRecord),
}

impl GeoRecord {
    pub fn accession(&self) -> &str {
        match self {
            GeoRecord::Platform(platform) => &platform.accession,
            GeoRecord::Series(series) => &series.accession,
            GeoRecord::Dataset(record) => &record.dataset.accession,
        }
    }
}

/// A curated dataset together with the series it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub dataset: GeoDataset,
    #[serde(default)]
    pub series: Vec<GeoSeries>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoPlatform {
    pub accession: String,
    pub title: String,
    pub description: String,
    /// Raw GEO technology label; interpreted during conversion.
    pub technology: Option<String>,
    pub organisms: Vec<String>,
    pub manufacturer: Option<String>,
    pub column_names: Vec<String>,
    pub column_descriptions: Vec<String>,
    /// Column-major table data aligned with `column_names`.
    pub columns: Vec<Vec<String>>,
    pub supplementary_file: Option<String>,
    pub last_update_date: Option<String>,
    /// Identifier to warehouse probe-name mapping filled in by an earlier matching step.
    pub probe_names: HashMap<String, String>,
    pub use_data_from_geo: bool,
}

impl Default for GeoPlatform {
    fn default() -> Self {
        Self {
            accession: String::new(),
            title: String::new(),
            description: String::new(),
            technology: None,
            organisms: Vec::new(),
            manufacturer: None,
            column_names: Vec::new(),
            column_descriptions: Vec::new(),
            columns: Vec::new(),
            supplementary_file: None,
            last_update_date: None,
            probe_names: HashMap::new(),
            use_data_from_geo: true,
        }
    }
}

impl GeoPlatform {
    pub fn column_data(&self, name: &str) -> Option<&[String]> {
        let index = self.column_names.iter().position(|column| column == name)?;
        self.columns.get(index).map(Vec::as_slice)
    }

    pub fn column_description(&self, name: &str) -> Option<&str> {
        let index = self.column_names.iter().position(|column| column == name)?;
        self.column_descriptions
            .get(index)
            .map(String::as_str)
            .filter(|description| !description.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoContact {
    pub name: String,
    pub email: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoChannel {
    pub channel_number: u32,
    pub source_name: Option<String>,
    pub organism: Option<String>,
    pub characteristics: Vec<String>,
    pub molecule: Option<String>,
    pub label: Option<String>,
    pub growth_protocol: Option<String>,
    pub treatment_protocol: Option<String>,
    pub extract_protocol: Option<String>,
    pub label_protocol: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoVariable {
    #[serde(rename = "type")]
    pub kind: VariableType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoReplication {
    #[serde(rename = "type")]
    pub kind: ReplicationType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSample {
    pub accession: String,
    pub title: String,
    pub description: String,
    pub platforms: Vec<String>,
    pub channels: Vec<GeoChannel>,
    /// Data table headers; the first is the row identifier.
    pub column_names: Vec<String>,
    pub column_descriptions: Vec<String>,
    pub supplementary_file: Option<String>,
    pub last_update_date: Option<String>,
    pub replicates: Vec<GeoReplication>,
    pub variables: Vec<GeoVariable>,
}

impl GeoSample {
    /// Organism of the first channel that declares one.
    pub fn organism(&self) -> Option<&str> {
        self.channels
            .iter()
            .filter_map(|channel| channel.organism.as_deref())
            .map(str::trim)
            .find(|organism| !organism.is_empty())
    }

    pub fn has_usable_data(&self) -> bool {
        !self.column_names.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoSubset {
    pub accession: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: VariableType,
    #[serde(default)]
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoDataset {
    pub accession: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub platform: String,
    #[serde(default)]
    pub organism: String,
    pub experiment_type: ExperimentType,
    /// Sample accessions included in the dataset.
    #[serde(default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub subsets: Vec<GeoSubset>,
    #[serde(default)]
    pub update_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSeries {
    pub accession: String,
    pub title: String,
    pub summaries: Vec<String>,
    pub overall_design: Option<String>,
    pub last_update_date: Option<String>,
    pub series_types: Vec<SeriesType>,
    pub contact: Option<GeoContact>,
    pub contributors: Vec<GeoContact>,
    pub pubmed_ids: Vec<String>,
    pub keywords: Vec<String>,
    pub supplementary_file: Option<String>,
    pub platforms: Vec<GeoPlatform>,
    pub samples: Vec<GeoSample>,
    pub datasets: Vec<GeoDataset>,
    pub variables: Vec<GeoVariable>,
    pub replicates: Vec<GeoReplication>,
    /// Groups of samples that were run on the same physical biomaterial.
    pub sample_correspondence: Vec<Vec<String>>,
    pub values: GeoValues,
}

impl GeoSeries {
    pub fn platform(&self, accession: &str) -> Option<&GeoPlatform> {
        self.platforms
            .iter()
            .find(|platform| platform.accession == accession)
    }

    pub fn sample(&self, accession: &str) -> Option<&GeoSample> {
        self.samples
            .iter()
            .find(|sample| sample.accession == accession)
    }

    /// Samples of this series that the dataset lists, in series order.
    pub fn dataset_samples(&self, dataset: &GeoDataset) -> Vec<&GeoSample> {
        let wanted: HashSet<&str> = dataset.column_names.iter().map(String::as_str).collect();
        self.samples
            .iter()
            .filter(|sample| wanted.contains(sample.accession.as_str()))
            .collect()
    }
}

/// Raw measurement values of a series, by platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoValues {
    pub platforms: IndexMap<String, PlatformValues>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformValues {
    /// Quantitation type names, excluding the row identifier column.
    pub quantitation_types: Vec<String>,
    /// sample accession -> design element -> one value per quantitation type.
    pub samples: IndexMap<String, IndexMap<String, Vec<Option<String>>>>,
}

impl GeoValues {
    pub fn has_data(&self) -> bool {
        self.platforms
            .values()
            .any(|values| !values.samples.is_empty())
    }

    pub fn quantitation_type_index(&self, platform: &str, name: &str) -> Option<usize> {
        self.platforms
            .get(platform)?
            .quantitation_types
            .iter()
            .position(|qt| qt == name)
    }

    /// Values of one design element for one quantitation type, one slot per sample.
    /// Returns `None` when no sample has a row for the design element.
    pub fn values(
        &self,
        platform: &str,
        quantitation_type: usize,
        samples: &[&GeoSample],
        design_element: &str,
    ) -> Option<Vec<Option<String>>> {
        let table = self.platforms.get(platform)?;
        let mut seen = false;
        let values = samples
            .iter()
            .map(|sample| {
                let row = table
                    .samples
                    .get(&sample.accession)
                    .and_then(|rows| rows.get(design_element));
                if row.is_some() {
                    seen = true;
                }
                row.and_then(|row| row.get(quantitation_type).cloned().flatten())
            })
            .collect();
        seen.then_some(values)
    }

    /// Copy restricted to the given samples.
    pub fn subset(&self, samples: &HashSet<&str>) -> GeoValues {
        let platforms = self
            .platforms
            .iter()
            .map(|(platform, values)| {
                let kept = values
                    .samples
                    .iter()
                    .filter(|(sample, _)| samples.contains(sample.as_str()))
                    .map(|(sample, rows)| (sample.clone(), rows.clone()))
                    .collect();
                (
                    platform.clone(),
                    PlatformValues {
                        quantitation_types: values.quantitation_types.clone(),
                        samples: kept,
                    },
                )
            })
            .collect();
        GeoValues { platforms }
    }
}
