//! Warehouse entity graph produced by the converter.
//!
//! Entities reference each other by index into their owning collection
//! (assays to biomaterials, vectors to quantitation types) or by short name
//! (assays to array designs). Taxa are shared through `Arc`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{PrimitiveType, TechnologyType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    /// Assigned by the taxon store once the taxon is persistent.
    pub id: Option<u64>,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub abbreviation: Option<String>,
    pub is_species: bool,
    pub parent: Option<Arc<Taxon>>,
}

impl Taxon {
    pub fn named(scientific_name: impl Into<String>) -> Self {
        Self {
            id: None,
            scientific_name: scientific_name.into(),
            common_name: None,
            abbreviation: None,
            is_species: true,
            parent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDatabase {
    pub name: String,
    pub web_uri: Option<String>,
}

impl ExternalDatabase {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            web_uri: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub accession: String,
    pub version: Option<String>,
    pub database: ExternalDatabase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibliographicReference {
    pub pubmed: DatabaseEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    pub remote_url: Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceCode {
    /// Inferred from imported annotation.
    Iia,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    pub category: Option<String>,
    pub category_uri: Option<String>,
    pub value: String,
    pub value_uri: Option<String>,
    pub description: Option<String>,
    pub evidence_code: Option<EvidenceCode>,
}

impl Characteristic {
    pub fn unstructured(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            evidence_code: Some(EvidenceCode::Iia),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SequenceType {
    Dna,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioSequence {
    pub name: String,
    pub description: Option<String>,
    pub sequence: Option<String>,
    pub length: Option<usize>,
    pub is_approximate_length: bool,
    pub kind: Option<SequenceType>,
    pub taxon: Arc<Taxon>,
    pub database_entry: Option<DatabaseEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSequence {
    pub name: String,
    pub description: String,
    pub biological_characteristic: Option<BioSequence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDesign {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub technology: TechnologyType,
    pub primary_taxon: Option<Arc<Taxon>>,
    pub design_provider: Option<Contact>,
    pub external_references: Vec<DatabaseEntry>,
    pub advertised_number_of_design_elements: usize,
    pub composite_sequences: Vec<CompositeSequence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    pub name: String,
    pub description: String,
}

/// Position of a factor value inside an experimental design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactorValueRef {
    pub factor: usize,
    pub value: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BioMaterial {
    pub name: String,
    pub description: String,
    pub source_taxon: Option<Arc<Taxon>>,
    pub characteristics: Vec<Characteristic>,
    pub treatments: Vec<Treatment>,
    pub factor_values: Vec<FactorValueRef>,
    /// Indices into the experiment's bioassays.
    pub bio_assays_used_in: Vec<usize>,
}

impl BioMaterial {
    pub fn add_factor_value(&mut self, value: FactorValueRef) {
        if !self.factor_values.contains(&value) {
            self.factor_values.push(value);
        }
    }

    pub fn has_value_for_factor(&self, factor: usize) -> bool {
        self.factor_values.iter().any(|value| value.factor == factor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioAssay {
    pub name: String,
    pub description: String,
    pub accession: DatabaseEntry,
    /// Short names of the array designs the sample was run on.
    pub array_designs_used: Vec<String>,
    /// Index into the experiment's biomaterials.
    pub sample_used: usize,
    pub raw_data_file: Option<LocalFile>,
    pub is_outlier: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorType {
    Categorical,
    Continuous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorValue {
    pub value: String,
    pub characteristics: Vec<Characteristic>,
}

impl FactorValue {
    /// The (category, value) pair factor values are deduplicated and matched on.
    pub fn key(&self) -> (Option<&str>, &str) {
        match self.characteristics.first() {
            Some(characteristic) => (
                characteristic.category.as_deref(),
                characteristic.value.as_str(),
            ),
            None => (None, self.value.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentalFactor {
    pub name: String,
    pub description: String,
    pub kind: FactorType,
    pub category: Option<Characteristic>,
    pub values: Vec<FactorValue>,
}

impl ExperimentalFactor {
    pub fn categorical(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: FactorType::Categorical,
            category: None,
            values: Vec::new(),
        }
    }

    /// Adds the value unless one with the same (category, value) exists; returns its index.
    pub fn add_value(&mut self, value: FactorValue) -> usize {
        if let Some(index) = self.values.iter().position(|fv| fv.key() == value.key()) {
            return index;
        }
        self.values.push(value);
        self.values.len() - 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentalDesign {
    pub name: String,
    pub description: String,
    pub factors: Vec<ExperimentalFactor>,
}

impl ExperimentalDesign {
    pub fn factor_index(&self, name: &str) -> Option<usize> {
        self.factors
            .iter()
            .position(|factor| factor.name.eq_ignore_ascii_case(name))
    }

    /// Adds the factor unless one with the same name exists; returns its index.
    pub fn add_factor(&mut self, factor: ExperimentalFactor) -> usize {
        if let Some(index) = self.factor_index(&factor.name) {
            return index;
        }
        self.factors.push(factor);
        self.factors.len() - 1
    }

    pub fn find_factor_value(&self, key: (Option<&str>, &str)) -> Option<FactorValueRef> {
        self.factors.iter().enumerate().find_map(|(factor, f)| {
            f.values
                .iter()
                .position(|fv| fv.key() == key)
                .map(|value| FactorValueRef { factor, value })
        })
    }

    pub fn factor_value(&self, reference: FactorValueRef) -> Option<&FactorValue> {
        self.factors
            .get(reference.factor)?
            .values
            .get(reference.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneralType {
    Quantitative,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardType {
    Amount,
    Count,
    PresentAbsent,
    ConfidenceIndicator,
    Ratio,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleType {
    Linear,
    Log2,
    Log10,
    Ln,
    Percent,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitationType {
    pub name: String,
    pub description: String,
    pub representation: PrimitiveType,
    pub general_type: GeneralType,
    pub standard_type: StandardType,
    pub scale: ScaleType,
    pub is_background: bool,
    pub is_background_subtracted: bool,
    pub is_ratio: bool,
    pub is_preferred: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BioAssayDimension {
    pub name: String,
    pub description: String,
    /// Indices into the experiment's bioassays, in vector order.
    pub bio_assays: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExpressionDataVector {
    pub array_design: String,
    pub design_element: String,
    pub dimension: usize,
    pub quantitation_type: usize,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionExperiment {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub accession: Option<DatabaseEntry>,
    pub investigators: Vec<Contact>,
    pub primary_publication: Option<BibliographicReference>,
    pub raw_data_file: Option<LocalFile>,
    pub characteristics: Vec<Characteristic>,
    pub experimental_design: ExperimentalDesign,
    pub bio_materials: Vec<BioMaterial>,
    pub bio_assays: Vec<BioAssay>,
    pub bio_assay_dimensions: Vec<BioAssayDimension>,
    pub quantitation_types: Vec<QuantitationType>,
    pub raw_vectors: Vec<RawExpressionDataVector>,
}

impl ExpressionExperiment {
    pub fn bio_assay_index(&self, accession: &str) -> Option<usize> {
        self.bio_assays
            .iter()
            .position(|assay| assay.accession.accession == accession)
    }
}
