use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConvertError {
    #[error("unknown variable type: {0}")]
    UnknownVariableType(String),

    #[error("platform {platform}: don't know how to interpret technology type '{value}'")]
    UnrecognizedTechnology { platform: String, value: String },

    #[error("platform {platform} has {columns} columns but no identifier column")]
    MissingIdentifierColumn { platform: String, columns: usize },

    #[error("platform {0} declares no organisms")]
    NoPlatformOrganism(String),

    #[error("platform {platform} has multiple taxa with different parents ({taxa}) and no probe organism column")]
    InconsistentPlatformTaxa { platform: String, taxa: String },

    #[error("no taxon could be determined for platform {0}")]
    NoPlatformTaxon(String),

    #[error("platform {platform}: no external database was identified from column {column}")]
    NoExternalDatabase { platform: String, column: String },

    #[error("platform {platform} still has {count} elements after filtering (limit {limit})")]
    TooManyElements {
        platform: String,
        count: usize,
        limit: usize,
    },

    #[error("sample {sample}: channel organism {second} conflicts with {first}")]
    ChannelTaxonConflict {
        sample: String,
        first: String,
        second: String,
    },

    #[error("sample {sample}: no design factor value matches {category}={value}")]
    SampleFactorMismatch {
        sample: String,
        category: String,
        value: String,
    },

    #[error("series {0} has no sample correspondence")]
    MissingSampleCorrespondence(String),

    #[error("sample {0} is not associated with any platform")]
    SampleWithoutPlatform(String),

    #[error("platform {platform} referenced by {owner} is not part of the submission")]
    UnknownPlatform { platform: String, owner: String },

    #[error("dataset {dataset}: platform {platform} has not been converted")]
    PlatformNotConverted { dataset: String, platform: String },

    #[error("dataset {0} is not associated with a series")]
    DatasetWithoutSeries(String),

    #[error("dataset {0} is associated with more than one series")]
    DatasetWithMultipleSeries(String),

    #[error("samples from platforms {first} and {second} were mixed in one vector batch")]
    MixedPlatforms { first: String, second: String },

    #[error("platform {0}: no bioassays matched the samples for the assay dimension")]
    EmptyAssayDimension(String),

    #[error("platform {0}: none of the samples have any quantitation type names")]
    NoQuantitationTypes(String),

    #[error("platform {platform}: no probe name mapping for design element {name}")]
    UnmappedDesignElement { platform: String, name: String },

    #[error("platform {platform}: design element {name} was not converted")]
    MissingDesignElement { platform: String, name: String },

    #[error("design element {design_element}: {actual} values for an assay dimension of {expected}")]
    VectorLengthMismatch {
        design_element: String,
        expected: usize,
        actual: usize,
    },

    #[error("encoded payload decodes to {actual} values, expected {expected}")]
    CodecInconsistency { expected: usize, actual: usize },

    #[error("corrupt encoded payload: {0}")]
    CorruptPayload(String),

    #[error("collaborator failure: {0}")]
    Store(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("failed to parse input: {0}")]
    InputParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
