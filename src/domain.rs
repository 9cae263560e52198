use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Platform type as declared by a GEO platform record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformType {
    DualChannel,
    DualChannelGenomic,
    SpottedOligonucleotide,
    SpottedDnaOrCdna,
    SingleChannel,
    OligonucleotideBeads,
    InSituOligonucleotide,
    Mpss,
    Sage,
    SageNlaIII,
    SageRsaI,
    SageSau3A,
    Other,
}

impl PlatformType {
    pub fn technology(self) -> TechnologyType {
        match self {
            PlatformType::DualChannel
            | PlatformType::DualChannelGenomic
            | PlatformType::SpottedOligonucleotide
            | PlatformType::SpottedDnaOrCdna => TechnologyType::TwoColor,
            PlatformType::SingleChannel
            | PlatformType::OligonucleotideBeads
            | PlatformType::InSituOligonucleotide => TechnologyType::OneColor,
            PlatformType::Mpss
            | PlatformType::Sage
            | PlatformType::SageNlaIII
            | PlatformType::SageRsaI
            | PlatformType::SageSau3A
            | PlatformType::Other => TechnologyType::None,
        }
    }
}

impl FromStr for PlatformType {
    type Err = String;

    /// Accepts both the GEO free-text label ("in situ oligonucleotide") and the compact
    /// camel-case name ("inSituOligonucleotide").
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let kind = match compact(value).as_str() {
            "dualchannel" => PlatformType::DualChannel,
            "dualchannelgenomic" => PlatformType::DualChannelGenomic,
            "spottedoligonucleotide" => PlatformType::SpottedOligonucleotide,
            "spotteddnacdna" | "spotteddnaorcdna" => PlatformType::SpottedDnaOrCdna,
            "singlechannel" => PlatformType::SingleChannel,
            "oligonucleotidebeads" => PlatformType::OligonucleotideBeads,
            "insituoligonucleotide" => PlatformType::InSituOligonucleotide,
            "mpss" => PlatformType::Mpss,
            "sage" => PlatformType::Sage,
            "sagenlaiii" => PlatformType::SageNlaIII,
            "sagersai" => PlatformType::SageRsaI,
            "sagesau3a" => PlatformType::SageSau3A,
            "other" => PlatformType::Other,
            _ => return Err(value.to_string()),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TechnologyType {
    OneColor,
    TwoColor,
    DualMode,
    None,
}

impl fmt::Display for TechnologyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TechnologyType::OneColor => "ONECOLOR",
            TechnologyType::TwoColor => "TWOCOLOR",
            TechnologyType::DualMode => "DUALMODE",
            TechnologyType::None => "NONE",
        };
        write!(f, "{value}")
    }
}

/// Experiment type of a curated GEO dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExperimentType {
    #[serde(alias = "Expression profiling by array")]
    GeneExpressionArrayBased,
    #[serde(alias = "Expression profiling by SAGE")]
    GeneExpressionSageBased,
    #[serde(alias = "Expression profiling by MPSS")]
    GeneExpressionMpssBased,
    #[serde(alias = "Expression profiling by RT-PCR")]
    GeneExpressionRtPcrBased,
    #[serde(alias = "arrayCGH", alias = "Genome variation profiling by array")]
    ArrayCgh,
    #[serde(alias = "ChIPChip", alias = "Genome binding/occupancy profiling by array")]
    ChipChip,
    #[serde(other)]
    Other,
}

impl ExperimentType {
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            ExperimentType::ArrayCgh
                | ExperimentType::ChipChip
                | ExperimentType::GeneExpressionSageBased
                | ExperimentType::Other
        )
    }
}

/// Declared type of a GEO series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesType {
    #[serde(alias = "Expression profiling by array")]
    GeneExpressionByArray,
    #[serde(alias = "Expression profiling by high throughput sequencing")]
    GeneExpressionBySequencing,
    #[serde(alias = "Genome binding/occupancy profiling by array")]
    GenomeBindingByArray,
    #[serde(alias = "Genome variation profiling by array")]
    GenomeVariationByArray,
    #[serde(other)]
    Other,
}

impl SeriesType {
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            SeriesType::GeneExpressionByArray | SeriesType::GeneExpressionBySequencing
        )
    }
}

/// Closed set of variable and characteristic kinds used by GEO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VariableType {
    Age,
    Agent,
    CellLine,
    CellType,
    DevelopmentStage,
    DiseaseState,
    Dose,
    Gender,
    GenotypeOrVariation,
    GrowthProtocol,
    Individual,
    Infection,
    Isolate,
    Metabolism,
    Other,
    Protocol,
    Shock,
    Species,
    Specimen,
    Strain,
    Stress,
    Temperature,
    Time,
    Tissue,
}

impl VariableType {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableType::Age => "age",
            VariableType::Agent => "agent",
            VariableType::CellLine => "cell line",
            VariableType::CellType => "cell type",
            VariableType::DevelopmentStage => "development stage",
            VariableType::DiseaseState => "disease state",
            VariableType::Dose => "dose",
            VariableType::Gender => "gender",
            VariableType::GenotypeOrVariation => "genotype/variation",
            VariableType::GrowthProtocol => "growth protocol",
            VariableType::Individual => "individual",
            VariableType::Infection => "infection",
            VariableType::Isolate => "isolate",
            VariableType::Metabolism => "metabolism",
            VariableType::Other => "other",
            VariableType::Protocol => "protocol",
            VariableType::Shock => "shock",
            VariableType::Species => "species",
            VariableType::Specimen => "specimen",
            VariableType::Strain => "strain",
            VariableType::Stress => "stress",
            VariableType::Temperature => "temperature",
            VariableType::Time => "time",
            VariableType::Tissue => "tissue",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let kind = match compact(value).as_str() {
            "age" => VariableType::Age,
            "agent" => VariableType::Agent,
            "cellline" => VariableType::CellLine,
            "celltype" => VariableType::CellType,
            "developmentstage" | "developmentalstage" => VariableType::DevelopmentStage,
            "diseasestate" => VariableType::DiseaseState,
            "dose" => VariableType::Dose,
            "gender" | "sex" => VariableType::Gender,
            "genotypevariation" | "genotypeorvariation" | "genotype" => {
                VariableType::GenotypeOrVariation
            }
            "growthprotocol" => VariableType::GrowthProtocol,
            "individual" => VariableType::Individual,
            "infection" => VariableType::Infection,
            "isolate" => VariableType::Isolate,
            "metabolism" => VariableType::Metabolism,
            "other" => VariableType::Other,
            "protocol" => VariableType::Protocol,
            "shock" => VariableType::Shock,
            "species" => VariableType::Species,
            "specimen" => VariableType::Specimen,
            "strain" => VariableType::Strain,
            "stress" => VariableType::Stress,
            "temperature" => VariableType::Temperature,
            "time" => VariableType::Time,
            "tissue" => VariableType::Tissue,
            _ => return Err(ConvertError::UnknownVariableType(value.to_string())),
        };
        Ok(kind)
    }
}

impl TryFrom<String> for VariableType {
    type Error = ConvertError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VariableType> for String {
    fn from(value: VariableType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplicationType {
    #[serde(alias = "biological replicate")]
    BiologicalReplicate,
    #[serde(alias = "technical replicate - extract")]
    TechnicalReplicateExtract,
    #[serde(alias = "technical replicate - labeled-extract")]
    TechnicalReplicateLabeledExtract,
}

impl fmt::Display for ReplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ReplicationType::BiologicalReplicate => "biological replicate",
            ReplicationType::TechnicalReplicateExtract => "technical replicate - extract",
            ReplicationType::TechnicalReplicateLabeledExtract => {
                "technical replicate - labeled extract"
            }
        };
        write!(f, "{value}")
    }
}

/// Storage representation of an encoded data vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrimitiveType {
    Double,
    Int,
    Boolean,
    String,
    Char,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PrimitiveType::Double => "DOUBLE",
            PrimitiveType::Int => "INT",
            PrimitiveType::Boolean => "BOOLEAN",
            PrimitiveType::String => "STRING",
            PrimitiveType::Char => "CHAR",
        };
        write!(f, "{value}")
    }
}

/// Removes the `.N` suffix that split series carry, e.g. `GSE10.2` -> `GSE10`.
pub fn strip_split_suffix(accession: &str) -> &str {
    match accession.rsplit_once('.') {
        Some((base, suffix))
            if !base.is_empty()
                && !suffix.is_empty()
                && suffix.chars().all(|ch| ch.is_ascii_digit()) =>
        {
            base
        }
        _ => accession,
    }
}

/// Treats empty and whitespace-only strings as absent.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_platform_type_from_geo_label() {
        let kind: PlatformType = "in situ oligonucleotide".parse().unwrap();
        assert_eq!(kind, PlatformType::InSituOligonucleotide);
        assert_eq!(kind.technology(), TechnologyType::OneColor);
    }

    #[test]
    fn parse_platform_type_spotted_dna() {
        let kind: PlatformType = "spotted DNA/cDNA".parse().unwrap();
        assert_eq!(kind.technology(), TechnologyType::TwoColor);
    }

    #[test]
    fn parse_platform_type_unknown() {
        assert!("antibody".parse::<PlatformType>().is_err());
    }

    #[test]
    fn parse_variable_type_aliases() {
        assert_eq!(
            "Genotype/Variation".parse::<VariableType>().unwrap(),
            VariableType::GenotypeOrVariation
        );
        assert_eq!("sex".parse::<VariableType>().unwrap(), VariableType::Gender);
        assert_eq!(
            "cellLine".parse::<VariableType>().unwrap(),
            VariableType::CellLine
        );
    }

    #[test]
    fn parse_variable_type_invalid() {
        let err = "favourite colour".parse::<VariableType>().unwrap_err();
        assert_matches!(err, ConvertError::UnknownVariableType(_));
    }

    #[test]
    fn strip_split_suffix_handles_plain_and_split() {
        assert_eq!(strip_split_suffix("GSE10.2"), "GSE10");
        assert_eq!(strip_split_suffix("GSE10"), "GSE10");
        assert_eq!(strip_split_suffix("GPL1.x"), "GPL1.x");
    }

    #[test]
    fn unsupported_experiment_types() {
        assert!(!ExperimentType::ArrayCgh.is_supported());
        assert!(!ExperimentType::GeneExpressionSageBased.is_supported());
        assert!(ExperimentType::GeneExpressionArrayBased.is_supported());
    }
}
