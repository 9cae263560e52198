//! Experimental factors and factor values derived from GEO variables, replicates and
//! dataset subsets.

use crate::domain::{ReplicationType, VariableType};
use crate::geo::{GeoReplication, GeoSeries, GeoSubset, GeoVariable};
use crate::model::{
    Characteristic, EvidenceCode, ExperimentalDesign, ExperimentalFactor, FactorValue,
};
use crate::vocabulary::{
    REPLICATE, categorized, category_characteristic, category_term, replicate_term,
};

/// Design built from the series' declared variables and replicate groups. The design is
/// named after the variable descriptions.
pub fn build_design(series: &GeoSeries) -> ExperimentalDesign {
    let mut design = ExperimentalDesign {
        name: series
            .variables
            .iter()
            .map(|variable| variable.description.trim())
            .filter(|description| !description.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        description: series
            .overall_design
            .as_deref()
            .map(|overall| format!("Overall design: {}", overall.trim()))
            .unwrap_or_default(),
        factors: Vec::new(),
    };
    for variable in &series.variables {
        let factor = design.add_factor(variable_factor(variable));
        design.factors[factor].add_value(variable_value(variable));
    }
    for replication in &series.replicates {
        let factor = design.add_factor(replicate_factor(replication));
        design.factors[factor].add_value(replicate_value(replication.kind));
    }
    design
}

pub fn variable_factor(variable: &GeoVariable) -> ExperimentalFactor {
    let mut factor = ExperimentalFactor::categorical(variable.kind.as_str(), &variable.description);
    factor.category = category_term(variable.kind).map(category_characteristic);
    factor
}

pub fn variable_value(variable: &GeoVariable) -> FactorValue {
    typed_value(variable.kind, &variable.description, None)
}

pub fn replicate_factor(replication: &GeoReplication) -> ExperimentalFactor {
    let mut factor =
        ExperimentalFactor::categorical(replication.kind.to_string(), &replication.description);
    factor.category = Some(category_characteristic(REPLICATE));
    factor
}

pub fn replicate_value(kind: ReplicationType) -> FactorValue {
    let term = replicate_term(kind);
    let characteristic = Characteristic {
        value_uri: Some(term.uri()),
        ..categorized(REPLICATE, term.label)
    };
    FactorValue {
        value: term.label.to_string(),
        characteristics: vec![characteristic],
    }
}

pub fn subset_factor(subset: &GeoSubset) -> ExperimentalFactor {
    let mut factor = ExperimentalFactor::categorical(
        subset.kind.as_str(),
        format!("Converted from GEO subset {}", subset.accession),
    );
    factor.category = category_term(subset.kind).map(category_characteristic);
    factor
}

pub fn subset_value(subset: &GeoSubset) -> FactorValue {
    typed_value(
        subset.kind,
        &subset.description,
        Some(format!("Converted from GEO subset {}", subset.accession)),
    )
}

/// Factor value whose single characteristic is categorized by the kind's term, or left
/// uncategorized for kinds without one.
fn typed_value(kind: VariableType, value: &str, description: Option<String>) -> FactorValue {
    let characteristic = match category_term(kind) {
        Some(term) => categorized(term, value),
        None => Characteristic {
            value: value.to_string(),
            evidence_code: Some(EvidenceCode::Iia),
            ..Characteristic::default()
        },
    };
    FactorValue {
        value: value.to_string(),
        characteristics: vec![Characteristic {
            description,
            ..characteristic
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(kind: VariableType, description: &str) -> GeoVariable {
        GeoVariable {
            kind,
            description: description.to_string(),
            samples: Vec::new(),
        }
    }

    #[test]
    fn factors_are_deduplicated_by_name() {
        let series = GeoSeries {
            variables: vec![
                variable(VariableType::Agent, "aspirin"),
                variable(VariableType::Agent, "placebo"),
                variable(VariableType::Agent, "aspirin"),
            ],
            ..GeoSeries::default()
        };
        let design = build_design(&series);
        assert_eq!(design.factors.len(), 1);
        assert_eq!(design.factors[0].values.len(), 2);
        assert_eq!(design.factors[0].name, "agent");
    }

    #[test]
    fn variable_value_keys_on_category_and_value() {
        let value = variable_value(&variable(VariableType::Tissue, "liver"));
        assert_eq!(value.key(), (Some("organism part"), "liver"));
        let other = variable_value(&variable(VariableType::Other, "batch 2"));
        assert_eq!(other.key(), (None, "batch 2"));
    }

    #[test]
    fn technical_replicates_share_one_value() {
        let extract = replicate_value(ReplicationType::TechnicalReplicateExtract);
        let labeled = replicate_value(ReplicationType::TechnicalReplicateLabeledExtract);
        assert_eq!(extract.key(), labeled.key());
        assert_eq!(extract.key(), (Some("replicate"), "technical replicate"));
    }
}
