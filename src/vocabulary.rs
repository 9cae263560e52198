use crate::domain::{ReplicationType, VariableType};
use crate::model::{Characteristic, EvidenceCode};

const EFO: &str = "http://www.ebi.ac.uk/efo/";
const OBO: &str = "http://purl.obolibrary.org/obo/";

/// A controlled-vocabulary term: label plus the identifier it resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OntologyTerm {
    pub label: &'static str,
    pub uri: Term,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Efo(&'static str),
    Obo(&'static str),
}

impl Term {
    pub fn uri(self) -> String {
        match self {
            Term::Efo(id) => format!("{EFO}{id}"),
            Term::Obo(id) => format!("{OBO}{id}"),
        }
    }
}

impl OntologyTerm {
    const fn efo(label: &'static str, id: &'static str) -> Self {
        Self {
            label,
            uri: Term::Efo(id),
        }
    }

    const fn obo(label: &'static str, id: &'static str) -> Self {
        Self {
            label,
            uri: Term::Obo(id),
        }
    }

    pub fn uri(&self) -> String {
        self.uri.uri()
    }
}

pub const REPLICATE: OntologyTerm = OntologyTerm::efo("replicate", "EFO_0000683");
pub const BIOLOGICAL_REPLICATE: OntologyTerm =
    OntologyTerm::efo("biological replicate", "EFO_0002091");
pub const TECHNICAL_REPLICATE: OntologyTerm =
    OntologyTerm::efo("technical replicate", "EFO_0002090");
pub const BIO_SOURCE: OntologyTerm = OntologyTerm::efo("BioSource", "EFO_0000635");
pub const LABEL_COMPOUND: OntologyTerm = OntologyTerm::efo("LabelCompound", "EFO_0000562");

/// Category term for a variable kind. `Other` and `Species` have none: callers keep
/// those as free text.
pub fn category_term(kind: VariableType) -> Option<OntologyTerm> {
    let term = match kind {
        VariableType::Age => OntologyTerm::efo("age", "EFO_0000246"),
        VariableType::Agent => OntologyTerm::obo("molecular entity", "CHEBI_23367"),
        VariableType::CellLine => OntologyTerm::efo("cell line", "EFO_0000322"),
        VariableType::CellType => OntologyTerm::efo("cell type", "EFO_0000324"),
        VariableType::DevelopmentStage => OntologyTerm::efo("developmental stage", "EFO_0000399"),
        VariableType::DiseaseState => OntologyTerm::efo("disease", "EFO_0000408"),
        VariableType::Dose => OntologyTerm::efo("dose", "EFO_0000428"),
        VariableType::Gender => OntologyTerm::obo("sex", "PATO_0000047"),
        VariableType::GenotypeOrVariation => OntologyTerm::efo("genotype", "EFO_0000513"),
        VariableType::GrowthProtocol => OntologyTerm::efo("growth condition", "EFO_0000523"),
        VariableType::Individual => OntologyTerm::efo("individual", "EFO_0000542"),
        VariableType::Infection | VariableType::Metabolism => {
            OntologyTerm::efo("phenotype", "EFO_0000651")
        }
        // GEO "isolate" is almost always used for the age of the isolate.
        VariableType::Isolate => OntologyTerm::efo("age", "EFO_0000246"),
        VariableType::Protocol => OntologyTerm::obo("protocol", "OBI_0000272"),
        VariableType::Shock | VariableType::Stress => {
            OntologyTerm::efo("environmental stress", "EFO_0000470")
        }
        VariableType::Specimen => OntologyTerm::obo("specimen", "OBI_0100051"),
        VariableType::Strain => OntologyTerm::efo("strain", "EFO_0005135"),
        VariableType::Temperature => OntologyTerm::efo("temperature", "EFO_0001702"),
        VariableType::Time => OntologyTerm::efo("timepoint", "EFO_0000724"),
        VariableType::Tissue => OntologyTerm::efo("organism part", "EFO_0000635"),
        VariableType::Other | VariableType::Species => return None,
    };
    Some(term)
}

pub fn replicate_term(kind: ReplicationType) -> OntologyTerm {
    match kind {
        ReplicationType::BiologicalReplicate => BIOLOGICAL_REPLICATE,
        ReplicationType::TechnicalReplicateExtract
        | ReplicationType::TechnicalReplicateLabeledExtract => TECHNICAL_REPLICATE,
    }
}

/// Characteristic carrying `term` as its category and `value` as free text.
pub fn categorized(term: OntologyTerm, value: impl Into<String>) -> Characteristic {
    Characteristic {
        category: Some(term.label.to_string()),
        category_uri: Some(term.uri()),
        value: value.into(),
        value_uri: None,
        description: None,
        evidence_code: Some(EvidenceCode::Iia),
    }
}

/// Characteristic whose value is the term itself, used as a factor category.
pub fn category_characteristic(term: OntologyTerm) -> Characteristic {
    Characteristic {
        value_uri: Some(term.uri()),
        ..categorized(term, term.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_and_species_have_no_term() {
        assert_eq!(category_term(VariableType::Other), None);
        assert_eq!(category_term(VariableType::Species), None);
    }

    #[test]
    fn tissue_maps_to_organism_part() {
        let term = category_term(VariableType::Tissue).unwrap();
        assert_eq!(term.label, "organism part");
        assert_eq!(term.uri(), "http://www.ebi.ac.uk/efo/EFO_0000635");
    }

    #[test]
    fn sex_uses_pato() {
        let term = category_term(VariableType::Gender).unwrap();
        assert_eq!(term.uri(), "http://purl.obolibrary.org/obo/PATO_0000047");
    }

    #[test]
    fn technical_replicates_share_a_term() {
        assert_eq!(
            replicate_term(ReplicationType::TechnicalReplicateExtract),
            replicate_term(ReplicationType::TechnicalReplicateLabeledExtract)
        );
    }

    #[test]
    fn categorized_characteristic_carries_uri() {
        let characteristic = categorized(REPLICATE, "biological replicate");
        assert_eq!(characteristic.category.as_deref(), Some("replicate"));
        assert_eq!(
            characteristic.category_uri.as_deref(),
            Some("http://www.ebi.ac.uk/efo/EFO_0000683")
        );
    }
}
