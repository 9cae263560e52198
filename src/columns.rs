//! Heuristic assignment of roles to platform table columns, based on header names only.

use std::sync::LazyLock;

use regex::Regex;

pub const CLONE_ID_COLUMN: &str = "CLONE_ID";
pub const GENE_ASSIGNMENT_COLUMN: &str = "gene_assignment";

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(ID|ID_REF)$").expect("valid identifier pattern"));
static EXTERNAL_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(GB_ACC|GB_LIST|ORF|GENBANK|GENBANK[ _]?ACC(ESSION)?)$")
        .expect("valid external reference pattern")
});
static GENBANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(GB_ACC|GB_LIST)$|genbank").expect("valid genbank pattern"));
static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(DESCRIPTION|SEQ_DESCRIPTION|DEFINITION|GENE[ _]TITLE|GENE[ _]DESCRIPTION)$")
        .expect("valid description pattern")
});
static SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(SEQUENCE|PROBE[ _]SEQUENCE|OLIGO[ _]SEQUENCE)$")
        .expect("valid sequence pattern")
});
static PROBE_ORGANISM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(ORGANISM|SPECIES|SPECIES[ _]SCIENTIFIC[ _]NAME|TAXON)$")
        .expect("valid organism pattern")
});

/// Which header plays which role. Each single-valued role takes the first matching header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub sequence: Option<String>,
    pub probe_organism: Option<String>,
    /// Candidate external-reference columns in header order.
    pub external_references: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceConvention {
    Genbank,
    Orf,
}

pub fn detect_column_roles<S: AsRef<str>>(headers: &[S]) -> ColumnRoles {
    let mut roles = ColumnRoles::default();
    for header in headers {
        let header = header.as_ref();
        let name = header.trim();
        if IDENTIFIER.is_match(name) {
            roles.identifier.get_or_insert_with(|| header.to_string());
        } else if EXTERNAL_REFERENCE.is_match(name) {
            roles.external_references.push(header.to_string());
        } else if DESCRIPTION.is_match(name) {
            roles.description.get_or_insert_with(|| header.to_string());
        } else if SEQUENCE.is_match(name) {
            roles.sequence.get_or_insert_with(|| header.to_string());
        } else if PROBE_ORGANISM.is_match(name) {
            roles.probe_organism.get_or_insert_with(|| header.to_string());
        }
    }
    roles
}

/// Naming convention of an external-reference column, if it is one we can bind.
pub fn reference_convention(header: &str) -> Option<ReferenceConvention> {
    let name = header.trim();
    if GENBANK.is_match(name) {
        Some(ReferenceConvention::Genbank)
    } else if name.eq_ignore_ascii_case("ORF") {
        Some(ReferenceConvention::Orf)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_typical_affymetrix_headers() {
        let roles = detect_column_roles(&[
            "ID",
            "GB_ACC",
            "SPOT_ID",
            "Species Scientific Name",
            "SEQUENCE",
            "Gene Title",
        ]);
        assert_eq!(roles.identifier.as_deref(), Some("ID"));
        assert_eq!(roles.external_references, vec!["GB_ACC".to_string()]);
        assert_eq!(roles.probe_organism.as_deref(), Some("Species Scientific Name"));
        assert_eq!(roles.sequence.as_deref(), Some("SEQUENCE"));
        assert_eq!(roles.description.as_deref(), Some("Gene Title"));
    }

    #[test]
    fn first_identifier_wins() {
        let roles = detect_column_roles(&["ID_REF", "ID"]);
        assert_eq!(roles.identifier.as_deref(), Some("ID_REF"));
    }

    #[test]
    fn no_identifier_among_ambiguous_headers() {
        let roles = detect_column_roles(&["IDENTIFIER", "PROBE_ID", "VALUE"]);
        assert_eq!(roles, ColumnRoles::default());
    }

    #[test]
    fn keeps_every_reference_column() {
        let roles = detect_column_roles(&["ID", "ORF", "GB_LIST"]);
        assert_eq!(roles.external_references, vec!["ORF", "GB_LIST"]);
    }

    #[test]
    fn reference_conventions() {
        assert_eq!(reference_convention("GB_ACC"), Some(ReferenceConvention::Genbank));
        assert_eq!(
            reference_convention("GenBank Accession"),
            Some(ReferenceConvention::Genbank)
        );
        assert_eq!(reference_convention("ORF"), Some(ReferenceConvention::Orf));
        assert_eq!(reference_convention("SPOT_ID"), None);
    }
}
