use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::columns::{
    CLONE_ID_COLUMN, ColumnRoles, GENE_ASSIGNMENT_COLUMN, ReferenceConvention,
    detect_column_roles, reference_convention,
};
use crate::config::ConverterSettings;
use crate::context::ConversionContext;
use crate::domain::{PlatformType, TechnologyType, non_blank, strip_split_suffix};
use crate::error::ConvertError;
use crate::geo::GeoPlatform;
use crate::model::{
    ArrayDesign, BioSequence, CompositeSequence, Contact, DatabaseEntry, ExternalDatabase,
    SequenceType, Taxon,
};
use crate::store::{Collaborators, GENBANK, GEO};
use crate::taxon::{TaxonResolver, normalize_organism};

static REFSEQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}_").expect("valid refseq pattern"));

const LINK_PREFIX: &str = "LINK_PRE:";
const GENE_ASSIGNMENT_PLACEHOLDER: &str = "---";

/// Builds one array design per platform accession.
pub struct PlatformConverter<'a> {
    settings: &'a ConverterSettings,
    services: Collaborators<'a>,
}

/// Per-row text of the columns that feed one probe.
struct ProbeRow<'r> {
    id: &'r str,
    accession: Option<&'r str>,
    clone_id: Option<&'r str>,
    sequence: Option<&'r str>,
}

impl<'a> PlatformConverter<'a> {
    pub fn new(settings: &'a ConverterSettings, services: Collaborators<'a>) -> Self {
        Self { settings, services }
    }

    /// Converts the platform, or returns the design already built for its accession.
    pub fn convert<'c>(
        &self,
        platform: &GeoPlatform,
        context: &'c mut ConversionContext,
    ) -> Result<&'c ArrayDesign, ConvertError> {
        let accession = platform.accession.as_str();
        if !context.has_platform(accession) {
            let design = self.build(platform, context)?;
            context.insert_platform(accession, design);
        } else {
            debug!(platform = accession, "platform already converted");
        }
        context
            .array_design(accession)
            .ok_or_else(|| ConvertError::UnknownPlatform {
                platform: accession.to_string(),
                owner: "conversion context".to_string(),
            })
    }

    fn build(
        &self,
        platform: &GeoPlatform,
        context: &mut ConversionContext,
    ) -> Result<ArrayDesign, ConvertError> {
        let accession = platform.accession.as_str();
        info!(platform = accession, "converting platform");

        let technology = technology_type(platform)?;
        let roles = detect_column_roles(&platform.column_names);
        if roles.identifier.is_none() && !platform.column_names.is_empty() {
            return Err(ConvertError::MissingIdentifierColumn {
                platform: accession.to_string(),
                columns: platform.column_names.len(),
            });
        }

        let external_database = self.external_database(platform, &roles)?;
        let platform_taxa = self.platform_taxa(platform, &roles, context)?;
        let probe_organisms = roles
            .probe_organism
            .as_deref()
            .and_then(|column| platform.column_data(column));
        let primary_taxon = TaxonResolver::new(self.services.taxa).resolve_primary_platform_taxon(
            &mut context.taxa,
            accession,
            &platform_taxa,
            probe_organisms,
        )?;

        let geo = self
            .services
            .databases
            .find(GEO)?
            .unwrap_or_else(|| ExternalDatabase::named(GEO));
        let mut design = ArrayDesign {
            name: platform.title.clone(),
            short_name: accession.to_string(),
            description: platform.description.clone(),
            technology,
            primary_taxon: Some(Arc::clone(&primary_taxon)),
            design_provider: non_blank(platform.manufacturer.as_deref()).map(|name| Contact {
                name: name.to_string(),
                email: None,
            }),
            external_references: vec![DatabaseEntry {
                accession: strip_split_suffix(accession).to_string(),
                version: None,
                database: geo,
            }],
            advertised_number_of_design_elements: 0,
            composite_sequences: Vec::new(),
        };

        context.seed_probe_names(accession, &platform.probe_names);

        if roles.identifier.is_none() {
            warn!(platform = accession, "no identifier column, platform has no elements");
            return Ok(design);
        }
        if !platform.use_data_from_geo && !self.settings.force_convert_elements {
            warn!(
                platform = accession,
                "platform data is not taken from GEO, elements not converted"
            );
            return Ok(design);
        }

        self.convert_elements(
            platform,
            &roles,
            external_database.as_ref(),
            &primary_taxon,
            &mut design,
            context,
        )?;
        Ok(design)
    }

    fn platform_taxa(
        &self,
        platform: &GeoPlatform,
        roles: &ColumnRoles,
        context: &mut ConversionContext,
    ) -> Result<Vec<Arc<Taxon>>, ConvertError> {
        let resolver = TaxonResolver::new(self.services.taxa);
        let mut taxa: Vec<Arc<Taxon>> = Vec::new();
        for organism in &platform.organisms {
            if organism.trim().is_empty() {
                continue;
            }
            let taxon = resolver.resolve_organism(&mut context.taxa, organism)?;
            if !taxa
                .iter()
                .any(|known| known.scientific_name == taxon.scientific_name)
            {
                taxa.push(taxon);
            }
        }
        if taxa.is_empty() {
            return Err(ConvertError::NoPlatformOrganism(platform.accession.clone()));
        }

        if taxa.len() > 1 && roles.probe_organism.is_none() {
            let mut parents: Vec<String> = Vec::new();
            for taxon in &taxa {
                let thawed = self.services.taxa.thaw(taxon)?;
                if let Some(parent) = thawed.parent.as_ref() {
                    if !parents.contains(&parent.scientific_name) {
                        parents.push(parent.scientific_name.clone());
                    }
                }
            }
            if parents.len() > 1 {
                return Err(ConvertError::InconsistentPlatformTaxa {
                    platform: platform.accession.clone(),
                    taxa: taxa
                        .iter()
                        .map(|taxon| taxon.scientific_name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }
        Ok(taxa)
    }

    /// Database the platform's external accessions belong to, judged from the first
    /// external-reference column.
    fn external_database(
        &self,
        platform: &GeoPlatform,
        roles: &ColumnRoles,
    ) -> Result<Option<ExternalDatabase>, ConvertError> {
        let Some(column) = roles.external_references.first() else {
            return Ok(None);
        };
        let Some(description) = platform.column_description(column) else {
            debug!(platform = %platform.accession, column = %column, "reference column has no description");
            return Ok(None);
        };

        let mut database = match reference_convention(column) {
            Some(ReferenceConvention::Genbank) => self
                .services
                .databases
                .find(GENBANK)?
                .unwrap_or_else(|| ExternalDatabase::named(GENBANK)),
            Some(ReferenceConvention::Orf) => {
                let organism = platform
                    .organisms
                    .first()
                    .map(|organism| normalize_organism(organism))
                    .unwrap_or_default();
                self.settings.organism_database(&organism)
            }
            None => {
                return Err(ConvertError::NoExternalDatabase {
                    platform: platform.accession.clone(),
                    column: column.clone(),
                });
            }
        };
        if let Some(uri) = link_prefix(description) {
            database.web_uri = Some(uri);
        }
        Ok(Some(database))
    }

    fn convert_elements(
        &self,
        platform: &GeoPlatform,
        roles: &ColumnRoles,
        database: Option<&ExternalDatabase>,
        primary_taxon: &Arc<Taxon>,
        design: &mut ArrayDesign,
        context: &mut ConversionContext,
    ) -> Result<(), ConvertError> {
        let accession = platform.accession.as_str();
        let identifiers = roles
            .identifier
            .as_deref()
            .and_then(|column| platform.column_data(column))
            .unwrap_or_default();
        let column = |name: Option<&str>| name.and_then(|name| platform.column_data(name));
        let descriptions = column(roles.description.as_deref());
        let sequences = column(roles.sequence.as_deref());
        let probe_organisms = column(roles.probe_organism.as_deref());
        let clone_ids = column(Some(CLONE_ID_COLUMN));
        let gene_assignments = column(Some(GENE_ASSIGNMENT_COLUMN));
        let references: Vec<&[String]> = roles
            .external_references
            .iter()
            .filter_map(|name| platform.column_data(name))
            .collect();

        let limit = self.settings.too_many_elements;
        let strict = identifiers.len() > limit;
        if strict {
            info!(
                platform = accession,
                elements = identifiers.len(),
                limit,
                "platform is large, using strict element selection"
            );
        }
        let is_genbank = database.is_some_and(|database| database.name == GENBANK);
        let resolver = TaxonResolver::new(self.services.taxa);

        let mut skipped: Vec<&str> = Vec::new();
        for (row, id) in identifiers.iter().enumerate() {
            let id = id.trim();
            let mut external = references.iter().find_map(|values| cell(values, row));

            if strict && external.is_none() {
                let salvage = gene_assignments
                    .and_then(|values| cell(values, row))
                    .filter(|value| *value != GENE_ASSIGNMENT_PLACEHOLDER);
                if salvage.is_none() {
                    skipped.push(id);
                    continue;
                }
            }

            let mut description = String::new();
            if let Some(list) = external.filter(|value| value.contains(',')) {
                description.push_str(&format!("Multiple external sequence references: {list}; "));
                external = list.split(',').map(str::trim).find(|value| !value.is_empty());
            }
            if let Some(text) = descriptions.and_then(|values| cell(values, row)) {
                description.push_str(text);
            }

            let probe_taxon = match probe_organisms {
                Some(values) => match cell(values, row) {
                    Some(label) => resolver.resolve_probe_organism(&mut context.taxa, label)?,
                    None => None,
                },
                None => Some(Arc::clone(primary_taxon)),
            };

            let probe = ProbeRow {
                id,
                accession: external,
                clone_id: clone_ids.and_then(|values| cell(values, row)),
                sequence: sequences.and_then(|values| cell(values, row)),
            };
            let biological_characteristic =
                bio_sequence(accession, &probe, database, is_genbank, probe_taxon);

            let name = context.probe_name(accession, id);
            context.push_design_element(accession, name.clone(), design.composite_sequences.len());
            design.composite_sequences.push(CompositeSequence {
                name,
                description: description.trim().to_string(),
                biological_characteristic,
            });
        }

        design.advertised_number_of_design_elements = design.composite_sequences.len();
        if let Some(last) = skipped.last() {
            info!(
                platform = accession,
                skipped = skipped.len(),
                last,
                "skipped elements due to strict selection"
            );
        }
        if design.composite_sequences.len() > limit {
            return Err(ConvertError::TooManyElements {
                platform: accession.to_string(),
                count: design.composite_sequences.len(),
                limit,
            });
        }
        info!(
            platform = accession,
            elements = design.composite_sequences.len(),
            "converted platform elements"
        );
        Ok(())
    }
}

/// Sequence record for one probe. Probes without an accession or clone id, or without a
/// persistent taxon, get none.
fn bio_sequence(
    platform: &str,
    probe: &ProbeRow<'_>,
    database: Option<&ExternalDatabase>,
    is_genbank: bool,
    taxon: Option<Arc<Taxon>>,
) -> Option<BioSequence> {
    if probe.accession.is_none() && probe.clone_id.is_none() {
        return None;
    }
    let taxon = taxon.filter(|taxon| taxon.id.is_some())?;

    let is_refseq = is_genbank && probe.accession.is_some_and(|value| REFSEQ.is_match(value));
    let name = match (probe.accession, probe.clone_id) {
        (Some(accession), _) if is_genbank => accession,
        (_, Some(clone_id)) => clone_id,
        _ => probe.id,
    };
    let mut sequence = BioSequence {
        name: name.to_string(),
        description: None,
        sequence: None,
        length: None,
        is_approximate_length: true,
        kind: None,
        taxon,
        database_entry: None,
    };

    if let Some(literal) = probe.sequence {
        sequence.name = probe.id.to_string();
        sequence.sequence = Some(literal.to_string());
        sequence.length = Some(literal.len());
        sequence.is_approximate_length = false;
        sequence.kind = Some(SequenceType::Dna);
        sequence.description = Some(match probe.accession {
            Some(accession) => format!(
                "Sequence from platform {platform} provided by manufacturer. Used in lieu of {accession}"
            ),
            None => format!(
                "Sequence from platform {platform} provided by manufacturer. No external accession provided"
            ),
        });
    } else if let (Some(accession), Some(database), false) = (probe.accession, database, is_refseq)
    {
        let (accession, version) = if is_genbank {
            match accession.split_once('.') {
                Some((base, version)) => (base, Some(version.to_string())),
                None => (accession, None),
            }
        } else {
            (accession, None)
        };
        sequence.name = accession.to_string();
        sequence.database_entry = Some(DatabaseEntry {
            accession: accession.to_string(),
            version,
            database: database.clone(),
        });
    }
    Some(sequence)
}

fn technology_type(platform: &GeoPlatform) -> Result<TechnologyType, ConvertError> {
    match non_blank(platform.technology.as_deref()) {
        None => {
            warn!(
                platform = %platform.accession,
                "platform has no technology type, assuming dual mode"
            );
            Ok(TechnologyType::DualMode)
        }
        Some(value) => value
            .parse::<PlatformType>()
            .map(PlatformType::technology)
            .map_err(|value| ConvertError::UnrecognizedTechnology {
                platform: platform.accession.clone(),
                value,
            }),
    }
}

fn link_prefix(description: &str) -> Option<String> {
    let (_, rest) = description.split_once(LINK_PREFIX)?;
    let uri = rest
        .split_whitespace()
        .next()?
        .trim_matches(|ch| ch == '"' || ch == '\'');
    (!uri.is_empty()).then(|| uri.to_string())
}

fn cell(values: &[String], row: usize) -> Option<&str> {
    non_blank(values.get(row).map(String::as_str))
}
