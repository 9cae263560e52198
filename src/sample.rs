use std::sync::Arc;

use tracing::{debug, error, warn};
use url::Url;

use crate::config::ConverterSettings;
use crate::context::ConversionContext;
use crate::design::{replicate_value, variable_value};
use crate::domain::{VariableType, non_blank, strip_split_suffix};
use crate::error::ConvertError;
use crate::geo::{GeoChannel, GeoPlatform, GeoSample};
use crate::model::{
    BioAssay, BioMaterial, Characteristic, DatabaseEntry, ExperimentalDesign, ExternalDatabase,
    FactorValue, FactorValueRef, LocalFile, Taxon, Treatment,
};
use crate::platform::PlatformConverter;
use crate::store::{Collaborators, GEO};
use crate::vocabulary::{BIO_SOURCE, LABEL_COMPOUND, categorized, category_term};

const MAX_CHARACTERISTIC_LENGTH: usize = 255;
const TRUNCATED_LENGTH: usize = 199;
const CHARACTERISTIC_DESCRIPTION: &str = "GEO Sample characteristic";
const MATERIAL_TYPE: &str = "MaterialType";

/// Where a converted sample's channels and factor values are written.
pub struct SampleTarget<'m> {
    /// Index the biomaterial will have in the experiment.
    pub index: usize,
    pub material: &'m mut BioMaterial,
}

/// Converts GEO samples into bioassays, merging every channel onto one biomaterial.
pub struct SampleConverter<'a> {
    settings: &'a ConverterSettings,
    services: Collaborators<'a>,
}

impl<'a> SampleConverter<'a> {
    pub fn new(settings: &'a ConverterSettings, services: Collaborators<'a>) -> Self {
        Self { settings, services }
    }

    /// Converts one sample. A sample without an accession is logged and yields `None`.
    ///
    /// Every replicate and variable descriptor of the sample must match a factor value
    /// already present in `design`.
    pub fn convert(
        &self,
        sample: &GeoSample,
        platforms: &[GeoPlatform],
        target: SampleTarget<'_>,
        design: &ExperimentalDesign,
        context: &mut ConversionContext,
    ) -> Result<Option<BioAssay>, ConvertError> {
        let accession = sample.accession.trim();
        if accession.is_empty() {
            error!("sample has no GEO accession, skipping");
            return Ok(None);
        }
        debug!(sample = accession, "converting sample");

        let name = match non_blank(Some(&sample.title)) {
            Some(title) => title.to_string(),
            None => {
                warn!(sample = accession, "blank sample title, using accession");
                accession.to_string()
            }
        };

        for replication in &sample.replicates {
            let value = replicate_value(replication.kind);
            let reference = matching_value(accession, design, &value)?;
            target.material.add_factor_value(reference);
        }
        for variable in &sample.variables {
            let value = variable_value(variable);
            let reference = matching_value(accession, design, &value)?;
            if target.material.has_value_for_factor(reference.factor) {
                continue;
            }
            target.material.add_factor_value(reference);
        }

        for channel in &sample.channels {
            convert_channel(accession, channel, target.material)?;
        }

        let array_designs_used = self.array_designs(sample, platforms, context)?;

        let geo = self
            .services
            .databases
            .find(GEO)?
            .unwrap_or_else(|| ExternalDatabase::named(GEO));
        let mut description = sample.description.clone();
        description.push_str(&format!("\nSource GEO sample is {accession}"));
        if let Some(updated) = non_blank(sample.last_update_date.as_deref()) {
            description.push_str(&format!("\nLast updated (according to GEO): {updated}"));
        }

        Ok(Some(BioAssay {
            name,
            description,
            accession: DatabaseEntry {
                accession: strip_split_suffix(accession).to_string(),
                version: None,
                database: geo,
            },
            array_designs_used,
            sample_used: target.index,
            raw_data_file: remote_file(sample.supplementary_file.as_deref()),
            is_outlier: false,
        }))
    }

    /// Converts every platform the sample was run on and returns their short names.
    fn array_designs(
        &self,
        sample: &GeoSample,
        platforms: &[GeoPlatform],
        context: &mut ConversionContext,
    ) -> Result<Vec<String>, ConvertError> {
        if sample.platforms.is_empty() {
            return Err(ConvertError::SampleWithoutPlatform(sample.accession.clone()));
        }
        let converter = PlatformConverter::new(self.settings, self.services);
        let mut used = Vec::with_capacity(sample.platforms.len());
        for accession in &sample.platforms {
            let platform = platforms
                .iter()
                .find(|platform| &platform.accession == accession)
                .ok_or_else(|| ConvertError::UnknownPlatform {
                    platform: accession.clone(),
                    owner: sample.accession.clone(),
                })?;
            let design = converter.convert(platform, context)?;
            used.push(design.short_name.clone());
        }
        Ok(used)
    }
}

fn matching_value(
    sample: &str,
    design: &ExperimentalDesign,
    value: &FactorValue,
) -> Result<FactorValueRef, ConvertError> {
    design.find_factor_value(value.key()).ok_or_else(|| {
        let (category, text) = value.key();
        ConvertError::SampleFactorMismatch {
            sample: sample.to_string(),
            category: category.unwrap_or("(none)").to_string(),
            value: text.to_string(),
        }
    })
}

/// Writes one channel's treatments, characteristics and organism onto the sample's
/// biomaterial.
fn convert_channel(
    sample: &str,
    channel: &GeoChannel,
    material: &mut BioMaterial,
) -> Result<(), ConvertError> {
    let number = channel.channel_number;
    if material.description.is_empty() {
        material.description = format!("Channel {number}");
    } else {
        material.description.push_str(&format!(";Channel {number}"));
    }
    if let Some(text) = non_blank(channel.description.as_deref()) {
        material.description.push_str(&format!(" {text}"));
    }

    let protocols = [
        ("growth", channel.growth_protocol.as_deref()),
        ("treatment", channel.treatment_protocol.as_deref()),
        ("extraction", channel.extract_protocol.as_deref()),
        ("labeling", channel.label_protocol.as_deref()),
    ];
    for (kind, protocol) in protocols {
        if let Some(protocol) = non_blank(protocol) {
            material.treatments.push(Treatment {
                name: format!("{sample} channel {number} {kind}"),
                description: protocol.to_string(),
            });
        }
    }

    for raw in &channel.characteristics {
        if raw.trim().is_empty() {
            continue;
        }
        material.characteristics.push(parse_characteristic(&truncate(raw)));
    }

    if let Some(source) = non_blank(channel.source_name.as_deref()) {
        material.characteristics.push(Characteristic {
            description: Some("GEO Sample source".to_string()),
            ..categorized(BIO_SOURCE, truncate(source))
        });
    }

    if let Some(organism) = non_blank(channel.organism.as_deref()) {
        match material.source_taxon.as_ref() {
            Some(existing) if existing.scientific_name != organism => {
                return Err(ConvertError::ChannelTaxonConflict {
                    sample: sample.to_string(),
                    first: existing.scientific_name.clone(),
                    second: organism.to_string(),
                });
            }
            Some(_) => {}
            None => material.source_taxon = Some(Arc::new(Taxon::named(organism))),
        }
    }

    if let Some(molecule) = non_blank(channel.molecule.as_deref()) {
        material.characteristics.push(Characteristic {
            category: Some(MATERIAL_TYPE.to_string()),
            description: Some("GEO Sample molecule".to_string()),
            ..Characteristic::unstructured(molecule)
        });
    }

    if let Some(label) = non_blank(channel.label.as_deref()) {
        material.characteristics.push(Characteristic {
            description: Some("GEO Sample label".to_string()),
            ..categorized(LABEL_COMPOUND, truncate(label))
        });
    }
    Ok(())
}

/// `"Category: value"` becomes a structured characteristic when the category maps to a
/// vocabulary term; anything else is kept verbatim.
pub fn parse_characteristic(text: &str) -> Characteristic {
    let fields: Vec<&str> = text.split(':').collect();
    if let [category, value] = fields.as_slice() {
        let term = category
            .trim()
            .parse::<VariableType>()
            .ok()
            .and_then(category_term);
        if let Some(term) = term {
            return Characteristic {
                description: Some(CHARACTERISTIC_DESCRIPTION.to_string()),
                ..categorized(term, value.trim())
            };
        }
    }
    debug!(characteristic = text, "storing characteristic as free text");
    Characteristic {
        description: Some(CHARACTERISTIC_DESCRIPTION.to_string()),
        ..Characteristic::unstructured(text)
    }
}

/// Caps overlong free text at 199 characters plus a marker.
pub fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CHARACTERISTIC_LENGTH {
        return text.to_string();
    }
    warn!(length = text.chars().count(), "characteristic too long, truncating");
    let head: String = text.chars().take(TRUNCATED_LENGTH).collect();
    format!("{head} (truncated at 200 characters)")
}

/// Remote URL of a supplementary file; blank, "NONE" and malformed values give none.
pub fn remote_file(file: Option<&str>) -> Option<LocalFile> {
    let file = non_blank(file)?;
    if file.eq_ignore_ascii_case("NONE") {
        return None;
    }
    match Url::parse(file) {
        Ok(remote_url) => Some(LocalFile { remote_url }),
        Err(err) => {
            error!(file, error = %err, "malformed supplementary file URL, not stored");
            None
        }
    }
}
