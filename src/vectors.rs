//! Assembly of raw expression data vectors for the samples of one platform.

use tracing::{debug, info, warn};

use crate::codec;
use crate::columns::detect_column_roles;
use crate::context::ConversionContext;
use crate::error::ConvertError;
use crate::geo::{GeoPlatform, GeoSample, GeoValues};
use crate::model::{BioAssayDimension, ExpressionExperiment, RawExpressionDataVector};
use crate::quantitation;

const MAX_DIMENSION_NAME: usize = 100;

/// Builds one vector per (quantitation type, design element) with data and attaches them,
/// their assay dimension and the retained quantitation types to `experiment`. Returns the
/// number of vectors added.
pub fn assemble_vectors(
    values: &GeoValues,
    experiment: &mut ExpressionExperiment,
    samples: &[&GeoSample],
    platform: &GeoPlatform,
    context: &ConversionContext,
) -> Result<usize, ConvertError> {
    let accession = platform.accession.as_str();
    if samples.is_empty() {
        debug!(platform = accession, "no samples, no vectors");
        return Ok(0);
    }
    if !platform.use_data_from_geo {
        warn!(
            platform = accession,
            "platform data from GEO is to be ignored, no vectors assembled"
        );
        return Ok(0);
    }
    check_single_platform(samples, accession)?;

    let mut samples = samples.to_vec();
    samples.sort_by(|a, b| a.accession.cmp(&b.accession));
    info!(
        platform = accession,
        samples = samples.len(),
        "converting vectors"
    );

    let dimension = assay_dimension(experiment, &samples, accession)?;
    let expected = dimension.bio_assays.len();
    let reference = check_quantitation_labels(&samples, accession)?;

    let roles = detect_column_roles(&platform.column_names);
    let design_elements = roles
        .identifier
        .as_deref()
        .and_then(|column| platform.column_data(column))
        .unwrap_or_default();
    if design_elements.is_empty() {
        warn!(platform = accession, "platform lists no design elements");
        return Ok(0);
    }

    let dimension_index = experiment.bio_assay_dimensions.len();
    experiment.bio_assay_dimensions.push(dimension);

    // Labels come from the reference sample even when samples disagree.
    let labels = &reference.column_names;
    let descriptions = &reference.column_descriptions;
    let mut added = 0;
    for (column, label) in labels.iter().enumerate().skip(1) {
        let Some(qt_index) = values.quantitation_type_index(accession, label) else {
            debug!(platform = accession, quantitation_type = %label, "no values for column");
            continue;
        };

        let rows: Vec<(&str, Vec<Option<String>>)> = design_elements
            .iter()
            .map(|name| name.trim())
            .filter_map(|name| {
                values
                    .values(accession, qt_index, &samples, name)
                    .map(|row| (name, row))
            })
            .collect();
        let present: Vec<&str> = rows
            .iter()
            .flat_map(|(_, row)| row.iter().flatten())
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
            .collect();
        if present.is_empty() {
            debug!(platform = accession, quantitation_type = %label, "all values missing");
            continue;
        }

        let description = descriptions.get(column).map(String::as_str).unwrap_or_default();
        let quantitation_type = quantitation::guess(label, description, &present);
        let qt_position = experiment.quantitation_types.len();

        let mut count = 0;
        let mut skipped = 0;
        for (name, row) in &rows {
            if row.len() != expected {
                return Err(ConvertError::VectorLengthMismatch {
                    design_element: name.to_string(),
                    expected,
                    actual: row.len(),
                });
            }
            let Some(data) = codec::encode(row, quantitation_type.representation)? else {
                skipped += 1;
                continue;
            };
            let mapped = context.mapped_probe_name(accession, name).ok_or_else(|| {
                ConvertError::UnmappedDesignElement {
                    platform: accession.to_string(),
                    name: name.to_string(),
                }
            })?;
            if context.design_element(accession, mapped).is_none() {
                return Err(ConvertError::MissingDesignElement {
                    platform: accession.to_string(),
                    name: mapped.to_string(),
                });
            }
            experiment.raw_vectors.push(RawExpressionDataVector {
                array_design: accession.to_string(),
                design_element: mapped.to_string(),
                dimension: dimension_index,
                quantitation_type: qt_position,
                data,
            });
            count += 1;
        }

        if skipped > 0 {
            debug!(platform = accession, quantitation_type = %label, skipped, "skipped all-missing vectors");
        }
        if count > 0 {
            debug!(platform = accession, quantitation_type = %label, vectors = count, "added vectors");
            experiment.quantitation_types.push(quantitation_type);
            added += count;
        } else {
            info!(
                platform = accession,
                quantitation_type = %label,
                "no vectors retained, usually because all values are missing"
            );
        }
    }

    info!(
        platform = accession,
        vectors = added,
        quantitation_types = experiment.quantitation_types.len(),
        "vectors converted"
    );
    Ok(added)
}

fn check_single_platform(samples: &[&GeoSample], platform: &str) -> Result<(), ConvertError> {
    for sample in samples {
        match sample.platforms.as_slice() {
            [] => return Err(ConvertError::SampleWithoutPlatform(sample.accession.clone())),
            [only] if only == platform => {}
            [other, ..] => {
                return Err(ConvertError::MixedPlatforms {
                    first: platform.to_string(),
                    second: if other == platform {
                        sample.platforms.get(1).cloned().unwrap_or_default()
                    } else {
                        other.clone()
                    },
                });
            }
        }
    }
    Ok(())
}

/// Dimension over the experiment's bioassays for `samples`, which must be sorted.
fn assay_dimension(
    experiment: &ExpressionExperiment,
    samples: &[&GeoSample],
    platform: &str,
) -> Result<BioAssayDimension, ConvertError> {
    let mut description = format!("{}: ", experiment.short_name);
    let mut bio_assays = Vec::with_capacity(samples.len());
    for sample in samples {
        description.push_str(&sample.accession);
        description.push(',');
        match experiment.bio_assay_index(&sample.accession) {
            Some(index) => bio_assays.push(index),
            None => warn!(sample = %sample.accession, "no bioassay matches sample"),
        }
    }
    if bio_assays.is_empty() {
        return Err(ConvertError::EmptyAssayDimension(platform.to_string()));
    }
    Ok(BioAssayDimension {
        name: abbreviate(&description, MAX_DIMENSION_NAME),
        description,
        bio_assays,
    })
}

/// Picks the first sample with data as the label reference and warns when other samples
/// disagree with it.
fn check_quantitation_labels<'s>(
    samples: &[&'s GeoSample],
    platform: &str,
) -> Result<&'s GeoSample, ConvertError> {
    let reference = samples
        .iter()
        .copied()
        .find(|sample| sample.has_usable_data())
        .ok_or_else(|| ConvertError::NoQuantitationTypes(platform.to_string()))?;
    if samples.iter().any(|sample| !sample.has_usable_data()) {
        warn!(platform, "some samples have no data, skipping quantitation type check");
        return Ok(reference);
    }
    let mismatched: Vec<&str> = samples
        .iter()
        .filter(|sample| sample.column_names != reference.column_names)
        .map(|sample| sample.accession.as_str())
        .collect();
    if let Some(last) = mismatched.last() {
        warn!(
            platform,
            reference = %reference.accession,
            mismatched = mismatched.len(),
            last,
            "samples do not have consistent quantitation type names"
        );
    }
    Ok(reference)
}

/// Cuts `text` to at most `max` characters, ending in "..." when shortened.
pub fn abbreviate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}
