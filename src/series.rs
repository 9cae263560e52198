//! Conversion of GEO series (and the datasets curated from them) into expression experiments.
//!
//! A series whose samples come from several organisms is split into one experiment per
//! organism, accessions `GSE1.1`, `GSE1.2`, ... in first-seen order. With split-by-platform
//! enabled the same happens per platform.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::config::ConverterSettings;
use crate::context::ConversionContext;
use crate::design::{build_design, subset_factor, subset_value};
use crate::domain::{non_blank, strip_split_suffix};
use crate::error::ConvertError;
use crate::geo::{GeoContact, GeoDataset, GeoSample, GeoSeries, GeoSubset};
use crate::model::{
    BibliographicReference, BioMaterial, Characteristic, Contact, DatabaseEntry,
    ExpressionExperiment, ExternalDatabase, FactorValueRef,
};
use crate::sample::{SampleConverter, SampleTarget, remote_file};
use crate::store::{Collaborators, GEO, PUBMED};
use crate::vectors::assemble_vectors;

const BIOMATERIAL_NAME_TAG: &str = "_Biomat_";
const KEYWORD_DESCRIPTION: &str = "Keyword from GEO series definition file.";

pub struct SeriesConverter<'a> {
    settings: &'a ConverterSettings,
    services: Collaborators<'a>,
}

/// Samples of a series grouped three ways, each in first-seen key order.
#[derive(Debug, Default)]
struct Partitions<'s> {
    by_organism: IndexMap<String, Vec<&'s GeoSample>>,
    by_sample_organism: IndexMap<String, Vec<&'s GeoSample>>,
    by_platform: IndexMap<String, Vec<&'s GeoSample>>,
}

/// What a single-series conversion leaves out.
#[derive(Debug, Default)]
struct Exclusions {
    datasets: HashSet<String>,
    samples: HashSet<String>,
}

impl<'a> SeriesConverter<'a> {
    pub fn new(settings: &'a ConverterSettings, services: Collaborators<'a>) -> Self {
        Self { settings, services }
    }

    /// Converts a series into zero or more experiments.
    pub fn convert(
        &self,
        series: &GeoSeries,
        context: &mut ConversionContext,
    ) -> Result<Vec<ExpressionExperiment>, ConvertError> {
        let accession = series.accession.as_str();
        if self.services.blacklist.is_blacklisted(strip_split_suffix(accession))? {
            info!(series = accession, "series is blacklisted, skipping");
            return Ok(Vec::new());
        }

        let partitions = classify(series);
        let parts: Vec<GeoSeries> = if partitions.by_organism.len() > 1 {
            warn!(
                series = accession,
                organisms = partitions.by_organism.len(),
                "multiple-species series, splitting by organism"
            );
            partitions
                .by_organism
                .iter()
                .enumerate()
                .map(|(i, (organism, samples))| {
                    let datasets = series
                        .datasets
                        .iter()
                        .filter(|dataset| dataset.organism.trim() == organism.as_str())
                        .cloned()
                        .collect();
                    sub_series(series, i + 1, organism, samples, datasets)
                })
                .collect()
        } else if partitions.by_sample_organism.len() > 1 {
            warn!(
                series = accession,
                organisms = partitions.by_sample_organism.len(),
                "samples from multiple species, splitting by sample organism"
            );
            partitions
                .by_sample_organism
                .iter()
                .enumerate()
                .map(|(i, (organism, samples))| {
                    let datasets = datasets_with_samples(series, samples);
                    sub_series(series, i + 1, organism, samples, datasets)
                })
                .collect()
        } else if partitions.by_platform.len() > 1 && self.settings.split_by_platform {
            info!(
                series = accession,
                platforms = partitions.by_platform.len(),
                "splitting series by platform"
            );
            partitions
                .by_platform
                .iter()
                .enumerate()
                .map(|(i, (platform, samples))| {
                    let datasets = series
                        .datasets
                        .iter()
                        .filter(|dataset| &dataset.platform == platform)
                        .cloned()
                        .collect();
                    sub_series(series, i + 1, platform, samples, datasets)
                })
                .collect()
        } else {
            return Ok(self.convert_single(series, context)?.into_iter().collect());
        };

        let mut experiments = Vec::new();
        for part in &parts {
            experiments.extend(self.convert(part, context)?);
        }
        Ok(experiments)
    }

    fn convert_single(
        &self,
        series: &GeoSeries,
        context: &mut ConversionContext,
    ) -> Result<Option<ExpressionExperiment>, ConvertError> {
        let accession = series.accession.as_str();
        info!(series = accession, "converting series");

        let exclusions = self.exclusions(series)?;
        if !series.datasets.is_empty() && exclusions.datasets.len() == series.datasets.len() {
            warn!(
                series = accession,
                "no dataset has a supported experiment type, nothing converted"
            );
            return Ok(None);
        }
        if !series.series_types.iter().any(|kind| kind.is_supported()) {
            warn!(series = accession, types = ?series.series_types, "series type is not usable");
            return Ok(None);
        }

        let mut experiment = self.experiment_shell(series)?;
        experiment.experimental_design = build_design(series);

        info!(series = accession, samples = series.samples.len(), "series samples");
        if !exclusions.samples.is_empty() {
            info!(
                series = accession,
                skipped = exclusions.samples.len(),
                "samples will be skipped"
            );
        }
        if series.sample_correspondence.is_empty() {
            return Err(ConvertError::MissingSampleCorrespondence(accession.to_string()));
        }
        self.convert_biomaterials(series, &exclusions, &mut experiment, context)?;

        let expected = series
            .samples
            .iter()
            .filter(|sample| !exclusions.samples.contains(&sample.accession))
            .count();
        let actual = experiment.bio_assays.len();
        info!(
            series = accession,
            bio_assays = actual,
            bio_materials = experiment.bio_materials.len(),
            "converted samples"
        );
        if expected > actual {
            warn!(
                series = accession,
                omitted = expected - actual,
                "samples missing from the sample correspondence were omitted"
            );
        }

        if series.datasets.is_empty() {
            if series.values.has_data() {
                self.convert_series_vectors(series, &exclusions, &mut experiment, context)?;
            }
        } else {
            for dataset in &series.datasets {
                if exclusions.datasets.contains(&dataset.accession) {
                    continue;
                }
                convert_dataset(series, dataset, &exclusions.samples, &mut experiment, context)?;
            }
        }
        Ok(Some(experiment))
    }

    /// Datasets of unsupported experiment types, their samples, and blacklisted samples.
    fn exclusions(&self, series: &GeoSeries) -> Result<Exclusions, ConvertError> {
        let mut exclusions = Exclusions::default();
        for dataset in &series.datasets {
            let samples = series.dataset_samples(dataset);
            if dataset.experiment_type.is_supported() {
                info!(
                    dataset = %dataset.accession,
                    experiment_type = ?dataset.experiment_type,
                    samples = samples.len(),
                    "dataset will be converted"
                );
                continue;
            }
            warn!(
                dataset = %dataset.accession,
                experiment_type = ?dataset.experiment_type,
                "experiment type cannot be handled, dataset skipped"
            );
            exclusions.datasets.insert(dataset.accession.clone());
            exclusions
                .samples
                .extend(samples.iter().map(|sample| sample.accession.clone()));
        }
        for sample in &series.samples {
            if self.services.blacklist.is_blacklisted(&sample.accession)? {
                info!(sample = %sample.accession, "sample is blacklisted, skipping");
                exclusions.samples.insert(sample.accession.clone());
            }
        }
        Ok(exclusions)
    }

    fn experiment_shell(&self, series: &GeoSeries) -> Result<ExpressionExperiment, ConvertError> {
        let mut description = series.summaries.join("\n");
        if !description.ends_with('\n') {
            description.push('\n');
        }
        if let Some(updated) = non_blank(series.last_update_date.as_deref()) {
            description.push_str(&format!("Last Updated (by provider): {updated}\n"));
        }

        let mut investigators: Vec<Contact> = series.contact.iter().map(contact).collect();
        if !series.contributors.is_empty() {
            let names: Vec<&str> = series
                .contributors
                .iter()
                .map(|contributor| contributor.name.as_str())
                .collect();
            description.push_str(&format!("\nContributors: {}\n", names.join(" ")));
            investigators.extend(series.contributors.iter().map(contact));
        }
        if let Some(overall) = non_blank(series.overall_design.as_deref()) {
            description.push_str(&format!("Overall design: {overall}\n"));
        }

        let primary_publication = match series.pubmed_ids.iter().find_map(|id| non_blank(Some(id.as_str()))) {
            Some(id) => Some(BibliographicReference {
                pubmed: DatabaseEntry {
                    accession: id.to_string(),
                    version: None,
                    database: self
                        .services
                        .databases
                        .find(PUBMED)?
                        .unwrap_or_else(|| ExternalDatabase::named(PUBMED)),
                },
            }),
            None => None,
        };

        let characteristics = series
            .keywords
            .iter()
            .filter_map(|keyword| non_blank(Some(keyword.as_str())))
            .map(|keyword| Characteristic {
                description: Some(KEYWORD_DESCRIPTION.to_string()),
                ..Characteristic::unstructured(keyword)
            })
            .collect();

        Ok(ExpressionExperiment {
            name: series.title.clone(),
            short_name: series.accession.clone(),
            description: description.trim_end().to_string(),
            accession: Some(DatabaseEntry {
                accession: strip_split_suffix(&series.accession).to_string(),
                version: None,
                database: self
                    .services
                    .databases
                    .find(GEO)?
                    .unwrap_or_else(|| ExternalDatabase::named(GEO)),
            }),
            investigators,
            primary_publication,
            raw_data_file: remote_file(series.supplementary_file.as_deref()),
            characteristics,
            ..ExpressionExperiment::default()
        })
    }

    /// One biomaterial per sample-correspondence group, holding the group's bioassays.
    fn convert_biomaterials(
        &self,
        series: &GeoSeries,
        exclusions: &Exclusions,
        experiment: &mut ExpressionExperiment,
        context: &mut ConversionContext,
    ) -> Result<(), ConvertError> {
        let accession = series.accession.as_str();
        let converter = SampleConverter::new(self.settings, self.services);
        let mut seen: HashSet<&str> = HashSet::new();

        for group in &series.sample_correspondence {
            if group.is_empty() {
                continue;
            }
            let index = experiment.bio_materials.len();
            let mut material = BioMaterial {
                name: format!("{accession}{BIOMATERIAL_NAME_TAG}{}", index + 1),
                description: format!("Converted from GEO series {accession}"),
                ..BioMaterial::default()
            };

            for member in group {
                let Some(sample) = series
                    .sample(member)
                    .filter(|sample| !exclusions.samples.contains(&sample.accession))
                else {
                    debug!(
                        series = accession,
                        sample = %member,
                        "no sample matches correspondence entry"
                    );
                    continue;
                };
                if !seen.insert(sample.accession.as_str()) {
                    error!(series = accession, sample = %sample.accession, "sample appears in more than one correspondence group");
                }

                let target = SampleTarget {
                    index,
                    material: &mut material,
                };
                let Some(assay) = converter.convert(
                    sample,
                    &series.platforms,
                    target,
                    &experiment.experimental_design,
                    context,
                )?
                else {
                    continue;
                };
                material.bio_assays_used_in.push(experiment.bio_assays.len());
                material.description.push_str(&format!(",{}", sample.accession));
                experiment.bio_assays.push(assay);
            }

            if !material.bio_assays_used_in.is_empty() {
                experiment.bio_materials.push(material);
            }
        }
        Ok(())
    }

    /// Vectors straight from the series value table, one batch per platform.
    fn convert_series_vectors(
        &self,
        series: &GeoSeries,
        exclusions: &Exclusions,
        experiment: &mut ExpressionExperiment,
        context: &ConversionContext,
    ) -> Result<(), ConvertError> {
        let mut by_platform: IndexMap<&str, Vec<&GeoSample>> = IndexMap::new();
        for sample in &series.samples {
            if exclusions.samples.contains(&sample.accession) {
                continue;
            }
            match sample.platforms.first() {
                Some(platform) => by_platform.entry(platform.as_str()).or_default().push(sample),
                None => return Err(ConvertError::SampleWithoutPlatform(sample.accession.clone())),
            }
        }

        for (accession, samples) in by_platform {
            let platform = series
                .platform(accession)
                .ok_or_else(|| ConvertError::UnknownPlatform {
                    platform: accession.to_string(),
                    owner: series.accession.clone(),
                })?;
            debug!(platform = accession, samples = samples.len(), "series samples on platform");
            assemble_vectors(&series.values, experiment, &samples, platform, context)?;
        }
        Ok(())
    }
}

/// Adds a dataset's descriptions, vectors and subset factors to an experiment converted from
/// its series. The dataset's platform must already have been converted.
pub fn convert_dataset(
    series: &GeoSeries,
    dataset: &GeoDataset,
    skipped_samples: &HashSet<String>,
    experiment: &mut ExpressionExperiment,
    context: &ConversionContext,
) -> Result<(), ConvertError> {
    let samples: Vec<&GeoSample> = series
        .dataset_samples(dataset)
        .into_iter()
        .filter(|sample| !skipped_samples.contains(&sample.accession))
        .collect();
    if samples.is_empty() {
        info!(dataset = %dataset.accession, "no samples remain for dataset, nothing to do");
        return Ok(());
    }
    info!(dataset = %dataset.accession, samples = samples.len(), "converting dataset");

    if experiment.description.is_empty() {
        experiment.description = dataset.description.clone();
    }
    experiment
        .description
        .push_str(&format!("\nIncludes {}.", dataset.accession));
    if let Some(updated) = non_blank(dataset.update_date.as_deref()) {
        experiment
            .description
            .push_str(&format!(" Update date: {updated}."));
    }
    if experiment.name.is_empty() {
        experiment.name = dataset.title.clone();
    } else if !dataset.title.trim().is_empty() {
        experiment.description.push_str(&format!(
            "\nDataset description {}: {}.",
            dataset.accession, dataset.title
        ));
    }

    if !context.has_platform(&dataset.platform) {
        return Err(ConvertError::PlatformNotConverted {
            dataset: dataset.accession.clone(),
            platform: dataset.platform.clone(),
        });
    }
    let platform = series
        .platform(&dataset.platform)
        .ok_or_else(|| ConvertError::UnknownPlatform {
            platform: dataset.platform.clone(),
            owner: dataset.accession.clone(),
        })?;
    assemble_vectors(&series.values, experiment, &samples, platform, context)?;

    for subset in &dataset.subsets {
        convert_subset(experiment, subset);
    }
    Ok(())
}

/// Turns a dataset subset into a factor value on the biomaterials of the subset's samples.
/// Factors are shared by subsets of the same kind.
pub fn convert_subset(experiment: &mut ExpressionExperiment, subset: &GeoSubset) -> FactorValueRef {
    debug!(subset = %subset.accession, kind = %subset.kind, "converting subset to factor");
    let design = &mut experiment.experimental_design;
    let factor = design.add_factor(subset_factor(subset));
    let value = design.factors[factor].add_value(subset_value(subset));
    let reference = FactorValueRef { factor, value };

    for sample in &subset.samples {
        let Some(assay) = experiment.bio_assay_index(sample) else {
            continue;
        };
        let material = experiment.bio_assays[assay].sample_used;
        if let Some(material) = experiment.bio_materials.get_mut(material) {
            material.add_factor_value(reference);
        }
    }
    reference
}

fn contact(contact: &GeoContact) -> Contact {
    Contact {
        name: contact.name.clone(),
        email: contact.email.clone(),
    }
}

fn classify(series: &GeoSeries) -> Partitions<'_> {
    let mut partitions = Partitions::default();
    let mut in_dataset: HashSet<&str> = HashSet::new();

    for dataset in &series.datasets {
        let samples = series.dataset_samples(dataset);
        in_dataset.extend(samples.iter().map(|sample| sample.accession.as_str()));
        push_unique(
            partitions
                .by_organism
                .entry(dataset.organism.trim().to_string())
                .or_default(),
            &samples,
        );
        push_unique(
            partitions
                .by_platform
                .entry(dataset.platform.clone())
                .or_default(),
            &samples,
        );
    }

    for sample in &series.samples {
        let platform_organism = platform_organism(series, sample);
        if !in_dataset.contains(sample.accession.as_str()) {
            let organism = platform_organism.or(sample.organism()).unwrap_or_default();
            push_unique(
                partitions.by_organism.entry(organism.to_string()).or_default(),
                &[sample],
            );
            if let Some(platform) = sample.platforms.first() {
                push_unique(
                    partitions.by_platform.entry(platform.clone()).or_default(),
                    &[sample],
                );
            }
        }
        let organism = sample.organism().or(platform_organism).unwrap_or_default();
        partitions
            .by_sample_organism
            .entry(organism.to_string())
            .or_default()
            .push(sample);
    }

    // Datasets listing none of the series' samples do not form a part.
    partitions.by_organism.retain(|_, samples| !samples.is_empty());
    partitions.by_platform.retain(|_, samples| !samples.is_empty());
    partitions
}

fn push_unique<'s>(group: &mut Vec<&'s GeoSample>, samples: &[&'s GeoSample]) {
    for sample in samples {
        if !group.iter().any(|known| known.accession == sample.accession) {
            group.push(sample);
        }
    }
}

/// First organism of the first platform the sample was run on.
fn platform_organism<'s>(series: &'s GeoSeries, sample: &GeoSample) -> Option<&'s str> {
    let platform = series.platform(sample.platforms.first()?)?;
    platform
        .organisms
        .iter()
        .map(|organism| organism.trim())
        .find(|organism| !organism.is_empty())
}

fn datasets_with_samples(series: &GeoSeries, samples: &[&GeoSample]) -> Vec<GeoDataset> {
    let kept: HashSet<&str> = samples.iter().map(|sample| sample.accession.as_str()).collect();
    series
        .datasets
        .iter()
        .filter(|dataset| {
            dataset
                .column_names
                .iter()
                .any(|sample| kept.contains(sample.as_str()))
        })
        .cloned()
        .collect()
}

/// The part of `series` covering `samples`, with the correspondence and values pruned to them.
fn sub_series(
    series: &GeoSeries,
    index: usize,
    label: &str,
    samples: &[&GeoSample],
    datasets: Vec<GeoDataset>,
) -> GeoSeries {
    let kept: HashSet<&str> = samples.iter().map(|sample| sample.accession.as_str()).collect();
    let platforms_used: HashSet<&str> = samples
        .iter()
        .flat_map(|sample| sample.platforms.iter().map(String::as_str))
        .chain(datasets.iter().map(|dataset| dataset.platform.as_str()))
        .collect();

    GeoSeries {
        accession: format!("{}.{index}", series.accession),
        title: format!("{} - {label}", series.title),
        summaries: series.summaries.clone(),
        overall_design: series.overall_design.clone(),
        last_update_date: series.last_update_date.clone(),
        series_types: series.series_types.clone(),
        contact: series.contact.clone(),
        contributors: series.contributors.clone(),
        pubmed_ids: series.pubmed_ids.clone(),
        keywords: series.keywords.clone(),
        supplementary_file: series.supplementary_file.clone(),
        platforms: series
            .platforms
            .iter()
            .filter(|platform| platforms_used.contains(platform.accession.as_str()))
            .cloned()
            .collect(),
        samples: samples.iter().map(|sample| (*sample).clone()).collect(),
        datasets,
        variables: series.variables.clone(),
        replicates: series.replicates.clone(),
        sample_correspondence: series
            .sample_correspondence
            .iter()
            .map(|group| {
                group
                    .iter()
                    .filter(|sample| kept.contains(sample.as_str()))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect(),
        values: series.values.subset(&kept),
    }
}
