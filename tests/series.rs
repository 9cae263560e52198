mod common;

use assert_matches::assert_matches;
use geo_convert::codec::{DecodedValues, decode};
use geo_convert::config::ConverterSettings;
use geo_convert::context::ConversionContext;
use geo_convert::domain::{ExperimentType, SeriesType, VariableType};
use geo_convert::error::ConvertError;
use geo_convert::geo::{GeoSeries, GeoSubset, GeoValues, GeoVariable};
use geo_convert::model::{ExpressionExperiment, FactorValueRef};
use geo_convert::series::SeriesConverter;
use geo_convert::store::MemoryStore;

use common::{
    dataset, platform, sample, services, settings, simple_series, two_species_series, values,
};
use indexmap::IndexMap;

fn assays(experiment: &ExpressionExperiment) -> Vec<&str> {
    experiment
        .bio_assays
        .iter()
        .map(|assay| assay.accession.accession.as_str())
        .collect()
}

/// GSM1..GSM3 on the given platforms, each probed on p1 and p2, one biomaterial per sample.
fn three_sample_series(
    accession: &str,
    platforms: &[(&str, &str)],
    samples: &[(&str, &str, &str)],
) -> GeoSeries {
    let probes = ["p1", "p2"];
    let mut by_platform = IndexMap::new();
    for (gpl, _) in platforms {
        let on_platform: Vec<&str> = samples
            .iter()
            .filter(|(_, platform, _)| platform == gpl)
            .map(|(gsm, _, _)| *gsm)
            .collect();
        by_platform.insert(gpl.to_string(), values(&on_platform, &probes));
    }
    GeoSeries {
        accession: accession.to_string(),
        title: "Mixed".to_string(),
        series_types: vec![SeriesType::GeneExpressionByArray],
        platforms: platforms
            .iter()
            .map(|(gpl, organism)| platform(gpl, organism, &probes))
            .collect(),
        samples: samples
            .iter()
            .map(|(gsm, gpl, organism)| sample(gsm, gpl, organism))
            .collect(),
        sample_correspondence: samples.iter().map(|(gsm, _, _)| vec![gsm.to_string()]).collect(),
        values: GeoValues {
            platforms: by_platform,
        },
        ..GeoSeries::default()
    }
}

#[test]
fn converts_simple_series() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut context = ConversionContext::new();
    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&simple_series(), &mut context)
        .unwrap();

    assert_eq!(experiments.len(), 1);
    let experiment = &experiments[0];
    assert_eq!(experiment.short_name, "GSE1");
    assert_eq!(experiment.name, "Liver time course");
    assert!(experiment.description.starts_with("Two liver samples."));
    assert_eq!(
        experiment.accession.as_ref().map(|entry| entry.accession.as_str()),
        Some("GSE1")
    );

    assert_eq!(experiment.bio_materials.len(), 2);
    assert_eq!(experiment.bio_materials[0].name, "GSE1_Biomat_1");
    assert_eq!(experiment.bio_materials[1].bio_assays_used_in, vec![1]);
    assert_eq!(
        experiment.bio_materials[0]
            .source_taxon
            .as_ref()
            .map(|taxon| taxon.scientific_name.as_str()),
        Some("Homo sapiens")
    );

    assert_eq!(experiment.bio_assays.len(), 2);
    assert_eq!(experiment.bio_assays[0].accession.accession, "GSM1");
    assert_eq!(experiment.bio_assays[1].sample_used, 1);
    assert_eq!(experiment.bio_assays[0].array_designs_used, vec!["GPL1".to_string()]);

    assert_eq!(experiment.bio_assay_dimensions.len(), 1);
    let dimension = &experiment.bio_assay_dimensions[0];
    assert_eq!(dimension.name, "GSE1: GSM1,GSM2,");
    assert_eq!(dimension.bio_assays, vec![0, 1]);

    assert_eq!(experiment.quantitation_types.len(), 1);
    assert!(experiment.quantitation_types[0].is_preferred);
    assert_eq!(experiment.raw_vectors.len(), 3);

    let first = &experiment.raw_vectors[0];
    assert_eq!(first.design_element, "p1");
    assert_eq!(first.array_design, "GPL1");
    assert_eq!(
        decode(&first.data, experiment.quantitation_types[0].representation).unwrap(),
        DecodedValues::Double(vec![0.5, 100.5])
    );
    assert!(context.has_platform("GPL1"));
}

#[test]
fn missing_sample_correspondence_is_fatal() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut series = simple_series();
    series.sample_correspondence.clear();
    let err = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap_err();
    assert_matches!(err, ConvertError::MissingSampleCorrespondence(acc) if acc == "GSE1");
}

#[test]
fn splits_series_by_organism() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut context = ConversionContext::new();
    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&two_species_series(), &mut context)
        .unwrap();

    let names: Vec<&str> = experiments.iter().map(|ee| ee.short_name.as_str()).collect();
    assert_eq!(names, ["GSE2.1", "GSE2.2"]);
    assert_eq!(experiments[0].name, "Cross species - Homo sapiens");
    assert_eq!(experiments[0].bio_assays.len(), 2);
    assert_eq!(experiments[1].bio_assays.len(), 1);
    assert_eq!(experiments[1].bio_assays[0].accession.accession, "GSM3");
    assert_eq!(experiments[1].raw_vectors.len(), 2);
    for experiment in &experiments {
        assert_eq!(
            experiment.accession.as_ref().map(|entry| entry.accession.as_str()),
            Some("GSE2")
        );
    }
    assert_eq!(context.array_designs().count(), 2);
}

#[test]
fn blacklisted_series_is_skipped() {
    let store = MemoryStore::new().with_blacklist(["GSE1".to_string()]);
    let settings = settings();
    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&simple_series(), &mut ConversionContext::new())
        .unwrap();
    assert!(experiments.is_empty());
}

#[test]
fn blacklisted_sample_is_left_out() {
    let store = MemoryStore::new().with_blacklist(["GSM2".to_string()]);
    let settings = settings();
    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&simple_series(), &mut ConversionContext::new())
        .unwrap();
    let experiment = &experiments[0];
    assert_eq!(experiment.bio_assays.len(), 1);
    assert_eq!(experiment.bio_materials.len(), 1);
    assert_eq!(experiment.bio_assay_dimensions[0].bio_assays, vec![0]);
    assert_eq!(experiment.raw_vectors.len(), 3);
}

#[test]
fn unsupported_series_type_yields_nothing() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut series = simple_series();
    series.series_types = vec![SeriesType::GenomeVariationByArray];
    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();
    assert!(experiments.is_empty());
}

#[test]
fn unsupported_datasets_yield_nothing() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut series = simple_series();
    let mut cgh = dataset("GDS9", "GPL1", &["GSM1", "GSM2"]);
    cgh.experiment_type = ExperimentType::ArrayCgh;
    series.datasets.push(cgh);
    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();
    assert!(experiments.is_empty());
}

#[test]
fn dataset_subsets_become_factor_values() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut series = simple_series();
    let mut gds = dataset("GDS1", "GPL1", &["GSM1", "GSM2"]);
    gds.subsets = vec![
        GeoSubset {
            accession: "GDS1_1".to_string(),
            description: "liver".to_string(),
            kind: VariableType::Tissue,
            samples: vec!["GSM1".to_string()],
        },
        GeoSubset {
            accession: "GDS1_2".to_string(),
            description: "kidney".to_string(),
            kind: VariableType::Tissue,
            samples: vec!["GSM2".to_string()],
        },
    ];
    series.datasets.push(gds);

    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();
    let experiment = &experiments[0];
    assert!(experiment.description.contains("Includes GDS1."));
    assert_eq!(experiment.raw_vectors.len(), 3);

    let factors = &experiment.experimental_design.factors;
    assert_eq!(factors.len(), 1);
    assert_eq!(factors[0].name, "tissue");
    assert_eq!(factors[0].values.len(), 2);
    assert_eq!(
        experiment.bio_materials[0].factor_values,
        vec![FactorValueRef { factor: 0, value: 0 }]
    );
    assert_eq!(
        experiment.bio_materials[1].factor_values,
        vec![FactorValueRef { factor: 0, value: 1 }]
    );
    let kidney = experiment
        .experimental_design
        .factor_value(FactorValueRef { factor: 0, value: 1 })
        .unwrap();
    assert_eq!(kidney.key(), (Some("organism part"), "kidney"));
}

#[test]
fn sample_variable_needs_design_value() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut series = simple_series();
    series.samples[0].variables.push(GeoVariable {
        kind: VariableType::Agent,
        description: "aspirin".to_string(),
        samples: Vec::new(),
    });
    let err = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap_err();
    assert_matches!(err, ConvertError::SampleFactorMismatch { sample, .. } if sample == "GSM1");
}

#[test]
fn series_variables_bind_to_samples() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut series = simple_series();
    let aspirin = GeoVariable {
        kind: VariableType::Agent,
        description: "aspirin".to_string(),
        samples: vec!["GSM1".to_string()],
    };
    series.variables.push(aspirin.clone());
    series.samples[0].variables.push(aspirin);

    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();
    let experiment = &experiments[0];
    assert_eq!(experiment.experimental_design.name, "aspirin");
    assert_eq!(experiment.bio_materials[0].factor_values.len(), 1);
    assert!(experiment.bio_materials[1].factor_values.is_empty());
}

#[test]
fn splits_series_by_dataset_organism() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut series = two_species_series();
    let mut mouse = dataset("GDS2", "GPL2", &["GSM3"]);
    mouse.organism = "Mus musculus".to_string();
    series.datasets = vec![mouse, dataset("GDS1", "GPL1", &["GSM1", "GSM2"])];

    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();

    let names: Vec<&str> = experiments.iter().map(|ee| ee.short_name.as_str()).collect();
    assert_eq!(names, ["GSE2.1", "GSE2.2"]);
    assert_eq!(assays(&experiments[0]), ["GSM3"]);
    assert_eq!(assays(&experiments[1]), ["GSM1", "GSM2"]);
    assert!(experiments[0].description.contains("Includes GDS2."));
    assert!(!experiments[0].description.contains("GDS1"));
    assert_eq!(experiments[0].raw_vectors.len(), 2);
    assert_eq!(experiments[1].raw_vectors.len(), 2);
}

#[test]
fn dataset_without_series_samples_does_not_split() {
    let store = MemoryStore::new();
    let settings = settings();
    let mut series = simple_series();
    let mut stray = dataset("GDS9", "GPL1", &["GSM99"]);
    stray.organism = "Mus musculus".to_string();
    series.datasets = vec![dataset("GDS1", "GPL1", &["GSM1", "GSM2"]), stray];

    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();

    assert_eq!(experiments.len(), 1);
    assert_eq!(experiments[0].short_name, "GSE1");
    assert_eq!(assays(&experiments[0]), ["GSM1", "GSM2"]);
    assert_eq!(experiments[0].raw_vectors.len(), 3);
}

#[test]
fn splits_shared_platform_by_sample_organism() {
    let store = MemoryStore::new();
    let settings = settings();
    let series = three_sample_series(
        "GSE3",
        &[("GPL1", "Homo sapiens")],
        &[
            ("GSM1", "GPL1", "Homo sapiens"),
            ("GSM2", "GPL1", "Mus musculus"),
            ("GSM3", "GPL1", "Homo sapiens"),
        ],
    );

    let experiments = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();

    let names: Vec<&str> = experiments.iter().map(|ee| ee.short_name.as_str()).collect();
    assert_eq!(names, ["GSE3.1", "GSE3.2"]);
    assert_eq!(experiments[1].name, "Mixed - Mus musculus");
    assert_eq!(assays(&experiments[0]), ["GSM1", "GSM3"]);
    assert_eq!(assays(&experiments[1]), ["GSM2"]);
    assert_eq!(experiments[0].raw_vectors.len(), 2);
    assert_eq!(experiments[1].raw_vectors.len(), 2);
}

#[test]
fn splits_by_platform_only_when_enabled() {
    let store = MemoryStore::new();
    let series = three_sample_series(
        "GSE4",
        &[("GPL1", "Homo sapiens"), ("GPL2", "Homo sapiens")],
        &[
            ("GSM1", "GPL1", "Homo sapiens"),
            ("GSM2", "GPL2", "Homo sapiens"),
            ("GSM3", "GPL1", "Homo sapiens"),
        ],
    );

    let settings = settings();
    let whole = SeriesConverter::new(&settings, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();
    assert_eq!(whole.len(), 1);
    assert_eq!(whole[0].bio_assay_dimensions.len(), 2);
    assert_eq!(whole[0].raw_vectors.len(), 4);

    let split = ConverterSettings {
        split_by_platform: true,
        ..ConverterSettings::default()
    };
    let experiments = SeriesConverter::new(&split, services(&store))
        .convert(&series, &mut ConversionContext::new())
        .unwrap();

    let names: Vec<&str> = experiments.iter().map(|ee| ee.short_name.as_str()).collect();
    assert_eq!(names, ["GSE4.1", "GSE4.2"]);
    assert_eq!(assays(&experiments[0]), ["GSM1", "GSM3"]);
    assert_eq!(assays(&experiments[1]), ["GSM2"]);
    for experiment in &experiments {
        assert_eq!(experiment.bio_assay_dimensions.len(), 1);
        assert_eq!(experiment.raw_vectors.len(), 2);
    }
    assert_eq!(experiments[1].bio_assays[0].array_designs_used, vec!["GPL2".to_string()]);
}
