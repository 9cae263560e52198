#![allow(dead_code)]

use geo_convert::config::ConverterSettings;
use geo_convert::domain::{ExperimentType, SeriesType};
use geo_convert::geo::{
    GeoChannel, GeoDataset, GeoPlatform, GeoSample, GeoSeries, GeoValues, PlatformValues,
};
use geo_convert::store::{Collaborators, MemoryStore, TaxonSeed};
use indexmap::IndexMap;

pub fn settings() -> ConverterSettings {
    ConverterSettings::default()
}

pub fn services(store: &MemoryStore) -> Collaborators<'_> {
    Collaborators::from_store(store)
}

pub fn seed(name: &str, parent: Option<&str>) -> TaxonSeed {
    TaxonSeed {
        scientific_name: name.to_string(),
        parent: parent.map(str::to_string),
        ..TaxonSeed::default()
    }
}

/// Single-channel platform with an `ID` column holding `probes`.
pub fn platform(accession: &str, organism: &str, probes: &[&str]) -> GeoPlatform {
    GeoPlatform {
        accession: accession.to_string(),
        title: format!("{accession} test array"),
        technology: Some("in situ oligonucleotide".to_string()),
        organisms: vec![organism.to_string()],
        column_names: vec!["ID".to_string()],
        column_descriptions: vec![String::new()],
        columns: vec![probes.iter().map(|probe| probe.to_string()).collect()],
        ..GeoPlatform::default()
    }
}

pub fn sample(accession: &str, platform: &str, organism: &str) -> GeoSample {
    GeoSample {
        accession: accession.to_string(),
        title: format!("{accession} title"),
        platforms: vec![platform.to_string()],
        channels: vec![GeoChannel {
            channel_number: 1,
            organism: Some(organism.to_string()),
            source_name: Some("liver".to_string()),
            ..GeoChannel::default()
        }],
        column_names: vec!["ID_REF".to_string(), "VALUE".to_string()],
        column_descriptions: vec![String::new(), "MAS5 signal".to_string()],
        ..GeoSample::default()
    }
}

/// VALUE rows for each (sample, probe), value = sample index * 100 + probe index.
pub fn values(samples: &[&str], probes: &[&str]) -> PlatformValues {
    let mut by_sample = IndexMap::new();
    for (s, sample) in samples.iter().enumerate() {
        let rows: IndexMap<String, Vec<Option<String>>> = probes
            .iter()
            .enumerate()
            .map(|(p, probe)| {
                (
                    probe.to_string(),
                    vec![Some(format!("{}.5", s * 100 + p))],
                )
            })
            .collect();
        by_sample.insert(sample.to_string(), rows);
    }
    PlatformValues {
        quantitation_types: vec!["VALUE".to_string()],
        samples: by_sample,
    }
}

/// GSE1: GSM1 and GSM2 on GPL1 (three probes), one biomaterial per sample.
pub fn simple_series() -> GeoSeries {
    let probes = ["p1", "p2", "p3"];
    let mut platforms = IndexMap::new();
    platforms.insert("GPL1".to_string(), values(&["GSM1", "GSM2"], &probes));
    GeoSeries {
        accession: "GSE1".to_string(),
        title: "Liver time course".to_string(),
        summaries: vec!["Two liver samples.".to_string()],
        series_types: vec![SeriesType::GeneExpressionByArray],
        platforms: vec![platform("GPL1", "Homo sapiens", &probes)],
        samples: vec![
            sample("GSM1", "GPL1", "Homo sapiens"),
            sample("GSM2", "GPL1", "Homo sapiens"),
        ],
        sample_correspondence: vec![vec!["GSM1".to_string()], vec!["GSM2".to_string()]],
        values: GeoValues { platforms },
        ..GeoSeries::default()
    }
}

/// GSE2: human samples on GPL1, mouse samples on GPL2.
pub fn two_species_series() -> GeoSeries {
    let probes = ["p1", "p2"];
    let mut platforms = IndexMap::new();
    platforms.insert("GPL1".to_string(), values(&["GSM1", "GSM2"], &probes));
    platforms.insert("GPL2".to_string(), values(&["GSM3"], &probes));
    GeoSeries {
        accession: "GSE2".to_string(),
        title: "Cross species".to_string(),
        series_types: vec![SeriesType::GeneExpressionByArray],
        platforms: vec![
            platform("GPL1", "Homo sapiens", &probes),
            platform("GPL2", "Mus musculus", &probes),
        ],
        samples: vec![
            sample("GSM1", "GPL1", "Homo sapiens"),
            sample("GSM2", "GPL1", "Homo sapiens"),
            sample("GSM3", "GPL2", "Mus musculus"),
        ],
        sample_correspondence: vec![
            vec!["GSM1".to_string()],
            vec!["GSM2".to_string()],
            vec!["GSM3".to_string()],
        ],
        values: GeoValues { platforms },
        ..GeoSeries::default()
    }
}

pub fn dataset(accession: &str, platform: &str, samples: &[&str]) -> GeoDataset {
    GeoDataset {
        accession: accession.to_string(),
        title: format!("{accession} title"),
        description: String::new(),
        platform: platform.to_string(),
        organism: "Homo sapiens".to_string(),
        experiment_type: ExperimentType::GeneExpressionArrayBased,
        column_names: samples.iter().map(|sample| sample.to_string()).collect(),
        subsets: Vec::new(),
        update_date: Some("2004-05-01".to_string()),
    }
}
