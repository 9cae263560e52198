use serde::Serialize;
use tracing::{info, warn};

use crate::config::ConverterSettings;
use crate::context::ConversionContext;
use crate::error::ConvertError;
use crate::geo::{DatasetRecord, GeoPlatform, GeoRecord, GeoSeries};
use crate::model::{ArrayDesign, ExpressionExperiment};
use crate::platform::PlatformConverter;
use crate::series::SeriesConverter;
use crate::store::Collaborators;

/// Everything one batch produced, ready to hand to persistence.
#[derive(Debug, Default, Serialize)]
pub struct ConversionResults {
    pub experiments: Vec<ExpressionExperiment>,
    pub array_designs: Vec<ArrayDesign>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionTally {
    pub platforms: usize,
    pub series: usize,
    pub datasets: usize,
    pub experiments: usize,
}

/// Entry point: converts parsed GEO records into warehouse entities.
pub struct GeoConverter<'a> {
    settings: &'a ConverterSettings,
    services: Collaborators<'a>,
}

impl<'a> GeoConverter<'a> {
    pub fn new(settings: &'a ConverterSettings, services: Collaborators<'a>) -> Self {
        Self { settings, services }
    }

    /// Converts `records` in order. Platforms converted along the way stay in `context`, so
    /// later records in the batch (and later batches, until [`ConversionContext::clear`])
    /// reuse them.
    pub fn convert(
        &self,
        records: &[GeoRecord],
        context: &mut ConversionContext,
    ) -> Result<ConversionResults, ConvertError> {
        let mut experiments = Vec::new();
        let mut tally = ConversionTally::default();
        for record in records {
            match record {
                GeoRecord::Platform(platform) => {
                    self.convert_platform(platform, context)?;
                    tally.platforms += 1;
                }
                GeoRecord::Series(series) => {
                    experiments.extend(self.convert_series(series, context)?);
                    tally.series += 1;
                }
                GeoRecord::Dataset(record) => {
                    experiments.extend(self.convert_dataset(record, context)?);
                    tally.datasets += 1;
                }
            }
        }
        tally.experiments = experiments.len();
        info!(
            platforms = tally.platforms,
            series = tally.series,
            datasets = tally.datasets,
            experiments = tally.experiments,
            "conversion finished"
        );

        Ok(ConversionResults {
            experiments,
            array_designs: context.array_designs().cloned().collect(),
        })
    }

    pub fn convert_platform<'c>(
        &self,
        platform: &GeoPlatform,
        context: &'c mut ConversionContext,
    ) -> Result<&'c ArrayDesign, ConvertError> {
        PlatformConverter::new(self.settings, self.services).convert(platform, context)
    }

    pub fn convert_series(
        &self,
        series: &GeoSeries,
        context: &mut ConversionContext,
    ) -> Result<Vec<ExpressionExperiment>, ConvertError> {
        SeriesConverter::new(self.settings, self.services).convert(series, context)
    }

    /// Converts the single series a dataset came from. The dataset is attached to the series
    /// when the series does not list it already.
    pub fn convert_dataset(
        &self,
        record: &DatasetRecord,
        context: &mut ConversionContext,
    ) -> Result<Option<ExpressionExperiment>, ConvertError> {
        let dataset = &record.dataset;
        let series = match record.series.as_slice() {
            [] => return Err(ConvertError::DatasetWithoutSeries(dataset.accession.clone())),
            [series] => series,
            _ => {
                return Err(ConvertError::DatasetWithMultipleSeries(
                    dataset.accession.clone(),
                ));
            }
        };

        let experiments = if series
            .datasets
            .iter()
            .any(|known| known.accession == dataset.accession)
        {
            self.convert_series(series, context)?
        } else {
            let mut series = series.clone();
            series.datasets.push(dataset.clone());
            self.convert_series(&series, context)?
        };

        if experiments.len() > 1 {
            warn!(
                dataset = %dataset.accession,
                experiments = experiments.len(),
                "dataset series was split, keeping the first experiment"
            );
        }
        Ok(experiments.into_iter().next())
    }
}
