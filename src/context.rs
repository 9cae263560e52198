use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{ArrayDesign, Taxon};

/// Taxa resolved so far in a run, keyed by scientific name and by abbreviation.
#[derive(Debug, Default)]
pub struct TaxonCache {
    by_scientific_name: HashMap<String, Arc<Taxon>>,
    by_abbreviation: HashMap<String, Arc<Taxon>>,
}

impl TaxonCache {
    pub fn by_scientific_name(&self, name: &str) -> Option<&Arc<Taxon>> {
        self.by_scientific_name.get(name)
    }

    pub fn by_abbreviation(&self, abbreviation: &str) -> Option<&Arc<Taxon>> {
        self.by_abbreviation.get(abbreviation)
    }

    pub fn remember_scientific_name(&mut self, name: impl Into<String>, taxon: Arc<Taxon>) {
        self.by_scientific_name.insert(name.into(), taxon);
    }

    pub fn remember_abbreviation(&mut self, abbreviation: impl Into<String>, taxon: Arc<Taxon>) {
        self.by_abbreviation.insert(abbreviation.into(), taxon);
    }

    pub fn len(&self) -> usize {
        self.by_scientific_name.len() + self.by_abbreviation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State accumulated over one conversion run. Owned by the caller; give each worker its own.
#[derive(Debug, Default)]
pub struct ConversionContext {
    pub taxa: TaxonCache,
    platforms: IndexMap<String, ArrayDesign>,
    /// platform -> GEO probe identifier -> warehouse probe name
    probe_names: HashMap<String, HashMap<String, String>>,
    /// platform -> probe name -> index into the design's composite sequences
    design_elements: HashMap<String, HashMap<String, usize>>,
}

impl ConversionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn array_design(&self, accession: &str) -> Option<&ArrayDesign> {
        self.platforms.get(accession)
    }

    pub fn array_designs(&self) -> impl Iterator<Item = &ArrayDesign> {
        self.platforms.values()
    }

    pub fn has_platform(&self, accession: &str) -> bool {
        self.platforms.contains_key(accession)
    }

    pub(crate) fn insert_platform(&mut self, accession: &str, design: ArrayDesign) {
        self.platforms.insert(accession.to_string(), design);
        self.design_elements.entry(accession.to_string()).or_default();
    }

    pub(crate) fn seed_probe_names(&mut self, platform: &str, names: &HashMap<String, String>) {
        let mapping = self.probe_names.entry(platform.to_string()).or_default();
        for (id, name) in names {
            mapping.entry(id.clone()).or_insert_with(|| name.clone());
        }
    }

    /// Warehouse name for a GEO probe identifier, registering the identity mapping when
    /// none was declared.
    pub(crate) fn probe_name(&mut self, platform: &str, id: &str) -> String {
        self.probe_names
            .entry(platform.to_string())
            .or_default()
            .entry(id.to_string())
            .or_insert_with(|| id.to_string())
            .clone()
    }

    /// Resolves a data-file design element name, trying an upper-cased match once.
    pub fn mapped_probe_name(&self, platform: &str, id: &str) -> Option<&str> {
        let mapping = self.probe_names.get(platform)?;
        mapping
            .get(id)
            .or_else(|| mapping.get(&id.to_uppercase()))
            .map(String::as_str)
    }

    pub(crate) fn push_design_element(&mut self, platform: &str, name: String, index: usize) {
        self.design_elements
            .entry(platform.to_string())
            .or_default()
            .insert(name, index);
    }

    pub fn design_element(&self, platform: &str, name: &str) -> Option<usize> {
        self.design_elements.get(platform)?.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn probe_name_defaults_to_identifier() {
        let mut context = ConversionContext::new();
        assert_eq!(context.probe_name("GPL1", "p1"), "p1");
        assert_eq!(context.mapped_probe_name("GPL1", "p1"), Some("p1"));
    }

    #[test]
    fn declared_probe_names_take_precedence() {
        let mut context = ConversionContext::new();
        let declared: HashMap<String, String> =
            [("p1".to_string(), "PROBE-1".to_string())].into_iter().collect();
        context.seed_probe_names("GPL1", &declared);
        assert_eq!(context.probe_name("GPL1", "p1"), "PROBE-1");
    }

    #[test]
    fn mapped_probe_name_falls_back_to_upper_case() {
        let mut context = ConversionContext::new();
        context.probe_name("GPL1", "AFFX-BIOB");
        assert_eq!(context.mapped_probe_name("GPL1", "affx-biob"), Some("AFFX-BIOB"));
        assert_eq!(context.mapped_probe_name("GPL1", "missing"), None);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut context = ConversionContext::new();
        context.probe_name("GPL1", "p1");
        context
            .taxa
            .remember_scientific_name("Mus musculus", Arc::new(Taxon::named("Mus musculus")));
        context.clear();
        assert!(context.taxa.is_empty());
        assert_eq!(context.mapped_probe_name("GPL1", "p1"), None);
    }
}
