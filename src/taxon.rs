use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::context::TaxonCache;
use crate::error::ConvertError;
use crate::model::Taxon;
use crate::store::TaxonStore;

const RAT: &str = "Rattus norvegicus";
const NOT_AVAILABLE: &str = "n/a";

/// Maps organism labels found in GEO records onto stored taxa.
pub struct TaxonResolver<'a> {
    store: &'a dyn TaxonStore,
}

impl<'a> TaxonResolver<'a> {
    pub fn new(store: &'a dyn TaxonStore) -> Self {
        Self { store }
    }

    /// Resolves a per-probe organism label. Unresolvable labels yield `None`.
    pub fn resolve_probe_organism(
        &self,
        cache: &mut TaxonCache,
        label: &str,
    ) -> Result<Option<Arc<Taxon>>, ConvertError> {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case(NOT_AVAILABLE) {
            return Ok(None);
        }
        if let Some(taxon) = cache.by_scientific_name(label) {
            return Ok(Some(Arc::clone(taxon)));
        }
        if let Some(taxon) = cache.by_abbreviation(label) {
            return Ok(Some(Arc::clone(taxon)));
        }

        let lowered = label.to_lowercase();
        let found = match self.store.find_by_abbreviation(&lowered)? {
            Some(taxon) => Some(taxon),
            None => self.store.find_by_common_name(&lowered)?,
        };
        match found {
            Some(taxon) => {
                debug!(label, taxon = %taxon.scientific_name, "resolved probe organism");
                if let Some(abbreviation) = taxon.abbreviation.as_deref() {
                    cache.remember_abbreviation(abbreviation, Arc::clone(&taxon));
                }
                cache.remember_abbreviation(label, Arc::clone(&taxon));
                Ok(Some(taxon))
            }
            None => {
                warn!(label, "could not resolve probe organism");
                Ok(None)
            }
        }
    }

    /// Finds or creates the taxon for a declared organism name.
    pub fn resolve_organism(
        &self,
        cache: &mut TaxonCache,
        organism: &str,
    ) -> Result<Arc<Taxon>, ConvertError> {
        let name = normalize_organism(organism);
        if let Some(taxon) = cache.by_scientific_name(&name) {
            return Ok(Arc::clone(taxon));
        }
        let taxon = self.store.find_or_create(Taxon::named(name.clone()))?;
        cache.remember_scientific_name(name, Arc::clone(&taxon));
        Ok(taxon)
    }

    /// Picks the primary taxon of a platform.
    ///
    /// A single declared taxon wins outright; several declared taxa sharing one parent
    /// resolve to that parent; otherwise the taxon with the strictly highest probe count
    /// wins, the first seen label taking ties.
    pub fn resolve_primary_platform_taxon(
        &self,
        cache: &mut TaxonCache,
        platform: &str,
        platform_taxa: &[Arc<Taxon>],
        probe_organisms: Option<&[String]>,
    ) -> Result<Arc<Taxon>, ConvertError> {
        if let [only] = platform_taxa {
            return Ok(Arc::clone(only));
        }

        if !platform_taxa.is_empty() {
            if let Some(parent) = self.common_parent(platform_taxa)? {
                debug!(platform, parent = %parent.scientific_name, "using common parent taxon");
                return Ok(parent);
            }
        }

        let mut tally: IndexMap<&str, usize> = IndexMap::new();
        for label in probe_organisms.unwrap_or_default() {
            let label = label.trim();
            if label.is_empty() || label.eq_ignore_ascii_case(NOT_AVAILABLE) {
                continue;
            }
            *tally.entry(label).or_default() += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for (label, count) in &tally {
            if best.is_none_or(|(_, highest)| *count > highest) {
                best = Some((*label, *count));
            }
        }

        if let Some((label, count)) = best {
            debug!(platform, label, count, "most frequent probe organism");
            if let Some(taxon) = self.resolve_probe_organism(cache, label)? {
                return Ok(taxon);
            }
        }
        Err(ConvertError::NoPlatformTaxon(platform.to_string()))
    }

    /// The parent shared by every taxon, when they all have the same one.
    pub fn common_parent(&self, taxa: &[Arc<Taxon>]) -> Result<Option<Arc<Taxon>>, ConvertError> {
        let mut shared: Option<Arc<Taxon>> = None;
        for taxon in taxa {
            let thawed = self.store.thaw(taxon)?;
            let Some(parent) = thawed.parent.clone() else {
                return Ok(None);
            };
            if let Some(existing) = &shared {
                if existing.scientific_name != parent.scientific_name {
                    return Ok(None);
                }
            } else {
                shared = Some(parent);
            }
        }
        Ok(shared)
    }
}

/// Collapses rat strain names onto the species.
pub fn normalize_organism(organism: &str) -> String {
    let organism = organism.trim();
    if organism.to_lowercase().starts_with(&RAT.to_lowercase()) {
        RAT.to_string()
    } else {
        organism.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rat_strains() {
        assert_eq!(normalize_organism("Rattus norvegicus (Sprague-Dawley)"), RAT);
        assert_eq!(normalize_organism("rattus norvegicus"), RAT);
        assert_eq!(normalize_organism(" Mus musculus "), "Mus musculus");
    }
}
