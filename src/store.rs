//! Persistence collaborators the converter calls into, and an in-memory implementation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConvertError;
use crate::model::{ExternalDatabase, Taxon};

pub const GENBANK: &str = "Genbank";
pub const GEO: &str = "GEO";
pub const PUBMED: &str = "PubMed";

pub trait TaxonStore: Send + Sync {
    /// Returns the stored taxon with the candidate's scientific name, creating it if needed.
    fn find_or_create(&self, candidate: Taxon) -> Result<Arc<Taxon>, ConvertError>;
    fn find_by_abbreviation(&self, abbreviation: &str) -> Result<Option<Arc<Taxon>>, ConvertError>;
    fn find_by_common_name(&self, common_name: &str) -> Result<Option<Arc<Taxon>>, ConvertError>;
    /// Loads lazy associations, notably the parent taxon.
    fn thaw(&self, taxon: &Arc<Taxon>) -> Result<Arc<Taxon>, ConvertError>;
}

pub trait ExternalDatabaseRegistry: Send + Sync {
    fn find(&self, name: &str) -> Result<Option<ExternalDatabase>, ConvertError>;
}

pub trait Blacklist: Send + Sync {
    fn is_blacklisted(&self, accession: &str) -> Result<bool, ConvertError>;
}

/// The collaborators one conversion run calls into.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub taxa: &'a dyn TaxonStore,
    pub databases: &'a dyn ExternalDatabaseRegistry,
    pub blacklist: &'a dyn Blacklist,
}

impl<'a> Collaborators<'a> {
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: TaxonStore + ExternalDatabaseRegistry + Blacklist,
    {
        Self {
            taxa: store,
            databases: store,
            blacklist: store,
        }
    }
}

/// Taxon description used to seed a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonSeed {
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub abbreviation: Option<String>,
    /// Scientific name of a previously listed taxon.
    pub parent: Option<String>,
}

#[derive(Debug, Default)]
struct TaxonTable {
    taxa: Vec<Arc<Taxon>>,
    next_id: u64,
}

impl TaxonTable {
    fn by_scientific_name(&self, name: &str) -> Option<&Arc<Taxon>> {
        self.taxa
            .iter()
            .find(|taxon| taxon.scientific_name.eq_ignore_ascii_case(name))
    }

    fn insert(&mut self, mut taxon: Taxon) -> Arc<Taxon> {
        self.next_id += 1;
        taxon.id = Some(self.next_id);
        let taxon = Arc::new(taxon);
        self.taxa.push(Arc::clone(&taxon));
        taxon
    }
}

/// In-process stand-in for the warehouse persistence layer.
#[derive(Debug)]
pub struct MemoryStore {
    taxa: Mutex<TaxonTable>,
    databases: Vec<ExternalDatabase>,
    blacklist: HashSet<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            taxa: Mutex::new(TaxonTable::default()),
            databases: [GENBANK, GEO, PUBMED]
                .into_iter()
                .map(ExternalDatabase::named)
                .collect(),
            blacklist: HashSet::new(),
        }
    }

    pub fn with_taxa(self, seeds: Vec<TaxonSeed>) -> Result<Self, ConvertError> {
        {
            let mut table = self.lock()?;
            for seed in seeds {
                let parent = match seed.parent.as_deref() {
                    Some(name) => Some(Arc::clone(table.by_scientific_name(name).ok_or_else(
                        || {
                            ConvertError::InputParse(format!(
                                "taxon {} names unknown parent {name}",
                                seed.scientific_name
                            ))
                        },
                    )?)),
                    None => None,
                };
                table.insert(Taxon {
                    id: None,
                    scientific_name: seed.scientific_name,
                    common_name: seed.common_name,
                    abbreviation: seed.abbreviation,
                    is_species: true,
                    parent,
                });
            }
        }
        Ok(self)
    }

    pub fn with_databases(mut self, databases: impl IntoIterator<Item = ExternalDatabase>) -> Self {
        self.databases.extend(databases);
        self
    }

    pub fn with_blacklist(mut self, accessions: impl IntoIterator<Item = String>) -> Self {
        self.blacklist.extend(accessions);
        self
    }

    pub fn taxa(&self) -> Result<Vec<Arc<Taxon>>, ConvertError> {
        Ok(self.lock()?.taxa.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, TaxonTable>, ConvertError> {
        self.taxa
            .lock()
            .map_err(|_| ConvertError::Store("taxon table lock poisoned".to_string()))
    }
}

impl TaxonStore for MemoryStore {
    fn find_or_create(&self, candidate: Taxon) -> Result<Arc<Taxon>, ConvertError> {
        let mut table = self.lock()?;
        if let Some(existing) = table.by_scientific_name(&candidate.scientific_name) {
            return Ok(Arc::clone(existing));
        }
        debug!(taxon = %candidate.scientific_name, "creating taxon");
        Ok(table.insert(candidate))
    }

    fn find_by_abbreviation(&self, abbreviation: &str) -> Result<Option<Arc<Taxon>>, ConvertError> {
        let table = self.lock()?;
        Ok(table
            .taxa
            .iter()
            .find(|taxon| {
                taxon
                    .abbreviation
                    .as_deref()
                    .is_some_and(|value| value.eq_ignore_ascii_case(abbreviation))
            })
            .cloned())
    }

    fn find_by_common_name(&self, common_name: &str) -> Result<Option<Arc<Taxon>>, ConvertError> {
        let table = self.lock()?;
        Ok(table
            .taxa
            .iter()
            .find(|taxon| {
                taxon
                    .common_name
                    .as_deref()
                    .is_some_and(|value| value.eq_ignore_ascii_case(common_name))
            })
            .cloned())
    }

    fn thaw(&self, taxon: &Arc<Taxon>) -> Result<Arc<Taxon>, ConvertError> {
        let table = self.lock()?;
        Ok(table
            .by_scientific_name(&taxon.scientific_name)
            .cloned()
            .unwrap_or_else(|| Arc::clone(taxon)))
    }
}

impl ExternalDatabaseRegistry for MemoryStore {
    fn find(&self, name: &str) -> Result<Option<ExternalDatabase>, ConvertError> {
        Ok(self
            .databases
            .iter()
            .find(|database| database.name.eq_ignore_ascii_case(name))
            .cloned())
    }
}

impl Blacklist for MemoryStore {
    fn is_blacklisted(&self, accession: &str) -> Result<bool, ConvertError> {
        Ok(self.blacklist.contains(accession))
    }
}
