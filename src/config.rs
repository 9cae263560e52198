use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConvertError;
use crate::model::ExternalDatabase;

pub const CONFIG_FILE: &str = "geo-convert.json";
pub const DEFAULT_MAX_ELEMENTS: usize = 100_000;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub max_elements: Option<usize>,
    #[serde(default)]
    pub split_by_platform: Option<bool>,
    #[serde(default)]
    pub force_convert_elements: Option<bool>,
    #[serde(default)]
    pub organism_databases: Option<BTreeMap<String, DatabaseEntry>>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DatabaseEntry {
    Shorthand(String),
    Detailed(DatabaseEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatabaseEntryObject {
    pub name: String,
    #[serde(default)]
    pub web_uri: Option<String>,
}

/// Immutable settings shared by every conversion in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConverterSettings {
    /// Probe count above which strict element selection applies; also the hard ceiling.
    pub too_many_elements: usize,
    pub split_by_platform: bool,
    pub force_convert_elements: bool,
    /// Organism scientific name -> database holding its ORF identifiers.
    pub organism_databases: BTreeMap<String, ExternalDatabase>,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            too_many_elements: DEFAULT_MAX_ELEMENTS,
            split_by_platform: false,
            force_convert_elements: false,
            organism_databases: default_organism_databases(),
        }
    }
}

impl ConverterSettings {
    /// Database for ORF identifiers of `organism`, or a placeholder named after it.
    pub fn organism_database(&self, organism: &str) -> ExternalDatabase {
        self.organism_databases
            .get(organism)
            .cloned()
            .unwrap_or_else(|| ExternalDatabase::named(format!("{organism} ORFs")))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub source: Option<PathBuf>,
    pub settings: ConverterSettings,
    pub blacklist: Vec<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the explicit path, else `geo-convert.json` in the working directory, else the
    /// per-user config file. With no file anywhere the defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ConvertError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::implicit_path(),
        };
        let Some(config_path) = config_path else {
            debug!("no config file found, using defaults");
            return Self::resolve_config(Config::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConvertError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ConvertError::ConfigParse(err.to_string()))?;

        let mut resolved = Self::resolve_config(config)?;
        resolved.source = Some(config_path);
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ConvertError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let too_many_elements = config.max_elements.unwrap_or(DEFAULT_MAX_ELEMENTS);
        if too_many_elements == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_elements must be greater than zero".to_string(),
            ));
        }

        let organism_databases = match config.organism_databases {
            Some(entries) => entries
                .into_iter()
                .map(|(organism, entry)| {
                    let database = match entry {
                        DatabaseEntry::Shorthand(name) => ExternalDatabase::named(name),
                        DatabaseEntry::Detailed(obj) => ExternalDatabase {
                            name: obj.name,
                            web_uri: obj.web_uri,
                        },
                    };
                    if database.name.trim().is_empty() {
                        return Err(ConvertError::InvalidConfig(format!(
                            "empty database name for {organism}"
                        )));
                    }
                    Ok((organism, database))
                })
                .collect::<Result<BTreeMap<_, _>, ConvertError>>()?,
            None => default_organism_databases(),
        };

        Ok(ResolvedConfig {
            schema_version,
            source: None,
            settings: ConverterSettings {
                too_many_elements,
                split_by_platform: config.split_by_platform.unwrap_or(false),
                force_convert_elements: config.force_convert_elements.unwrap_or(false),
                organism_databases,
            },
            blacklist: config.blacklist,
        })
    }

    fn implicit_path() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("geo-convert").join("config.json"))
            .filter(|path| path.exists())
    }
}

pub fn default_organism_databases() -> BTreeMap<String, ExternalDatabase> {
    [
        ("Saccharomyces cerevisiae", "SGD"),
        ("Schizosaccharomyces pombe", "GeneDB"),
    ]
    .into_iter()
    .map(|(organism, name)| (organism.to_string(), ExternalDatabase::named(name)))
    .collect()
}
