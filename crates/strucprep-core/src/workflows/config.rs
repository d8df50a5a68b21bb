use crate::core::io::StructureFormat;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Sequence modifications as shortcodes, applied in the order
/// deletions, substitutions, mutations, cleavages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationConfig {
    pub deletions: Vec<String>,
    pub substitutions: Vec<String>,
    pub mutations: Vec<String>,
    pub cleavages: Vec<String>,
}

impl ModificationConfig {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty()
            && self.substitutions.is_empty()
            && self.mutations.is_empty()
            && self.cleavages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainIdConfig {
    /// Deposited chain identifier to the identifier it should carry.
    pub remap: BTreeMap<String, String>,
    /// Deposited chain identifier to the identifiers kept for its symmetry copies.
    pub transform_reserves: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub structure_path: PathBuf,
    /// Overrides detection from the file extension.
    pub format: Option<StructureFormat>,
    pub segtype_registry_path: Option<PathBuf>,
    pub chain_ids: ChainIdConfig,
    pub assembly_index: usize,
    pub modifications: ModificationConfig,
}

#[derive(Default)]
pub struct BuildConfigBuilder {
    structure_path: Option<PathBuf>,
    format: Option<StructureFormat>,
    segtype_registry_path: Option<PathBuf>,
    remap: BTreeMap<String, String>,
    transform_reserves: BTreeMap<String, Vec<String>>,
    assembly_index: Option<usize>,
    modifications: ModificationConfig,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn structure_path(mut self, path: PathBuf) -> Self {
        self.structure_path = Some(path);
        self
    }

    pub fn format(mut self, format: StructureFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn segtype_registry_path(mut self, path: PathBuf) -> Self {
        self.segtype_registry_path = Some(path);
        self
    }

    pub fn chain_remap(mut self, remap: BTreeMap<String, String>) -> Self {
        self.remap = remap;
        self
    }

    pub fn transform_reserves(mut self, reserves: BTreeMap<String, Vec<String>>) -> Self {
        self.transform_reserves = reserves;
        self
    }

    pub fn assembly_index(mut self, index: usize) -> Self {
        self.assembly_index = Some(index);
        self
    }

    pub fn mutation(mut self, shortcode: &str) -> Self {
        self.modifications.mutations.push(shortcode.to_string());
        self
    }

    pub fn deletion(mut self, shortcode: &str) -> Self {
        self.modifications.deletions.push(shortcode.to_string());
        self
    }

    pub fn substitution(mut self, shortcode: &str) -> Self {
        self.modifications.substitutions.push(shortcode.to_string());
        self
    }

    pub fn cleavage(mut self, shortcode: &str) -> Self {
        self.modifications.cleavages.push(shortcode.to_string());
        self
    }

    pub fn modifications(mut self, modifications: ModificationConfig) -> Self {
        self.modifications = modifications;
        self
    }

    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        Ok(BuildConfig {
            structure_path: self
                .structure_path
                .ok_or(ConfigError::MissingParameter("structure_path"))?,
            format: self.format,
            segtype_registry_path: self.segtype_registry_path,
            chain_ids: ChainIdConfig {
                remap: self.remap,
                transform_reserves: self.transform_reserves,
            },
            assembly_index: self.assembly_index.unwrap_or(0),
            modifications: self.modifications,
        })
    }
}
