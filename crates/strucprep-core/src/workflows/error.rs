use super::config::ConfigError;
use crate::core::io::cif::CifError;
use crate::core::io::pdb::PdbError;
use crate::core::models::chainid::ChainIdError;
use crate::core::models::mods::ShortcodeError;
use crate::core::models::molecule::MoleculeError;
use crate::core::topology::registry::RegistryLoadError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot determine the structure format of '{0}'")]
    UnknownFormat(PathBuf),

    #[error("PDB read failed: {0}")]
    Pdb(#[from] PdbError),

    #[error("mmCIF read failed: {0}")]
    Cif(#[from] CifError),

    #[error("Segtype registry error: {0}")]
    Registry(#[from] RegistryLoadError),

    #[error("Invalid modification shortcode: {0}")]
    Shortcode(#[from] ShortcodeError),

    #[error("Chain identifier error: {0}")]
    ChainId(#[from] ChainIdError),

    #[error("Molecule build failed: {0}")]
    Molecule(#[from] MoleculeError),
}
