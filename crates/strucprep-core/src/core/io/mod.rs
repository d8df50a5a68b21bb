//! Provides readers for macromolecular structure formats.
//!
//! PDB files are parsed by fixed columns and mmCIF files through a small
//! tokenizer; both yield a [`ParsedStructure`] holding the raw records that
//! the asymmetric unit is built from. A PDB writer emits activated
//! biological assemblies.

pub mod cif;
pub mod pdb;
pub mod traits;

use crate::core::models::annotations::{Conflict, Missing, Ter};
use crate::core::models::atom::Atom;
use crate::core::models::chainid::ChainIdFormat;
use crate::core::models::topology::{Link, SsBond};
use crate::core::models::transform::AssemblyRecord;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StructureFormat {
    #[default]
    Pdb,
    Mmcif,
}

impl StructureFormat {
    /// Guesses the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdb" | "ent" => Some(StructureFormat::Pdb),
            "cif" | "mmcif" => Some(StructureFormat::Mmcif),
            _ => None,
        }
    }

    /// The chain identifier alphabet this format can address.
    pub fn chain_id_format(&self) -> ChainIdFormat {
        match self {
            StructureFormat::Pdb => ChainIdFormat::Pdb,
            StructureFormat::Mmcif => ChainIdFormat::Mmcif,
        }
    }
}

impl std::str::FromStr for StructureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdb" => Ok(StructureFormat::Pdb),
            "cif" | "mmcif" => Ok(StructureFormat::Mmcif),
            _ => Err(format!("Unknown structure format: {}", s)),
        }
    }
}

/// Raw records of one structure, in file order.
#[derive(Debug, Clone, Default)]
pub struct ParsedStructure {
    pub format: StructureFormat,
    pub atoms: Vec<Atom>,
    pub ters: Vec<Ter>,
    pub missings: Vec<Missing>,
    pub ssbonds: Vec<SsBond>,
    pub links: Vec<Link>,
    pub conflicts: Vec<Conflict>,
    pub assemblies: Vec<AssemblyRecord>,
    /// Chain identifiers as the depositor wrote them.
    pub author_chain_ids: Vec<String>,
}

impl ParsedStructure {
    pub fn new(format: StructureFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub(crate) fn note_author_chain(&mut self, chain_id: &str) {
        if !chain_id.is_empty() && !self.author_chain_ids.iter().any(|c| c == chain_id) {
            self.author_chain_ids.push(chain_id.to_string());
        }
    }
}
