//! # Core Models Module
//!
//! Data structures describing a deposited macromolecular structure and the
//! biological assemblies generated from it.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom records with coordinates, original serials and author fields
//! - [`residue`] - Residues, residue keys, up/down adjacency and residue queries
//! - [`segment`] - Segtypes, segments and resolved/missing state intervals
//! - [`topology`] - Covalent links and disulfide bonds with their patch names
//! - [`annotations`] - TER records, missing residues and sequence conflicts
//! - [`mods`] - Mutation, deletion, substitution and cleavage shortcodes
//! - [`chainid`] - Collision-free chain identifier allocation
//! - [`transform`] - Symmetry operators and biological assemblies
//! - [`asymmetric_unit`] - The aggregate owning atoms, residues and topology
//! - [`molecule`] - The asymmetric unit plus assemblies and build context
//! - [`ids`] - Stable keys for atoms, residues and links
//!
//! ## Usage
//!
//! ```ignore
//! use strucprep::core::io::{pdb::PdbFile, traits::StructureFile};
//! use strucprep::core::models::chainid::ChainIdFormat;
//! use strucprep::core::models::molecule::{BuildContext, Molecule};
//! use strucprep::core::topology::registry::SegtypeRegistry;
//!
//! let parsed = PdbFile::read_from_path("4zmj.pdb")?;
//! let mut molecule = Molecule::from_parsed(
//!     parsed,
//!     &SegtypeRegistry::new(),
//!     BuildContext::new(ChainIdFormat::Pdb),
//! )?;
//! molecule.activate_biological_assembly(1)?;
//! for line in molecule.patch_directives() {
//!     println!("{line}");
//! }
//! ```

pub mod annotations;
pub mod asymmetric_unit;
pub mod atom;
pub mod chainid;
pub mod ids;
pub mod mods;
pub mod molecule;
pub mod residue;
pub mod segment;
pub mod topology;
pub mod transform;
