//! # Core Module
//!
//! The building blocks every build is assembled from.
//!
//! ## Architecture
//!
//! - **Structural Model** ([`models`]) - Atoms, residues, segments, links, the
//!   asymmetric unit, symmetry transforms and the chain identifier manager
//! - **File I/O** ([`io`]) - PDB and mmCIF readers and the assembly writer
//! - **Residue Knowledge** ([`topology`]) - Segtype classification tables and
//!   the patch tables used to name covalent links
//! - **Utilities** ([`utils`]) - Dihedral measurement and reference-angle
//!   classification
//!
//! ## Data Flow
//!
//! Raw records are read into a [`io::ParsedStructure`], grouped into residues
//! and segments by [`models::asymmetric_unit::AsymmetricUnit`], and wrapped in a
//! [`models::molecule::Molecule`] together with its biological assemblies.
//! Activating an assembly drives the shared chain identifier manager to give
//! every symmetry copy its own chain identifiers.

pub mod io;
pub mod models;
pub mod topology;
pub mod utils;
