//! # Residue Knowledge
//!
//! Static tables about residue names and the patches joining residues.
//!
//! - [`residues`] - Built-in segtype classification and amino-acid code tables
//! - [`registry`] - A segtype registry extendable from a TOML file
//! - [`patches`] - Patch selection for covalent links, including geometric
//!   disambiguation of anomeric and glycosidic linkages
//!
//! ```toml
//! [segtypes]
//! glycan = ["NAG", "BMA", "MAN"]
//! ligand = ["HEM"]
//! ```

pub mod patches;
pub mod registry;
pub mod residues;
