//! # strucprep Core Library
//!
//! Structural data model and topology resolution for preparing macromolecular
//! structures for simulation system builders.
//!
//! ## Architectural Philosophy
//!
//! The library is split into two layers with a one-way dependency between them.
//!
//! - **[`core`]: The Foundation.** Atom, residue and segment models, the
//!   asymmetric unit and its biological assemblies, chain identifier
//!   allocation, patch resolution for covalent links, and the PDB/mmCIF readers.
//!
//! - **[`workflows`]: The Public API.** Runs a complete build from a structure
//!   file and a [`workflows::config::BuildConfig`]: reading, residue
//!   classification, modifications and assembly activation.

pub mod core;
pub mod workflows;
