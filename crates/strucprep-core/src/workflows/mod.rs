//! # Workflows Module
//!
//! High-level entry points that run a complete structure build.
//!
//! ## Overview
//!
//! A build reads a structure file, classifies its residues, assembles the
//! asymmetric unit with its links and segments, applies requested sequence
//! modifications and activates one biological assembly. The result is a
//! [`crate::core::models::molecule::Molecule`] ready for script generation.
//!
//! ## Architecture
//!
//! - **Build Workflow** ([`build`]) - The end-to-end procedure
//! - **Configuration** ([`config`]) - `BuildConfig` and its builder
//! - **Errors** ([`error`]) - `BuildError`, aggregating every failure a build can hit

pub mod build;
pub mod config;
pub mod error;
