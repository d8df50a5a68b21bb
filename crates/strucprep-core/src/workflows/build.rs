use super::config::{BuildConfig, ModificationConfig};
use super::error::BuildError;
use crate::core::io::cif::reader::CifFile;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::StructureFile;
use crate::core::io::{ParsedStructure, StructureFormat};
use crate::core::models::chainid::ChainIdManager;
use crate::core::models::mods::{Cleavage, Deletion, Mutation, Substitution};
use crate::core::models::molecule::{BuildContext, Molecule};
use crate::core::topology::registry::SegtypeRegistry;
use tracing::{info, instrument, warn};

struct ParsedModifications {
    deletions: Vec<Deletion>,
    substitutions: Vec<Substitution>,
    mutations: Vec<Mutation>,
    cleavages: Vec<Cleavage>,
}

impl ParsedModifications {
    fn parse(config: &ModificationConfig) -> Result<Self, BuildError> {
        Ok(Self {
            deletions: config
                .deletions
                .iter()
                .map(|c| Deletion::from_shortcode(c))
                .collect::<Result<_, _>>()?,
            substitutions: config
                .substitutions
                .iter()
                .map(|c| Substitution::from_shortcode(c))
                .collect::<Result<_, _>>()?,
            mutations: config
                .mutations
                .iter()
                .map(|c| Mutation::from_shortcode(c))
                .collect::<Result<_, _>>()?,
            cleavages: config
                .cleavages
                .iter()
                .map(|c| Cleavage::from_shortcode(c))
                .collect::<Result<_, _>>()?,
        })
    }

    fn apply(&self, molecule: &mut Molecule) -> Result<(), BuildError> {
        for deletion in &self.deletions {
            molecule.apply_deletion(deletion)?;
        }
        for substitution in &self.substitutions {
            molecule.apply_substitution(substitution)?;
        }
        for mutation in &self.mutations {
            molecule.apply_mutation(mutation)?;
        }
        for cleavage in &self.cleavages {
            molecule.apply_cleavage(cleavage)?;
        }
        Ok(())
    }

    fn count(&self) -> usize {
        self.deletions.len() + self.substitutions.len() + self.mutations.len() + self.cleavages.len()
    }
}

#[instrument(skip_all, name = "build_workflow", fields(path = %config.structure_path.display()))]
pub fn run(config: &BuildConfig) -> Result<Molecule, BuildError> {
    // === Phase 0: Validate modification shortcodes ===
    let modifications = ParsedModifications::parse(&config.modifications)?;

    // === Phase 1: Read the structure ===
    let format = match config.format {
        Some(format) => format,
        None => StructureFormat::from_path(&config.structure_path)
            .ok_or_else(|| BuildError::UnknownFormat(config.structure_path.clone()))?,
    };
    info!("Reading {:?} structure.", format);
    let parsed = read_structure(config, format)?;

    // === Phase 2: Residue classification ===
    let registry = match &config.segtype_registry_path {
        Some(path) => {
            info!("Loading segtype registry from '{}'.", path.display());
            SegtypeRegistry::load(path)?
        }
        None => SegtypeRegistry::new(),
    };

    // === Phase 3: Build the molecule ===
    let chain_ids = ChainIdManager::with_reserves(
        format.chain_id_format(),
        config.chain_ids.transform_reserves.clone(),
        config.chain_ids.remap.clone(),
    )?;
    let mut molecule = Molecule::from_parsed(parsed, &registry, BuildContext::with_chain_ids(chain_ids))?;
    report_orphans(&molecule);

    // === Phase 4: Sequence modifications ===
    if modifications.count() > 0 {
        info!("Applying {} modification(s).", modifications.count());
        modifications.apply(&mut molecule)?;
    }

    // === Phase 5: Activate the biological assembly ===
    molecule.activate_biological_assembly(config.assembly_index)?;

    info!(
        "Build complete: {} chains, {} segments, {} patch directives.",
        molecule.asymmetric_unit().chain_ids().len(),
        molecule.asymmetric_unit().segments().len(),
        molecule.patch_directives().len()
    );
    Ok(molecule)
}

fn read_structure(config: &BuildConfig, format: StructureFormat) -> Result<ParsedStructure, BuildError> {
    Ok(match format {
        StructureFormat::Pdb => PdbFile::read_from_path(&config.structure_path)?,
        StructureFormat::Mmcif => CifFile::read_from_path(&config.structure_path)?,
    })
}

fn report_orphans(molecule: &Molecule) {
    let au = molecule.asymmetric_unit();
    if !au.orphan_links().is_empty() || !au.orphan_ssbonds().is_empty() {
        warn!(
            "{} link(s) and {} disulfide(s) could not be resolved and were set aside.",
            au.orphan_links().len(),
            au.orphan_ssbonds().len()
        );
    }
}
