use super::asymmetric_unit::AsymmetricUnit;
use super::chainid::{ChainIdError, ChainIdFormat, ChainIdManager};
use super::mods::{Cleavage, Deletion, Mutation, Substitution};
use super::residue::ResidueKey;
use super::transform::BioAssemb;
use crate::core::io::{ParsedStructure, StructureFormat};
use crate::core::topology::registry::SegtypeRegistry;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MoleculeError {
    #[error("No biological assembly with index {0}")]
    AssemblyNotFound(usize),
    #[error("Residue {0} not found")]
    ResidueNotFound(ResidueKey),
    #[error("Invalid modification: {0}")]
    InvalidModification(String),
    #[error("Chain identifier error: {0}")]
    ChainId(#[from] ChainIdError),
}

/// Per-build state: the chain identifier pool and the assembly index counter.
///
/// Create one per independent build; nothing in it is shared between builds.
#[derive(Debug, Clone)]
pub struct BuildContext {
    chain_ids: ChainIdManager,
    next_bioassemb_index: usize,
}

impl BuildContext {
    pub fn new(format: ChainIdFormat) -> Self {
        Self::with_chain_ids(ChainIdManager::new(format))
    }

    /// Uses a preconfigured manager, e.g. one carrying reserves and remaps.
    pub fn with_chain_ids(chain_ids: ChainIdManager) -> Self {
        Self {
            chain_ids,
            next_bioassemb_index: 0,
        }
    }

    pub fn chain_ids(&self) -> &ChainIdManager {
        &self.chain_ids
    }

    fn next_bioassemb_index(&mut self) -> usize {
        let index = self.next_bioassemb_index;
        self.next_bioassemb_index += 1;
        index
    }
}

/// An asymmetric unit together with its biological assemblies.
///
/// Assembly 0 is always the asymmetric unit itself under a single identity
/// transform; assemblies read from the file follow from index 1.
#[derive(Debug, Clone)]
pub struct Molecule {
    context: BuildContext,
    format: StructureFormat,
    asymmetric_unit: AsymmetricUnit,
    bioassemblies: Vec<BioAssemb>,
    active: Option<usize>,
}

impl Molecule {
    pub fn from_parsed(
        mut parsed: ParsedStructure,
        registry: &SegtypeRegistry,
        mut context: BuildContext,
    ) -> Result<Self, MoleculeError> {
        let format = parsed.format;

        let mut initial: Vec<String> = parsed.author_chain_ids.clone();
        for chain_id in parsed.atoms.iter().map(|a| &a.chain_id) {
            if !chain_id.is_empty() && !initial.contains(chain_id) {
                initial.push(chain_id.clone());
            }
        }
        context.chain_ids.sandbag(&initial);

        let assemblies = std::mem::take(&mut parsed.assemblies);
        let asymmetric_unit = AsymmetricUnit::from_parsed(parsed, registry, &mut context.chain_ids)?;

        let mut bioassemblies = vec![BioAssemb::asymmetric_unit(context.next_bioassemb_index())];
        for record in &assemblies {
            let index = context.next_bioassemb_index();
            debug!(
                "Biological assembly {} ('{}') has {} transforms.",
                index,
                record.name,
                record.operators.len()
            );
            bioassemblies.push(BioAssemb::from_record(record, index));
        }

        Ok(Self {
            context,
            format,
            asymmetric_unit,
            bioassemblies,
            active: None,
        })
    }

    /// Activates the assembly with `index`, allocating chain maps for each of
    /// its transforms. Activating an already active assembly changes nothing.
    pub fn activate_biological_assembly(&mut self, index: usize) -> Result<&mut Self, MoleculeError> {
        let position = self
            .bioassemblies
            .iter()
            .position(|b| b.index == index)
            .ok_or(MoleculeError::AssemblyNotFound(index))?;
        let assembly = &mut self.bioassemblies[position];
        assembly.activate(
            self.asymmetric_unit.chain_ids(),
            self.asymmetric_unit.daughters(),
            &mut self.context.chain_ids,
        )?;
        info!(
            "Activated biological assembly {} ('{}') with {} transforms.",
            assembly.index,
            assembly.name,
            assembly.transforms.len()
        );
        self.active = Some(position);
        Ok(self)
    }

    pub fn active_assembly(&self) -> Option<&BioAssemb> {
        self.active.and_then(|i| self.bioassemblies.get(i))
    }

    pub fn asymmetric_unit(&self) -> &AsymmetricUnit {
        &self.asymmetric_unit
    }

    pub fn bioassemblies(&self) -> &[BioAssemb] {
        &self.bioassemblies
    }

    pub fn format(&self) -> StructureFormat {
        self.format
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Patch lines for every copy of the asymmetric unit in the active
    /// assembly, or for the asymmetric unit alone when none is active.
    pub fn patch_directives(&self) -> Vec<String> {
        match self.active_assembly() {
            Some(assembly) => assembly
                .transforms
                .iter()
                .flat_map(|t| self.asymmetric_unit.patch_directives(t.chain_id_map()))
                .collect(),
            None => self.asymmetric_unit.patch_directives(&BTreeMap::new()),
        }
    }

    fn ensure_unactivated(&self) -> Result<(), MoleculeError> {
        match self.active_assembly() {
            Some(assembly) => Err(MoleculeError::InvalidModification(format!(
                "assembly {} is already active; modify the asymmetric unit before activation",
                assembly.index
            ))),
            None => Ok(()),
        }
    }

    pub fn apply_mutation(&mut self, mutation: &Mutation) -> Result<(), MoleculeError> {
        self.ensure_unactivated()?;
        self.asymmetric_unit
            .apply_mutation(mutation, &mut self.context.chain_ids)
    }

    pub fn apply_deletion(&mut self, deletion: &Deletion) -> Result<(), MoleculeError> {
        self.ensure_unactivated()?;
        self.asymmetric_unit
            .apply_deletion(deletion, &mut self.context.chain_ids)
    }

    pub fn apply_substitution(&mut self, substitution: &Substitution) -> Result<(), MoleculeError> {
        self.ensure_unactivated()?;
        self.asymmetric_unit
            .apply_substitution(substitution, &mut self.context.chain_ids)
    }

    pub fn apply_cleavage(&mut self, cleavage: &Cleavage) -> Result<(), MoleculeError> {
        self.ensure_unactivated()?;
        self.asymmetric_unit
            .apply_cleavage(cleavage, &mut self.context.chain_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::residue::ResidueQuery;
    use crate::core::models::topology::{Link, LinkPartner, PatchName};
    use crate::core::models::transform::{AssemblyRecord, OperatorRecord};
    use nalgebra::Point3;

    fn partner(atom: &str, resname: &str, chain: &str, seq: isize) -> LinkPartner {
        LinkPartner {
            atom_name: atom.to_string(),
            altloc: String::new(),
            resname: resname.to_string(),
            key: ResidueKey::new(chain, seq, ""),
            auth_key: None,
        }
    }

    /// ASN A10 carrying NAG B1, with the ND2-C1-O5-C5 dihedral at 175 degrees.
    fn glycosylated() -> ParsedStructure {
        let theta = 175.0_f64.to_radians();
        let mut parsed = ParsedStructure::new(StructureFormat::Pdb);
        parsed.atoms = vec![
            Atom::new(1, "CA", "ASN", "A", 10, Point3::new(2.0, -1.0, 0.0)),
            Atom::new(2, "ND2", "ASN", "A", 10, Point3::new(1.0, theta.cos(), theta.sin())),
            Atom::new(3, "C1", "NAG", "B", 1, Point3::new(1.0, 0.0, 0.0)),
            Atom::new(4, "O5", "NAG", "B", 1, Point3::new(0.0, 0.0, 0.0)),
            Atom::new(5, "C5", "NAG", "B", 1, Point3::new(0.0, 1.0, 0.0)),
        ];
        parsed.author_chain_ids = vec!["A".to_string(), "B".to_string()];
        parsed.links = vec![Link::new(partner("ND2", "ASN", "A", 10), partner("C1", "NAG", "B", 1))];
        parsed.assemblies = vec![AssemblyRecord {
            name: "1".to_string(),
            operators: vec![
                OperatorRecord {
                    id: "1".to_string(),
                    chain_ids: vec!["A".to_string(), "B".to_string()],
                    matrix: [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
                },
                OperatorRecord {
                    id: "2".to_string(),
                    chain_ids: vec!["A".to_string(), "B".to_string()],
                    matrix: [[-1.0, 0.0, 0.0, 0.0], [0.0, -1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
                },
            ],
        }];
        parsed
    }

    fn build() -> Molecule {
        Molecule::from_parsed(
            glycosylated(),
            &SegtypeRegistry::new(),
            BuildContext::new(ChainIdFormat::Pdb),
        )
        .unwrap()
    }

    #[test]
    fn asn_glycan_link_gets_geometric_patch_and_adjacency() {
        let molecule = build();
        let au = molecule.asymmetric_unit();
        let (_, link) = au.links().next().unwrap();
        assert_eq!(link.patchname, PatchName::Named("NGLB".to_string()));
        assert!(link.patchname.is_found());

        let asn = au.get_residue(&ResidueQuery::key(&ResidueKey::new("A", 10, ""))).unwrap();
        let nag = au.get_residue(&ResidueQuery::key(&ResidueKey::new("B", 1, ""))).unwrap();
        assert!(au.residue(asn).unwrap().down().contains(&nag));
    }

    #[test]
    fn assemblies_are_indexed_after_the_asymmetric_unit() {
        let molecule = build();
        let indices: Vec<usize> = molecule.bioassemblies().iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(molecule.bioassemblies()[0].name, "A.U.");
        assert!(molecule.bioassemblies()[0].transforms[0].is_identity());
        assert!(molecule.active_assembly().is_none());
    }

    #[test]
    fn activation_maps_image_chains_to_fresh_identifiers() {
        let mut molecule = build();
        molecule.activate_biological_assembly(1).unwrap();
        let assembly = molecule.active_assembly().unwrap();
        assert!(assembly.is_activated());

        let first = assembly.transforms[0].chain_id_map();
        assert_eq!(first["A"], "A");
        assert_eq!(first["B"], "B");
        let second = assembly.transforms[1].chain_id_map();
        assert_eq!(second["A"], "C");
        assert_eq!(second["B"], "D");

        let directives = molecule.patch_directives();
        assert_eq!(directives, vec!["patch NGLB A:10 B:1", "patch NGLB C:10 D:1"]);
    }

    #[test]
    fn unknown_assembly_is_an_error() {
        let mut molecule = build();
        assert!(matches!(
            molecule.activate_biological_assembly(7),
            Err(MoleculeError::AssemblyNotFound(7))
        ));
    }

    #[test]
    fn asymmetric_unit_assembly_keeps_chain_identifiers() {
        let mut molecule = build();
        molecule.activate_biological_assembly(0).unwrap();
        let map = molecule.active_assembly().unwrap().transforms[0].chain_id_map();
        assert_eq!(map.get("A").map(String::as_str), Some("A"));
        assert_eq!(molecule.patch_directives(), vec!["patch NGLB A:10 B:1"]);
    }

    #[test]
    fn modifications_are_refused_after_activation() {
        let mut molecule = build();
        let mutation = Mutation::from_shortcode("A:N10Q").unwrap();
        molecule.activate_biological_assembly(1).unwrap();
        assert!(matches!(
            molecule.apply_mutation(&mutation),
            Err(MoleculeError::InvalidModification(_))
        ));
    }

    #[test]
    fn mutation_before_activation_drops_the_glycan() {
        let mut molecule = build();
        let mutation = Mutation::from_shortcode("A:N10Q").unwrap();
        molecule.apply_mutation(&mutation).unwrap();
        let au = molecule.asymmetric_unit();
        assert_eq!(au.chain_ids(), &["A".to_string()]);
        assert!(molecule.patch_directives().is_empty());
        assert!(!molecule.context().chain_ids().is_used("B"));
    }
}
