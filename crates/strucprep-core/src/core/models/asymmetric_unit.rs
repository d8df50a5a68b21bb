use super::annotations::{Conflict, Missing, Ter};
use super::atom::{Atom, adjust_serials};
use super::chainid::{ChainIdError, ChainIdManager};
use super::ids::{AtomId, LinkId, ResidueId};
use super::mods::{AppliedMods, Cleavage, Deletion, Mutation, Substitution};
use super::molecule::MoleculeError;
use super::residue::{Residue, ResidueKey, ResidueQuery, get_down_group, link_to};
use super::segment::{ResidueState, SegType, Segment, state_bounds};
use super::topology::{Link, SsBond};
use crate::core::io::{ParsedStructure, StructureFormat};
use crate::core::topology::registry::SegtypeRegistry;
use crate::core::utils::geometry::NamedCoords;
use slotmap::SlotMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// The deposited structure: atoms grouped into residues and segments, the
/// covalent topology between residues, and the annotations read alongside.
#[derive(Debug, Clone, Default)]
pub struct AsymmetricUnit {
    atoms: SlotMap<AtomId, Atom>,
    atom_order: Vec<AtomId>,
    residues: SlotMap<ResidueId, Residue>,
    residue_order: Vec<ResidueId>,
    links: SlotMap<LinkId, Link>,
    link_order: Vec<LinkId>,
    ssbonds: Vec<SsBond>,
    segments: Vec<Segment>,
    chain_ids: Vec<String>,
    daughters: BTreeMap<String, Vec<String>>,
    orphan_links: Vec<Link>,
    orphan_ssbonds: Vec<SsBond>,
    segtypes: SegtypeRegistry,

    pub ters: Vec<Ter>,
    pub missings: Vec<Missing>,
    pub conflicts: Vec<Conflict>,
    pub mods: AppliedMods,
}

fn renamed(map: &BTreeMap<String, String>, chain_id: &mut String) {
    if let Some(new_id) = map.get(chain_id.as_str()) {
        if new_id != chain_id {
            *chain_id = new_id.clone();
        }
    }
}

/// Claims an identifier for every chain, in order of first appearance.
fn register_chains(
    atoms: &[Atom],
    missings: &[Missing],
    chain_ids: &mut ChainIdManager,
) -> Result<BTreeMap<String, String>, ChainIdError> {
    let mut map = BTreeMap::new();
    let seen = atoms
        .iter()
        .map(|a| &a.chain_id)
        .chain(missings.iter().map(|m| &m.chain_id));
    for chain_id in seen {
        if map.contains_key(chain_id) {
            continue;
        }
        let granted = if chain_id.is_empty() {
            chain_ids.next_unused_chain_id()?
        } else {
            chain_ids.check(chain_id)?
        };
        if &granted != chain_id {
            info!("Chain '{}' renamed to '{}'.", chain_id, granted);
        }
        map.insert(chain_id.clone(), granted);
    }
    Ok(map)
}

impl AsymmetricUnit {
    /// Builds the asymmetric unit from parsed records.
    ///
    /// Serials are adjusted, chains are registered with `chain_ids` (and
    /// renamed where the manager substitutes), residues are built and
    /// classified, links and disulfides are resolved against them, and
    /// segments are formed.
    pub fn from_parsed(
        parsed: ParsedStructure,
        registry: &SegtypeRegistry,
        chain_ids: &mut ChainIdManager,
    ) -> Result<Self, MoleculeError> {
        let ParsedStructure {
            format,
            mut atoms,
            ters,
            mut missings,
            mut ssbonds,
            mut links,
            mut conflicts,
            ..
        } = parsed;

        let ter_serials: Vec<usize> = ters.iter().filter_map(|t| t.serial).collect();
        adjust_serials(&mut atoms, &ter_serials);

        let renames = register_chains(&atoms, &missings, chain_ids)?;
        if renames.iter().any(|(old, new)| old != new) {
            atoms.iter_mut().for_each(|a| renamed(&renames, &mut a.chain_id));
            missings.iter_mut().for_each(|m| renamed(&renames, &mut m.chain_id));
            for link in &mut links {
                renamed(&renames, &mut link.partner1.key.chain_id);
                renamed(&renames, &mut link.partner2.key.chain_id);
            }
            for bond in &mut ssbonds {
                renamed(&renames, &mut bond.partner1.key.chain_id);
                renamed(&renames, &mut bond.partner2.key.chain_id);
            }
            if format == StructureFormat::Pdb {
                conflicts.iter_mut().for_each(|c| renamed(&renames, &mut c.chain_id));
            }
        }

        let mut au = Self {
            ters,
            conflicts,
            ..Default::default()
        };
        au.build_residues(atoms, &missings);
        au.missings = missings;
        au.apply_segtypes(registry);

        au.orphan_links = au.assign_residues(links);
        au.orphan_ssbonds = au.assign_ssbonds(ssbonds);
        au.build_segments(chain_ids)?;

        info!(
            "Built asymmetric unit: {} atoms, {} residues, {} segments, {} links ({} orphaned), {} ssbonds ({} orphaned).",
            au.atom_order.len(),
            au.residue_order.len(),
            au.segments.len(),
            au.link_order.len(),
            au.orphan_links.len(),
            au.ssbonds.len(),
            au.orphan_ssbonds.len()
        );
        Ok(au)
    }

    /// Groups atoms into residues and merges missing-residue placeholders.
    ///
    /// Each atom is tested against the most recently created residue only;
    /// on mismatch a new residue starts. Residues are then ordered by chain
    /// (first appearance) and by sequence number and insertion code.
    fn build_residues(&mut self, atoms: Vec<Atom>, missings: &[Missing]) {
        for mut atom in atoms {
            let current = self.residue_order.last().copied();
            let residue_id = match current {
                Some(last) if self.residues.get(last).is_some_and(|r| r.matches_atom(&atom)) => last,
                _ => {
                    let id = self.residues.insert(Residue::from_atom(&atom));
                    self.residue_order.push(id);
                    id
                }
            };
            atom.residue_id = Some(residue_id);
            let atom_id = self.atoms.insert(atom);
            self.atom_order.push(atom_id);
            if let Some(residue) = self.residues.get_mut(residue_id) {
                residue.add_atom(atom_id);
            }
        }

        let mut present: HashSet<ResidueKey> = self.residues.values().map(Residue::key).collect();
        for missing in missings {
            if present.insert(missing.key()) {
                let id = self.residues.insert(Residue::from_missing(missing));
                self.residue_order.push(id);
            }
        }

        let mut chain_rank: HashMap<String, usize> = HashMap::new();
        for residue in self.residue_order.iter().filter_map(|id| self.residues.get(*id)) {
            let next = chain_rank.len();
            chain_rank.entry(residue.chain_id.clone()).or_insert(next);
        }
        let residues = &self.residues;
        self.residue_order.sort_by_cached_key(|id| {
            residues.get(*id).map(|r| {
                (
                    chain_rank.get(&r.chain_id).copied().unwrap_or(usize::MAX),
                    r.resseqnum,
                    r.insertion.clone(),
                )
            })
        });
    }

    pub fn apply_segtypes(&mut self, registry: &SegtypeRegistry) {
        self.segtypes = registry.clone();
        for residue in self.residues.values_mut() {
            residue.segtype = registry.classify(&residue.resname);
        }
    }

    fn key_index(&self) -> HashMap<ResidueKey, ResidueId> {
        let mut index = HashMap::new();
        for &id in &self.residue_order {
            if let Some(residue) = self.residues.get(id) {
                index.entry(residue.key()).or_insert(id);
            }
        }
        index
    }

    fn auth_index(&self) -> HashMap<ResidueKey, ResidueId> {
        let mut index = HashMap::new();
        for &id in &self.residue_order {
            if let Some(key) = self.residues.get(id).and_then(|r| r.auth_key.clone()) {
                index.entry(key).or_insert(id);
            }
        }
        index
    }

    fn find_atom(&self, residue: ResidueId, name: &str, altloc: &str) -> Option<AtomId> {
        let residue = self.residues.get(residue)?;
        let named = |id: &&AtomId| self.atoms.get(**id).is_some_and(|a| a.name == name);
        let exact = residue
            .atoms
            .iter()
            .filter(named)
            .find(|id| self.atoms.get(**id).is_some_and(|a| a.altloc == altloc));
        exact.or_else(|| residue.atoms.iter().find(named)).copied()
    }

    /// Resolves link ends to residues and atoms, builds up/down adjacency and
    /// assigns patch names. Label keys are tried first, then author keys.
    /// Returns the links that could not be resolved.
    pub fn assign_residues(&mut self, links: Vec<Link>) -> Vec<Link> {
        let by_key = self.key_index();
        let by_auth = self.auth_index();
        let lookup = |key: &ResidueKey, auth: &Option<ResidueKey>| {
            by_key
                .get(key)
                .or_else(|| auth.as_ref().and_then(|k| by_auth.get(k)))
                .copied()
        };

        let mut ignored = Vec::new();
        for mut link in links {
            link.residue1 = lookup(&link.partner1.key, &link.partner1.auth_key);
            link.residue2 = lookup(&link.partner2.key, &link.partner2.auth_key);
            link.atom1 = link
                .residue1
                .and_then(|r| self.find_atom(r, &link.partner1.atom_name, &link.partner1.altloc));
            link.atom2 = link
                .residue2
                .and_then(|r| self.find_atom(r, &link.partner2.atom_name, &link.partner2.altloc));

            let (Some(residue1), Some(residue2)) = (link.residue1, link.residue2) else {
                warn!(
                    "Link {} {} -> {} {} refers to a residue not in the structure.",
                    link.partner1.key, link.partner1.atom_name, link.partner2.key, link.partner2.atom_name
                );
                ignored.push(link);
                continue;
            };
            if !link.is_resolved() {
                warn!(
                    "Link {} {} -> {} {} refers to an atom not in the structure.",
                    link.partner1.key, link.partner1.atom_name, link.partner2.key, link.partner2.atom_name
                );
                ignored.push(link);
                continue;
            }

            link.segtype1 = self.residues.get(residue1).map(|r| r.segtype).unwrap_or_default();
            link.segtype2 = self.residues.get(residue2).map(|r| r.segtype).unwrap_or_default();
            link.orient();
            let (Some(upstream), Some(downstream)) = (link.residue1, link.residue2) else {
                continue;
            };
            let coords1 = self.named_coords(upstream);
            let coords2 = self.named_coords(downstream);
            link.set_patchname(&coords1, &coords2);

            let id = self.links.insert(link);
            self.link_order.push(id);
            link_to(&mut self.residues, upstream, downstream, id);
        }
        ignored
    }

    /// Resolves disulfide ends to residues. Returns the bonds that could not be resolved.
    pub fn assign_ssbonds(&mut self, ssbonds: Vec<SsBond>) -> Vec<SsBond> {
        let by_key = self.key_index();
        let by_auth = self.auth_index();
        let mut ignored = Vec::new();
        for mut bond in ssbonds {
            bond.residue1 = by_key
                .get(&bond.partner1.key)
                .or_else(|| bond.partner1.auth_key.as_ref().and_then(|k| by_auth.get(k)))
                .copied();
            bond.residue2 = by_key
                .get(&bond.partner2.key)
                .or_else(|| bond.partner2.auth_key.as_ref().and_then(|k| by_auth.get(k)))
                .copied();
            if bond.is_resolved() {
                self.ssbonds.push(bond);
            } else {
                warn!(
                    "SSBOND {} -> {} refers to a residue not in the structure.",
                    bond.partner1.key, bond.partner2.key
                );
                ignored.push(bond);
            }
        }
        ignored
    }

    fn ordered_chains(&self) -> Vec<String> {
        let mut chains: Vec<String> = Vec::new();
        for residue in self.residue_order.iter().filter_map(|id| self.residues.get(*id)) {
            if !chains.contains(&residue.chain_id) {
                chains.push(residue.chain_id.clone());
            }
        }
        chains
    }

    fn parent_of(&self, chain_id: &str) -> Option<String> {
        self.daughters
            .iter()
            .find(|(_, children)| children.iter().any(|c| c == chain_id))
            .map(|(parent, _)| parent.clone())
    }

    fn rename_residues(&mut self, ids: &[ResidueId], chain_id: &str) {
        for &id in ids {
            let Some(residue) = self.residues.get_mut(id) else {
                continue;
            };
            residue.chain_id = chain_id.to_string();
            for &atom_id in &residue.atoms {
                if let Some(atom) = self.atoms.get_mut(atom_id) {
                    atom.chain_id = chain_id.to_string();
                }
            }
        }
    }

    /// Renames a residue and its atoms, reclassifying its segtype.
    fn rename_residue(&mut self, id: ResidueId, resname: &str) {
        let segtype = self.segtypes.classify(resname);
        let Some(residue) = self.residues.get_mut(id) else {
            return;
        };
        residue.resname = resname.to_string();
        residue.segtype = segtype;
        for &atom_id in &residue.atoms {
            if let Some(atom) = self.atoms.get_mut(atom_id) {
                atom.resname = resname.to_string();
            }
        }
    }

    fn refresh_chain_ids(&mut self) {
        let mut chains = self.ordered_chains();
        chains.sort();
        self.chain_ids = chains;
    }

    fn sync_link_keys(&mut self) {
        for link in self.links.values_mut() {
            if let Some(r) = link.residue1.and_then(|id| self.residues.get(id)) {
                link.partner1.key = r.key();
            }
            if let Some(r) = link.residue2.and_then(|id| self.residues.get(id)) {
                link.partner2.key = r.key();
            }
        }
        for bond in &mut self.ssbonds {
            if let Some(r) = bond.residue1.and_then(|id| self.residues.get(id)) {
                bond.partner1.key = r.key();
            }
            if let Some(r) = bond.residue2.and_then(|id| self.residues.get(id)) {
                bond.partner2.key = r.key();
            }
        }
    }

    /// Partitions residues into segments by chain and segtype.
    ///
    /// A chain holding more than one segtype is split: the first segtype keeps
    /// the chain identifier and every later one moves to a fresh identifier
    /// recorded as a daughter of the chain.
    fn build_segments(&mut self, chain_ids: &mut ChainIdManager) -> Result<(), ChainIdError> {
        self.segments.clear();
        for chain in self.ordered_chains() {
            let mut groups: Vec<(SegType, Vec<ResidueId>)> = Vec::new();
            for &id in &self.residue_order {
                let Some(residue) = self.residues.get(id) else {
                    continue;
                };
                if residue.chain_id != chain {
                    continue;
                }
                match groups.iter_mut().find(|(segtype, _)| *segtype == residue.segtype) {
                    Some((_, members)) => members.push(id),
                    None => groups.push((residue.segtype, vec![id])),
                }
            }

            for (i, (segtype, members)) in groups.into_iter().enumerate() {
                let segname = if i == 0 {
                    chain.clone()
                } else {
                    let new_id = chain_ids.next_unused_chain_id()?;
                    debug!(
                        "Chain '{}' residues of type {} moved to daughter chain '{}'.",
                        chain, segtype, new_id
                    );
                    self.rename_residues(&members, &new_id);
                    self.daughters.entry(chain.clone()).or_default().push(new_id.clone());
                    new_id
                };
                let residues = &self.residues;
                let subsegments = state_bounds(&members, |id| {
                    residues
                        .get(*id)
                        .map(Residue::state)
                        .unwrap_or(ResidueState::Missing)
                });
                let mut segment = Segment::new(&segname, segtype, members, subsegments);
                segment.parent_chain_id = self.parent_of(&segname);
                self.segments.push(segment);
            }
        }
        self.refresh_chain_ids();
        self.sync_link_keys();
        Ok(())
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Atoms in file order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atom_order.iter().filter_map(|id| self.atoms.get(*id))
    }

    pub fn atom_count(&self) -> usize {
        self.atom_order.len()
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub fn residue_ids(&self) -> &[ResidueId] {
        &self.residue_order
    }

    /// Residues in chain order, then sequence order.
    pub fn residues(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residue_order
            .iter()
            .filter_map(|&id| self.residues.get(id).map(|r| (id, r)))
    }

    pub fn residues_in_chain<'a>(&'a self, chain_id: &'a str) -> impl Iterator<Item = &'a Residue> + 'a {
        self.residues()
            .map(|(_, r)| r)
            .filter(move |r| r.chain_id == chain_id)
    }

    /// The first residue matching `query`.
    pub fn get_residue(&self, query: &ResidueQuery) -> Option<ResidueId> {
        self.residues()
            .find(|(_, r)| query.matches(r))
            .map(|(id, _)| id)
    }

    pub fn filter_residues(&self, query: &ResidueQuery) -> Vec<ResidueId> {
        self.residues()
            .filter(|(_, r)| query.matches(r))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn get_down_group(&self, start: ResidueId) -> (Vec<ResidueId>, Vec<LinkId>) {
        get_down_group(&self.residues, start)
    }

    /// Atom positions of a residue by name; the first altloc of each name wins.
    pub fn named_coords(&self, id: ResidueId) -> NamedCoords {
        let mut coords = NamedCoords::new();
        if let Some(residue) = self.residues.get(id) {
            for atom in residue.atoms.iter().filter_map(|a| self.atoms.get(*a)) {
                coords.entry(atom.name.clone()).or_insert(atom.position);
            }
        }
        coords
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.link_order
            .iter()
            .filter_map(|&id| self.links.get(id).map(|l| (id, l)))
    }

    pub fn ssbonds(&self) -> &[SsBond] {
        &self.ssbonds
    }

    pub fn orphan_links(&self) -> &[Link] {
        &self.orphan_links
    }

    pub fn orphan_ssbonds(&self) -> &[SsBond] {
        &self.orphan_ssbonds
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct chain identifiers, sorted.
    pub fn chain_ids(&self) -> &[String] {
        &self.chain_ids
    }

    /// Chains split off a parent chain, keyed by the parent.
    pub fn daughters(&self) -> &BTreeMap<String, Vec<String>> {
        &self.daughters
    }

    /// One `patch` line per resolved link with a patch and per disulfide.
    pub fn patch_directives(&self, chain_map: &BTreeMap<String, String>) -> Vec<String> {
        self.links()
            .filter_map(|(_, link)| link.patch_directive(chain_map))
            .chain(self.ssbonds.iter().map(|b| b.patch_directive(chain_map)))
            .collect()
    }

    fn find_residue(&self, key: &ResidueKey) -> Result<ResidueId, MoleculeError> {
        self.get_residue(&ResidueQuery::key(key))
            .ok_or_else(|| MoleculeError::ResidueNotFound(key.clone()))
    }

    /// Residues of `first`'s chain from `first` to `last` inclusive.
    fn chain_range(&self, first: &ResidueKey, last: &ResidueKey) -> Vec<ResidueId> {
        self.residues()
            .filter(|(_, r)| r.chain_id == first.chain_id)
            .filter(|(_, r)| {
                let key = r.key();
                first.seq_cmp(&key) != Ordering::Greater && key.seq_cmp(last) != Ordering::Greater
            })
            .map(|(id, _)| id)
            .collect()
    }

    fn with_down_groups(&self, ids: &[ResidueId]) -> Vec<ResidueId> {
        let mut all = ids.to_vec();
        for &id in ids {
            all.extend(get_down_group(&self.residues, id).0);
        }
        all
    }

    fn remove_links_involving(&mut self, doomed: &HashSet<ResidueId>) {
        let doomed_links: Vec<LinkId> = self
            .links
            .iter()
            .filter(|(_, l)| doomed.iter().any(|&r| l.involves(r)))
            .map(|(id, _)| id)
            .collect();
        for link_id in doomed_links {
            let Some(link) = self.links.remove(link_id) else {
                continue;
            };
            for residue_id in [link.residue1, link.residue2].into_iter().flatten() {
                if let Some(residue) = self.residues.get_mut(residue_id) {
                    residue.unlink(link_id);
                }
            }
        }
        self.link_order.retain(|id| self.links.contains_key(*id));
        self.ssbonds.retain(|b| !doomed.iter().any(|&r| b.involves(r)));
    }

    /// Removes residues with their atoms and every link or disulfide touching
    /// them. Chains left empty are returned to `chain_ids`.
    fn remove_residues(&mut self, ids: &[ResidueId], chain_ids: &mut ChainIdManager) {
        let doomed: HashSet<ResidueId> = ids.iter().copied().collect();
        self.remove_links_involving(&doomed);

        let mut touched_chains: Vec<String> = Vec::new();
        for &id in &doomed {
            let Some(residue) = self.residues.remove(id) else {
                continue;
            };
            for atom_id in residue.atoms {
                self.atoms.remove(atom_id);
            }
            if !touched_chains.contains(&residue.chain_id) {
                touched_chains.push(residue.chain_id);
            }
        }
        self.atom_order.retain(|id| self.atoms.contains_key(*id));
        self.residue_order.retain(|id| self.residues.contains_key(*id));

        for chain in touched_chains {
            if self.residues.values().any(|r| r.chain_id == chain) {
                continue;
            }
            debug!("Chain '{}' is empty and has been released.", chain);
            chain_ids.unregister_chain(&chain);
            self.daughters.remove(&chain);
            for children in self.daughters.values_mut() {
                children.retain(|c| c != &chain);
            }
        }
        self.daughters.retain(|_, children| !children.is_empty());
        self.refresh_chain_ids();
    }

    /// Renames a residue. If the name changes, everything downstream of it and
    /// every link or disulfide anchored on it is removed.
    fn replace_residue(&mut self, id: ResidueId, resname: &str, chain_ids: &mut ChainIdManager) {
        if self.residues.get(id).is_none_or(|r| r.resname == resname) {
            return;
        }
        let (group, _) = self.get_down_group(id);
        if !group.is_empty() {
            self.remove_residues(&group, chain_ids);
        }
        self.remove_links_involving(&HashSet::from([id]));
        self.rename_residue(id, resname);
    }

    pub fn apply_mutation(
        &mut self,
        mutation: &Mutation,
        chain_ids: &mut ChainIdManager,
    ) -> Result<(), MoleculeError> {
        let id = self.find_residue(&mutation.key())?;
        let current = self
            .residues
            .get(id)
            .map(|r| r.resname.clone())
            .unwrap_or_default();
        if current != mutation.orig_resname {
            warn!(
                "Mutation {} expects {} but the residue is {}.",
                mutation, mutation.orig_resname, current
            );
        }
        self.replace_residue(id, &mutation.new_resname, chain_ids);
        self.mods.mutations.push(mutation.clone());
        self.build_segments(chain_ids)?;
        Ok(())
    }

    /// Removes a residue range together with everything downstream of it.
    pub fn apply_deletion(
        &mut self,
        deletion: &Deletion,
        chain_ids: &mut ChainIdManager,
    ) -> Result<(), MoleculeError> {
        let range = self.chain_range(&deletion.first, &deletion.last);
        if range.is_empty() {
            return Err(MoleculeError::ResidueNotFound(deletion.first.clone()));
        }
        let doomed = self.with_down_groups(&range);
        self.remove_residues(&doomed, chain_ids);
        self.mods.deletions.push(deletion.clone());
        self.build_segments(chain_ids)?;
        Ok(())
    }

    /// Renames a residue range to a new sequence and deletes the residues the
    /// sequence does not reach.
    pub fn apply_substitution(
        &mut self,
        substitution: &Substitution,
        chain_ids: &mut ChainIdManager,
    ) -> Result<(), MoleculeError> {
        let range = self.chain_range(&substitution.first, &substitution.last);
        if range.is_empty() {
            return Err(MoleculeError::ResidueNotFound(substitution.first.clone()));
        }
        if substitution.sequence.len() > range.len() {
            return Err(MoleculeError::InvalidModification(format!(
                "substitution of {} residues does not fit the {} residues from {} to {}",
                substitution.sequence.len(),
                range.len(),
                substitution.first,
                substitution.last
            )));
        }
        for (&id, resname) in range.iter().zip(&substitution.sequence) {
            self.replace_residue(id, resname, chain_ids);
        }
        let surplus = self.with_down_groups(&range[substitution.sequence.len()..]);
        if !surplus.is_empty() {
            self.remove_residues(&surplus, chain_ids);
        }
        self.mods.substitutions.push(substitution.clone());
        self.build_segments(chain_ids)?;
        Ok(())
    }

    /// Moves every residue after `cleavage.after` to a new daughter chain.
    pub fn apply_cleavage(
        &mut self,
        cleavage: &Cleavage,
        chain_ids: &mut ChainIdManager,
    ) -> Result<(), MoleculeError> {
        self.find_residue(&cleavage.after)?;
        let tail: Vec<ResidueId> = self
            .residues()
            .filter(|(_, r)| {
                r.chain_id == cleavage.chain_id && r.key().seq_cmp(&cleavage.after) == Ordering::Greater
            })
            .map(|(id, _)| id)
            .collect();
        if tail.is_empty() {
            return Err(MoleculeError::InvalidModification(format!(
                "no residues follow cleavage site {}",
                cleavage.after
            )));
        }
        let new_id = chain_ids.next_unused_chain_id()?;
        self.rename_residues(&tail, &new_id);
        self.daughters
            .entry(cleavage.chain_id.clone())
            .or_default()
            .push(new_id);
        self.mods.cleavages.push(cleavage.clone());
        self.build_segments(chain_ids)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::chainid::ChainIdFormat;
    use crate::core::models::topology::{LinkPartner, PatchName};
    use nalgebra::Point3;

    fn atom(serial: usize, name: &str, resname: &str, chain: &str, seq: isize) -> Atom {
        Atom::new(serial, name, resname, chain, seq, Point3::new(serial as f64, 0.0, 0.0))
    }

    fn partner(atom: &str, resname: &str, chain: &str, seq: isize) -> LinkPartner {
        LinkPartner {
            atom_name: atom.to_string(),
            altloc: String::new(),
            resname: resname.to_string(),
            key: ResidueKey::new(chain, seq, ""),
            auth_key: None,
        }
    }

    fn build(parsed: ParsedStructure) -> (AsymmetricUnit, ChainIdManager) {
        let mut cm = ChainIdManager::new(ChainIdFormat::Pdb);
        let au = AsymmetricUnit::from_parsed(parsed, &SegtypeRegistry::new(), &mut cm).unwrap();
        (au, cm)
    }

    /// Protein chain A (1..=4 with 3 missing) and a two-sugar glycan chain B
    /// hanging off A:2 ND2.
    fn glycoprotein() -> ParsedStructure {
        let mut parsed = ParsedStructure::new(StructureFormat::Pdb);
        parsed.atoms = vec![
            atom(1, "CA", "ALA", "A", 1),
            atom(2, "CA", "ASN", "A", 2),
            atom(3, "ND2", "ASN", "A", 2),
            atom(4, "CA", "GLY", "A", 4),
            atom(5, "C1", "NAG", "B", 1),
            atom(6, "O4", "NAG", "B", 1),
            atom(7, "C1", "NAG", "B", 2),
        ];
        parsed.missings = vec![Missing::new("SER", "A", 3, "")];
        parsed.links = vec![
            Link::new(partner("ND2", "ASN", "A", 2), partner("C1", "NAG", "B", 1)),
            Link::new(partner("C1", "NAG", "B", 2), partner("O4", "NAG", "B", 1)),
            Link::new(partner("ND2", "ASN", "A", 99), partner("C1", "NAG", "B", 1)),
        ];
        parsed
    }

    fn key(chain: &str, seq: isize) -> ResidueKey {
        ResidueKey::new(chain, seq, "")
    }

    fn residue_id(au: &AsymmetricUnit, chain: &str, seq: isize) -> ResidueId {
        au.get_residue(&ResidueQuery::key(&key(chain, seq))).unwrap()
    }

    #[test]
    fn residues_merge_missing_placeholders_in_sequence_order() {
        let (au, _) = build(glycoprotein());
        let keys: Vec<String> = au.residues().map(|(_, r)| r.key().to_string()).collect();
        assert_eq!(keys, vec!["A:1", "A:2", "A:3", "A:4", "B:1", "B:2"]);
        assert_eq!(au.chain_ids(), &["A".to_string(), "B".to_string()]);

        let segment = &au.segments()[0];
        assert_eq!(segment.segname, "A");
        assert_eq!(segment.segtype, SegType::Protein);
        let pstrs: Vec<String> = segment.subsegments().iter().map(|s| s.pstr()).collect();
        assert_eq!(pstrs, vec!["RESOLVED(0)-(1)", "MISSING(2)-(2)", "RESOLVED(3)-(3)"]);
        assert_eq!(segment.internal_loops().count(), 1);

        assert_eq!(au.residue_ids().len(), 6);
        let missing = au.filter_residues(&ResidueQuery::new().resolved(false));
        assert_eq!(missing, vec![residue_id(&au, "A", 3)]);
        let glycan = au.filter_residues(&ResidueQuery::new().segtype(SegType::Glycan));
        assert_eq!(glycan.len(), 2);
    }

    #[test]
    fn links_resolve_to_residues_and_atoms() {
        let (au, _) = build(glycoprotein());
        let asn = residue_id(&au, "A", 2);
        let nag1 = residue_id(&au, "B", 1);
        let (link_id, link) = au.links().next().unwrap();
        assert_eq!(link.residue1, Some(asn));
        assert_eq!(link.residue2, Some(nag1));
        assert_eq!(au.atom(link.atom1.unwrap()).unwrap().name, "ND2");
        assert_eq!(au.atom(link.atom2.unwrap()).unwrap().name, "C1");
        assert_eq!(au.residue(asn).unwrap().down(), &[nag1]);
        assert_eq!(au.residue(asn).unwrap().downlink(), &[link_id]);
        assert_eq!(au.residue(nag1).unwrap().up(), &[asn]);
    }

    #[test]
    fn unmatched_link_is_reported_as_orphan() {
        let (au, _) = build(glycoprotein());
        assert_eq!(au.links().count(), 2);
        assert_eq!(au.orphan_links().len(), 1);
        assert_eq!(au.orphan_links()[0].partner1.key, key("A", 99));
    }

    #[test]
    fn glycosidic_link_is_oriented_acceptor_first() {
        let (au, _) = build(glycoprotein());
        let (_, link) = au.links().nth(1).unwrap();
        assert_eq!(link.partner1.atom_name, "O4");
        assert_eq!(link.partner2.atom_name, "C1");
        let (group, links) = au.get_down_group(residue_id(&au, "A", 2));
        assert_eq!(group, vec![residue_id(&au, "B", 1), residue_id(&au, "B", 2)]);
        assert_eq!(links.len(), 2);
        // No coordinates for the ring atoms, so geometry cannot decide.
        assert_eq!(link.patchname, PatchName::Unfound);
        assert!(!link.patchname.is_found());
    }

    #[test]
    fn mixed_segtype_chain_is_split_into_daughter() {
        let mut parsed = ParsedStructure::new(StructureFormat::Pdb);
        parsed.atoms = vec![
            atom(1, "ND2", "ASN", "A", 1),
            atom(2, "C1", "NAG", "A", 501),
            atom(3, "O", "HOH", "A", 601),
        ];
        parsed.links = vec![Link::new(partner("ND2", "ASN", "A", 1), partner("C1", "NAG", "A", 501))];
        let (au, cm) = build(parsed);

        assert_eq!(au.segments().len(), 3);
        assert_eq!(au.daughters()["A"], vec!["B".to_string(), "C".to_string()]);
        assert_eq!(au.segments()[1].segtype, SegType::Glycan);
        assert_eq!(au.segments()[1].parent_chain_id.as_deref(), Some("A"));
        assert_eq!(au.chain_ids(), &["A".to_string(), "B".to_string(), "C".to_string()]);
        assert!(cm.is_used("B"));

        let (_, link) = au.links().next().unwrap();
        assert_eq!(link.partner2.key, key("B", 501));
        assert!(au.atoms().any(|a| a.resname == "NAG" && a.chain_id == "B"));
    }

    #[test]
    fn colliding_chain_is_renamed_everywhere() {
        let parsed = glycoprotein();
        let mut cm = ChainIdManager::with_reserves(
            ChainIdFormat::Pdb,
            BTreeMap::from([("A".to_string(), vec!["B".to_string()])]),
            BTreeMap::new(),
        )
        .unwrap();
        let au = AsymmetricUnit::from_parsed(parsed, &SegtypeRegistry::new(), &mut cm).unwrap();
        assert_eq!(au.chain_ids(), &["A".to_string(), "C".to_string()]);
        let (_, link) = au.links().next().unwrap();
        assert_eq!(link.partner2.key, key("C", 1));
        assert!(au.atoms().filter(|a| a.resname == "NAG").all(|a| a.chain_id == "C"));
    }

    #[test]
    fn deletion_removes_down_group_and_releases_empty_chain() {
        let (mut au, mut cm) = build(glycoprotein());
        let deletion = Deletion::from_shortcode("A:2").unwrap();
        au.apply_deletion(&deletion, &mut cm).unwrap();

        assert!(au.get_residue(&ResidueQuery::key(&key("A", 2))).is_none());
        assert!(au.get_residue(&ResidueQuery::key(&key("B", 1))).is_none());
        assert_eq!(au.links().count(), 0);
        assert_eq!(au.chain_ids(), &["A".to_string()]);
        assert!(!cm.is_used("B"));
        assert_eq!(au.atom_count(), 2);
        assert_eq!(au.mods.deletions.len(), 1);
    }

    #[test]
    fn deleting_unknown_range_fails() {
        let (mut au, mut cm) = build(glycoprotein());
        let deletion = Deletion::from_shortcode("A:50-60").unwrap();
        assert!(matches!(
            au.apply_deletion(&deletion, &mut cm),
            Err(MoleculeError::ResidueNotFound(_))
        ));
    }

    #[test]
    fn mutation_renames_and_drops_glycan() {
        let (mut au, mut cm) = build(glycoprotein());
        let mutation = Mutation::from_shortcode("A:N2Q").unwrap();
        au.apply_mutation(&mutation, &mut cm).unwrap();

        let id = residue_id(&au, "A", 2);
        let residue = au.residue(id).unwrap();
        assert_eq!(residue.resname, "GLN");
        assert!(residue.down().is_empty());
        assert!(au.atoms().filter(|a| a.resseqnum == 2 && a.chain_id == "A").all(|a| a.resname == "GLN"));
        assert_eq!(au.links().count(), 0);
        assert_eq!(au.segments().len(), 1);
    }

    #[test]
    fn mutation_across_segtypes_moves_residue_to_daughter_chain() {
        let (mut au, mut cm) = build(glycoprotein());
        let mutation = Mutation {
            chain_id: "A".to_string(),
            resseqnum: 4,
            insertion: String::new(),
            orig_resname: "GLY".to_string(),
            new_resname: "NAG".to_string(),
        };
        au.apply_mutation(&mutation, &mut cm).unwrap();

        assert_eq!(au.daughters()["A"], vec!["C".to_string()]);
        let id = residue_id(&au, "C", 4);
        assert_eq!(au.residue(id).unwrap().segtype, SegType::Glycan);
        let protein: Vec<isize> = au.residues_in_chain("A").map(|r| r.resseqnum).collect();
        assert_eq!(protein, vec![1, 2, 3]);
        assert_eq!(au.segments().iter().filter(|s| s.segtype == SegType::Glycan).count(), 2);
        assert!(au.atoms().any(|a| a.resname == "NAG" && a.chain_id == "C" && a.resseqnum == 4));
    }

    #[test]
    fn substitution_renames_range_and_deletes_surplus() {
        let (mut au, mut cm) = build(glycoprotein());
        let substitution = Substitution::from_shortcode("A:1,3,GS").unwrap();
        au.apply_substitution(&substitution, &mut cm).unwrap();

        let names: Vec<String> = au
            .residues_in_chain("A")
            .map(|r| format!("{}{}", r.resname, r.resseqnum))
            .collect();
        assert_eq!(names, vec!["GLY1", "SER2", "GLY4"]);

        let too_long = Substitution::from_shortcode("A:1,1,GGG").unwrap();
        assert!(matches!(
            au.apply_substitution(&too_long, &mut cm),
            Err(MoleculeError::InvalidModification(_))
        ));
    }

    #[test]
    fn cleavage_moves_tail_to_daughter_chain() {
        let (mut au, mut cm) = build(glycoprotein());
        let cleavage = Cleavage::from_shortcode("A:2").unwrap();
        au.apply_cleavage(&cleavage, &mut cm).unwrap();

        assert_eq!(au.daughters()["A"], vec!["C".to_string()]);
        let tail: Vec<isize> = au.residues_in_chain("C").map(|r| r.resseqnum).collect();
        assert_eq!(tail, vec![3, 4]);
        assert_eq!(au.segments().iter().filter(|s| s.segtype == SegType::Protein).count(), 2);

        let at_end = Cleavage::from_shortcode("C:4").unwrap();
        assert!(matches!(
            au.apply_cleavage(&at_end, &mut cm),
            Err(MoleculeError::InvalidModification(_))
        ));
    }
}
