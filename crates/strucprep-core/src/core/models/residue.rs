use super::annotations::Missing;
use super::atom::Atom;
use super::ids::{AtomId, LinkId, ResidueId};
use super::segment::{ResidueState, SegType};
use slotmap::SlotMap;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Residue identity within a structure: chain, sequence number and insertion code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueKey {
    pub chain_id: String,
    pub resseqnum: isize,
    pub insertion: String,
}

impl ResidueKey {
    pub fn new(chain_id: &str, resseqnum: isize, insertion: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            resseqnum,
            insertion: insertion.to_string(),
        }
    }

    /// Orders by sequence number, then insertion code, ignoring the chain.
    pub fn seq_cmp(&self, other: &ResidueKey) -> Ordering {
        self.resseqnum
            .cmp(&other.resseqnum)
            .then_with(|| self.insertion.cmp(&other.insertion))
    }

    /// Sequence number plus insertion code, e.g. `"100A"`.
    pub fn resid(&self) -> String {
        format!("{}{}", self.resseqnum, self.insertion)
    }
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.chain_id, self.resseqnum, self.insertion)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub resname: String,
    pub chain_id: String,
    pub resseqnum: isize,
    pub insertion: String,
    pub segtype: SegType,
    pub auth_key: Option<ResidueKey>,
    pub(crate) atoms: Vec<AtomId>,
    pub(crate) up: Vec<ResidueId>,
    pub(crate) uplink: Vec<LinkId>,
    pub(crate) down: Vec<ResidueId>,
    pub(crate) downlink: Vec<LinkId>,
}

impl Residue {
    pub fn new(resname: &str, key: &ResidueKey) -> Self {
        Self {
            resname: resname.to_string(),
            chain_id: key.chain_id.clone(),
            resseqnum: key.resseqnum,
            insertion: key.insertion.clone(),
            segtype: SegType::Unset,
            auth_key: None,
            atoms: Vec::new(),
            up: Vec::new(),
            uplink: Vec::new(),
            down: Vec::new(),
            downlink: Vec::new(),
        }
    }

    pub fn from_atom(atom: &Atom) -> Self {
        let mut residue = Self::new(&atom.resname, &atom.residue_key());
        residue.auth_key = atom.auth_residue_key();
        residue
    }

    /// A placeholder residue with no atoms.
    pub fn from_missing(missing: &Missing) -> Self {
        Self::new(&missing.resname, &missing.key())
    }

    pub fn key(&self) -> ResidueKey {
        ResidueKey::new(&self.chain_id, self.resseqnum, &self.insertion)
    }

    pub fn resid(&self) -> String {
        format!("{}{}", self.resseqnum, self.insertion)
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn up(&self) -> &[ResidueId] {
        &self.up
    }

    pub fn uplink(&self) -> &[LinkId] {
        &self.uplink
    }

    pub fn down(&self) -> &[ResidueId] {
        &self.down
    }

    pub fn downlink(&self) -> &[LinkId] {
        &self.downlink
    }

    pub fn is_resolved(&self) -> bool {
        !self.atoms.is_empty()
    }

    pub fn state(&self) -> ResidueState {
        if self.is_resolved() {
            ResidueState::Resolved
        } else {
            ResidueState::Missing
        }
    }

    pub fn matches_atom(&self, atom: &Atom) -> bool {
        self.resname == atom.resname
            && self.chain_id == atom.chain_id
            && self.resseqnum == atom.resseqnum
            && self.insertion == atom.insertion
    }

    pub(crate) fn add_atom(&mut self, atom_id: AtomId) {
        self.atoms.push(atom_id);
    }

    pub(crate) fn add_downstream(&mut self, residue: ResidueId, link: LinkId) {
        self.down.push(residue);
        self.downlink.push(link);
    }

    pub(crate) fn add_upstream(&mut self, residue: ResidueId, link: LinkId) {
        self.up.push(residue);
        self.uplink.push(link);
    }

    /// Drops every adjacency entry that goes through `link`.
    pub(crate) fn unlink(&mut self, link: LinkId) {
        if let Some(i) = self.downlink.iter().position(|&l| l == link) {
            self.downlink.remove(i);
            self.down.remove(i);
        }
        if let Some(i) = self.uplink.iter().position(|&l| l == link) {
            self.uplink.remove(i);
            self.up.remove(i);
        }
    }
}

/// Records `link` as joining `upstream` to `downstream` on both residues.
pub fn link_to(
    residues: &mut SlotMap<ResidueId, Residue>,
    upstream: ResidueId,
    downstream: ResidueId,
    link: LinkId,
) {
    if let Some(residue) = residues.get_mut(upstream) {
        residue.add_downstream(downstream, link);
    }
    if let Some(residue) = residues.get_mut(downstream) {
        residue.add_upstream(upstream, link);
    }
}

/// Every residue reachable from `start` through `down` pointers, depth first,
/// together with the links traversed to reach them. `start` itself is excluded.
pub fn get_down_group(
    residues: &SlotMap<ResidueId, Residue>,
    start: ResidueId,
) -> (Vec<ResidueId>, Vec<LinkId>) {
    let mut group = Vec::new();
    let mut links = Vec::new();
    let mut visited = HashSet::from([start]);
    let mut stack: Vec<(ResidueId, LinkId)> = Vec::new();

    let push_children = |stack: &mut Vec<(ResidueId, LinkId)>, id: ResidueId| {
        if let Some(residue) = residues.get(id) {
            for (&child, &link) in residue.down.iter().zip(residue.downlink.iter()).rev() {
                stack.push((child, link));
            }
        }
    };

    push_children(&mut stack, start);
    while let Some((id, link)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        group.push(id);
        links.push(link);
        push_children(&mut stack, id);
    }
    (group, links)
}

/// Field filter over residues; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidueQuery {
    pub chain_id: Option<String>,
    pub resseqnum: Option<isize>,
    pub insertion: Option<String>,
    pub resname: Option<String>,
    pub segtype: Option<SegType>,
    pub resolved: Option<bool>,
}

impl ResidueQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(key: &ResidueKey) -> Self {
        Self::new()
            .chain_id(&key.chain_id)
            .resseqnum(key.resseqnum)
            .insertion(&key.insertion)
    }

    pub fn chain_id(mut self, chain_id: &str) -> Self {
        self.chain_id = Some(chain_id.to_string());
        self
    }

    pub fn resseqnum(mut self, resseqnum: isize) -> Self {
        self.resseqnum = Some(resseqnum);
        self
    }

    pub fn insertion(mut self, insertion: &str) -> Self {
        self.insertion = Some(insertion.to_string());
        self
    }

    pub fn resname(mut self, resname: &str) -> Self {
        self.resname = Some(resname.to_string());
        self
    }

    pub fn segtype(mut self, segtype: SegType) -> Self {
        self.segtype = Some(segtype);
        self
    }

    pub fn resolved(mut self, resolved: bool) -> Self {
        self.resolved = Some(resolved);
        self
    }

    pub fn matches(&self, residue: &Residue) -> bool {
        self.chain_id.as_ref().is_none_or(|c| *c == residue.chain_id)
            && self.resseqnum.is_none_or(|n| n == residue.resseqnum)
            && self.insertion.as_ref().is_none_or(|i| *i == residue.insertion)
            && self.resname.as_ref().is_none_or(|r| *r == residue.resname)
            && self.segtype.is_none_or(|s| s == residue.segtype)
            && self.resolved.is_none_or(|r| r == residue.is_resolved())
    }
}
