use super::ids::{AtomId, ResidueId};
use super::residue::ResidueKey;
use super::segment::SegType;
use crate::core::io::cif::{CifError, CifRow};
use crate::core::io::pdb::{PdbError, PdbRecord};
use crate::core::topology::patches::{DISULFIDE_PATCH, PatchEnd, resolve_patch};
use crate::core::topology::residues::is_sialic_acid;
use crate::core::utils::geometry::NamedCoords;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PatchName {
    Named(String),
    #[default]
    Unfound,
}

impl PatchName {
    pub fn is_found(&self) -> bool {
        matches!(self, PatchName::Named(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            PatchName::Named(name) => name,
            PatchName::Unfound => "UNFOUND",
        }
    }
}

impl fmt::Display for PatchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One bonded end of a link record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPartner {
    pub atom_name: String,
    pub altloc: String,
    pub resname: String,
    pub key: ResidueKey,
    pub auth_key: Option<ResidueKey>,
}

impl LinkPartner {
    fn is_anomeric_donor(&self) -> bool {
        self.atom_name == "C1" || (self.atom_name == "C2" && is_sialic_acid(&self.resname))
    }
}

/// A covalent bond between atoms of two different residues.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub partner1: LinkPartner,
    pub partner2: LinkPartner,
    pub sym1: String,
    pub sym2: String,
    pub length: Option<f64>,
    pub residue1: Option<ResidueId>,
    pub residue2: Option<ResidueId>,
    pub atom1: Option<AtomId>,
    pub atom2: Option<AtomId>,
    pub segtype1: SegType,
    pub segtype2: SegType,
    pub patchname: PatchName,
    /// The patch directive names residue2 before residue1.
    pub reversed: bool,
}

fn resid_of(chain_map: &BTreeMap<String, String>, key: &ResidueKey) -> String {
    let segname = chain_map.get(&key.chain_id).unwrap_or(&key.chain_id);
    format!("{}:{}", segname, key.resid())
}

impl Link {
    pub fn new(partner1: LinkPartner, partner2: LinkPartner) -> Self {
        Self {
            partner1,
            partner2,
            sym1: String::new(),
            sym2: String::new(),
            length: None,
            residue1: None,
            residue2: None,
            atom1: None,
            atom2: None,
            segtype1: SegType::Unset,
            segtype2: SegType::Unset,
            patchname: PatchName::Unfound,
            reversed: false,
        }
    }

    pub fn from_pdb_record(record: &PdbRecord) -> Result<Self, PdbError> {
        let partner1 = LinkPartner {
            atom_name: record.required_text(12, 16)?.to_string(),
            altloc: record.text(16, 17).to_string(),
            resname: record.text(17, 20).to_string(),
            key: ResidueKey::new(record.text(21, 22), record.int(22, 26)?, record.text(26, 27)),
            auth_key: None,
        };
        let partner2 = LinkPartner {
            atom_name: record.required_text(42, 46)?.to_string(),
            altloc: record.text(46, 47).to_string(),
            resname: record.text(47, 50).to_string(),
            key: ResidueKey::new(record.text(51, 52), record.int(52, 56)?, record.text(56, 57)),
            auth_key: None,
        };
        let mut link = Self::new(partner1, partner2);
        link.sym1 = record.text(59, 65).to_string();
        link.sym2 = record.text(66, 72).to_string();
        link.length = record.opt_float(73, 78)?;
        Ok(link)
    }

    /// Reads a covalent or metal-coordination `struct_conn` row.
    pub fn from_cif_row(row: &CifRow) -> Result<Self, CifError> {
        let partner = |n: u8| -> Result<LinkPartner, CifError> {
            let seq = row.int(&format!("ptnr{n}_auth_seq_id"))?;
            let insertion = row.get(&format!("pdbx_ptnr{n}_pdb_ins_code"));
            let auth_chain = row.get(&format!("ptnr{n}_auth_asym_id"));
            Ok(LinkPartner {
                atom_name: row.required(&format!("ptnr{n}_label_atom_id"))?.to_string(),
                altloc: row.get(&format!("pdbx_ptnr{n}_label_alt_id")).to_string(),
                resname: row.get(&format!("ptnr{n}_label_comp_id")).to_string(),
                key: ResidueKey::new(row.required(&format!("ptnr{n}_label_asym_id"))?, seq, insertion),
                auth_key: (!auth_chain.is_empty()).then(|| ResidueKey::new(auth_chain, seq, insertion)),
            })
        };
        let mut link = Self::new(partner(1)?, partner(2)?);
        link.sym1 = row.get("ptnr1_symmetry").to_string();
        link.sym2 = row.get("ptnr2_symmetry").to_string();
        link.length = row.opt_float("pdbx_dist_value")?;
        Ok(link)
    }

    pub fn is_resolved(&self) -> bool {
        self.residue1.is_some() && self.residue2.is_some() && self.atom1.is_some() && self.atom2.is_some()
    }

    pub fn involves(&self, residue: ResidueId) -> bool {
        self.residue1 == Some(residue) || self.residue2 == Some(residue)
    }

    /// Exchanges the two ends along with everything resolved for them.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.partner1, &mut self.partner2);
        std::mem::swap(&mut self.sym1, &mut self.sym2);
        std::mem::swap(&mut self.residue1, &mut self.residue2);
        std::mem::swap(&mut self.atom1, &mut self.atom2);
        std::mem::swap(&mut self.segtype1, &mut self.segtype2);
    }

    /// Puts the upstream end first: protein before glycan or ion, and a
    /// glycosidic acceptor oxygen before the donor anomeric carbon.
    /// Returns whether the ends were exchanged.
    pub fn orient(&mut self) -> bool {
        let should_swap = match (self.segtype1, self.segtype2) {
            (SegType::Glycan, SegType::Protein) | (SegType::Ion, SegType::Protein) => true,
            (SegType::Glycan, SegType::Glycan) => {
                self.partner1.is_anomeric_donor() && !self.partner2.is_anomeric_donor()
            }
            _ => false,
        };
        if should_swap {
            self.swap();
        }
        should_swap
    }

    /// Chooses the patch for this link from its segtypes, atom names and the
    /// geometry of the two residues.
    pub fn set_patchname(&mut self, coords1: &NamedCoords, coords2: &NamedCoords) {
        let ends = [
            PatchEnd {
                resname: &self.partner1.resname,
                atom_name: &self.partner1.atom_name,
                segtype: self.segtype1,
            },
            PatchEnd {
                resname: &self.partner2.resname,
                atom_name: &self.partner2.atom_name,
                segtype: self.segtype2,
            },
        ];
        match resolve_patch(ends, [coords1, coords2]) {
            Some(assignment) => {
                self.patchname = PatchName::Named(assignment.name);
                self.reversed = assignment.reversed;
            }
            None => {
                warn!(
                    "No patch found for link {} {} ({}) -> {} {} ({}).",
                    self.partner1.key,
                    self.partner1.atom_name,
                    self.segtype1,
                    self.partner2.key,
                    self.partner2.atom_name,
                    self.segtype2
                );
                self.patchname = PatchName::Unfound;
                self.reversed = false;
            }
        }
    }

    /// Renders `patch NAME SEG:RESID SEG:RESID`, renaming chains through `chain_map`.
    /// Links without a patch render nothing.
    pub fn patch_directive(&self, chain_map: &BTreeMap<String, String>) -> Option<String> {
        let PatchName::Named(name) = &self.patchname else {
            return None;
        };
        let first = resid_of(chain_map, &self.partner1.key);
        let second = resid_of(chain_map, &self.partner2.key);
        Some(if self.reversed {
            format!("patch {name} {second} {first}")
        } else {
            format!("patch {name} {first} {second}")
        })
    }
}

/// One residue of a disulfide record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondPartner {
    pub resname: String,
    pub key: ResidueKey,
    pub auth_key: Option<ResidueKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SsBond {
    pub serial: Option<isize>,
    pub partner1: BondPartner,
    pub partner2: BondPartner,
    pub sym1: String,
    pub sym2: String,
    pub length: Option<f64>,
    pub residue1: Option<ResidueId>,
    pub residue2: Option<ResidueId>,
}

impl SsBond {
    pub fn new(partner1: BondPartner, partner2: BondPartner) -> Self {
        Self {
            serial: None,
            partner1,
            partner2,
            sym1: String::new(),
            sym2: String::new(),
            length: None,
            residue1: None,
            residue2: None,
        }
    }

    pub fn from_pdb_record(record: &PdbRecord) -> Result<Self, PdbError> {
        let partner1 = BondPartner {
            resname: record.text(11, 14).to_string(),
            key: ResidueKey::new(record.text(15, 16), record.int(17, 21)?, record.text(21, 22)),
            auth_key: None,
        };
        let partner2 = BondPartner {
            resname: record.text(25, 28).to_string(),
            key: ResidueKey::new(record.text(29, 30), record.int(31, 35)?, record.text(35, 36)),
            auth_key: None,
        };
        let mut bond = Self::new(partner1, partner2);
        bond.serial = record.opt_int(7, 10)?;
        bond.sym1 = record.text(59, 65).to_string();
        bond.sym2 = record.text(66, 72).to_string();
        bond.length = record.opt_float(73, 78)?;
        Ok(bond)
    }

    /// Reads a `struct_conn` row whose `conn_type_id` is `disulf`.
    pub fn from_cif_row(row: &CifRow) -> Result<Self, CifError> {
        let partner = |n: u8| -> Result<BondPartner, CifError> {
            let seq = row.int(&format!("ptnr{n}_auth_seq_id"))?;
            let insertion = row.get(&format!("pdbx_ptnr{n}_pdb_ins_code"));
            let auth_chain = row.get(&format!("ptnr{n}_auth_asym_id"));
            Ok(BondPartner {
                resname: row.get(&format!("ptnr{n}_label_comp_id")).to_string(),
                key: ResidueKey::new(row.required(&format!("ptnr{n}_label_asym_id"))?, seq, insertion),
                auth_key: (!auth_chain.is_empty()).then(|| ResidueKey::new(auth_chain, seq, insertion)),
            })
        };
        let mut bond = Self::new(partner(1)?, partner(2)?);
        bond.sym1 = row.get("ptnr1_symmetry").to_string();
        bond.sym2 = row.get("ptnr2_symmetry").to_string();
        bond.length = row.opt_float("pdbx_dist_value")?;
        Ok(bond)
    }

    pub fn is_resolved(&self) -> bool {
        self.residue1.is_some() && self.residue2.is_some()
    }

    pub fn involves(&self, residue: ResidueId) -> bool {
        self.residue1 == Some(residue) || self.residue2 == Some(residue)
    }

    pub fn patchname(&self) -> &'static str {
        DISULFIDE_PATCH
    }

    pub fn patch_directive(&self, chain_map: &BTreeMap<String, String>) -> String {
        format!(
            "patch {} {} {}",
            DISULFIDE_PATCH,
            resid_of(chain_map, &self.partner1.key),
            resid_of(chain_map, &self.partner2.key)
        )
    }
}
