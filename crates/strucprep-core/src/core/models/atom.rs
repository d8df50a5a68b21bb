use super::ids::ResidueId;
use super::residue::ResidueKey;
use crate::core::io::cif::{CifError, CifRow};
use crate::core::io::pdb::{PdbError, PdbRecord};
use nalgebra::Point3;
use tracing::debug;

/// mmCIF author-numbering values kept alongside the label values used for identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthFields {
    pub asym_id: String,
    pub seq_id: isize,
    pub comp_id: String,
    pub atom_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub serial: usize,
    pub original_serial: usize,
    pub name: String,
    pub altloc: String,
    pub resname: String,
    pub chain_id: String,
    pub resseqnum: isize,
    pub insertion: String,
    pub position: Point3<f64>,
    pub occupancy: f64,
    pub beta: f64,
    pub element: String,
    pub formal_charge: i8,
    pub segname: String,
    pub hetero: bool,
    pub auth: Option<AuthFields>,

    pub(crate) residue_id: Option<ResidueId>,
}

impl Atom {
    pub fn new(
        serial: usize,
        name: &str,
        resname: &str,
        chain_id: &str,
        resseqnum: isize,
        position: Point3<f64>,
    ) -> Self {
        Self {
            serial,
            original_serial: serial,
            name: name.to_string(),
            altloc: String::new(),
            resname: resname.to_string(),
            chain_id: chain_id.to_string(),
            resseqnum,
            insertion: String::new(),
            position,
            occupancy: 1.0,
            beta: 0.0,
            element: String::new(),
            formal_charge: 0,
            segname: String::new(),
            hetero: false,
            auth: None,
            residue_id: None,
        }
    }

    pub fn from_pdb_record(record: &PdbRecord) -> Result<Self, PdbError> {
        let serial = record.int(6, 11)?;
        let name = record.required_text(12, 16)?;
        let x = record.float(30, 38)?;
        let y = record.float(38, 46)?;
        let z = record.float(46, 54)?;

        Ok(Self {
            serial: serial.max(0) as usize,
            original_serial: serial.max(0) as usize,
            name: name.to_string(),
            altloc: record.text(16, 17).to_string(),
            resname: record.text(17, 21).to_string(),
            chain_id: record.text(21, 22).to_string(),
            resseqnum: record.int(22, 26)?,
            insertion: record.text(26, 27).to_string(),
            position: Point3::new(x, y, z),
            occupancy: record.opt_float(54, 60)?.unwrap_or(1.0),
            beta: record.opt_float(60, 66)?.unwrap_or(0.0),
            element: record.text(76, 78).to_string(),
            formal_charge: parse_pdb_charge(record.text(78, 80)),
            segname: record.text(72, 76).to_string(),
            hetero: record.record_type() == "HETATM",
            auth: None,
            residue_id: None,
        })
    }

    /// Builds an atom from an `atom_site` row, keyed by label identifiers.
    pub fn from_cif_row(row: &CifRow) -> Result<Self, CifError> {
        let serial = row.int("id")?.max(0) as usize;
        let label_seq = row.opt_int("label_seq_id")?;
        let auth_seq = row.opt_int("auth_seq_id")?;
        let resseqnum = auth_seq.or(label_seq).ok_or_else(|| CifError::MissingField {
            category: "atom_site".into(),
            key: "auth_seq_id".into(),
        })?;

        let auth = AuthFields {
            asym_id: row.get("auth_asym_id").to_string(),
            seq_id: resseqnum,
            comp_id: row.get("auth_comp_id").to_string(),
            atom_id: row.get("auth_atom_id").to_string(),
        };

        Ok(Self {
            serial,
            original_serial: serial,
            name: row.required("label_atom_id")?.to_string(),
            altloc: row.get("label_alt_id").to_string(),
            resname: row.required("label_comp_id")?.to_string(),
            chain_id: row.required("label_asym_id")?.to_string(),
            resseqnum,
            insertion: row.get("pdbx_pdb_ins_code").to_string(),
            position: Point3::new(
                row.float("cartn_x")?,
                row.float("cartn_y")?,
                row.float("cartn_z")?,
            ),
            occupancy: row.opt_float("occupancy")?.unwrap_or(1.0),
            beta: row.opt_float("b_iso_or_equiv")?.unwrap_or(0.0),
            element: row.get("type_symbol").to_string(),
            formal_charge: row
                .opt_int("pdbx_formal_charge")?
                .map(|c| c.clamp(i8::MIN as isize, i8::MAX as isize) as i8)
                .unwrap_or(0),
            segname: String::new(),
            hetero: row.get("group_pdb") == "HETATM",
            auth: Some(auth),
            residue_id: None,
        })
    }

    pub fn residue_id(&self) -> Option<ResidueId> {
        self.residue_id
    }

    pub fn residue_key(&self) -> ResidueKey {
        ResidueKey::new(&self.chain_id, self.resseqnum, &self.insertion)
    }

    /// Key under author numbering, if this atom came from an mmCIF file.
    pub fn auth_residue_key(&self) -> Option<ResidueKey> {
        self.auth
            .as_ref()
            .map(|a| ResidueKey::new(&a.asym_id, a.seq_id, &self.insertion))
    }
}

/// Parses the PDB charge column (`"2+"`, `"1-"`); blank or malformed values read as neutral.
fn parse_pdb_charge(text: &str) -> i8 {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(d), Some(sign)) if d.is_ascii_digit() => {
            let magnitude = d.to_digit(10).unwrap_or(0) as i8;
            match sign {
                '-' => -magnitude,
                '+' => magnitude,
                _ => 0,
            }
        }
        _ => 0,
    }
}

/// Renumbers atoms to the contiguous `1..=N` sequence a TER-unaware reader would produce.
///
/// The adjusted serial is computed as the original serial minus the number of
/// TER serials below it. When the source numbering is not simply gapped by TER
/// records (duplicates, jumps), positional numbering wins. Returns the number of
/// atoms whose offset-derived serial disagreed with their position.
pub fn adjust_serials(atoms: &mut [Atom], ter_serials: &[usize]) -> usize {
    let mut ters = ter_serials.to_vec();
    ters.sort_unstable();

    let mut disagreements = 0;
    for (index, atom) in atoms.iter_mut().enumerate() {
        let original = atom.original_serial;
        let offset = ters.partition_point(|&t| t < original);
        let expected = index + 1;
        if original.saturating_sub(offset) != expected {
            disagreements += 1;
        }
        atom.serial = expected;
    }
    if disagreements > 0 {
        debug!(
            "{} atom serials did not follow a TER-gapped numbering; renumbered positionally.",
            disagreements
        );
    }
    disagreements
}
