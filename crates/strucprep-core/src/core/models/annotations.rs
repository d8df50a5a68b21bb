use super::residue::ResidueKey;
use crate::core::io::cif::{CifError, CifRow};
use crate::core::io::pdb::{PdbError, PdbRecord};
use std::fmt;
use tracing::warn;

/// A chain terminator record; only its serial matters after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ter {
    pub serial: Option<usize>,
    pub resname: String,
    pub chain_id: String,
    pub resseqnum: Option<isize>,
    pub insertion: String,
}

impl Ter {
    pub fn from_pdb_record(record: &PdbRecord) -> Result<Self, PdbError> {
        Ok(Self {
            serial: record.opt_int(6, 11)?.map(|s| s.max(0) as usize),
            resname: record.text(17, 21).to_string(),
            chain_id: record.text(21, 22).to_string(),
            resseqnum: record.opt_int(22, 26)?,
            insertion: record.text(26, 27).to_string(),
        })
    }
}

/// A residue present in the sequence but absent from the coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Missing {
    pub model: Option<isize>,
    pub resname: String,
    pub chain_id: String,
    pub resseqnum: isize,
    pub insertion: String,
}

impl Missing {
    pub fn new(resname: &str, chain_id: &str, resseqnum: isize, insertion: &str) -> Self {
        Self {
            model: None,
            resname: resname.to_string(),
            chain_id: chain_id.to_string(),
            resseqnum,
            insertion: insertion.to_string(),
        }
    }

    /// Reads one tabular `REMARK 465` row.
    pub fn from_pdb_record(record: &PdbRecord) -> Result<Self, PdbError> {
        Ok(Self {
            model: record.opt_int(11, 14)?,
            resname: record.required_text(15, 18)?.to_string(),
            chain_id: record.text(19, 20).to_string(),
            resseqnum: record.int(21, 26)?,
            insertion: record.text(26, 27).to_string(),
        })
    }

    /// Reads a `pdbx_unobs_or_zero_occ_residues` row.
    pub fn from_cif_row(row: &CifRow) -> Result<Self, CifError> {
        Ok(Self {
            model: row.opt_int("pdb_model_num")?,
            resname: row.required("label_comp_id")?.to_string(),
            chain_id: row.required("label_asym_id")?.to_string(),
            resseqnum: row.int("auth_seq_id")?,
            insertion: row.get("pdb_ins_code").to_string(),
        })
    }

    pub fn key(&self) -> ResidueKey {
        ResidueKey::new(&self.chain_id, self.resseqnum, &self.insertion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    EngineeredMutation,
    Conflict,
    ExpressionTag,
    CloningArtifact,
    Variant,
    Insertion,
    Deletion,
    Microheterogeneity,
    Linker,
    InitiatingMethionine,
    ModifiedResidue,
    Chromophore,
    SeeRemark,
    Other,
}

impl ConflictKind {
    /// Classifies the free-text conflict column; unrecognised text maps to `Other`.
    pub fn classify(text: &str) -> Self {
        let normalized = text.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "ENGINEERED MUTATION" | "ENGINEERED" => ConflictKind::EngineeredMutation,
            "CONFLICT" => ConflictKind::Conflict,
            "EXPRESSION TAG" => ConflictKind::ExpressionTag,
            "CLONING ARTIFACT" => ConflictKind::CloningArtifact,
            "VARIANT" => ConflictKind::Variant,
            "INSERTION" => ConflictKind::Insertion,
            "DELETION" => ConflictKind::Deletion,
            "MICROHETEROGENEITY" => ConflictKind::Microheterogeneity,
            "LINKER" => ConflictKind::Linker,
            "INITIATING METHIONINE" => ConflictKind::InitiatingMethionine,
            "MODIFIED RESIDUE" => ConflictKind::ModifiedResidue,
            "CHROMOPHORE" => ConflictKind::Chromophore,
            s if s.starts_with("SEE REMARK") || s.starts_with("SEE SEQUENCE DETAILS") => {
                ConflictKind::SeeRemark
            }
            _ => ConflictKind::Other,
        }
    }

    /// Whether the deposited residue was deliberately engineered.
    pub fn is_engineered(&self) -> bool {
        matches!(self, ConflictKind::EngineeredMutation)
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictKind::EngineeredMutation => "engineered mutation",
            ConflictKind::Conflict => "conflict",
            ConflictKind::ExpressionTag => "expression tag",
            ConflictKind::CloningArtifact => "cloning artifact",
            ConflictKind::Variant => "variant",
            ConflictKind::Insertion => "insertion",
            ConflictKind::Deletion => "deletion",
            ConflictKind::Microheterogeneity => "microheterogeneity",
            ConflictKind::Linker => "linker",
            ConflictKind::InitiatingMethionine => "initiating methionine",
            ConflictKind::ModifiedResidue => "modified residue",
            ConflictKind::Chromophore => "chromophore",
            ConflictKind::SeeRemark => "see remark",
            ConflictKind::Other => "_other_",
        };
        write!(f, "{}", s)
    }
}

/// A sequence difference between the deposited model and its reference database entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub resname: String,
    pub chain_id: String,
    pub resseqnum: Option<isize>,
    pub insertion: String,
    pub database: String,
    pub db_accession: String,
    pub db_resname: String,
    pub db_seqnum: Option<isize>,
    pub kind: ConflictKind,
    pub description: String,
}

impl Conflict {
    fn classified(description: &str) -> ConflictKind {
        let kind = ConflictKind::classify(description);
        if kind == ConflictKind::Other {
            warn!("Unhandled sequence conflict type '{}'.", description.trim());
        }
        kind
    }

    pub fn from_pdb_record(record: &PdbRecord) -> Result<Self, PdbError> {
        let description = record.text(49, 70);
        Ok(Self {
            resname: record.text(12, 15).to_string(),
            chain_id: record.text(16, 17).to_string(),
            resseqnum: record.opt_int(18, 22)?,
            insertion: record.text(22, 23).to_string(),
            database: record.text(24, 28).to_string(),
            db_accession: record.text(29, 38).to_string(),
            db_resname: record.text(39, 42).to_string(),
            db_seqnum: record.opt_int(43, 48)?,
            kind: Self::classified(description),
            description: description.to_string(),
        })
    }

    /// Reads a `struct_ref_seq_dif` row; the chain is the author strand identifier.
    pub fn from_cif_row(row: &CifRow) -> Result<Self, CifError> {
        let description = row.get("details");
        Ok(Self {
            resname: row.get("mon_id").to_string(),
            chain_id: row.get("pdbx_pdb_strand_id").to_string(),
            resseqnum: row.opt_int("pdbx_auth_seq_num")?,
            insertion: row.get("pdbx_pdb_ins_code").to_string(),
            database: row.get("pdbx_seq_db_name").to_string(),
            db_accession: row.get("pdbx_seq_db_accession_code").to_string(),
            db_resname: row.get("db_mon_id").to_string(),
            db_seqnum: row.opt_int("pdbx_seq_db_seq_num")?,
            kind: Self::classified(description),
            description: description.to_string(),
        })
    }
}
