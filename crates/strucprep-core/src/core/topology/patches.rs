//! Patch-residue selection for covalent links between residues.
//!
//! Most glycosidic and glycopeptide links can be realised by two or more
//! patches that differ only in anomeric configuration. The choice is made
//! geometrically: each candidate carries reference dihedral values, and the
//! candidate nearest to the measured geometry wins (see
//! [`ic_reference_closest`]). Donor anomers are read from the
//! `X-C1-O5-C5` dihedral (about 60° for an axial, α-D bond and 180° for an
//! equatorial, β-D bond); acceptor ring positions from the dihedral of the
//! acceptor oxygen against the two preceding ring atoms.

use super::residues::is_sialic_acid;
use crate::core::models::segment::SegType;
use crate::core::utils::geometry::{IcMap, NamedCoords, ic, ic_reference_closest};

/// Identity of one bonded end, as seen by the patch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchEnd<'a> {
    pub resname: &'a str,
    pub atom_name: &'a str,
    pub segtype: SegType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchAssignment {
    pub name: String,
    /// The patch lists the downstream residue first.
    pub reversed: bool,
}

impl PatchAssignment {
    fn forward(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reversed: false,
        }
    }

    fn reversed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reversed: true,
        }
    }
}

pub const DISULFIDE_PATCH: &str = "DISU";

const ASN_GLYCAN: IcMap = IcMap {
    atoms: [ic(0, "ND2"), ic(1, "C1"), ic(1, "O5"), ic(1, "C5")],
    references: &[("NGLA", 60.0), ("NGLB", 180.0)],
};

const SER_GLYCAN: IcMap = IcMap {
    atoms: [ic(0, "OG"), ic(1, "C1"), ic(1, "O5"), ic(1, "C5")],
    references: &[("SGPA", 60.0), ("SGPB", 180.0)],
};

const THR_GLYCAN: IcMap = IcMap {
    atoms: [ic(0, "OG1"), ic(1, "C1"), ic(1, "O5"), ic(1, "C5")],
    references: &[("TGPA", 60.0), ("TGPB", 180.0)],
};

const GLYCAN_16: IcMap = IcMap {
    atoms: [ic(0, "O6"), ic(1, "C1"), ic(1, "O5"), ic(1, "C5")],
    references: &[("16AT", 60.0), ("16BT", 180.0)],
};

const GLYCAN_11: [IcMap; 2] = [
    IcMap {
        atoms: [ic(0, "O1"), ic(1, "C1"), ic(1, "O5"), ic(1, "C5")],
        references: &[("11aa", 60.0), ("11ab", 60.0), ("11bb", 180.0)],
    },
    IcMap {
        atoms: [ic(0, "O1"), ic(0, "C1"), ic(0, "O5"), ic(0, "C5")],
        references: &[("11aa", 60.0), ("11ab", 180.0), ("11bb", 180.0)],
    },
];

const GLYCAN_12: [IcMap; 2] = [
    IcMap {
        atoms: [ic(0, "O2"), ic(1, "C1"), ic(1, "O5"), ic(1, "C5")],
        references: &[("12aa", 60.0), ("12ab", 60.0), ("12ba", 180.0), ("12bb", 180.0)],
    },
    IcMap {
        atoms: [ic(0, "O2"), ic(0, "C2"), ic(0, "C1"), ic(0, "O5")],
        references: &[("12aa", -65.0), ("12ab", 180.0), ("12ba", -65.0), ("12bb", 180.0)],
    },
];

const GLYCAN_13: [IcMap; 2] = [
    IcMap {
        atoms: [ic(0, "O3"), ic(1, "C1"), ic(1, "O5"), ic(1, "C5")],
        references: &[("13aa", 60.0), ("13ab", 60.0), ("13ba", 180.0), ("13bb", 180.0)],
    },
    IcMap {
        atoms: [ic(0, "O3"), ic(0, "C3"), ic(0, "C2"), ic(0, "C1")],
        references: &[("13aa", 65.0), ("13ab", 180.0), ("13ba", 65.0), ("13bb", 180.0)],
    },
];

const GLYCAN_14: [IcMap; 2] = [
    IcMap {
        atoms: [ic(0, "O4"), ic(1, "C1"), ic(1, "O5"), ic(1, "C5")],
        references: &[("14aa", 60.0), ("14ab", 60.0), ("14ba", 180.0), ("14bb", 180.0)],
    },
    IcMap {
        atoms: [ic(0, "O4"), ic(0, "C4"), ic(0, "C3"), ic(0, "C2")],
        references: &[("14aa", -65.0), ("14ab", 180.0), ("14ba", -65.0), ("14bb", 180.0)],
    },
];

fn is_histidine(resname: &str) -> bool {
    matches!(resname, "HIS" | "HSD" | "HSE" | "HSP")
}

fn geometric(maps: &[IcMap], coords: [&NamedCoords; 2]) -> Option<PatchAssignment> {
    ic_reference_closest(coords, maps).map(PatchAssignment::forward)
}

fn glycopeptide(
    protein: &PatchEnd,
    glycan: &PatchEnd,
    coords: [&NamedCoords; 2],
) -> Option<PatchAssignment> {
    if glycan.atom_name != "C1" {
        return None;
    }
    match (protein.resname, protein.atom_name) {
        ("ASN", "ND2") => geometric(&[ASN_GLYCAN], coords),
        ("SER", "OG") => geometric(&[SER_GLYCAN], coords),
        ("THR", "OG1") => geometric(&[THR_GLYCAN], coords),
        _ => None,
    }
}

fn glycosidic(
    acceptor: &PatchEnd,
    donor: &PatchEnd,
    coords: [&NamedCoords; 2],
) -> Option<PatchAssignment> {
    if is_sialic_acid(donor.resname) && donor.atom_name == "C2" {
        return match acceptor.atom_name {
            "O6" => Some(PatchAssignment::forward("SA26AT")),
            "O8" => Some(PatchAssignment::forward("SA28AA")),
            "O9" => Some(PatchAssignment::forward("SA29AT")),
            _ => None,
        };
    }
    if donor.atom_name != "C1" {
        return None;
    }
    match acceptor.atom_name {
        "O1" => geometric(&GLYCAN_11, coords),
        "O2" => geometric(&GLYCAN_12, coords),
        "O3" => geometric(&GLYCAN_13, coords),
        "O4" => geometric(&GLYCAN_14, coords),
        "O6" => geometric(&[GLYCAN_16], coords),
        _ => None,
    }
}

/// Selects the patch realising a bond between `ends[0]` (upstream) and `ends[1]`.
///
/// `coords` holds the named atom positions of the two residues in the same
/// order. Returns `None` when no table entry applies or the geometry needed to
/// decide is incomplete.
pub fn resolve_patch(ends: [PatchEnd; 2], coords: [&NamedCoords; 2]) -> Option<PatchAssignment> {
    let [up, down] = ends;
    match (up.segtype, down.segtype) {
        (SegType::Protein, SegType::Glycan) => glycopeptide(&up, &down, coords),
        (SegType::Glycan, SegType::Glycan) => glycosidic(&up, &down, coords),
        (SegType::Protein, SegType::Ion) if is_histidine(up.resname) && down.resname == "ZN" => {
            match up.atom_name {
                "NE2" => Some(PatchAssignment::reversed("ZNHE")),
                "ND1" => Some(PatchAssignment::reversed("ZNHD")),
                _ => None,
            }
        }
        (SegType::Protein, SegType::Protein)
            if up.resname == "CYS" && down.resname == "CYS" && up.atom_name == "SG" && down.atom_name == "SG" =>
        {
            Some(PatchAssignment::forward(DISULFIDE_PATCH))
        }
        _ => None,
    }
}
