use crate::core::models::segment::SegType;
use phf::{Map, Set, phf_map, phf_set};

/// Built-in residue classification used when no override is registered.
pub static DEFAULT_SEGTYPES: Map<&'static str, SegType> = phf_map! {
    // --- Amino acids ---
    "ALA" => SegType::Protein,
    "ARG" => SegType::Protein,
    "ASN" => SegType::Protein,
    "ASP" => SegType::Protein,
    "CYS" => SegType::Protein,
    "GLN" => SegType::Protein,
    "GLU" => SegType::Protein,
    "GLY" => SegType::Protein,
    "HIS" => SegType::Protein,
    "HSD" => SegType::Protein,
    "HSE" => SegType::Protein,
    "HSP" => SegType::Protein,
    "ILE" => SegType::Protein,
    "LEU" => SegType::Protein,
    "LYS" => SegType::Protein,
    "MET" => SegType::Protein,
    "MSE" => SegType::Protein,
    "PHE" => SegType::Protein,
    "PRO" => SegType::Protein,
    "SER" => SegType::Protein,
    "THR" => SegType::Protein,
    "TRP" => SegType::Protein,
    "TYR" => SegType::Protein,
    "VAL" => SegType::Protein,

    // --- Monosaccharides ---
    "NAG" => SegType::Glycan,
    "NDG" => SegType::Glycan,
    "BMA" => SegType::Glycan,
    "MAN" => SegType::Glycan,
    "GAL" => SegType::Glycan,
    "GLA" => SegType::Glycan,
    "GLC" => SegType::Glycan,
    "BGC" => SegType::Glycan,
    "FUC" => SegType::Glycan,
    "FUL" => SegType::Glycan,
    "SIA" => SegType::Glycan,
    "SLB" => SegType::Glycan,
    "NAN" => SegType::Glycan,
    "NGA" => SegType::Glycan,
    "A2G" => SegType::Glycan,
    "XYS" => SegType::Glycan,

    // --- Ions ---
    "ZN" => SegType::Ion,
    "NA" => SegType::Ion,
    "CL" => SegType::Ion,
    "K" => SegType::Ion,
    "MG" => SegType::Ion,
    "CA" => SegType::Ion,
    "MN" => SegType::Ion,
    "FE" => SegType::Ion,
    "CU" => SegType::Ion,
    "CD" => SegType::Ion,
    "NI" => SegType::Ion,
    "CO" => SegType::Ion,
    "SOD" => SegType::Ion,
    "CLA" => SegType::Ion,
    "POT" => SegType::Ion,
    "CAL" => SegType::Ion,

    // --- Water ---
    "HOH" => SegType::Water,
    "WAT" => SegType::Water,
    "TIP3" => SegType::Water,
    "DOD" => SegType::Water,

    // --- Nucleotides ---
    "A" => SegType::NucleicAcid,
    "C" => SegType::NucleicAcid,
    "G" => SegType::NucleicAcid,
    "U" => SegType::NucleicAcid,
    "T" => SegType::NucleicAcid,
    "DA" => SegType::NucleicAcid,
    "DC" => SegType::NucleicAcid,
    "DG" => SegType::NucleicAcid,
    "DT" => SegType::NucleicAcid,

    // --- Common crystallization additives ---
    "SO4" => SegType::Ligand,
    "PO4" => SegType::Ligand,
    "GOL" => SegType::Ligand,
    "EDO" => SegType::Ligand,
    "PEG" => SegType::Ligand,
    "ACT" => SegType::Ligand,
};

/// Sialic-acid residue names; their donor anomeric carbon is C2 rather than C1.
pub static SIALIC_ACIDS: Set<&'static str> = phf_set! { "SIA", "SLB", "NAN" };

static THREE_TO_ONE: Map<&'static str, char> = phf_map! {
    "ALA" => 'A', "ARG" => 'R', "ASN" => 'N', "ASP" => 'D', "CYS" => 'C',
    "GLN" => 'Q', "GLU" => 'E', "GLY" => 'G', "HIS" => 'H', "ILE" => 'I',
    "LEU" => 'L', "LYS" => 'K', "MET" => 'M', "PHE" => 'F', "PRO" => 'P',
    "SER" => 'S', "THR" => 'T', "TRP" => 'W', "TYR" => 'Y', "VAL" => 'V',
    "HSD" => 'H', "HSE" => 'H', "HSP" => 'H', "MSE" => 'M',
};

static ONE_TO_THREE: Map<char, &'static str> = phf_map! {
    'A' => "ALA", 'R' => "ARG", 'N' => "ASN", 'D' => "ASP", 'C' => "CYS",
    'Q' => "GLN", 'E' => "GLU", 'G' => "GLY", 'H' => "HIS", 'I' => "ILE",
    'L' => "LEU", 'K' => "LYS", 'M' => "MET", 'F' => "PHE", 'P' => "PRO",
    'S' => "SER", 'T' => "THR", 'W' => "TRP", 'Y' => "TYR", 'V' => "VAL",
};

pub fn three_letter_code(one: char) -> Option<&'static str> {
    ONE_TO_THREE.get(&one.to_ascii_uppercase()).copied()
}

pub fn one_letter_code(three: &str) -> Option<char> {
    THREE_TO_ONE.get(three.to_ascii_uppercase().as_str()).copied()
}

pub fn is_sialic_acid(resname: &str) -> bool {
    SIALIC_ACIDS.contains(resname)
}
