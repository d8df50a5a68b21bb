use super::{CifDocument, CifError, CifRow};
use crate::core::io::traits::StructureFile;
use crate::core::io::{ParsedStructure, StructureFormat};
use crate::core::models::annotations::{Conflict, Missing};
use crate::core::models::atom::Atom;
use crate::core::models::topology::{Link, SsBond};
use crate::core::models::transform::{AssemblyRecord, OperatorRecord};
use std::collections::HashMap;
use std::io::{BufRead, Read};
use tracing::{debug, warn};

pub struct CifFile;

impl StructureFile for CifFile {
    type Error = CifError;

    fn read_from(reader: &mut impl BufRead) -> Result<ParsedStructure, Self::Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let doc = CifDocument::parse(&text)?;
        parse_document(&doc)
    }
}

/// Builds a [`ParsedStructure`] from the categories of a parsed document.
pub fn parse_document(doc: &CifDocument) -> Result<ParsedStructure, CifError> {
    let mut parsed = ParsedStructure::new(StructureFormat::Mmcif);

    let atom_rows = doc.category("atom_site");
    if atom_rows.is_empty() {
        return Err(CifError::MissingCategory("atom_site".to_string()));
    }
    let first_model = atom_rows[0].get("pdbx_pdb_model_num").to_string();
    for row in atom_rows {
        if row.get("pdbx_pdb_model_num") != first_model {
            continue;
        }
        let atom = Atom::from_cif_row(row)?;
        if let Some(auth) = &atom.auth {
            parsed.note_author_chain(&auth.asym_id);
        }
        parsed.atoms.push(atom);
    }

    for row in doc.category("pdbx_unobs_or_zero_occ_residues") {
        if !matches!(row.get("occupancy_flag"), "" | "1") {
            continue;
        }
        let model = row.get("pdb_model_num");
        if !model.is_empty() && !first_model.is_empty() && model != first_model {
            continue;
        }
        parsed
            .missings
            .extend(skip_malformed("pdbx_unobs_or_zero_occ_residues", Missing::from_cif_row(row)));
    }

    for row in doc.category("struct_conn") {
        match row.get("conn_type_id").to_ascii_lowercase().as_str() {
            "disulf" => parsed
                .ssbonds
                .extend(skip_malformed("struct_conn", SsBond::from_cif_row(row))),
            "covale" | "covale_base" | "covale_phosphate" | "covale_sugar" | "metalc" => parsed
                .links
                .extend(skip_malformed("struct_conn", Link::from_cif_row(row))),
            _ => {}
        }
    }

    for row in doc.category("struct_ref_seq_dif") {
        parsed
            .conflicts
            .extend(skip_malformed("struct_ref_seq_dif", Conflict::from_cif_row(row)));
    }

    parsed.assemblies = read_assemblies(doc);
    debug!(
        "Read {} atoms, {} links, {} ssbonds, {} missing residues, {} assemblies.",
        parsed.atoms.len(),
        parsed.links.len(),
        parsed.ssbonds.len(),
        parsed.missings.len(),
        parsed.assemblies.len()
    );
    Ok(parsed)
}

/// Keeps a parsed row, or logs and drops it. Only `atom_site` rows are fatal.
fn skip_malformed<T>(category: &str, result: Result<T, CifError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping malformed {} row: {}", category, e);
            None
        }
    }
}

fn read_operator(row: &CifRow) -> Result<[[f64; 4]; 3], CifError> {
    let mut matrix = [[0.0; 4]; 3];
    for (i, line) in matrix.iter_mut().enumerate() {
        for (j, cell) in line.iter_mut().take(3).enumerate() {
            *cell = row.float(&format!("matrix[{}][{}]", i + 1, j + 1))?;
        }
        line[3] = row.float(&format!("vector[{}]", i + 1))?;
    }
    Ok(matrix)
}

/// Expands `1`, `1,2`, `1-3` and `(1-60)`. Products such as `(1-60)(61-88)`
/// are not supported and yield `None`.
fn expand_operator_expression(expression: &str) -> Option<Vec<String>> {
    if expression.matches('(').count() > 1 {
        return None;
    }
    let inner: String = expression.chars().filter(|c| !matches!(c, '(' | ')')).collect();
    let mut ids = Vec::new();
    for part in inner.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let range = part
            .split_once('-')
            .and_then(|(a, b)| Some((a.trim().parse::<i64>().ok()?, b.trim().parse::<i64>().ok()?)));
        match range {
            Some((start, end)) if start <= end => ids.extend((start..=end).map(|n| n.to_string())),
            _ => ids.push(part.to_string()),
        }
    }
    Some(ids)
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

fn read_assemblies(doc: &CifDocument) -> Vec<AssemblyRecord> {
    let mut operators: HashMap<String, [[f64; 4]; 3]> = HashMap::new();
    for row in doc.category("pdbx_struct_oper_list") {
        let operator = row
            .required("id")
            .and_then(|id| Ok((id.to_string(), read_operator(row)?)));
        if let Some((id, matrix)) = skip_malformed("pdbx_struct_oper_list", operator) {
            operators.insert(id, matrix);
        }
    }

    let mut assemblies: Vec<AssemblyRecord> = Vec::new();
    for row in doc.category("pdbx_struct_assembly_gen") {
        let header = row
            .required("assembly_id")
            .and_then(|name| Ok((name, row.required("oper_expression")?)));
        let Some((name, expression)) = skip_malformed("pdbx_struct_assembly_gen", header) else {
            continue;
        };
        let Some(ids) = expand_operator_expression(expression) else {
            warn!(
                "Operator expression '{}' of assembly {} is a product; skipped.",
                expression, name
            );
            continue;
        };
        let chain_ids = split_list(row.get("asym_id_list"));

        let index = match assemblies.iter().position(|a| a.name == name) {
            Some(index) => index,
            None => {
                assemblies.push(AssemblyRecord {
                    name: name.to_string(),
                    operators: Vec::new(),
                });
                assemblies.len() - 1
            }
        };
        for id in ids {
            let Some(matrix) = operators.get(&id).copied() else {
                warn!("Assembly {} refers to undefined operator '{}'; dropped.", name, id);
                continue;
            };
            assemblies[index].operators.push(OperatorRecord {
                id,
                chain_ids: chain_ids.clone(),
                matrix,
            });
        }
    }
    assemblies.retain(|a| !a.operators.is_empty());
    assemblies
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "data_TEST
loop_
_atom_site.group_PDB
_atom_site.id
_atom_site.type_symbol
_atom_site.label_atom_id
_atom_site.label_alt_id
_atom_site.label_comp_id
_atom_site.label_asym_id
_atom_site.label_seq_id
_atom_site.pdbx_PDB_ins_code
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
_atom_site.occupancy
_atom_site.B_iso_or_equiv
_atom_site.auth_seq_id
_atom_site.auth_comp_id
_atom_site.auth_asym_id
_atom_site.auth_atom_id
_atom_site.pdbx_PDB_model_num
ATOM   1 N ND2 . ASN A 10 ? 0.0 0.0 0.0 1.00 10.0 10 ASN A ND2 1
HETATM 2 C C1  . NAG B .  ? 1.4 0.0 0.0 1.00 10.0 1  NAG A C1  1
ATOM   3 N ND2 . ASN A 10 ? 5.0 5.0 5.0 1.00 10.0 10 ASN A ND2 2
#
loop_
_pdbx_unobs_or_zero_occ_residues.id
_pdbx_unobs_or_zero_occ_residues.PDB_model_num
_pdbx_unobs_or_zero_occ_residues.polymer_flag
_pdbx_unobs_or_zero_occ_residues.occupancy_flag
_pdbx_unobs_or_zero_occ_residues.auth_asym_id
_pdbx_unobs_or_zero_occ_residues.auth_comp_id
_pdbx_unobs_or_zero_occ_residues.auth_seq_id
_pdbx_unobs_or_zero_occ_residues.PDB_ins_code
_pdbx_unobs_or_zero_occ_residues.label_asym_id
_pdbx_unobs_or_zero_occ_residues.label_comp_id
_pdbx_unobs_or_zero_occ_residues.label_seq_id
1 1 Y 1 A MET 1 ? A MET 1
#
loop_
_struct_conn.id
_struct_conn.conn_type_id
_struct_conn.ptnr1_label_asym_id
_struct_conn.ptnr1_label_comp_id
_struct_conn.ptnr1_label_atom_id
_struct_conn.ptnr1_auth_asym_id
_struct_conn.ptnr1_auth_seq_id
_struct_conn.ptnr2_label_asym_id
_struct_conn.ptnr2_label_comp_id
_struct_conn.ptnr2_label_atom_id
_struct_conn.ptnr2_auth_asym_id
_struct_conn.ptnr2_auth_seq_id
_struct_conn.pdbx_dist_value
covale1 covale A ASN ND2 A 10 B NAG C1 A 1 1.44
hydrog1 hydrog A ASN ND2 A 10 B NAG C1 A 1 2.90
#
_pdbx_struct_assembly_gen.assembly_id 1
_pdbx_struct_assembly_gen.oper_expression '1,2'
_pdbx_struct_assembly_gen.asym_id_list A,B
#
loop_
_pdbx_struct_oper_list.id
_pdbx_struct_oper_list.matrix[1][1]
_pdbx_struct_oper_list.matrix[1][2]
_pdbx_struct_oper_list.matrix[1][3]
_pdbx_struct_oper_list.vector[1]
_pdbx_struct_oper_list.matrix[2][1]
_pdbx_struct_oper_list.matrix[2][2]
_pdbx_struct_oper_list.matrix[2][3]
_pdbx_struct_oper_list.vector[2]
_pdbx_struct_oper_list.matrix[3][1]
_pdbx_struct_oper_list.matrix[3][2]
_pdbx_struct_oper_list.matrix[3][3]
_pdbx_struct_oper_list.vector[3]
1 1 0 0 0 0 1 0 0 0 0 1 0
2 -1 0 0 10 0 -1 0 0 0 0 1 5
";

    fn read() -> ParsedStructure {
        CifFile::read_from(&mut Cursor::new(SAMPLE)).unwrap()
    }

    #[test]
    fn reads_first_model_atoms_with_label_chains() {
        let parsed = read();
        assert_eq!(parsed.format, StructureFormat::Mmcif);
        assert_eq!(parsed.atoms.len(), 2);
        assert_eq!(parsed.atoms[1].chain_id, "B");
        assert_eq!(parsed.atoms[1].resseqnum, 1);
        assert!(parsed.atoms[1].hetero);
        assert_eq!(parsed.author_chain_ids, vec!["A".to_string()]);
    }

    #[test]
    fn reads_missing_residues_and_covalent_links_only() {
        let parsed = read();
        assert_eq!(parsed.missings.len(), 1);
        assert_eq!(parsed.missings[0].chain_id, "A");
        assert_eq!(parsed.missings[0].resseqnum, 1);
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].partner1.atom_name, "ND2");
        assert_eq!(parsed.links[0].partner2.key.chain_id, "B");
        assert!(parsed.ssbonds.is_empty());
    }

    #[test]
    fn expands_assembly_operators() {
        let parsed = read();
        assert_eq!(parsed.assemblies.len(), 1);
        let assembly = &parsed.assemblies[0];
        assert_eq!(assembly.name, "1");
        assert_eq!(assembly.operators.len(), 2);
        assert_eq!(assembly.operators[0].chain_ids, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(assembly.operators[1].matrix[0], [-1.0, 0.0, 0.0, 10.0]);
        assert_eq!(assembly.operators[1].matrix[2], [0.0, 0.0, 1.0, 5.0]);
    }

    #[test]
    fn operator_expressions() {
        assert_eq!(expand_operator_expression("1").unwrap(), vec!["1"]);
        assert_eq!(expand_operator_expression("(1-3)").unwrap(), vec!["1", "2", "3"]);
        assert_eq!(expand_operator_expression("1,5,P").unwrap(), vec!["1", "5", "P"]);
        assert_eq!(expand_operator_expression("(1-60)(61-88)"), None);
    }

    #[test]
    fn malformed_rows_are_skipped_and_reading_continues() {
        let text = SAMPLE
            .replace(
                "1 1 Y 1 A MET 1 ? A MET 1\n",
                "1 1 Y 1 A MET 1 ? A MET 1\n2 1 Y 1 A GLY x ? A GLY 2\n",
            )
            .replace(
                "covale1 covale A ASN ND2 A 10 B NAG C1 A 1 1.44\n",
                "covale1 covale A ASN ND2 A 10 B NAG C1 A 1 1.44\ncovale2 covale A ASN ND2 A 1x B NAG C1 A 1 1.44\n",
            )
            .replace("'1,2'", "'1,X0'")
            .replace(
                "2 -1 0 0 10 0 -1 0 0 0 0 1 5\n",
                "2 -1 0 0 10 0 -1 0 0 0 0 1 5\n3 1 0 0 0 0 1 0 0 0 0 z 0\n",
            );
        let parsed = CifFile::read_from(&mut Cursor::new(text)).unwrap();

        assert_eq!(parsed.atoms.len(), 2);
        assert_eq!(parsed.missings.len(), 1);
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.assemblies.len(), 1);
        let ids: Vec<&str> = parsed.assemblies[0].operators.iter().map(|op| op.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn assembly_without_known_operators_is_dropped() {
        let text = SAMPLE.replace("'1,2'", "'(7-9)'");
        let parsed = CifFile::read_from(&mut Cursor::new(text)).unwrap();
        assert!(parsed.assemblies.is_empty());
    }

    #[test]
    fn malformed_atom_row_is_fatal() {
        let text = SAMPLE.replace("0.0 0.0 0.0 1.00 10.0 10 ASN", "0.0 y.0 0.0 1.00 10.0 10 ASN");
        assert!(matches!(
            CifFile::read_from(&mut Cursor::new(text)),
            Err(CifError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn missing_atom_site_is_an_error() {
        let err = CifFile::read_from(&mut Cursor::new("data_X\n_struct.title x\n")).unwrap_err();
        assert!(matches!(err, CifError::MissingCategory(_)));
    }
}
