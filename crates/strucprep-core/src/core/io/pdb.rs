use super::traits::StructureFile;
use super::{ParsedStructure, StructureFormat};
use crate::core::models::annotations::{Conflict, Missing, Ter};
use crate::core::models::asymmetric_unit::AsymmetricUnit;
use crate::core::models::atom::Atom;
use crate::core::models::topology::{Link, SsBond};
use crate::core::models::transform::{AssemblyRecord, BioAssemb, OperatorRecord};
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("BIOMT row is malformed: '{0}'")]
    MalformedBiomt(String),
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("").trim()
}

fn columns(start: usize, end: usize) -> String {
    format!("{}-{}", start + 1, end)
}

/// One line of a PDB file with fixed-column accessors. Column ranges are
/// zero-based and half-open; errors report them one-based.
#[derive(Debug, Clone, Copy)]
pub struct PdbRecord<'a> {
    line: &'a str,
    number: usize,
}

impl<'a> PdbRecord<'a> {
    pub fn new(line: &'a str, number: usize) -> Self {
        Self { line, number }
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    pub fn line_number(&self) -> usize {
        self.number
    }

    pub fn record_type(&self) -> &'a str {
        self.text(0, 6)
    }

    /// Trimmed text of columns `start..end`; columns past the end of the line read as empty.
    pub fn text(&self, start: usize, end: usize) -> &'a str {
        slice_and_trim(self.line, start, end)
    }

    /// Trimmed text from `start` to the end of the line.
    pub fn rest(&self, start: usize) -> &'a str {
        self.line.get(start..).unwrap_or("").trim()
    }

    fn error(&self, kind: PdbParseErrorKind) -> PdbError {
        PdbError::Parse {
            line: self.number,
            kind,
        }
    }

    pub fn required_text(&self, start: usize, end: usize) -> Result<&'a str, PdbError> {
        match self.text(start, end) {
            "" => Err(self.error(PdbParseErrorKind::MissingRequiredField {
                columns: columns(start, end),
            })),
            text => Ok(text),
        }
    }

    pub fn opt_int(&self, start: usize, end: usize) -> Result<Option<isize>, PdbError> {
        let text = self.text(start, end);
        if text.is_empty() {
            return Ok(None);
        }
        text.parse().map(Some).map_err(|_| {
            self.error(PdbParseErrorKind::InvalidInt {
                columns: columns(start, end),
                value: text.into(),
            })
        })
    }

    pub fn int(&self, start: usize, end: usize) -> Result<isize, PdbError> {
        let text = self.required_text(start, end)?;
        text.parse().map_err(|_| {
            self.error(PdbParseErrorKind::InvalidInt {
                columns: columns(start, end),
                value: text.into(),
            })
        })
    }

    pub fn opt_float(&self, start: usize, end: usize) -> Result<Option<f64>, PdbError> {
        let text = self.text(start, end);
        if text.is_empty() {
            return Ok(None);
        }
        text.parse().map(Some).map_err(|_| {
            self.error(PdbParseErrorKind::InvalidFloat {
                columns: columns(start, end),
                value: text.into(),
            })
        })
    }

    pub fn float(&self, start: usize, end: usize) -> Result<f64, PdbError> {
        let text = self.required_text(start, end)?;
        text.parse().map_err(|_| {
            self.error(PdbParseErrorKind::InvalidFloat {
                columns: columns(start, end),
                value: text.into(),
            })
        })
    }
}

/// Accumulates REMARK 350 records. The chain header in force when an
/// operator's first BIOMT row is read is the one the operator applies to.
#[derive(Debug, Default)]
struct Remark350 {
    assemblies: Vec<AssemblyRecord>,
    header: Vec<String>,
    discarded: Vec<String>,
}

fn split_chain_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
}

impl Remark350 {
    fn read(&mut self, record: &PdbRecord) -> Result<(), PdbError> {
        let body = record.rest(10);
        if let Some(name) = body.strip_prefix("BIOMOLECULE:") {
            self.assemblies.push(AssemblyRecord {
                name: name.trim().to_string(),
                operators: Vec::new(),
            });
            self.header.clear();
            self.discarded.clear();
        } else if let Some((_, chains)) = body
            .split_once("APPLY THE FOLLOWING TO CHAINS:")
            .or_else(|| body.split_once("APPLY THE FOLLOWING TO CHAIN:"))
        {
            self.header = split_chain_list(chains).collect();
        } else if let Some((_, chains)) = body.split_once("AND CHAINS:") {
            self.header.extend(split_chain_list(chains));
        } else if body.starts_with("BIOMT") {
            self.read_biomt(record, body)?;
        }
        Ok(())
    }

    /// Reads one BIOMT row. A malformed row discards its whole operator, and
    /// later rows of that operator are ignored.
    fn read_biomt(&mut self, record: &PdbRecord, body: &str) -> Result<(), PdbError> {
        let fields: Vec<&str> = body.split_whitespace().collect();
        let id = fields.get(1).copied().unwrap_or_default();
        if self.discarded.iter().any(|d| d == id) {
            return Ok(());
        }
        let result = self.apply_biomt(record, body, &fields);
        if result.is_err() && !id.is_empty() {
            if let Some(assembly) = self.assemblies.last_mut() {
                assembly.operators.retain(|op| op.id != id);
            }
            self.discarded.push(id.to_string());
        }
        result
    }

    fn apply_biomt(&mut self, record: &PdbRecord, body: &str, fields: &[&str]) -> Result<(), PdbError> {
        let malformed = || PdbError::Parse {
            line: record.line_number(),
            kind: PdbParseErrorKind::MalformedBiomt(body.to_string()),
        };
        if fields.len() < 6 {
            return Err(malformed());
        }
        let row: usize = match fields[0].strip_prefix("BIOMT").and_then(|r| r.parse::<usize>().ok()) {
            Some(r @ 1..=3) => r - 1,
            _ => return Err(malformed()),
        };
        let mut values = [0.0; 4];
        for (slot, text) in values.iter_mut().zip(&fields[2..6]) {
            *slot = text.parse().map_err(|_| malformed())?;
        }

        let Some(assembly) = self.assemblies.last_mut() else {
            warn!(
                "BIOMT row on line {} precedes any BIOMOLECULE record; ignored.",
                record.line_number()
            );
            return Ok(());
        };
        let id = fields[1];
        if row == 0 {
            assembly.operators.push(OperatorRecord {
                id: id.to_string(),
                chain_ids: self.header.clone(),
                matrix: [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
            });
        }
        match assembly.operators.iter_mut().rev().find(|op| op.id == id) {
            Some(op) => op.matrix[row] = values,
            None => return Err(malformed()),
        }
        Ok(())
    }
}

/// Keeps a parsed record, or logs and drops it. Only atom records are fatal.
fn skip_malformed<T>(kind: &str, record: &PdbRecord, result: Result<T, PdbError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                "Skipping malformed {} record on line {}: {}",
                kind,
                record.line_number(),
                e
            );
            None
        }
    }
}

pub struct PdbFile;

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<ParsedStructure, Self::Error> {
        let mut parsed = ParsedStructure::new(StructureFormat::Pdb);
        let mut models_seen = 0usize;
        let mut in_missing_table = false;
        let mut remark350 = Remark350::default();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let record = PdbRecord::new(&line, line_num + 1);

            match record.record_type() {
                "MODEL" => models_seen += 1,
                "ATOM" | "HETATM" => {
                    if models_seen > 1 {
                        continue;
                    }
                    let atom = Atom::from_pdb_record(&record)?;
                    parsed.note_author_chain(&atom.chain_id);
                    parsed.atoms.push(atom);
                }
                "TER" if models_seen <= 1 => {
                    parsed
                        .ters
                        .extend(skip_malformed("TER", &record, Ter::from_pdb_record(&record)));
                }
                "SSBOND" => parsed
                    .ssbonds
                    .extend(skip_malformed("SSBOND", &record, SsBond::from_pdb_record(&record))),
                "LINK" => parsed
                    .links
                    .extend(skip_malformed("LINK", &record, Link::from_pdb_record(&record))),
                "SEQADV" => parsed
                    .conflicts
                    .extend(skip_malformed("SEQADV", &record, Conflict::from_pdb_record(&record))),
                "REMARK" => match record.text(6, 10) {
                    "465" => {
                        if record.line().contains("M RES C SSSEQI") {
                            in_missing_table = true;
                        } else if in_missing_table && !record.text(15, 18).is_empty() {
                            parsed.missings.extend(skip_malformed(
                                "REMARK 465",
                                &record,
                                Missing::from_pdb_record(&record),
                            ));
                        }
                    }
                    "350" => {
                        skip_malformed("REMARK 350", &record, remark350.read(&record));
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        if parsed.atoms.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM".to_string()));
        }
        parsed.assemblies = remark350
            .assemblies
            .into_iter()
            .filter(|a| !a.operators.is_empty())
            .collect();
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
}

fn format_atom_name(name: &str, element: &str) -> String {
    if name.len() < 4 && element.len() < 2 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    }
}

fn format_resname(resname: &str) -> String {
    if resname.len() <= 3 {
        format!("{:>3} ", resname)
    } else {
        format!("{:<4}", resname)
    }
}

fn format_charge(charge: i8) -> String {
    match charge {
        0 => String::new(),
        c if c > 0 => format!("{}+", c),
        c => format!("{}-", -(c as i16)),
    }
}

fn format_atom_line(serial: usize, atom: &Atom, chain_id: &str, position: &Point3<f64>) -> String {
    format!(
        "{:<6}{:>5} {}{:1}{}{:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}      {:<4}{:>2}{:<2}",
        if atom.hetero { "HETATM" } else { "ATOM" },
        serial % 100_000,
        format_atom_name(&atom.name, &atom.element),
        atom.altloc,
        format_resname(&atom.resname),
        chain_id,
        atom.resseqnum,
        atom.insertion,
        position.x,
        position.y,
        position.z,
        atom.occupancy,
        atom.beta,
        atom.segname,
        atom.element,
        format_charge(atom.formal_charge),
    )
}

impl PdbFile {
    /// Writes one renamed, transformed copy of the asymmetric unit per
    /// transform of an activated assembly.
    ///
    /// # Errors
    ///
    /// Returns [`PdbError::Inconsistency`] if the assembly has not been
    /// activated or a mapped chain identifier does not fit the one-column
    /// PDB chain field.
    pub fn write_assembly(
        au: &AsymmetricUnit,
        assembly: &BioAssemb,
        writer: &mut impl Write,
    ) -> Result<(), PdbError> {
        if !assembly.is_activated() {
            return Err(PdbError::Inconsistency(format!(
                "Assembly '{}' has not been activated",
                assembly.name
            )));
        }
        let mut serial = 0usize;
        for transform in &assembly.transforms {
            for chain_id in au.chain_ids() {
                let Some(new_id) = transform.chain_id_map().get(chain_id) else {
                    continue;
                };
                if new_id.chars().count() > 1 {
                    return Err(PdbError::Inconsistency(format!(
                        "Chain identifier '{}' does not fit a PDB file",
                        new_id
                    )));
                }
                let mut last = None;
                for residue in au.residues_in_chain(chain_id) {
                    for atom in residue.atoms().iter().filter_map(|&id| au.atom(id)) {
                        serial += 1;
                        let position = transform.apply(&atom.position);
                        writeln!(writer, "{}", format_atom_line(serial, atom, new_id, &position))?;
                        last = Some(atom);
                    }
                }
                if let Some(atom) = last {
                    serial += 1;
                    writeln!(
                        writer,
                        "TER   {:>5}      {}{:1}{:>4}{:1}",
                        serial % 100_000,
                        format_resname(&atom.resname),
                        new_id,
                        atom.resseqnum,
                        atom.insertion
                    )?;
                }
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }

    pub fn write_assembly_to_path<P: AsRef<Path>>(
        au: &AsymmetricUnit,
        assembly: &BioAssemb,
        path: P,
    ) -> Result<(), PdbError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_assembly(au, assembly, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
