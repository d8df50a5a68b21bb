use super::build_molecule;
use crate::cli::AssembleArgs;
use crate::error::{CliError, Result};
use strucprep::core::io::pdb::PdbFile;
use tracing::info;

pub fn run(args: AssembleArgs) -> Result<()> {
    let molecule = build_molecule(&args.build)?;
    let assembly = molecule
        .active_assembly()
        .ok_or_else(|| CliError::Config("No biological assembly was activated.".to_string()))?;

    info!("Writing assembly '{}' to {:?}", assembly.name, &args.output);
    PdbFile::write_assembly_to_path(molecule.asymmetric_unit(), assembly, &args.output).map_err(
        |e| CliError::Output {
            path: args.output.clone(),
            source: e,
        },
    )?;

    println!(
        "Assembly {} ('{}', {} copies) written to: {}",
        assembly.index,
        assembly.name,
        assembly.transforms.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    const MONOMER: &str = "\
REMARK 350 BIOMOLECULE: 1
REMARK 350 APPLY THE FOLLOWING TO CHAINS: A
REMARK 350   BIOMT1   1  1.000000  0.000000  0.000000        0.00000
REMARK 350   BIOMT2   1  0.000000  1.000000  0.000000        0.00000
REMARK 350   BIOMT3   1  0.000000  0.000000  1.000000        0.00000
REMARK 350   BIOMT1   2 -1.000000  0.000000  0.000000        0.00000
REMARK 350   BIOMT2   2  0.000000 -1.000000  0.000000        0.00000
REMARK 350   BIOMT3   2  0.000000  0.000000  1.000000        0.00000
ATOM      1  N   ALA A   1       1.000   2.000   3.000  1.00  0.00           N
ATOM      2  CA  ALA A   1       2.000   2.000   3.000  1.00  0.00           C
END
";

    fn assemble_args(input: &str, output: &str, extra: &[&str]) -> AssembleArgs {
        let mut args = vec!["strucprep", "assemble", input, "-o", output];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Assemble(assemble) => assemble,
            Commands::Inspect(_) => panic!("Expected 'assemble' subcommand"),
        }
    }

    #[test]
    fn writes_one_copy_per_operator() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("monomer.pdb");
        let output = dir.path().join("assembly.pdb");
        fs::write(&input, MONOMER).unwrap();

        let args = assemble_args(
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            &["-b", "1"],
        );
        run(args).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        let atom_lines = text.lines().filter(|l| l.starts_with("ATOM")).count();
        assert_eq!(atom_lines, 4);
        assert_eq!(text.lines().filter(|l| l.starts_with("TER")).count(), 2);
        assert!(text.lines().any(|l| l.starts_with("ATOM") && &l[21..22] == "B"));
    }

    #[test]
    fn missing_input_is_a_build_error() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.pdb");
        let args = assemble_args("no-such-file.pdb", output.to_str().unwrap(), &[]);
        assert!(matches!(run(args), Err(CliError::Build(_))));
    }
}
