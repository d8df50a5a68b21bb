use super::build_molecule;
use crate::cli::InspectArgs;
use crate::error::Result;
use std::fmt::{self, Write};
use strucprep::core::models::molecule::Molecule;

pub fn run(args: InspectArgs) -> Result<()> {
    let molecule = build_molecule(&args.build)?;
    print!("{}", render_report(&molecule, args.patches)?);
    Ok(())
}

/// Plain-text summary of a built molecule.
pub fn render_report(molecule: &Molecule, with_patches: bool) -> std::result::Result<String, fmt::Error> {
    let mut out = String::new();
    write_report(&mut out, molecule, with_patches)?;
    Ok(out)
}

fn write_report<W: Write>(out: &mut W, molecule: &Molecule, with_patches: bool) -> fmt::Result {
    let au = molecule.asymmetric_unit();

    writeln!(out, "Format: {:?}", molecule.format())?;
    writeln!(out, "Atoms: {}", au.atom_count())?;
    writeln!(out, "Chains: {}", au.chain_ids().join(", "))?;
    for (parent, children) in au.daughters() {
        writeln!(out, "  {} -> {}", parent, children.join(", "))?;
    }

    writeln!(out, "Segments:")?;
    for segment in au.segments() {
        let states: Vec<String> = segment.subsegments().iter().map(|s| s.pstr()).collect();
        writeln!(
            out,
            "  {} {} ({} residues) {}",
            segment.segname,
            segment.segtype,
            segment.residues().len(),
            states.join(" ")
        )?;
    }

    writeln!(out, "Links:")?;
    for (_, link) in au.links() {
        writeln!(
            out,
            "  {} {} -> {} {} {}",
            link.partner1.key,
            link.partner1.atom_name,
            link.partner2.key,
            link.partner2.atom_name,
            link.patchname
        )?;
    }
    for bond in au.ssbonds() {
        writeln!(out, "  {} SG -> {} SG {}", bond.partner1.key, bond.partner2.key, bond.patchname())?;
    }

    if !au.orphan_links().is_empty() || !au.orphan_ssbonds().is_empty() {
        writeln!(out, "Unresolved:")?;
        for link in au.orphan_links() {
            writeln!(
                out,
                "  link {} {} -> {} {}",
                link.partner1.key, link.partner1.atom_name, link.partner2.key, link.partner2.atom_name
            )?;
        }
        for bond in au.orphan_ssbonds() {
            writeln!(out, "  ssbond {} -> {}", bond.partner1.key, bond.partner2.key)?;
        }
    }

    if !au.conflicts.is_empty() {
        let engineered = au.conflicts.iter().filter(|c| c.kind.is_engineered()).count();
        writeln!(
            out,
            "Sequence conflicts: {} ({} engineered)",
            au.conflicts.len(),
            engineered
        )?;
    }

    let active = molecule.active_assembly().map(|a| a.index);
    writeln!(out, "Assemblies:")?;
    for assembly in molecule.bioassemblies() {
        let marker = if Some(assembly.index) == active { " *" } else { "" };
        writeln!(
            out,
            "  {} '{}' {} transform(s){}",
            assembly.index,
            assembly.name,
            assembly.transforms.len(),
            marker
        )?;
        if Some(assembly.index) == active {
            for transform in &assembly.transforms {
                let map: Vec<String> = transform
                    .chain_id_map()
                    .iter()
                    .map(|(old, new)| format!("{old}->{new}"))
                    .collect();
                writeln!(out, "    #{} {}", transform.index, map.join(" "))?;
            }
        }
    }

    if with_patches {
        writeln!(out, "Patches:")?;
        for line in molecule.patch_directives() {
            writeln!(out, "  {}", line)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use strucprep::workflows::config::BuildConfigBuilder;
    use strucprep::workflows::build;
    use tempfile::tempdir;

    const GLYCOPROTEIN: &str = "\
LINK         ND2 ASN A   2                 C1  NAG B   1     1555   1555  1.44
LINK         ND2 ASN A   9                 C1  NAG B   1     1555   1555  1.44
REMARK 465 MISSING RESIDUES
REMARK 465   M RES C SSSEQI
REMARK 465     SER A     3
ATOM      1  CA  ALA A   1       1.000   2.000   3.000  1.00  0.00           C
ATOM      2  ND2 ASN A   2       3.000   2.000   3.000  1.00  0.00           N
ATOM      3  CA  GLY A   4       6.000   2.000   3.000  1.00  0.00           C
TER       4      GLY A   4
HETATM    5  C1  NAG B   1       4.000   2.000   3.000  1.00  0.00           C
END
";

    fn molecule() -> Molecule {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glyco.pdb");
        fs::write(&path, GLYCOPROTEIN).unwrap();
        let config = BuildConfigBuilder::new().structure_path(path).build().unwrap();
        build::run(&config).unwrap()
    }

    #[test]
    fn report_lists_segments_links_and_orphans() {
        let report = render_report(&molecule(), false).unwrap();
        assert!(report.contains("Chains: A, B"));
        assert!(report.contains("  A protein (4 residues) RESOLVED(0)-(1) MISSING(2)-(2) RESOLVED(3)-(3)"));
        assert!(report.contains("  B glycan (1 residues) RESOLVED(0)-(0)"));
        assert!(report.contains("  A:2 ND2 -> B:1 C1 UNFOUND"));
        assert!(report.contains("Unresolved:\n  link A:9 ND2 -> B:1 C1"));
        assert!(report.contains("  0 'A.U.' 1 transform(s) *"));
        assert!(!report.contains("Patches:"));
    }

    #[test]
    fn patches_section_is_optional() {
        let report = render_report(&molecule(), true).unwrap();
        assert!(report.ends_with("Patches:\n"));
    }

    /// Accepts a fixed number of bytes, then fails.
    struct Capped(usize);

    impl Write for Capped {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0 = self.0.checked_sub(s.len()).ok_or(fmt::Error)?;
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_propagated() {
        let molecule = molecule();
        assert!(write_report(&mut Capped(20), &molecule, false).is_err());
        assert!(write_report(&mut Capped(usize::MAX), &molecule, true).is_ok());
    }
}
