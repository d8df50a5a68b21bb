use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "strucprep - read a PDB or mmCIF structure, resolve its chains, links and patches, and write out biological assemblies.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize chains, segments, links, orphans and assemblies of a structure.
    Inspect(InspectArgs),
    /// Write one transformed, renamed copy of the structure per operator of an assembly.
    Assemble(AssembleArgs),
}

/// Options shared by every command that builds a molecule.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Path to the input structure file (.pdb, .ent, .cif, .mmcif).
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to a build configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Force the input format instead of guessing it from the extension.
    #[arg(long, value_name = "pdb|mmcif")]
    pub format: Option<String>,

    /// TOML file with additional residue name to segtype assignments.
    #[arg(long, value_name = "PATH")]
    pub segtypes: Option<PathBuf>,

    /// Index of the biological assembly to activate (0 is the asymmetric unit).
    #[arg(short = 'b', long, value_name = "INT")]
    pub assembly: Option<usize>,

    /// Point mutation, e.g. A:N25Q. Can be used multiple times.
    #[arg(short = 'm', long = "mutate", value_name = "SHORTCODE")]
    pub mutations: Vec<String>,

    /// Residue range to delete, e.g. A:25-30. Can be used multiple times.
    #[arg(short = 'd', long = "delete", value_name = "SHORTCODE")]
    pub deletions: Vec<String>,

    /// Range substitution, e.g. A:25,30,GGS. Can be used multiple times.
    #[arg(long = "substitute", value_name = "SHORTCODE")]
    pub substitutions: Vec<String>,

    /// Chain cleavage after a residue, e.g. A:100. Can be used multiple times.
    #[arg(long = "cleave", value_name = "SHORTCODE")]
    pub cleavages: Vec<String>,

    /// Rename a deposited chain, e.g. A=X. Can be used multiple times.
    #[arg(long = "remap", value_name = "OLD=NEW")]
    pub remap: Vec<String>,

    /// Reserve identifiers for the symmetry copies of a chain, e.g. A=H,J.
    #[arg(long = "reserve", value_name = "CHAIN=IDS")]
    pub reserves: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Also print the patch directives of the activated assembly.
    #[arg(long)]
    pub patches: bool,
}

/// Arguments for the `assemble` subcommand.
#[derive(Args, Debug)]
pub struct AssembleArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Path for the output PDB file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}
