pub mod assemble;
pub mod inspect;

use crate::cli::BuildArgs;
use crate::config::PartialBuildConfig;
use crate::error::Result;
use strucprep::core::models::molecule::Molecule;
use strucprep::workflows;
use tracing::info;

/// Merges file and command-line configuration and runs the build workflow.
pub fn build_molecule(args: &BuildArgs) -> Result<Molecule> {
    let partial = PartialBuildConfig::load(args)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial.merge_with_cli(args)?;
    info!("Building molecule from {:?}", &config.structure_path);
    Ok(workflows::build::run(&config)?)
}
