use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strucprep::core::io::StructureFormat;
use strucprep::workflows::config::{BuildConfig, BuildConfigBuilder, ModificationConfig};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialChainConfig {
    #[serde(default)]
    remap: BTreeMap<String, String>,
    #[serde(default)]
    transform_reserves: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialModificationConfig {
    #[serde(default)]
    mutations: Vec<String>,
    #[serde(default)]
    deletions: Vec<String>,
    #[serde(default)]
    substitutions: Vec<String>,
    #[serde(default)]
    cleavages: Vec<String>,
}

/// The build configuration file. Every field is optional; command-line
/// arguments take precedence over scalar values and are appended to lists.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialBuildConfig {
    format: Option<String>,
    segtype_registry: Option<PathBuf>,
    assembly: Option<usize>,
    chains: Option<PartialChainConfig>,
    modifications: Option<PartialModificationConfig>,
}

impl PartialBuildConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reads the file named by `--config`, or starts empty.
    pub fn load(args: &BuildArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_with_cli(mut self, args: &BuildArgs) -> Result<BuildConfig> {
        let chains = self.chains.take().unwrap_or_default();
        let file_mods = self.modifications.take().unwrap_or_default();

        let mut builder = BuildConfigBuilder::new().structure_path(args.input.clone());

        if let Some(format) = args.format.as_ref().or(self.format.as_ref()) {
            let format: StructureFormat = format.parse().map_err(CliError::Argument)?;
            builder = builder.format(format);
        }
        if let Some(path) = args.segtypes.clone().or(self.segtype_registry) {
            builder = builder.segtype_registry_path(path);
        }
        if let Some(index) = args.assembly.or(self.assembly) {
            builder = builder.assembly_index(index);
        }

        let mut remap = chains.remap;
        for entry in &args.remap {
            let (old, new) = parse_pair(entry, "--remap")?;
            remap.insert(old.to_string(), new.to_string());
        }
        let mut reserves = chains.transform_reserves;
        for entry in &args.reserves {
            let (chain, ids) = parse_pair(entry, "--reserve")?;
            let ids = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect();
            reserves.insert(chain.to_string(), ids);
        }

        let modifications = ModificationConfig {
            deletions: concat(file_mods.deletions, &args.deletions),
            substitutions: concat(file_mods.substitutions, &args.substitutions),
            mutations: concat(file_mods.mutations, &args.mutations),
            cleavages: concat(file_mods.cleavages, &args.cleavages),
        };

        builder
            .chain_remap(remap)
            .transform_reserves(reserves)
            .modifications(modifications)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}

fn concat(mut from_file: Vec<String>, from_cli: &[String]) -> Vec<String> {
    from_file.extend(from_cli.iter().cloned());
    from_file
}

fn parse_pair<'a>(entry: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim(), value.trim()))
        }
        _ => Err(CliError::Argument(format!(
            "Invalid {} value: '{}'. Expected KEY=VALUE.",
            flag, entry
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn build_args(extra: &[&str]) -> BuildArgs {
        let mut args = vec!["strucprep", "inspect", "4zmj.pdb"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Inspect(inspect) => inspect.build,
            Commands::Assemble(_) => panic!("Expected 'inspect' subcommand"),
        }
    }

    #[test]
    fn file_values_are_used_when_cli_is_silent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build.toml");
        fs::write(
            &path,
            r#"
            format = "mmcif"
            assembly = 1

            [chains]
            remap = { A = "X" }
            transform-reserves = { G = ["H", "J"] }

            [modifications]
            mutations = ["A:N25Q"]
            "#,
        )
        .unwrap();

        let config = PartialBuildConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&build_args(&[]))
            .unwrap();

        assert_eq!(config.structure_path, PathBuf::from("4zmj.pdb"));
        assert_eq!(config.format, Some(StructureFormat::Mmcif));
        assert_eq!(config.assembly_index, 1);
        assert_eq!(config.chain_ids.remap["A"], "X");
        assert_eq!(config.chain_ids.transform_reserves["G"], vec!["H", "J"]);
        assert_eq!(config.modifications.mutations, vec!["A:N25Q".to_string()]);
    }

    #[test]
    fn cli_overrides_scalars_and_extends_lists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build.toml");
        fs::write(
            &path,
            r#"
            assembly = 1
            [chains]
            remap = { A = "X" }
            [modifications]
            mutations = ["A:N25Q"]
            "#,
        )
        .unwrap();

        let args = build_args(&["-b", "2", "--remap", "A=Y", "-m", "B:N25Q", "--reserve", "B=K,L"]);
        let config = PartialBuildConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(config.assembly_index, 2);
        assert_eq!(config.chain_ids.remap["A"], "Y");
        assert_eq!(config.chain_ids.transform_reserves["B"], vec!["K", "L"]);
        assert_eq!(
            config.modifications.mutations,
            vec!["A:N25Q".to_string(), "B:N25Q".to_string()]
        );
    }

    #[test]
    fn malformed_pairs_and_formats_are_rejected() {
        let result = PartialBuildConfig::default().merge_with_cli(&build_args(&["--remap", "A"]));
        assert!(matches!(result, Err(CliError::Argument(_))));

        let result = PartialBuildConfig::default().merge_with_cli(&build_args(&["--format", "xyz"]));
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "assembly = 1\nrotamers = 3\n").unwrap();
        assert!(matches!(
            PartialBuildConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
