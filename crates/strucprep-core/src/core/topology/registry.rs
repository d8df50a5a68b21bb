use super::residues::DEFAULT_SEGTYPES;
use crate::core::models::segment::SegType;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SegtypeFile {
    #[serde(default)]
    segtypes: HashMap<String, Vec<String>>,
}

/// Residue name to segment type lookup.
///
/// Built-in classes are always available; entries loaded from a TOML file take
/// precedence over them. Unknown residue names classify as [`SegType::Unset`].
#[derive(Debug, Clone, Default)]
pub struct SegtypeRegistry {
    overrides: HashMap<String, SegType>,
}

impl SegtypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, RegistryLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            RegistryLoadError::Toml { source, .. } => RegistryLoadError::Toml {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, RegistryLoadError> {
        let file: SegtypeFile = toml::from_str(content).map_err(|e| RegistryLoadError::Toml {
            path: "<inline>".to_string(),
            source: e,
        })?;

        let mut registry = Self::new();
        for (class, resnames) in file.segtypes {
            let segtype: SegType = class
                .parse()
                .map_err(|_| RegistryLoadError::UnknownSegtype(class.clone()))?;
            for resname in resnames {
                registry.insert(&resname, segtype);
            }
        }
        Ok(registry)
    }

    pub fn insert(&mut self, resname: &str, segtype: SegType) {
        self.overrides.insert(resname.to_ascii_uppercase(), segtype);
    }

    pub fn classify(&self, resname: &str) -> SegType {
        let key = resname.to_ascii_uppercase();
        self.overrides
            .get(&key)
            .or_else(|| DEFAULT_SEGTYPES.get(key.as_str()))
            .copied()
            .unwrap_or(SegType::Unset)
    }
}

#[derive(Debug, Error)]
pub enum RegistryLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Unknown segment type '{0}' in segtype table")]
    UnknownSegtype(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn classify_falls_back_to_builtin_table() {
        let registry = SegtypeRegistry::new();
        assert_eq!(registry.classify("nag"), SegType::Glycan);
        assert_eq!(registry.classify("LYS"), SegType::Protein);
        assert_eq!(registry.classify("UNL"), SegType::Unset);
    }

    #[test]
    fn load_overrides_builtin_entries() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[segtypes]
ligand = ["UNL", "NAG"]
other = ["MSE"]
"#
        )
        .unwrap();

        let registry = SegtypeRegistry::load(file.path()).unwrap();
        assert_eq!(registry.classify("UNL"), SegType::Ligand);
        assert_eq!(registry.classify("NAG"), SegType::Ligand);
        assert_eq!(registry.classify("MSE"), SegType::Other);
        assert_eq!(registry.classify("BMA"), SegType::Glycan);
    }

    #[test]
    fn load_rejects_unknown_class() {
        let result = SegtypeRegistry::from_toml_str("[segtypes]\nlipid = [\"POPC\"]\n");
        assert!(matches!(result, Err(RegistryLoadError::UnknownSegtype(class)) if class == "lipid"));
    }

    #[test]
    fn load_reports_missing_file() {
        let result = SegtypeRegistry::load(Path::new("/nonexistent/segtypes.toml"));
        assert!(matches!(result, Err(RegistryLoadError::Io { .. })));
    }

    #[test]
    fn load_reports_malformed_toml_with_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[segtypes\nglycan = 1").unwrap();
        let result = SegtypeRegistry::load(file.path());
        match result {
            Err(RegistryLoadError::Toml { path, .. }) => assert!(path.ends_with(
                file.path().file_name().unwrap().to_str().unwrap()
            )),
            other => panic!("expected TOML error, got {other:?}"),
        }
    }
}
