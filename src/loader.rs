//! Document and registry loading.
//!
//! Manifests are usually YAML (`jackal.yaml`) and machine-written state is
//! JSON, so both are accepted. The format is picked from the file extension.

use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LoadError;
use crate::registry::SchemaRegistry;

/// Text format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// `.yaml` and `.yml` are YAML; everything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if it isn't valid JSON/YAML.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    let content = read_file(path)?;
    load_document_str(&content, Format::from_path(path))
}

/// Parse a document from a string.
pub fn load_document_str(content: &str, format: Format) -> Result<Value, LoadError> {
    parse(content, format)
}

/// Load a document from a path, or from stdin when `source` is `-`.
///
/// Stdin is parsed as YAML, which also accepts JSON.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|source| LoadError::ReadError {
                path: "<stdin>".into(),
                source,
            })?;
        return parse(&content, Format::Yaml);
    }
    load_document(Path::new(source))
}

/// Load a schema registry from a JSON or YAML file mapping type names to
/// descriptors.
///
/// The registry is not checked; call [`SchemaRegistry::check`] before use.
pub fn load_registry(path: &Path) -> Result<SchemaRegistry, LoadError> {
    let content = read_file(path)?;
    let registry: SchemaRegistry = parse(&content, Format::from_path(path))?;
    tracing::debug!(path = %path.display(), types = registry.len(), "loaded schema registry");
    Ok(registry)
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: DeserializeOwned>(content: &str, format: Format) -> Result<T, LoadError> {
    match format {
        Format::Json => {
            serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
        }
        Format::Yaml => {
            serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("jackal.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("jackal.YML")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("state.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("noext")), Format::Json);
    }

    #[test]
    fn yaml_keeps_key_order() {
        let value = load_document_str(
            "kind: JackalPackageConfig\nmetadata:\n  name: demo\n",
            Format::Yaml,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({ "kind": "JackalPackageConfig", "metadata": { "name": "demo" } })
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["kind", "metadata"]);
    }

    #[test]
    fn invalid_input_reports_format() {
        assert!(matches!(
            load_document_str("{", Format::Json),
            Err(LoadError::InvalidJson { .. })
        ));
        assert!(matches!(
            load_document_str("a: [", Format::Yaml),
            Err(LoadError::InvalidYaml { .. })
        ));
    }

    #[test]
    fn missing_file() {
        let err = load_document(Path::new("/nonexistent/jackal.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn registry_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.yaml");
        std::fs::write(
            &path,
            "Arch:\n  kind: enum\n  cases: [amd64, arm64]\nTags:\n  kind: array\n  items:\n    kind: primitive\n    of: string\n",
        )
        .unwrap();

        let registry = load_registry(&path).unwrap();
        assert_eq!(registry.names(), ["Arch", "Tags"]);
        assert_eq!(
            registry.get("Arch"),
            Some(&TypeDescriptor::enumeration(["amd64", "arm64"]))
        );
    }
}
