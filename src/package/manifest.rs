//! `package.json` reading and writing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::PackageError;
use crate::runtime::Runtime;

/// File name of both the project manifest and every installed package's manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// A `package.json` document.
///
/// Only `version` and `dependencies` are interpreted. The document itself is
/// kept in its original key order, so saving writes those two fields back in
/// place and leaves every other key untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub version: Option<String>,
    pub dependencies: Option<IndexMap<String, String>>,
    document: Map<String, Value>,
}

/// The interpreted fields, validated against the raw document.
#[derive(Deserialize)]
struct KnownFields {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: Option<IndexMap<String, String>>,
}

impl Manifest {
    /// Load a manifest. An absent file is `Ok(None)`; unreadable or
    /// malformed content is `PackageError::Manifest`.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Option<Self>, PackageError> {
        if !runtime.exists(path) {
            return Ok(None);
        }
        let content = runtime
            .read_to_string(path)
            .map_err(|e| PackageError::Manifest {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            })?;
        Self::parse(&content)
            .map(Some)
            .map_err(|e| PackageError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    pub fn parse(content: &str) -> serde_json::Result<Self> {
        let document: Map<String, Value> = serde_json::from_str(content)?;
        let known: KnownFields = serde_json::from_value(Value::Object(document.clone()))?;
        Ok(Self {
            version: known.version,
            dependencies: known.dependencies,
            document,
        })
    }

    /// Write the manifest with 4-space indentation. Fields already present
    /// keep their position; a new `dependencies` map is appended.
    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> anyhow::Result<()> {
        let mut document = self.document.clone();
        if let Some(version) = &self.version {
            document.insert("version".into(), Value::from(version.as_str()));
        }
        if let Some(dependencies) = &self.dependencies {
            document.insert("dependencies".into(), serde_json::to_value(dependencies)?);
        }

        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        document.serialize(&mut serializer)?;
        runtime.write(path, &out)
    }

    /// Declared dependencies in declaration order.
    pub fn dependency_list(&self) -> Vec<(String, String)> {
        self.dependencies
            .iter()
            .flatten()
            .map(|(name, spec)| (name.clone(), spec.clone()))
            .collect()
    }

    /// Whether any dependency key names the package `name`, with or without
    /// a registry id.
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies
            .as_ref()
            .is_some_and(|deps| deps.keys().any(|key| dependency_name(key) == name))
    }

    /// Insert or replace `dependencies[name]`, creating the map if needed.
    pub fn upsert_dependency(&mut self, name: &str, specifier: &str) {
        self.dependencies
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), specifier.to_string());
    }

    /// Drop every dependency entry naming `name`; returns whether one was removed.
    pub fn remove_dependency(&mut self, name: &str) -> bool {
        self.dependencies.as_mut().is_some_and(|deps| {
            let before = deps.len();
            deps.retain(|key, _| dependency_name(key) != name);
            deps.len() != before
        })
    }
}

/// Package name of a dependency key: `<name>` or `<name> <id>`.
pub fn dependency_name(key: &str) -> &str {
    key.split_whitespace().next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    #[test]
    fn test_parse_keeps_declaration_order() {
        let manifest = Manifest::parse(
            r#"{"name": "web", "version": "1.0.0",
                "dependencies": {"zeta": "^1.0.0", "alpha": "~2.1.0", "mid": "3.0.0"}}"#,
        )
        .unwrap();

        assert_eq!(manifest.version.as_deref(), Some("1.0.0"));
        let names: Vec<_> = manifest.dependency_list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(manifest.document.get("name"), Some(&Value::from("web")));
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(Manifest::parse("not json").is_err());
        assert!(Manifest::parse(r#"{"dependencies": ["a"]}"#).is_err());
        assert!(Manifest::parse(r#"{"dependencies": {"a": 1}}"#).is_err());
        assert!(Manifest::parse(r#"{"version": 2}"#).is_err());
    }

    #[test]
    fn test_upsert_and_remove_dependency() {
        let mut manifest = Manifest::default();
        assert!(!manifest.depends_on("foo"));

        manifest.upsert_dependency("foo", "1.2.0");
        manifest.upsert_dependency("bar", "^2.0.0");
        manifest.upsert_dependency("foo", "1.3.0");
        assert_eq!(
            manifest.dependency_list(),
            vec![
                ("foo".to_string(), "1.3.0".to_string()),
                ("bar".to_string(), "^2.0.0".to_string())
            ]
        );

        assert!(manifest.remove_dependency("foo"));
        assert!(!manifest.remove_dependency("foo"));
        assert!(!manifest.depends_on("foo"));
        assert!(manifest.depends_on("bar"));
    }

    #[test]
    fn test_dependency_keys_with_registry_id() {
        let mut manifest =
            Manifest::parse(r#"{"dependencies": {"uuid 42": "^3.0.0", "web": ""}}"#).unwrap();

        assert_eq!(dependency_name("uuid 42"), "uuid");
        assert_eq!(dependency_name("uuid"), "uuid");
        assert!(manifest.depends_on("uuid"));
        assert!(!manifest.depends_on("uuid 42"));
        assert!(!manifest.depends_on("uu"));

        assert!(manifest.remove_dependency("uuid"));
        assert_eq!(
            manifest.dependency_list(),
            vec![("web".to_string(), String::new())]
        );
    }

    #[test]
    fn test_load_absent_is_none() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/p/package.json");
        runtime.expect_exists().with(eq(path.clone())).returning(|_| false);

        assert_eq!(Manifest::load(&runtime, &path).unwrap(), None);
    }

    #[test]
    fn test_load_malformed_is_manifest_error() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/p/package.json");
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("{ broken".into()));

        let err = Manifest::load(&runtime, &path).unwrap_err();
        assert!(matches!(err, PackageError::Manifest { path: p, .. } if p == path));
    }

    fn captured_write(runtime: &mut MockRuntime) -> std::sync::Arc<std::sync::Mutex<String>> {
        let written = std::sync::Arc::new(std::sync::Mutex::new(String::new()));
        let written_clone = std::sync::Arc::clone(&written);
        runtime
            .expect_write()
            .withf(|p, _| p == Path::new("/p/package.json"))
            .times(1)
            .returning(move |_, contents| {
                *written_clone.lock().unwrap() = String::from_utf8(contents.to_vec()).unwrap();
                Ok(())
            });
        written
    }

    #[test]
    fn test_save_appends_new_dependencies_with_four_space_indent() {
        let mut runtime = MockRuntime::new();
        let written = captured_write(&mut runtime);

        let mut manifest = Manifest::parse(r#"{"scripts": {"start": "tinn main.js"}}"#).unwrap();
        manifest.upsert_dependency("foo", "1.2.0");
        manifest
            .save(&runtime, Path::new("/p/package.json"))
            .unwrap();

        let text = written.lock().unwrap().clone();
        assert!(text.starts_with("{\n    \"scripts\""), "{text}");
        assert!(text.contains("\n        \"foo\": \"1.2.0\""), "{text}");
        assert!(text.find("\"scripts\"") < text.find("\"dependencies\""));
    }

    #[test]
    fn test_save_keeps_key_order() {
        let mut runtime = MockRuntime::new();
        let written = captured_write(&mut runtime);

        let mut manifest = Manifest::parse(
            r#"{"name": "app", "version": "0.1.0", "dependencies": {"web": "1.0.0"}, "scripts": {}}"#,
        )
        .unwrap();
        manifest.upsert_dependency("uuid", "^3.0.0");
        manifest
            .save(&runtime, Path::new("/p/package.json"))
            .unwrap();

        let text = written.lock().unwrap().clone();
        let keys: Vec<String> = serde_json::from_str::<Map<String, Value>>(&text)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["name", "version", "dependencies", "scripts"]);

        let reparsed = Manifest::parse(&text).unwrap();
        assert_eq!(
            reparsed.dependency_list(),
            vec![
                ("web".to_string(), "1.0.0".to_string()),
                ("uuid".to_string(), "^3.0.0".to_string())
            ]
        );
    }
}
