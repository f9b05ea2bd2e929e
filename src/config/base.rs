//! `_BASE_` inheritance resolution for YAML configuration documents.
//!
//! A configuration may name a base document under the `_BASE_` key. The
//! base is loaded first (recursively, with cycle detection) and the
//! child's keys override it at matching paths: mappings merge key by
//! key, while scalars and sequences replace the inherited value
//! wholesale. The `_BASE_` key never survives into the merged document.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::core::{LayprepError, LayprepResult};

/// The inheritance marker key.
pub const BASE_KEY: &str = "_BASE_";

/// Loads a YAML document and resolves its `_BASE_` inheritance chain.
///
/// Base paths are interpreted relative to the referencing file's
/// directory. A missing base file or an inheritance cycle is a
/// configuration error.
pub fn load_yaml_with_bases(path: &Path) -> LayprepResult<Value> {
    let mut visited = Vec::new();
    load_recursive(path, &mut visited)
}

fn load_recursive(path: &Path, visited: &mut Vec<PathBuf>) -> LayprepResult<Value> {
    let canonical = path.canonicalize().map_err(|_| {
        LayprepError::config_error_detailed(
            "config inheritance",
            format!("config file not found: {}", path.display()),
        )
    })?;

    if visited.contains(&canonical) {
        return Err(LayprepError::config_error_detailed(
            "config inheritance",
            format!("cycle detected at {}", canonical.display()),
        ));
    }
    visited.push(canonical.clone());

    let text = std::fs::read_to_string(&canonical)?;
    let mut value: Value = serde_yaml::from_str(&text)?;

    let base_ref = match value.as_mapping_mut() {
        Some(mapping) => mapping.remove(BASE_KEY),
        None => None,
    };

    let merged = if let Some(base_ref) = base_ref {
        let base_rel = base_ref.as_str().ok_or_else(|| {
            LayprepError::config_error_detailed(
                "config inheritance",
                format!("{BASE_KEY} must be a string path in {}", canonical.display()),
            )
        })?;
        let base_path = canonical
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(base_rel);
        debug!(
            child = %canonical.display(),
            base = %base_path.display(),
            "resolving config base"
        );
        let base = load_recursive(&base_path, visited)?;
        merge_values(base, value)
    } else {
        value
    };

    visited.pop();
    Ok(merged)
}

/// Merges a child document over a base document.
///
/// Mappings merge recursively with the child winning on conflicts;
/// any other value kind in the child replaces the base value.
pub fn merge_values(base: Value, child: Value) -> Value {
    match (base, child) {
        (Value::Mapping(mut base_map), Value::Mapping(child_map)) => {
            for (key, child_value) in child_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge_values(base_value, child_value),
                    None => child_value,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (_, child) => child,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).expect("test yaml should parse")
    }

    #[test]
    fn child_scalar_overrides_base_at_matching_path() {
        let base = yaml("SOLVER:\n  BASE_LR: 0.01\n  MAX_ITER: 100\n");
        let child = yaml("SOLVER:\n  BASE_LR: 0.001\n");
        let merged = merge_values(base, child);
        assert_eq!(merged["SOLVER"]["BASE_LR"], yaml("0.001"));
        assert_eq!(merged["SOLVER"]["MAX_ITER"], yaml("100"));
    }

    #[test]
    fn sequences_replace_wholesale() {
        let base = yaml("STEPS: [100, 200, 300]\n");
        let child = yaml("STEPS: [50]\n");
        let merged = merge_values(base, child);
        assert_eq!(merged["STEPS"], yaml("[50]"));
    }

    #[test]
    fn disjoint_keys_union() {
        let base = yaml("A: 1\n");
        let child = yaml("B: 2\n");
        let merged = merge_values(base, child);
        assert_eq!(merged["A"], yaml("1"));
        assert_eq!(merged["B"], yaml("2"));
    }

    #[test]
    fn base_file_resolves_relative_to_child() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("mkdir");
        fs::write(dir.path().join("base.yaml"), "A: 1\nB: 2\n").expect("write base");
        fs::write(nested.join("child.yaml"), "_BASE_: ../base.yaml\nB: 3\n")
            .expect("write child");

        let merged = load_yaml_with_bases(&nested.join("child.yaml")).expect("should load");
        assert_eq!(merged["A"], yaml("1"));
        assert_eq!(merged["B"], yaml("3"));
        assert!(merged.get(BASE_KEY).is_none());
    }

    #[test]
    fn chained_bases_merge_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("root.yaml"), "A: 1\nB: 1\nC: 1\n").expect("write");
        fs::write(
            dir.path().join("mid.yaml"),
            "_BASE_: root.yaml\nB: 2\nC: 2\n",
        )
        .expect("write");
        fs::write(dir.path().join("leaf.yaml"), "_BASE_: mid.yaml\nC: 3\n").expect("write");

        let merged = load_yaml_with_bases(&dir.path().join("leaf.yaml")).expect("should load");
        assert_eq!(merged["A"], yaml("1"));
        assert_eq!(merged["B"], yaml("2"));
        assert_eq!(merged["C"], yaml("3"));
    }

    #[test]
    fn missing_base_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("child.yaml"), "_BASE_: nowhere.yaml\n").expect("write");

        let err = load_yaml_with_bases(&dir.path().join("child.yaml")).unwrap_err();
        assert!(matches!(err, LayprepError::Config { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn inheritance_cycle_is_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.yaml"), "_BASE_: b.yaml\n").expect("write");
        fs::write(dir.path().join("b.yaml"), "_BASE_: a.yaml\n").expect("write");

        let err = load_yaml_with_bases(&dir.path().join("a.yaml")).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
