// SLogViz - app/rule_mgr.rs
//
// Loads correlation rules from the embedded built-in set and from a user
// rule directory, then registers them by name. A user rule with the same
// name as a built-in replaces it.

use crate::core::correlation::RuleRegistry;
use crate::core::rules::{self, RuleDefaults, RuleSpec};
use crate::util::constants;
use crate::util::error::RuleError;
use std::path::Path;

/// Load built-in rules plus user overrides and register them.
///
/// `enabled`, when given, limits registration to the named rules; unknown
/// names in it are ignored with a warning. Invalid rule files are logged,
/// returned as errors and skipped.
pub fn load_all_rules(
    user_rule_dir: Option<&Path>,
    enabled: Option<&[String]>,
    defaults: &RuleDefaults,
) -> (RuleRegistry, Vec<RuleError>) {
    let mut specs = rules::load_builtin_rules(defaults);
    let mut errors = Vec::new();

    tracing::info!(builtin_count = specs.len(), "Loaded built-in rules");

    if let Some(dir) = user_rule_dir {
        if dir.is_dir() {
            let (user_specs, user_errors) = load_user_rules(dir, defaults);
            errors.extend(user_errors);

            for user_spec in user_specs {
                if let Some(pos) = specs.iter().position(|s| s.name == user_spec.name) {
                    tracing::info!(rule = %user_spec.name, "User rule overrides built-in");
                    specs[pos] = user_spec;
                } else {
                    tracing::info!(rule = %user_spec.name, "Loaded user-defined rule");
                    specs.push(user_spec);
                }
            }
        } else {
            tracing::debug!(
                dir = %dir.display(),
                "User rule directory does not exist (skipping)"
            );
        }
    }

    if specs.len() > constants::MAX_RULES {
        tracing::warn!(
            count = specs.len(),
            max = constants::MAX_RULES,
            "Too many rules loaded, truncating"
        );
        errors.push(RuleError::TooManyRules {
            count: specs.len(),
            max: constants::MAX_RULES,
        });
        specs.truncate(constants::MAX_RULES);
    }

    if let Some(names) = enabled {
        for name in names {
            if !specs.iter().any(|s| &s.name == name) {
                tracing::warn!(rule = %name, "Enabled rule is not defined");
            }
        }
        specs.retain(|s| names.contains(&s.name));
    }

    let mut registry = RuleRegistry::new();
    for spec in specs {
        spec.register_into(&mut registry);
    }

    tracing::info!(total = registry.len(), "Rule loading complete");
    (registry, errors)
}

/// Load user rule files (`*.toml`) from `dir`, sorted by file name.
fn load_user_rules(dir: &Path, defaults: &RuleDefaults) -> (Vec<RuleSpec>, Vec<RuleError>) {
    let mut specs = Vec::new();
    let mut errors = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(RuleError::Io {
                path: dir.to_path_buf(),
                source: e,
            });
            return (specs, errors);
        }
    };

    let mut paths = Vec::new();
    for entry_result in entries {
        match entry_result {
            Ok(entry) => {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                    paths.push(path);
                }
            }
            Err(e) => errors.push(RuleError::Io {
                path: dir.to_path_buf(),
                source: e,
            }),
        }
    }
    // read_dir order is platform-dependent; later files win on duplicate names.
    paths.sort();

    for path in paths {
        let size = match std::fs::metadata(&path) {
            Ok(m) => m.len(),
            Err(e) => {
                errors.push(RuleError::Io { path, source: e });
                continue;
            }
        };
        if size > constants::MAX_RULE_FILE_SIZE {
            errors.push(RuleError::FileTooLarge {
                path,
                size,
                max_size: constants::MAX_RULE_FILE_SIZE,
            });
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                errors.push(RuleError::Io { path, source: e });
                continue;
            }
        };

        match rules::parse_rule_toml(&content, &path)
            .and_then(|def| rules::validate_and_compile(def, defaults, false))
        {
            Ok(spec) => {
                if let Some(pos) = specs.iter().position(|s: &RuleSpec| s.name == spec.name) {
                    specs[pos] = spec;
                } else {
                    specs.push(spec);
                }
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Invalid rule file skipped");
                errors.push(e);
            }
        }
    }

    (specs, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtins_only() {
        let (registry, errors) = load_all_rules(None, None, &RuleDefaults::default());
        assert!(errors.is_empty());
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "event_a_rule_break",
                "session_balance",
                "the_first_50_entries",
                "the_last_50_entries"
            ]
        );
    }

    #[test]
    fn test_user_rule_overrides_builtin_and_bad_file_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("first.toml"),
            "[rule]\nname = \"the_first_50_entries\"\ndescription = \"first three\"\n\n[head]\ncount = 3\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.toml"), "[rule]\nname = \"broken\"\n").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let (registry, errors) =
            load_all_rules(Some(dir.path()), None, &RuleDefaults::default());
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.description("the_first_50_entries"), Some("first three"));
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], RuleError::AmbiguousKind { .. }));
    }

    #[test]
    fn test_enabled_list_limits_registry() {
        let enabled = vec!["session_balance".to_string(), "no_such_rule".to_string()];
        let (registry, _) = load_all_rules(None, Some(enabled.as_slice()), &RuleDefaults::default());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("session_balance"));
    }

    #[test]
    fn test_oversized_rule_file_rejected() {
        let dir = TempDir::new().unwrap();
        let big = "#".repeat(constants::MAX_RULE_FILE_SIZE as usize + 1);
        std::fs::write(dir.path().join("big.toml"), big).unwrap();
        let (_, errors) = load_all_rules(Some(dir.path()), None, &RuleDefaults::default());
        assert!(matches!(errors[0], RuleError::FileTooLarge { .. }));
    }
}
