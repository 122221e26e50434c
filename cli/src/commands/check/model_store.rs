//! # Conversation Model Store Checks
//!
//! File: cli/src/commands/check/model_store.rs
//!
//! ## Overview
//!
//! Loads the YAML files of a model store and cross-checks them: every intent
//! a story or rule relies on must be declared, every `utter_*` step needs a
//! response, and the custom actions the domain declares must match the ones
//! the action server registers.
//!
//! Parsing is deliberately loose (`serde_yaml::Value`): only the keys these
//! checks read are interpreted, so newer engine schema additions do not break
//! the check.
//!
//! | File               | Required | Read for                       |
//! |--------------------|----------|--------------------------------|
//! | `domain.yml`       | yes      | intents, responses, actions    |
//! | `data/nlu.yml`     | no       | which intents have examples    |
//! | `data/stories.yml` | no       | intent and action steps        |
//! | `data/rules.yml`   | no       | intent and action steps        |
//!
use crate::core::error::{Result, SentinelError};
use anyhow::{anyhow, Context};
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Intents the engine defines itself.
const BUILTIN_INTENTS: &[&str] = &["restart", "back", "session_start", "nlu_fallback"];

/// Actions the engine defines itself.
const BUILTIN_ACTIONS: &[&str] = &[
    "action_listen",
    "action_restart",
    "action_session_start",
    "action_default_fallback",
    "action_deactivate_loop",
    "action_revert_fallback_events",
    "action_default_ask_affirmation",
    "action_default_ask_rephrase",
    "action_two_stage_fallback",
    "action_unlikely_intent",
    "action_back",
    "action_extract_slots",
];

/// A story or a rule reduced to the names its steps reference.
#[derive(Debug, Default)]
struct Flow {
    kind: &'static str,
    name: String,
    intents: Vec<String>,
    actions: Vec<String>,
}

/// The parts of a model store the checks look at.
#[derive(Debug, Default)]
pub struct ModelStore {
    pub intents: BTreeSet<String>,
    pub responses: BTreeSet<String>,
    pub actions: BTreeSet<String>,
    pub nlu_intents: BTreeSet<String>,
    flows: Vec<Flow>,
    missing_files: Vec<String>,
}

/// Problems found by `check`.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).map_err(|e| {
        anyhow!(SentinelError::ModelStore(format!(
            "{} is not valid YAML: {}",
            path.display(),
            e
        )))
    })
}

/// Name of a list entry that is either `- name` or `- name: {...}`.
fn entry_name(entry: &Value) -> Option<String> {
    match entry {
        Value::String(name) => Some(name.clone()),
        Value::Mapping(map) if map.len() == 1 => map
            .keys()
            .next()
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn names_in(doc: &Value, key: &str) -> BTreeSet<String> {
    doc.get(key)
        .and_then(Value::as_sequence)
        .map(|entries| entries.iter().filter_map(entry_name).collect())
        .unwrap_or_default()
}

fn collect_steps(steps: &[Value], flow: &mut Flow) {
    for step in steps {
        if let Some(intent) = step.get("intent").and_then(Value::as_str) {
            flow.intents.push(intent.to_string());
        }
        if let Some(action) = step.get("action").and_then(Value::as_str) {
            flow.actions.push(action.to_string());
        }
        if let Some(alternatives) = step.get("or").and_then(Value::as_sequence) {
            collect_steps(alternatives, flow);
        }
    }
}

fn flows_in(doc: &Value, list_key: &str, kind: &'static str) -> Vec<Flow> {
    let Some(entries) = doc.get(list_key).and_then(Value::as_sequence) else {
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut flow = Flow {
                kind,
                name: entry
                    .get(kind)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{}", i + 1)),
                ..Flow::default()
            };
            if let Some(steps) = entry.get("steps").and_then(Value::as_sequence) {
                collect_steps(steps, &mut flow);
            }
            flow
        })
        .collect()
}

impl ModelStore {
    /// # Load Model Store (`load`)
    ///
    /// ## Errors
    ///
    /// `SentinelError::ModelStore` if `dir` has no `domain.yml` or a file is
    /// not valid YAML. Missing data files are recorded, not fatal.
    pub fn load(dir: &Path) -> Result<Self> {
        let domain_path = dir.join("domain.yml");
        if !domain_path.is_file() {
            return Err(anyhow!(SentinelError::ModelStore(format!(
                "no domain.yml in {}",
                dir.display()
            ))));
        }

        let domain = read_yaml(&domain_path)?;
        let mut store = ModelStore {
            intents: names_in(&domain, "intents"),
            actions: names_in(&domain, "actions"),
            responses: domain
                .get("responses")
                .and_then(Value::as_mapping)
                .map(|map| {
                    map.keys()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            ..ModelStore::default()
        };

        for (file, list_key, kind) in [
            ("data/nlu.yml", "nlu", ""),
            ("data/stories.yml", "stories", "story"),
            ("data/rules.yml", "rules", "rule"),
        ] {
            let path = dir.join(file);
            if !path.is_file() {
                store.missing_files.push(file.to_string());
                continue;
            }
            let doc = read_yaml(&path)?;
            debug!("Loaded {}", path.display());
            if kind.is_empty() {
                store.nlu_intents = doc
                    .get(list_key)
                    .and_then(Value::as_sequence)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter(|e| e.get("examples").is_some())
                            .filter_map(|e| e.get("intent").and_then(Value::as_str))
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
            } else {
                store.flows.extend(flows_in(&doc, list_key, kind));
            }
        }

        Ok(store)
    }

    /// # Cross-Check (`check`)
    ///
    /// `registered` is the list of actions the action server serves.
    pub fn check(&self, registered: &[&str]) -> CheckReport {
        let mut report = CheckReport::default();

        for file in &self.missing_files {
            report.warnings.push(format!("{} not found", file));
        }

        let mut reported = BTreeSet::new();
        for flow in &self.flows {
            for intent in &flow.intents {
                if !self.intents.contains(intent)
                    && !BUILTIN_INTENTS.contains(&intent.as_str())
                    && reported.insert(("intent", intent.clone()))
                {
                    report.errors.push(format!(
                        "Intent '{}' used in {} '{}' is not declared in domain.yml",
                        intent, flow.kind, flow.name
                    ));
                }
            }
            for action in &flow.actions {
                if action.starts_with("utter_") {
                    if !self.responses.contains(action) && reported.insert(("utter", action.clone())) {
                        report.errors.push(format!(
                            "Response '{}' used in {} '{}' has no entry under responses",
                            action, flow.kind, flow.name
                        ));
                    }
                } else if !self.actions.contains(action)
                    && !BUILTIN_ACTIONS.contains(&action.as_str())
                    && reported.insert(("action", action.clone()))
                {
                    report.errors.push(format!(
                        "Action '{}' used in {} '{}' is not declared in domain.yml",
                        action, flow.kind, flow.name
                    ));
                }
            }
        }

        for action in &self.actions {
            if action.starts_with("utter_") || BUILTIN_ACTIONS.contains(&action.as_str()) {
                continue;
            }
            if !registered.contains(&action.as_str()) {
                report.errors.push(format!(
                    "Action '{}' is declared in domain.yml but not registered in the action server",
                    action
                ));
            }
        }
        for action in registered {
            if !self.actions.contains(*action) {
                report.warnings.push(format!(
                    "Action '{}' is registered in the action server but not declared in domain.yml",
                    action
                ));
            }
        }

        for intent in &self.intents {
            if !self.nlu_intents.contains(intent) {
                report
                    .warnings
                    .push(format!("Intent '{}' has no NLU examples", intent));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOMAIN: &str = r#"
version: "3.1"
intents:
  - greet
  - express_sadness:
      use_entities: []
  - ask_coping_strategy
responses:
  utter_greet:
    - text: "Hello!"
actions:
  - action_process_message
  - action_suggest_coping_strategy
"#;

    const NLU: &str = r#"
version: "3.1"
nlu:
  - intent: greet
    examples: |
      - hi
  - intent: express_sadness
    examples: |
      - I feel sad
  - synonym: sad
    examples: |
      - down
"#;

    const STORIES: &str = r#"
version: "3.1"
stories:
  - story: sad path
    steps:
      - intent: greet
      - action: utter_greet
      - or:
          - intent: express_sadness
          - intent: ask_coping_strategy
      - action: action_process_message
      - action: action_suggest_coping_strategy
"#;

    fn store(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    const REGISTERED: &[&str] = &["action_process_message", "action_suggest_coping_strategy"];

    #[test]
    fn test_consistent_store_has_no_errors() {
        let dir = store(&[
            ("domain.yml", DOMAIN),
            ("data/nlu.yml", NLU),
            ("data/stories.yml", STORIES),
        ]);
        let loaded = ModelStore::load(dir.path()).unwrap();
        assert!(loaded.intents.contains("express_sadness"));

        let report = loaded.check(REGISTERED);
        assert!(report.is_ok(), "{:?}", report.errors);
        assert!(report.warnings.contains(&"data/rules.yml not found".to_string()));
        assert!(report
            .warnings
            .contains(&"Intent 'ask_coping_strategy' has no NLU examples".to_string()));
    }

    #[test]
    fn test_flags_undeclared_names() {
        let rules = r#"
rules:
  - rule: say goodbye
    steps:
      - intent: goodbye
      - action: utter_goodbye
      - action: action_mystery
"#;
        let dir = store(&[("domain.yml", DOMAIN), ("data/rules.yml", rules)]);
        let report = ModelStore::load(dir.path()).unwrap().check(REGISTERED);

        assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
        assert!(report.errors[0].contains("Intent 'goodbye' used in rule 'say goodbye'"));
        assert!(report.errors[1].contains("Response 'utter_goodbye'"));
        assert!(report.errors[2].contains("Action 'action_mystery'"));
    }

    #[test]
    fn test_domain_and_registry_mismatch() {
        let dir = store(&[("domain.yml", DOMAIN)]);
        let report = ModelStore::load(dir.path())
            .unwrap()
            .check(&["action_process_message", "action_fallback_api"]);

        assert_eq!(
            report.errors,
            vec![
                "Action 'action_suggest_coping_strategy' is declared in domain.yml but not registered in the action server"
            ]
        );
        assert!(report.warnings.iter().any(|w| w.contains("'action_fallback_api' is registered")));
    }

    #[test]
    fn test_missing_domain_is_error() {
        let dir = TempDir::new().unwrap();
        let err = ModelStore::load(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SentinelError>(),
            Some(SentinelError::ModelStore(_))
        ));
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let dir = store(&[("domain.yml", "intents: [greet\n")]);
        let err = ModelStore::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("is not valid YAML"));
    }
}
