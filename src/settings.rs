//! The VS Code settings file: relaxed-JSON read, scoped patch, atomic write.
//!
//! The whole file is held as one ordered JSON object so keys the sync never
//! touches keep their position. Only the two custom-model sections are ever
//! rewritten, and inside them only the entries whose `baseUrl` matches the
//! target endpoint; everything else passes through as opaque JSON.
//!
//! Reading accepts comments and trailing commas (the file is hand-edited);
//! writing emits plain JSON with the editor's own 4-space indentation.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use crate::catalog::normalize_base_url;
use crate::error::{Result, SyncError};
use crate::model::{ModelDescriptor, RegistryState};
use crate::reconcile::ReconciliationResult;

/// Settings key for the active custom-model section.
pub const ENABLED_KEY: &str = "github.copilot.chat.customOAIModels";

/// Settings key for the parked custom-model section.
pub const DISABLED_KEY: &str = "github.copilot.chat.customOAIModels.disabled";

/// Platform path of the VS Code user settings file.
///
/// `dirs::config_dir()` resolves to `%APPDATA%` on Windows, `~/Library/
/// Application Support` on macOS and `~/.config` on Linux, which is exactly
/// where Code keeps `User/settings.json`.
pub fn settings_path(insiders: bool) -> Result<PathBuf> {
    let product = if insiders { "Code - Insiders" } else { "Code" };
    let config = dirs::config_dir().ok_or_else(|| {
        SyncError::Config("cannot determine the user configuration directory".to_string())
    })?;
    Ok(config.join(product).join("User").join("settings.json"))
}

/// A settings file held as an ordered JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDocument {
    root: Map<String, Value>,
}

impl SettingsDocument {
    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SyncError::NotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(SyncError::Config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        Self::parse(&content)
    }

    /// Parse settings text. Comments and trailing commas are accepted.
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value =
            json5::from_str(content).map_err(|e| SyncError::Parse(e.to_string()))?;
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(SyncError::Parse(
                "settings root is not a JSON object".to_string(),
            )),
        }
    }

    /// Top-level value lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Top-level keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// Extract the registry slice scoped to `base_url`.
    ///
    /// A missing section reads as empty. Entries whose `baseUrl` does not
    /// normalize to the target (or that carry none at all) stay invisible
    /// here and untouched on write.
    pub fn registry_state(&self, base_url: &str) -> Result<RegistryState> {
        let target = normalize_base_url(base_url);
        let enabled = self.scoped_entries(ENABLED_KEY, &target)?;
        let disabled = self.scoped_entries(DISABLED_KEY, &target)?;
        Ok(RegistryState {
            base_url: target,
            enabled,
            disabled,
        })
    }

    fn scoped_entries(&self, section: &str, target: &str) -> Result<Vec<ModelDescriptor>> {
        let Some(value) = self.root.get(section) else {
            return Ok(Vec::new());
        };
        let Value::Object(entries) = value else {
            return Err(SyncError::Parse(format!(
                "settings section {section} is not an object"
            )));
        };

        let mut scoped = Vec::new();
        for (id, entry) in entries {
            if !entry_in_scope(entry, target) {
                continue;
            }
            let descriptor = ModelDescriptor::from_entry(id, entry).map_err(|e| {
                SyncError::Parse(format!("model {id:?} in {section}: {e}"))
            })?;
            scoped.push(descriptor);
        }
        Ok(scoped)
    }

    /// Patch the two custom-model sections with a reconciliation result.
    ///
    /// Kept entries stay in place, demoted and promoted entries change
    /// section (appending at the destination's end), new catalog entries
    /// append to the enabled section. Out-of-scope entries and every other
    /// top-level key are untouched. A section is only created when
    /// something actually lands in it.
    ///
    /// Section keys carry the model id alone, so an id already held by
    /// another endpoint's entry in the destination section cannot be
    /// claimed without destroying that entry. A colliding catalog addition
    /// is skipped and returned; a colliding promotion or demotion is a
    /// `Config` error, because skipping the move would strand or lose the
    /// entry's config.
    pub fn apply_result(&mut self, result: &ReconciliationResult) -> Result<Vec<String>> {
        let target = result.base_url.as_str();
        let enabled_taken = self.out_of_scope_ids(ENABLED_KEY, target);
        let disabled_taken = self.out_of_scope_ids(DISABLED_KEY, target);

        for descriptor in &result.re_enabled {
            if enabled_taken.contains(&descriptor.id) {
                return Err(SyncError::Config(format!(
                    "cannot re-enable {:?}: the id is held by another endpoint's entry in {ENABLED_KEY}",
                    descriptor.id
                )));
            }
        }
        for descriptor in &result.moved_to_disabled {
            if disabled_taken.contains(&descriptor.id) {
                return Err(SyncError::Config(format!(
                    "cannot disable {:?}: the id is held by another endpoint's entry in {DISABLED_KEY}",
                    descriptor.id
                )));
            }
        }

        let mut skipped = Vec::new();
        let added: Vec<&ModelDescriptor> = result
            .added
            .iter()
            .filter(|descriptor| {
                if enabled_taken.contains(&descriptor.id) {
                    skipped.push(descriptor.id.clone());
                    false
                } else {
                    true
                }
            })
            .collect();

        let replace: HashMap<&str, &ModelDescriptor> = result
            .kept
            .iter()
            .map(|descriptor| (descriptor.id.as_str(), descriptor))
            .collect();
        let evict: HashSet<&str> = result
            .moved_to_disabled
            .iter()
            .map(|descriptor| descriptor.id.as_str())
            .collect();
        let append: Vec<&ModelDescriptor> =
            result.re_enabled.iter().chain(added.into_iter()).collect();
        self.patch_section(ENABLED_KEY, target, &replace, &evict, &append);

        let replace = HashMap::new();
        let evict: HashSet<&str> = result
            .re_enabled
            .iter()
            .map(|descriptor| descriptor.id.as_str())
            .chain(result.dropped_duplicates.iter().map(String::as_str))
            .collect();
        let append: Vec<&ModelDescriptor> = result.moved_to_disabled.iter().collect();
        self.patch_section(DISABLED_KEY, target, &replace, &evict, &append);

        Ok(skipped)
    }

    /// Ids in `section` whose entry does not belong to the target scope.
    fn out_of_scope_ids(&self, section: &str, target: &str) -> HashSet<String> {
        match self.root.get(section) {
            Some(Value::Object(entries)) => entries
                .iter()
                .filter(|(_, entry)| !entry_in_scope(entry, target))
                .map(|(id, _)| id.clone())
                .collect(),
            _ => HashSet::new(),
        }
    }

    /// Rebuild one section around the scoped changes.
    ///
    /// Existing entries keep their relative order: out-of-scope entries are
    /// copied verbatim, scoped entries are re-emitted from `replace`,
    /// evicted from the section, or (scoped but unclaimed) kept verbatim.
    /// `append` lands at the end in the given order.
    fn patch_section(
        &mut self,
        section: &str,
        target: &str,
        replace: &HashMap<&str, &ModelDescriptor>,
        evict: &HashSet<&str>,
        append: &[&ModelDescriptor],
    ) {
        let mut rebuilt = Map::new();
        if let Some(Value::Object(entries)) = self.root.get(section) {
            for (id, entry) in entries {
                if !entry_in_scope(entry, target) {
                    rebuilt.insert(id.clone(), entry.clone());
                } else if let Some(descriptor) = replace.get(id.as_str()) {
                    let patched = descriptor.to_entry();
                    // Object equality ignores key order, so an entry the
                    // reconciliation left untouched keeps its original
                    // field layout byte for byte.
                    if patched == *entry {
                        rebuilt.insert(id.clone(), entry.clone());
                    } else {
                        rebuilt.insert(id.clone(), patched);
                    }
                } else if !evict.contains(id.as_str()) {
                    rebuilt.insert(id.clone(), entry.clone());
                }
            }
        }
        for descriptor in append {
            rebuilt.insert(descriptor.id.clone(), descriptor.to_entry());
        }

        if rebuilt.is_empty() && !self.root.contains_key(section) {
            return;
        }
        self.root.insert(section.to_string(), Value::Object(rebuilt));
    }

    /// Serialize with 4-space indentation and a trailing newline, matching
    /// how the editor writes the file itself.
    pub fn to_json_string(&self) -> String {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, formatter);
        // a string-keyed JSON tree cannot fail to serialize
        self.root
            .serialize(&mut ser)
            .expect("settings serialization cannot fail");
        buf.push(b'\n');
        String::from_utf8(buf).expect("serializer emits UTF-8")
    }

    /// Write the document to `path` via a temporary file and rename, so a
    /// torn write can never leave a half-serialized settings file behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SyncError::Write(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, self.to_json_string()).map_err(|e| {
            SyncError::Write(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, path).map_err(|e| {
            SyncError::Write(format!(
                "failed to rename {} → {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })?;
        Ok(())
    }
}

/// Whether a section entry belongs to the target scope.
fn entry_in_scope(entry: &Value, target: &str) -> bool {
    entry
        .get("baseUrl")
        .and_then(Value::as_str)
        .is_some_and(|url| normalize_base_url(url) == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use serde_json::json;

    const HOST: &str = "http://localhost:8080";

    fn doc(content: &str) -> SettingsDocument {
        SettingsDocument::parse(content).unwrap()
    }

    #[test]
    fn parse_tolerates_comments_and_trailing_commas() {
        let settings = doc(r#"{
            // editor things
            "editor.fontSize": 14,
            "github.copilot.chat.customOAIModels": {
                "m1": { "baseUrl": "http://localhost:8080", }, // trailing comma
            },
        }"#);
        assert_eq!(settings.get("editor.fontSize"), Some(&json!(14)));
    }

    #[test]
    fn parse_rejects_non_object_root() {
        let err = SettingsDocument::parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let err = SettingsDocument::load(&path).unwrap_err();
        assert!(matches!(err, SyncError::NotFound(p) if p == path));
    }

    #[test]
    fn missing_sections_read_as_empty_state() {
        let settings = doc(r#"{ "editor.fontSize": 14 }"#);
        let state = settings.registry_state(HOST).unwrap();
        assert_eq!(state.base_url, HOST);
        assert!(state.enabled.is_empty());
        assert!(state.disabled.is_empty());
    }

    #[test]
    fn registry_state_scopes_by_normalized_base_url() {
        let settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "mine": { "baseUrl": "http://localhost:8080/v1/" },
                "other": { "baseUrl": "http://elsewhere:9999" }
            },
            "github.copilot.chat.customOAIModels.disabled": {
                "parked": { "baseUrl": "http://localhost:8080" }
            }
        }"#);
        let state = settings.registry_state("http://localhost:8080/v1").unwrap();

        assert_eq!(state.enabled.len(), 1);
        assert_eq!(state.enabled[0].id, "mine");
        assert_eq!(state.disabled.len(), 1);
        assert_eq!(state.disabled[0].id, "parked");
    }

    #[test]
    fn entries_without_base_url_stay_out_of_scope() {
        let settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "urlless": { "name": "urlless" },
                "stringly": "not an object",
                "mine": { "baseUrl": "http://localhost:8080" }
            }
        }"#);
        let state = settings.registry_state(HOST).unwrap();
        assert_eq!(state.enabled.len(), 1);
        assert_eq!(state.enabled[0].id, "mine");
    }

    #[test]
    fn non_object_section_is_a_parse_error() {
        let settings = doc(r#"{ "github.copilot.chat.customOAIModels": [1, 2] }"#);
        let err = settings.registry_state(HOST).unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
    }

    #[test]
    fn malformed_scoped_entry_is_a_parse_error() {
        let settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "bad": { "baseUrl": "http://localhost:8080", "requiresAPIKey": "yes" }
            }
        }"#);
        let err = settings.registry_state(HOST).unwrap_err();
        assert!(matches!(err, SyncError::Parse(message) if message.contains("bad")));
    }

    #[test]
    fn apply_result_moves_vanished_model_to_disabled() {
        let mut settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "gone": { "baseUrl": "http://localhost:8080" },
                "here": { "baseUrl": "http://localhost:8080" }
            }
        }"#);
        let state = settings.registry_state(HOST).unwrap();
        let result = reconcile(&state, &crate::catalog::RemoteCatalog::from_ids(["here"]), false);
        settings.apply_result(&result).unwrap();

        let enabled = settings.get(ENABLED_KEY).unwrap().as_object().unwrap();
        assert!(enabled.contains_key("here"));
        assert!(!enabled.contains_key("gone"));
        let disabled = settings.get(DISABLED_KEY).unwrap().as_object().unwrap();
        assert!(disabled.contains_key("gone"));
        // created section lands after the existing keys
        assert_eq!(settings.keys().last(), Some(DISABLED_KEY));
    }

    #[test]
    fn apply_result_leaves_other_scopes_alone() {
        let mut settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "other": { "baseUrl": "http://elsewhere:9999", "note": "untouched" },
                "mine": { "baseUrl": "http://localhost:8080" }
            }
        }"#);
        let state = settings.registry_state(HOST).unwrap();
        let result = reconcile(&state, &crate::catalog::RemoteCatalog::from_ids(["mine"]), false);
        settings.apply_result(&result).unwrap();

        let enabled = settings.get(ENABLED_KEY).unwrap().as_object().unwrap();
        assert_eq!(enabled["other"]["note"], json!("untouched"));
        assert_eq!(
            enabled.keys().collect::<Vec<_>>(),
            ["other", "mine"],
            "out-of-scope entry keeps its position"
        );
    }

    #[test]
    fn colliding_catalog_id_is_skipped_not_overwritten() {
        let mut settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "m1": { "baseUrl": "http://elsewhere:9999", "note": "theirs" }
            }
        }"#);
        let before = settings.get(ENABLED_KEY).unwrap().clone();
        let state = settings.registry_state(HOST).unwrap();
        let result = reconcile(&state, &crate::catalog::RemoteCatalog::from_ids(["m1"]), false);
        assert_eq!(result.added.len(), 1, "the id looks new within the scope");

        let skipped = settings.apply_result(&result).unwrap();

        assert_eq!(skipped, ["m1"]);
        assert_eq!(settings.get(ENABLED_KEY).unwrap(), &before);
    }

    #[test]
    fn colliding_re_enable_is_a_config_error() {
        let mut settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "m1": { "baseUrl": "http://elsewhere:9999" }
            },
            "github.copilot.chat.customOAIModels.disabled": {
                "m1": { "baseUrl": "http://localhost:8080" }
            }
        }"#);
        let before = settings.clone();
        let state = settings.registry_state(HOST).unwrap();
        let result = reconcile(&state, &crate::catalog::RemoteCatalog::from_ids(["m1"]), false);

        let err = settings.apply_result(&result).unwrap_err();

        assert!(matches!(err, SyncError::Config(message) if message.contains("m1")));
        assert_eq!(settings, before, "nothing is patched on refusal");
    }

    #[test]
    fn colliding_demotion_is_a_config_error() {
        let mut settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "gone": { "baseUrl": "http://localhost:8080" }
            },
            "github.copilot.chat.customOAIModels.disabled": {
                "gone": { "baseUrl": "http://elsewhere:9999" }
            }
        }"#);
        let state = settings.registry_state(HOST).unwrap();
        let result =
            reconcile(&state, &crate::catalog::RemoteCatalog::from_ids(["other"]), false);

        let err = settings.apply_result(&result).unwrap_err();

        assert!(matches!(err, SyncError::Config(message) if message.contains("gone")));
    }

    #[test]
    fn no_empty_section_is_created() {
        let mut settings = doc(r#"{
            "github.copilot.chat.customOAIModels": {
                "here": { "baseUrl": "http://localhost:8080" }
            }
        }"#);
        let state = settings.registry_state(HOST).unwrap();
        let result = reconcile(&state, &crate::catalog::RemoteCatalog::from_ids(["here"]), false);
        settings.apply_result(&result).unwrap();
        assert!(settings.get(DISABLED_KEY).is_none());
    }

    #[test]
    fn to_json_string_uses_editor_indentation() {
        let settings = doc(r#"{ "a": { "b": 1 } }"#);
        let out = settings.to_json_string();
        assert!(out.contains("\n    \"a\""));
        assert!(out.contains("\n        \"b\""));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn save_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = doc(r#"{ "editor.fontSize": 14, "a": [1, 2] }"#);

        settings.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, settings.to_json_string());
        assert!(!path.with_extension("json.tmp").exists(), "tmp file cleaned up");
        assert_eq!(SettingsDocument::load(&path).unwrap(), settings);
    }
}
