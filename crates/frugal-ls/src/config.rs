//
// config.rs
//
// Workspace configuration
//

use std::path::PathBuf;

use serde::Deserialize;

/// What to do with an incremental edit whose range lies outside the current
/// content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditRecovery {
    /// Fail the whole change batch and leave the document untouched
    #[default]
    Reject,
    /// Replace the whole document with the failing edit's text and continue
    /// with the rest of the batch
    ReplaceDocument,
}

/// How to treat a change whose version is not newer than the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionPolicy {
    /// Apply the change anyway (logged)
    #[default]
    LastWriteWins,
    /// Fail with `StaleVersion`
    RejectStale,
}

/// Workspace configuration
///
/// Read from `initializationOptions` and from the `frugal` section of
/// `workspace/didChangeConfiguration`. Absent fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Fallback directories for resolving includes, tried in order
    pub workspace_roots: Vec<PathBuf>,
    pub edit_recovery: EditRecovery,
    pub version_policy: VersionPolicy,
    /// Result limit for workspace/symbol (0 = unlimited)
    pub max_workspace_symbols: usize,
    /// Capacity of the include resolution cache
    pub include_cache_capacity: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            workspace_roots: Vec::new(),
            edit_recovery: EditRecovery::default(),
            version_policy: VersionPolicy::default(),
            max_workspace_symbols: 256,
            include_cache_capacity: 1024,
        }
    }
}

impl WorkspaceConfig {
    /// Parse a configuration object (the `initializationOptions` shape).
    ///
    /// Returns `None` if the value is not a valid configuration object.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring invalid frugal configuration: {}", e);
                None
            }
        }
    }

    /// Parse the `frugal` section of `workspace/didChangeConfiguration` settings
    pub fn from_settings(settings: &serde_json::Value) -> Option<Self> {
        Self::from_value(settings.get("frugal")?)
    }

    /// Check if the include resolution inputs changed between two configs
    pub fn resolution_settings_changed(&self, other: &Self) -> bool {
        self.workspace_roots != other.workspace_roots
            || self.include_cache_capacity != other.include_cache_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_values() {
        let config = WorkspaceConfig::default();
        assert!(config.workspace_roots.is_empty());
        assert_eq!(config.edit_recovery, EditRecovery::Reject);
        assert_eq!(config.version_policy, VersionPolicy::LastWriteWins);
        assert_eq!(config.max_workspace_symbols, 256);
        assert_eq!(config.include_cache_capacity, 1024);
    }

    #[test]
    fn test_from_value_partial() {
        let config = WorkspaceConfig::from_value(&json!({
            "workspaceRoots": ["/project/idl", "/shared"],
            "editRecovery": "replaceDocument"
        }))
        .unwrap();
        assert_eq!(
            config.workspace_roots,
            vec![PathBuf::from("/project/idl"), PathBuf::from("/shared")]
        );
        assert_eq!(config.edit_recovery, EditRecovery::ReplaceDocument);
        // untouched fields keep defaults
        assert_eq!(config.version_policy, VersionPolicy::LastWriteWins);
        assert_eq!(config.max_workspace_symbols, 256);
    }

    #[test]
    fn test_from_settings_section() {
        let settings = json!({
            "frugal": { "versionPolicy": "rejectStale", "maxWorkspaceSymbols": 0 }
        });
        let config = WorkspaceConfig::from_settings(&settings).unwrap();
        assert_eq!(config.version_policy, VersionPolicy::RejectStale);
        assert_eq!(config.max_workspace_symbols, 0);
    }

    #[test]
    fn test_missing_or_invalid_section() {
        assert!(WorkspaceConfig::from_settings(&json!({ "other": {} })).is_none());
        assert!(WorkspaceConfig::from_value(&serde_json::Value::Null).is_none());
        assert!(WorkspaceConfig::from_value(&json!({ "editRecovery": "explode" })).is_none());
    }

    #[test]
    fn test_resolution_settings_changed() {
        let config1 = WorkspaceConfig::default();
        let mut config2 = WorkspaceConfig::default();
        assert!(!config1.resolution_settings_changed(&config2));

        config2.edit_recovery = EditRecovery::ReplaceDocument;
        assert!(!config1.resolution_settings_changed(&config2));

        config2.workspace_roots.push(PathBuf::from("/shared"));
        assert!(config1.resolution_settings_changed(&config2));
    }
}
