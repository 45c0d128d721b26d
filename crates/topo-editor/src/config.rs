use serde::{Deserialize, Serialize};
use topo_core::LayoutOptions;

/// Knobs for [`EditorStore`](crate::EditorStore) behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Options handed to the layout engine on every pass.
    pub layout: LayoutOptions,
    /// View loaded when `load_view` is called without a name. Default: **"dataflow"**.
    pub default_view: String,
    /// Re-fetch the architecture after a successful apply. Default: **true**.
    pub reload_after_apply: bool,
    /// Re-layout after edits that add or remove elements. Default: **true**.
    pub relayout_on_structural_change: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            default_view: "dataflow".to_owned(),
            reload_after_apply: true,
            relayout_on_structural_change: true,
        }
    }
}

impl EditorConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
