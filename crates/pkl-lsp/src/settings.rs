//! Server settings, read from the client's initialization options.

use anyhow::{Context, Result};
use pkl_checker::AnalyzerOptions;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    #[serde(default)]
    pub analyzers: AnalyzerSettings,
    /// Worker threads for whole-workspace analysis. `None` leaves the
    /// choice to rayon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
    /// Filter directive applied when the environment sets none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerSettings {
    #[serde(default = "enabled")]
    pub type_check: bool,
    #[serde(default = "enabled")]
    pub unresolved_reference: bool,
    #[serde(default = "enabled")]
    pub modifiers: bool,
}

fn enabled() -> bool {
    true
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            type_check: true,
            unresolved_reference: true,
            modifiers: true,
        }
    }
}

impl ServerSettings {
    /// Parse settings from the JSON initialization options. `null` yields
    /// the defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(source).context("initialization options are not valid JSON")?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).context("failed to parse server settings")
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            type_check: self.analyzers.type_check,
            unresolved_reference: self.analyzers.unresolved_reference,
            modifiers: self.analyzers.modifiers,
        }
    }
}

#[cfg(test)]
#[path = "../tests/settings_tests.rs"]
mod tests;
