//! Engine configuration

use serde::{Deserialize, Serialize};

/// How drafts intercept reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptionMode {
    /// Built-in object and array facades
    #[default]
    Native,
    /// Route draft creation, pre-finalize and change marking through the
    /// compatibility shim plugin
    Compat,
}

/// Producer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Freeze committed results
    pub auto_freeze: bool,
    /// Interception strategy
    pub interception: InterceptionMode,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With auto-freeze on or off
    #[inline]
    #[must_use]
    pub fn with_auto_freeze(mut self, auto_freeze: bool) -> Self {
        self.auto_freeze = auto_freeze;
        self
    }

    /// With interception mode
    #[inline]
    #[must_use]
    pub fn with_interception(mut self, interception: InterceptionMode) -> Self {
        self.interception = interception;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_freeze: true,
            interception: InterceptionMode::Native,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::new();
        assert!(config.auto_freeze);
        assert_eq!(config.interception, InterceptionMode::Native);
    }

    #[test]
    fn builders() {
        let config = EngineConfig::new()
            .with_auto_freeze(false)
            .with_interception(InterceptionMode::Compat);
        assert!(!config.auto_freeze);
        assert_eq!(config.interception, InterceptionMode::Compat);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: EngineConfig = serde_json::from_str(r#"{"interception":"compat"}"#).unwrap();
        assert!(config.auto_freeze);
        assert_eq!(config.interception, InterceptionMode::Compat);
    }
}
