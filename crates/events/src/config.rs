//! Emitter configuration.

use serde::{Deserialize, Serialize};

/// How the `once` field of the shared event record behaves during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnceSemantics {
    /// Each handler sees `once == true` only if it was itself registered as
    /// one-shot, and only one-shot handlers are removed after the pass.
    #[default]
    PerHandler,
    /// Legacy behaviour: the flag is sticky for the rest of the pass, so every
    /// handler invoked after a one-shot handler sees `once == true` and is
    /// removed as well.
    SharedRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Name for logging
    pub name: String,
    pub once_semantics: OnceSemantics,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            name: "emitter".to_string(),
            once_semantics: OnceSemantics::default(),
        }
    }
}

impl EmitterConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_once_semantics(mut self, once_semantics: OnceSemantics) -> Self {
        self.once_semantics = once_semantics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_per_handler_once() {
        let config = EmitterConfig::default();
        assert_eq!(config.name, "emitter");
        assert_eq!(config.once_semantics, OnceSemantics::PerHandler);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EmitterConfig =
            serde_json::from_str(r#"{ "once_semantics": "shared_record" }"#).unwrap();
        assert_eq!(config.name, "emitter");
        assert_eq!(config.once_semantics, OnceSemantics::SharedRecord);
    }
}
