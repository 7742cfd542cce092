//! Configuration for the deobfuscation engine.
//!
//! This module provides [`EngineConfig`], which selects the pass groups that are scheduled,
//! names the globals the bundler relies on and sets the sandbox limits.

use crate::sandbox::SandboxConfig;

/// Configuration for the deobfuscation engine.
///
/// Every pass group is enabled by default. A disabled group is simply not scheduled; the
/// relative order of the remaining passes never changes.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Runtime limits for sandboxed evaluation.
    pub sandbox: SandboxConfig,

    /// Identifier of the global object aliased by the bundler (default: `window`).
    pub global_object: String,

    /// Name of the base64 decoding primitive (default: `atob`).
    pub base64_primitive: String,

    /// Unescape strings, resolve char codes, fold concatenation, decode base64 and
    /// encrypted tables.
    pub enable_string_decoding: bool,

    /// Fold small arithmetic functions, static math calls and binary expressions.
    pub enable_arithmetic_folding: bool,

    /// Resolve global aliases and normalise computed member access.
    pub enable_member_cleanup: bool,

    /// Replace lookup-table opaque predicates with their equivalence class.
    pub enable_opaque_predicates: bool,

    /// Eliminate static branches, fold logical short circuits and normalise `if`.
    pub enable_control_flow: bool,

    /// Reverse switch-based control-flow flattening.
    pub enable_unflattening: bool,

    /// Strip numeric noise from comma sequences.
    pub enable_cosmetic_cleanup: bool,

    /// Indentation width of the printed output.
    pub indent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sandbox: SandboxConfig::default(),
            global_object: "window".to_string(),
            base64_primitive: "atob".to_string(),
            enable_string_decoding: true,
            enable_arithmetic_folding: true,
            enable_member_cleanup: true,
            enable_opaque_predicates: true,
            enable_control_flow: true,
            enable_unflattening: true,
            enable_cosmetic_cleanup: true,
            indent: 2,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that only runs the string decoders.
    ///
    /// Useful to inspect the decoded strings before any structural rewrite.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_arithmetic_folding: false,
            enable_member_cleanup: false,
            enable_opaque_predicates: false,
            enable_control_flow: false,
            enable_unflattening: false,
            enable_cosmetic_cleanup: false,
            ..Self::default()
        }
    }

    /// Sets the sandbox limits.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: SandboxConfig) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Sets the loop iteration limit of the sandbox.
    #[must_use]
    pub fn with_loop_limit(mut self, limit: u64) -> Self {
        self.sandbox.loop_iteration_limit = limit;
        self
    }

    /// Sets the global object identifier.
    #[must_use]
    pub fn with_global_object(mut self, name: impl Into<String>) -> Self {
        self.global_object = name.into();
        self
    }

    /// Sets the base64 primitive name.
    #[must_use]
    pub fn with_base64_primitive(mut self, name: impl Into<String>) -> Self {
        self.base64_primitive = name.into();
        self
    }

    /// Enables or disables the string decoders.
    #[must_use]
    pub fn with_string_decoding(mut self, enabled: bool) -> Self {
        self.enable_string_decoding = enabled;
        self
    }

    /// Enables or disables arithmetic folding.
    #[must_use]
    pub fn with_arithmetic_folding(mut self, enabled: bool) -> Self {
        self.enable_arithmetic_folding = enabled;
        self
    }

    /// Enables or disables member cleanup.
    #[must_use]
    pub fn with_member_cleanup(mut self, enabled: bool) -> Self {
        self.enable_member_cleanup = enabled;
        self
    }

    /// Enables or disables opaque predicate removal.
    #[must_use]
    pub fn with_opaque_predicates(mut self, enabled: bool) -> Self {
        self.enable_opaque_predicates = enabled;
        self
    }

    /// Enables or disables control-flow simplification.
    #[must_use]
    pub fn with_control_flow(mut self, enabled: bool) -> Self {
        self.enable_control_flow = enabled;
        self
    }

    /// Enables or disables switch unflattening.
    #[must_use]
    pub fn with_unflattening(mut self, enabled: bool) -> Self {
        self.enable_unflattening = enabled;
        self
    }

    /// Enables or disables cosmetic cleanup.
    #[must_use]
    pub fn with_cosmetic_cleanup(mut self, enabled: bool) -> Self {
        self.enable_cosmetic_cleanup = enabled;
        self
    }

    /// Sets the indentation width of the output.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_everything() {
        let config = EngineConfig::default();
        assert!(config.enable_string_decoding);
        assert!(config.enable_unflattening);
        assert_eq!(config.global_object, "window");
        assert_eq!(config.base64_primitive, "atob");
        assert_eq!(config.indent, 2);
    }

    #[test]
    fn test_minimal_keeps_decoders() {
        let config = EngineConfig::minimal();
        assert!(config.enable_string_decoding);
        assert!(!config.enable_arithmetic_folding);
        assert!(!config.enable_control_flow);
        assert!(!config.enable_cosmetic_cleanup);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_global_object("self")
            .with_loop_limit(10)
            .with_unflattening(false);
        assert_eq!(config.global_object, "self");
        assert_eq!(config.sandbox.loop_iteration_limit, 10);
        assert!(!config.enable_unflattening);
    }
}
