//! Main deobfuscation engine.
//!
//! The [`DeobfuscationEngine`] is the main entry point for deobfuscating a script. It
//! parses the source once, runs the fixed pass schedule over the tree and prints the
//! result.

use std::time::Instant;

use crate::{
    deobfuscation::{
        config::EngineConfig,
        context::{EquivalenceCache, PassContext},
        events::{EventKind, EventLog},
        pass::Pass,
        passes::{
            Base64DecodePass, BinaryFoldingPass, CharCodePass, ConcatFoldingPass,
            EncryptedTablePass, GlobalAliasPass, IfNormalizationPass, LogicalFoldingPass,
            MemberNormalizationPass, OpaquePredicatePass, SmallFunctionFoldingPass,
            StaticBranchPass, StaticMathPass, SwitchUnflatteningPass, UnescapeStringsPass,
            WildNumbersPass,
        },
        result::{DeobfuscationResult, PassStats},
    },
    sandbox::{BoaSandbox, Evaluator},
    syntax::{parse, Ast, Printer},
    Result,
};

/// Main deobfuscation engine.
///
/// The schedule is built once in the constructor from the configuration's pass groups:
///
/// 1. **Decoders**: unescape, small helpers, char codes, concatenation, base64 and
///    encrypted tables, small helpers again
/// 2. **Members**: global aliases, computed to static access
/// 3. **Arithmetic**: static math, opaque predicates, binary expressions
/// 4. **Control flow**: static branches twice, switch unflattening
/// 5. **Cleanup**: comma noise, logical short circuits, `if` normalisation
///
/// A pass that fails with a recoverable error is recorded and skipped. A fatal error
/// aborts the run.
///
/// # Example
///
/// ```rust
/// use jsdeob::deobfuscation::{DeobfuscationEngine, EngineConfig};
///
/// let engine = DeobfuscationEngine::new(EngineConfig::default().with_indent(4));
/// let (code, result) = engine.process("if (!0) { f(); } else { g(); }")?;
/// assert_eq!(code, "f();\n");
/// assert!(result.rewrites() > 0);
/// # Ok::<(), jsdeob::Error>(())
/// ```
pub struct DeobfuscationEngine {
    /// Configuration.
    config: EngineConfig,
    /// Sandbox handed to every pass.
    sandbox: Box<dyn Evaluator>,
    /// Scheduled passes, in execution order.
    passes: Vec<Box<dyn Pass>>,
}

impl Default for DeobfuscationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl DeobfuscationEngine {
    /// Creates a new engine with a `boa_engine` sandbox limited by `config.sandbox`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let sandbox = Box::new(BoaSandbox::new(config.sandbox));
        Self::with_evaluator(config, sandbox)
    }

    /// Creates a new engine with a custom evaluator.
    #[must_use]
    pub fn with_evaluator(config: EngineConfig, sandbox: Box<dyn Evaluator>) -> Self {
        let passes = Self::schedule(&config);
        Self {
            config,
            sandbox,
            passes,
        }
    }

    /// Builds the pass schedule for `config`.
    fn schedule(config: &EngineConfig) -> Vec<Box<dyn Pass>> {
        let strings = config.enable_string_decoding;
        let arithmetic = config.enable_arithmetic_folding;
        let members = config.enable_member_cleanup;
        let mut passes: Vec<Box<dyn Pass>> = Vec::new();
        let mut push = |enabled: bool, pass: Box<dyn Pass>| {
            if enabled {
                passes.push(pass);
            }
        };

        push(strings, Box::new(UnescapeStringsPass::new()));
        push(arithmetic, Box::new(SmallFunctionFoldingPass::new()));
        push(strings, Box::new(CharCodePass::new()));
        push(strings, Box::new(ConcatFoldingPass::new()));
        push(strings, Box::new(Base64DecodePass::new()));
        push(strings, Box::new(EncryptedTablePass::new()));
        push(arithmetic, Box::new(SmallFunctionFoldingPass::new()));
        push(members, Box::new(GlobalAliasPass::new()));
        push(members, Box::new(MemberNormalizationPass::new()));
        push(arithmetic, Box::new(StaticMathPass::new()));
        push(config.enable_opaque_predicates, Box::new(OpaquePredicatePass::new()));
        push(arithmetic, Box::new(BinaryFoldingPass::new()));
        push(config.enable_control_flow, Box::new(StaticBranchPass::new()));
        push(config.enable_control_flow, Box::new(StaticBranchPass::new()));
        push(config.enable_unflattening, Box::new(SwitchUnflatteningPass::new()));
        push(config.enable_cosmetic_cleanup, Box::new(WildNumbersPass::new()));
        push(config.enable_cosmetic_cleanup, Box::new(LogicalFoldingPass::new()));
        push(config.enable_cosmetic_cleanup, Box::new(IfNormalizationPass::new()));
        passes
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Names of the scheduled passes, in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Deobfuscates `source` and prints the result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Parse`] if the source cannot be parsed, or the fatal error
    /// that aborted the run.
    pub fn process(&self, source: &str) -> Result<(String, DeobfuscationResult)> {
        let mut ast = parse(source)?;
        let result = self.process_ast(&mut ast)?;
        let code = Printer::new(&ast).with_indent(self.config.indent).print();
        Ok((code, result))
    }

    /// Runs the pass schedule over an already parsed tree.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by a pass. Recoverable pass errors are recorded
    /// in the result instead.
    pub fn process_ast(&self, ast: &mut Ast) -> Result<DeobfuscationResult> {
        let start = Instant::now();
        let events = EventLog::new();
        let mut equivalences = EquivalenceCache::new();
        let mut stats = Vec::with_capacity(self.passes.len());

        {
            let mut ctx = PassContext::new(
                &self.config,
                self.sandbox.as_ref(),
                &events,
                &mut equivalences,
            );
            for pass in &self.passes {
                ctx.enter(pass.name());
                let pass_start = Instant::now();
                let outcome = pass.run(ast, &mut ctx);
                let elapsed = pass_start.elapsed();

                match outcome {
                    Ok(rewrites) => {
                        log::debug!("{}: {} rewrites in {:.2?}", pass.name(), rewrites, elapsed);
                        ctx.record(EventKind::PassCompleted)
                            .message(format!("{rewrites} rewrites"));
                        stats.push(PassStats {
                            name: pass.name(),
                            rewrites,
                            elapsed,
                            error: None,
                        });
                    }
                    Err(error) if error.is_fatal() => {
                        log::error!("{} aborted the run: {}", pass.name(), error);
                        ctx.record(EventKind::Error).message(error.to_string());
                        return Err(error);
                    }
                    Err(error) => {
                        log::warn!("{} failed, skipping: {}", pass.name(), error);
                        ctx.record(EventKind::Error).message(error.to_string());
                        stats.push(PassStats {
                            name: pass.name(),
                            rewrites: 0,
                            elapsed,
                            error: Some(error.to_string()),
                        });
                    }
                }
            }
        }

        if !equivalences.is_empty() {
            log::debug!(
                "{} lookup table(s) classified, {} cache hit(s)",
                equivalences.len(),
                equivalences.hits()
            );
        }
        let result = DeobfuscationResult::new(events, stats).with_timing(start.elapsed());
        log::info!("{}", result.summary());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sandbox::SandboxValue, test::ScriptedEvaluator, Error};

    #[test]
    fn test_default_schedule_order() {
        let engine = DeobfuscationEngine::default();
        assert_eq!(
            engine.pass_names(),
            [
                "unescape-strings",
                "small-functions",
                "char-codes",
                "concat",
                "base64",
                "encrypted-table",
                "small-functions",
                "global-alias",
                "members",
                "static-math",
                "opaque-predicates",
                "binary",
                "static-branches",
                "static-branches",
                "unflatten",
                "wild-numbers",
                "logical",
                "if-normalize",
            ]
        );
    }

    #[test]
    fn test_disabled_groups_are_not_scheduled() {
        let engine = DeobfuscationEngine::new(EngineConfig::minimal());
        assert_eq!(
            engine.pass_names(),
            ["unescape-strings", "char-codes", "concat", "base64", "encrypted-table"]
        );

        let config = EngineConfig::default()
            .with_unflattening(false)
            .with_opaque_predicates(false);
        let names = DeobfuscationEngine::new(config).pass_names();
        assert!(!names.contains(&"unflatten"));
        assert!(!names.contains(&"opaque-predicates"));
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn test_result_records_every_pass() {
        let engine = DeobfuscationEngine::default();
        let (code, result) = engine.process("x = 1 + 2;").unwrap();
        assert_eq!(code, "x = 3;\n");
        assert_eq!(result.passes.len(), 18);
        assert_eq!(result.events.count_kind(EventKind::PassCompleted), 18);
        assert_eq!(result.rewrites(), 1);
        assert!(result.passes.iter().all(|pass| pass.error.is_none()));
    }

    #[test]
    fn test_fatal_error_aborts() {
        let engine = DeobfuscationEngine::default();
        match engine.process("x = 1 in 2;") {
            Err(Error::UnsupportedOperator(operator)) => assert_eq!(operator, "in"),
            other => panic!("expected a fatal error, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_evaluator_and_indent() {
        let sandbox = ScriptedEvaluator::new(SandboxValue::Undefined);
        let config = EngineConfig::default().with_indent(4);
        let engine = DeobfuscationEngine::with_evaluator(config, Box::new(sandbox));
        let (code, _) = engine.process("function f() { return g(); }").unwrap();
        assert_eq!(code, "function f() {\n    return g();\n}\n");
    }

    #[test]
    fn test_parse_error_is_returned() {
        let engine = DeobfuscationEngine::default();
        assert!(matches!(engine.process("var = ;"), Err(Error::Parse { .. })));
    }
}
