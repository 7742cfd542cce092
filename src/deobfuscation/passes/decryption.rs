//! Encrypted string and number table decoding.
//!
//! The second table layer keeps numbers, `null`, booleans and encrypted strings in one
//! array. Every constant is read back through a decoder whose body is a short
//! character-substitution routine:
//!
//! ```text
//! var p = ["Ifmmp", 7, -3, null, !0];
//! function d(i) {
//!   var s = p[i];
//!   if (typeof s !== "string") return s;
//!   return s.replace(/[a-z]/gi, function (c) { ... String.fromCharCode(...) ... });
//! }
//! ```
//!
//! # Flow
//!
//! 1. Detection: a decoder has at most three top-level statements, mentions
//!    `fromCharCode`, `charAt`, `string` and `replace`, and indexes a never-reassigned
//!    array literal by its first parameter.
//! 2. Direct slots: numeric literals, negated numeric literals, `null` and `!N` are
//!    substituted without evaluation (`!N` becomes the boolean `N == 0`).
//! 3. String slots: the array declaration and the decoder are evaluated together in the
//!    sandbox, once for the whole table. Every distinct index is decoded inside its own
//!    `try`/`catch`, and the result is substituted at every call sharing the index.
//! 4. Cleanup: the decoder and table are removed under the same rule as the base64
//!    tables.

use std::{collections::BTreeMap, fmt::Write};

use crate::{
    deobfuscation::{
        context::PassContext,
        events::EventKind,
        pass::Pass,
        passes::utils::{
            function_body, function_name, indexed_calls, references_within, remove_table_decoder,
            resolve_array, ArrayTable,
        },
    },
    numeric::{synthesize, Primitive},
    sandbox::SandboxValue,
    syntax::{print_node, quote_string, Ast, NodeId, NodeKind, ScopeTree, UnaryOp},
    Result,
};

/// Maximum number of top-level statements in a decoder body.
const MAX_DECODER_STATEMENTS: usize = 3;

/// Names every decoder of this layer mentions.
const DECODER_MARKERS: [&str; 4] = ["fromCharCode", "charAt", "string", "replace"];

/// A table slot that can be substituted without running the decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DirectSlot {
    Number(f64),
    Null,
    Bool(bool),
}

/// Decodes encrypted string and number tables.
pub struct EncryptedTablePass;

impl Default for EncryptedTablePass {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptedTablePass {
    /// Creates a new encrypted table pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the table if `function` matches the decoder shape.
    fn decoder_table(ast: &Ast, scopes: &ScopeTree, function: NodeId) -> Option<ArrayTable> {
        if function_body(ast, function)?.len() > MAX_DECODER_STATEMENTS {
            return None;
        }
        let func = ast.kind(function).as_function()?;
        let index_param = ast.kind(*func.params.first()?).as_ident()?;

        let nodes = ast.preorder(function);
        let mentions = |marker: &str| {
            nodes.iter().any(|id| match ast.kind(*id) {
                NodeKind::Identifier { name } => name == marker,
                NodeKind::StringLiteral { value, .. } => value == marker,
                _ => false,
            })
        };
        if !DECODER_MARKERS.iter().all(|marker| mentions(marker)) {
            return None;
        }

        let object = nodes.iter().find_map(|id| match ast.kind(*id) {
            NodeKind::Member {
                object,
                property,
                computed: true,
            } if ast.kind(*object).as_ident().is_some()
                && ast.kind(*property).as_ident() == Some(index_param) =>
            {
                Some(*object)
            }
            _ => None,
        })?;
        resolve_array(ast, scopes, object)
    }

    /// Classifies a slot that needs no evaluation.
    fn direct_slot(ast: &Ast, element: NodeId) -> Option<DirectSlot> {
        match ast.kind(element) {
            NodeKind::NumericLiteral { value } => Some(DirectSlot::Number(*value)),
            NodeKind::NullLiteral => Some(DirectSlot::Null),
            NodeKind::Unary { operator, argument } => {
                let NodeKind::NumericLiteral { value } = ast.kind(*argument) else {
                    return None;
                };
                match operator {
                    UnaryOp::Minus => Some(DirectSlot::Number(-value)),
                    UnaryOp::Not => Some(DirectSlot::Bool(*value == 0.0)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Builds the sandbox snippet decoding `indices`, one `try` per index.
    fn snippet(ast: &Ast, function: NodeId, table: &ArrayTable, name: &str, indices: &[usize]) -> String {
        let mut source = format!(
            "var {};\n{}\n",
            print_node(ast, table.declarator),
            print_node(ast, function)
        );
        let list: Vec<String> = indices.iter().map(usize::to_string).collect();
        let _ = write!(
            source,
            "(function (indices) {{\n  var out = [];\n  for (var k = 0; k < indices.length; k++) {{\n    try {{\n      out.push({name}(indices[k]));\n    }} catch (e) {{\n      out.push(undefined);\n    }}\n  }}\n  return out;\n}})([{}]);\n",
            list.join(", ")
        );
        source
    }
}

impl Pass for EncryptedTablePass {
    fn name(&self) -> &'static str {
        "encrypted-table"
    }

    fn description(&self) -> &'static str {
        "Decodes encrypted string and number tables through the sandbox"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let scopes = ScopeTree::build(ast);
        let candidates: Vec<(NodeId, ArrayTable)> = ast
            .find_all(ast.root(), |kind| matches!(kind, NodeKind::FunctionDeclaration(_)))
            .into_iter()
            .filter_map(|function| {
                Self::decoder_table(ast, &scopes, function).map(|table| (function, table))
            })
            .collect();

        let mut changed = 0;
        for (function, table) in candidates {
            let Some(decoder) = ast
                .kind(function)
                .as_function()
                .and_then(|func| func.id)
                .and_then(|name_site| scopes.resolve(name_site))
            else {
                continue;
            };
            let name = function_name(ast, function).unwrap_or_default().to_string();
            ctx.record(EventKind::DecoderIdentified)
                .location(ast.span(function))
                .message(format!(
                    "'{name}' decrypts a table of {} entries",
                    table.elements.len()
                ));
            let table_local = references_within(ast, &scopes, table.binding, function);

            // Direct slots are substituted immediately; string slots are grouped by index.
            let mut encrypted: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
            for (call, index) in indexed_calls(ast, &scopes, decoder, ctx) {
                let Some(element) = table.elements.get(index).copied().flatten() else {
                    ctx.warn(ast.span(call), format!("{name}({index}) is out of range"));
                    continue;
                };
                if ast.kind(element).as_string().is_some() {
                    encrypted.entry(index).or_default().push(call);
                    continue;
                }
                let span = ast.span(call);
                match Self::direct_slot(ast, element) {
                    Some(DirectSlot::Number(value)) => {
                        let literal = synthesize(ast, Primitive::Number(value), span);
                        ast.replace_with(call, literal);
                    }
                    Some(DirectSlot::Null) => ast.replace(call, NodeKind::NullLiteral),
                    Some(DirectSlot::Bool(value)) => {
                        ast.replace(call, NodeKind::BooleanLiteral { value });
                    }
                    None => {
                        ctx.warn(
                            span,
                            format!(
                                "{name}({index}) holds an unexpected {}",
                                ast.kind(element).type_name()
                            ),
                        );
                        continue;
                    }
                }
                ctx.rewrite(
                    EventKind::ConstantDecoded,
                    span,
                    format!("{name}({index}) -> {}", print_node(ast, call)),
                );
                changed += 1;
            }

            if !encrypted.is_empty() {
                let indices: Vec<usize> = encrypted.keys().copied().collect();
                let source = Self::snippet(ast, function, &table, &name, &indices);
                match ctx.sandbox.evaluate(&source) {
                    Ok(SandboxValue::Array(results)) => {
                        for (index, result) in indices.iter().zip(results) {
                            let calls = &encrypted[index];
                            let SandboxValue::String(decoded) = result else {
                                ctx.warn(
                                    ast.span(calls[0]),
                                    format!("{name}({index}) evaluated to {result}"),
                                );
                                continue;
                            };
                            for call in calls {
                                ctx.rewrite(
                                    EventKind::StringDecoded,
                                    ast.span(*call),
                                    format!("{name}({index}) -> {}", quote_string(&decoded)),
                                );
                                ast.replace(*call, NodeKind::string(decoded.clone()));
                                changed += 1;
                            }
                        }
                    }
                    Ok(other) => ctx.warn(
                        ast.span(function),
                        format!("decoding '{name}' returned {}", other.type_name()),
                    ),
                    Err(err) => {
                        ctx.warn(ast.span(function), format!("decoding '{name}' failed: {err}"));
                    }
                }
            }

            changed += remove_table_decoder(ast, ctx, function, &table, table_local);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deobfuscation::EngineConfig,
        test::{run_pass, run_pass_with, ScriptedEvaluator},
    };

    const DECODER: &str = r#"
        var p = ["Ifmmp", 7, -3, null, !0, !1, "Cze"];
        function d(i) {
            var s = p[i];
            if (typeof s !== "string") return s;
            return s.replace(/[a-z]/gi, function (c) {
                return String.fromCharCode(c.charCodeAt(0) - 1);
            }) + s.charAt(-1);
        }
    "#;

    #[test]
    fn test_decodes_every_slot_kind() {
        let source = format!(
            "{DECODER} a = d(0); b = d(1); c = d(2); e = d(3); f = d(4); g = d(5); h = d(0) + d(6);"
        );
        let run = run_pass(&EncryptedTablePass::new(), &source);
        assert_eq!(
            run.output,
            "a = \"Hello\";\nb = 7;\nc = -3;\ne = null;\nf = true;\ng = false;\nh = \"Hello\" + \"Byd\";\n"
        );
        assert_eq!(run.events.count_kind(EventKind::StringDecoded), 3);
        assert_eq!(run.events.count_kind(EventKind::ConstantDecoded), 5);
        assert_eq!(run.events.count_kind(EventKind::ArtifactRemoved), 2);
    }

    #[test]
    fn test_sandbox_failure_keeps_string_calls() {
        let source = format!("{DECODER} a = d(0); b = d(1);");
        let sandbox = ScriptedEvaluator::failing();
        let run = run_pass_with(
            &EncryptedTablePass::new(),
            &source,
            &EngineConfig::default(),
            &sandbox,
        );
        assert_eq!(sandbox.calls.get(), 1);
        assert!(run.output.contains("a = d(0);"));
        assert!(run.output.contains("b = 7;"));
        assert!(run.output.contains("function d(i)"));
        assert_eq!(run.events.warnings().count(), 1);
    }

    #[test]
    fn test_snippet_is_seeded_with_table_and_decoder_only() {
        let source = format!("var unrelated = 1; {DECODER} a = d(0); b = d(0);");
        let sandbox = ScriptedEvaluator::new(SandboxValue::Array(vec![SandboxValue::String(
            "Hello".to_string(),
        )]));
        let run = run_pass_with(
            &EncryptedTablePass::new(),
            &source,
            &EngineConfig::default(),
            &sandbox,
        );
        let sources = sandbox.sources.borrow();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].starts_with("var p = ["));
        assert!(sources[0].contains("function d(i)"));
        assert!(sources[0].contains("([0]);"));
        assert!(!sources[0].contains("unrelated"));
        assert!(run.output.contains("a = \"Hello\";\nb = \"Hello\";"));
    }

    #[test]
    fn test_requires_all_markers() {
        let source = "var p = ['x']; function d(i) { return p[i].replace('a', 'b'); } a = d(0);";
        let run = run_pass(&EncryptedTablePass::new(), source);
        assert_eq!(run.rewrites, 0);
    }
}
