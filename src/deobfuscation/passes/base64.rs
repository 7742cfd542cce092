//! Base64 string table decoding.
//!
//! The bundler moves string constants into an array of base64 strings and routes every
//! use through a small accessor:
//!
//! ```text
//! var t = ["aGVsbG8="];
//! function f(i) { return atob(t[i]); }
//! x = f(0);                               →   x = "hello";
//! ```
//!
//! The decoding itself needs no sandbox: each table entry is decoded with `atob`
//! semantics (forgiving padding, bytes mapped to Latin-1 characters).

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};

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
    syntax::{quote_string, Ast, NodeId, NodeKind, ScopeTree},
    Result,
};

/// Maximum number of statements in an accessor body.
const MAX_ACCESSOR_STATEMENTS: usize = 5;

/// `atob` accepts input with or without padding and ignores non-zero trailing bits.
const ATOB: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes `text` the way `atob` does, returning one character per decoded byte.
#[must_use]
pub fn atob(text: &str) -> Option<String> {
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\n' | '\x0c' | '\r'))
        .collect();
    let bytes = ATOB.decode(compact).ok()?;
    Some(bytes.into_iter().map(char::from).collect())
}

/// Replaces calls of base64 table accessors with the decoded strings.
///
/// # Detection
///
/// A function declaration is an accessor if its body has at most five statements and
/// contains exactly one call of the base64 primitive (one argument) and exactly one
/// `name[name]` access whose object resolves to a never-reassigned array literal.
pub struct Base64DecodePass;

impl Default for Base64DecodePass {
    fn default() -> Self {
        Self::new()
    }
}

impl Base64DecodePass {
    /// Creates a new base64 table pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the table if `function` matches the accessor shape.
    fn accessor_table(
        ast: &Ast,
        scopes: &ScopeTree,
        function: NodeId,
        primitive: &str,
    ) -> Option<ArrayTable> {
        if function_body(ast, function)?.len() > MAX_ACCESSOR_STATEMENTS {
            return None;
        }
        let mut primitive_calls = Vec::new();
        let mut lookups = Vec::new();
        for id in ast.preorder(function) {
            match ast.kind(id) {
                NodeKind::Call { callee, arguments }
                    if ast.kind(*callee).as_ident() == Some(primitive)
                        && scopes.resolve(*callee).is_none() =>
                {
                    primitive_calls.push(arguments.len());
                }
                NodeKind::Member {
                    object,
                    property,
                    computed: true,
                } if ast.kind(*object).as_ident().is_some()
                    && ast.kind(*property).as_ident().is_some() =>
                {
                    lookups.push(*object);
                }
                _ => {}
            }
        }
        match (primitive_calls.as_slice(), lookups.as_slice()) {
            ([1], [object]) => resolve_array(ast, scopes, *object),
            _ => None,
        }
    }
}

impl Pass for Base64DecodePass {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn description(&self) -> &'static str {
        "Decodes strings served from base64 tables"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let primitive = ctx.config.base64_primitive.clone();
        let scopes = ScopeTree::build(ast);
        let candidates: Vec<(NodeId, ArrayTable)> = ast
            .find_all(ast.root(), |kind| matches!(kind, NodeKind::FunctionDeclaration(_)))
            .into_iter()
            .filter_map(|function| {
                Self::accessor_table(ast, &scopes, function, &primitive)
                    .map(|table| (function, table))
            })
            .collect();

        let mut changed = 0;
        for (function, table) in candidates {
            let Some(name_site) = ast.kind(function).as_function().and_then(|func| func.id) else {
                continue;
            };
            let Some(decoder) = scopes.resolve(name_site) else {
                continue;
            };
            let name = function_name(ast, function).unwrap_or_default().to_string();
            ctx.record(EventKind::DecoderIdentified)
                .location(ast.span(function))
                .message(format!(
                    "'{name}' reads a base64 table of {} entries",
                    table.elements.len()
                ));

            let table_local = references_within(ast, &scopes, table.binding, function);
            for (call, index) in indexed_calls(ast, &scopes, decoder, ctx) {
                let element = table.elements.get(index).copied().flatten();
                let Some(encoded) = element.and_then(|element| ast.kind(element).as_string())
                else {
                    ctx.warn(ast.span(call), format!("{name}({index}) is not a string entry"));
                    continue;
                };
                let Some(decoded) = atob(encoded) else {
                    ctx.warn(
                        ast.span(call),
                        format!("{name}({index}) is not valid base64: {}", quote_string(encoded)),
                    );
                    continue;
                };
                ctx.rewrite(
                    EventKind::StringDecoded,
                    ast.span(call),
                    format!("{name}({index}) -> {}", quote_string(&decoded)),
                );
                ast.replace(call, NodeKind::string(decoded));
                changed += 1;
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
        sandbox::BoaSandbox,
        test::{run_pass, run_pass_with},
    };

    #[test]
    fn test_atob_semantics() {
        assert_eq!(atob("aGVsbG8=").as_deref(), Some("hello"));
        assert_eq!(atob("aGVsbG8").as_deref(), Some("hello"));
        assert_eq!(atob(" aGk= \n").as_deref(), Some("hi"));
        assert_eq!(atob("/w==").as_deref(), Some("\u{ff}"));
        assert_eq!(atob("a"), None);
        assert_eq!(atob("a*b="), None);
    }

    #[test]
    fn test_decodes_and_removes_table() {
        let source = r#"
            var t = ["aGVsbG8="];
            function f(i) {
                return atob(t[i]);
            }
            x = f(0);
        "#;
        let run = run_pass(&Base64DecodePass::new(), source);
        assert_eq!(run.output, "x = \"hello\";\n");
        assert_eq!(run.rewrites, 3);
        assert_eq!(run.events.count_kind(EventKind::ArtifactRemoved), 2);
    }

    #[test]
    fn test_bad_entries_keep_decoder() {
        let source = r#"
            var t = ["aGk=", 5];
            function f(i) {
                var s = t[i];
                return atob(s);
            }
            x = f(0);
            y = f(1);
        "#;
        let run = run_pass(&Base64DecodePass::new(), source);
        assert_eq!(run.rewrites, 1);
        assert!(run.output.contains("x = \"hi\";"));
        assert!(run.output.contains("y = f(1);"));
        assert!(run.output.contains("function f(i)"));
        assert_eq!(run.events.warnings().count(), 1);
    }

    #[test]
    fn test_shared_table_is_kept() {
        let source = r#"
            var t = ["aGk="];
            function f(i) { return atob(t[i]); }
            x = f(0);
            y = t.length;
        "#;
        let run = run_pass(&Base64DecodePass::new(), source);
        assert_eq!(run.output, "var t = [\"aGk=\"];\nx = \"hi\";\ny = t.length;\n");
    }

    #[test]
    fn test_configured_primitive() {
        let source = "var t = ['aGk=']; function f(i) { return decode(t[i]); } x = f(0);";
        let config = EngineConfig::default().with_base64_primitive("decode");
        let run = run_pass_with(&Base64DecodePass::new(), source, &config, &BoaSandbox::default());
        assert_eq!(run.output, "x = \"hi\";\n");
    }

    #[test]
    fn test_two_lookups_are_not_an_accessor() {
        let source = "var t = ['aGk=']; function f(i, j) { return atob(t[i]) + t[j]; } x = f(0);";
        let run = run_pass(&Base64DecodePass::new(), source);
        assert_eq!(run.rewrites, 0);
    }
}
