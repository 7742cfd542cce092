//! Member access and comma-noise cleanup.
//!
//! - [`GlobalAliasPass`] resolves aliases of the global object: `var w = window; w.foo()`
//!   becomes `foo()`.
//! - [`MemberNormalizationPass`] rewrites `obj["key"]` and `obj[["key"]]` to `obj.key`.
//! - [`WildNumbersPass`] strips numeric literals the bundler sprinkles into comma
//!   sequences.

use crate::{
    deobfuscation::{
        context::PassContext,
        events::EventKind,
        pass::Pass,
        passes::utils::{member_property_name, remove_declarator, remove_statement, static_member_key},
    },
    syntax::{is_identifier_name, is_valid_identifier, Ast, NodeId, NodeKind, ScopeTree},
    Result,
};

/// Resolves member access through aliases of the global object.
///
/// # Transformed Patterns
///
/// ```text
/// var w = window;
/// w.foo();              →   foo();
/// w["bar"] = 1;         →   bar = 1;
/// x = w;                →   x = "window";
/// ```
///
/// A property is resolved to a bare identifier only if it is a valid identifier that no
/// local binding shadows at the access site. Every other reference is replaced by the
/// global's name as a string, after which the alias declarator is removed.
pub struct GlobalAliasPass;

impl Default for GlobalAliasPass {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalAliasPass {
    /// Creates a new global alias pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the global name `reference` can be resolved to, if it is the object of a
    /// static member access.
    fn resolved_global(ast: &Ast, scopes: &ScopeTree, reference: NodeId) -> Option<String> {
        let member = ast.parent(reference)?;
        let NodeKind::Member { object, .. } = ast.kind(member) else {
            return None;
        };
        if *object != reference {
            return None;
        }
        let name = member_property_name(ast, member)?;
        if !is_valid_identifier(name) {
            return None;
        }
        let scope = scopes.scope_of_ident(reference)?;
        scopes
            .lookup(scope, name)
            .is_none()
            .then(|| name.to_string())
    }
}

impl Pass for GlobalAliasPass {
    fn name(&self) -> &'static str {
        "global-alias"
    }

    fn description(&self) -> &'static str {
        "Resolves member access through aliases of the global object"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let global = ctx.config.global_object.clone();
        let scopes = ScopeTree::build(ast);
        let mut changed = 0;

        for (id, binding) in scopes.bindings() {
            let declarator = binding.declaration;
            let NodeKind::VariableDeclarator {
                init: Some(init), ..
            } = ast.kind(declarator)
            else {
                continue;
            };
            let aliases_global = ast.kind(*init).as_ident() == Some(global.as_str())
                && scopes.resolve(*init).is_none();
            if !aliases_global || !scopes.is_constant(id) {
                continue;
            }

            for reference in &binding.references {
                if let Some(name) = Self::resolved_global(ast, &scopes, *reference) {
                    let Some(member) = ast.parent(*reference) else {
                        continue;
                    };
                    ctx.rewrite(
                        EventKind::MemberNormalized,
                        ast.span(member),
                        format!("{}.{name} -> {name}", binding.name),
                    );
                    ast.replace(member, NodeKind::ident(name));
                } else {
                    ctx.rewrite(
                        EventKind::MemberNormalized,
                        ast.span(*reference),
                        format!("{} -> \"{global}\"", binding.name),
                    );
                    ast.replace(*reference, NodeKind::string(global.clone()));
                }
                changed += 1;
            }

            if remove_declarator(ast, declarator) {
                ctx.rewrite(
                    EventKind::ArtifactRemoved,
                    ast.span(declarator),
                    format!("removed alias '{}' of {global}", binding.name),
                );
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// Rewrites computed member access with a constant key to dot access.
pub struct MemberNormalizationPass;

impl Default for MemberNormalizationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberNormalizationPass {
    /// Creates a new member normalisation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Pass for MemberNormalizationPass {
    fn name(&self) -> &'static str {
        "members"
    }

    fn description(&self) -> &'static str {
        "Rewrites obj[\"key\"] and obj[[\"key\"]] to obj.key"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let mut changed = 0;
        for id in ast.live_nodes() {
            let NodeKind::Member {
                object,
                property,
                computed: true,
            } = *ast.kind(id)
            else {
                continue;
            };
            let Some(key) = static_member_key(ast, property, true) else {
                continue;
            };
            if !is_identifier_name(key) {
                continue;
            }
            let key = key.to_string();
            ctx.rewrite(
                EventKind::MemberNormalized,
                ast.span(id),
                format!("[\"{key}\"] -> .{key}"),
            );
            let property = ast.ident(key, ast.span(property));
            ast.replace(
                id,
                NodeKind::Member {
                    object,
                    property,
                    computed: false,
                },
            );
            changed += 1;
        }
        Ok(changed)
    }
}

/// Strips numeric literals from comma sequences.
///
/// In statement position every numeric element is dropped and an emptied statement is
/// removed. In value position the final element is the value of the sequence and stays.
/// `(0, obj.method)(..)` is left intact, since unwrapping it would change `this`.
pub struct WildNumbersPass;

impl Default for WildNumbersPass {
    fn default() -> Self {
        Self::new()
    }
}

impl WildNumbersPass {
    /// Creates a new wild numbers pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn is_numeric_literal(ast: &Ast, id: NodeId) -> bool {
        matches!(ast.kind(id), NodeKind::NumericLiteral { .. })
    }

    /// Returns the statement whose whole expression is `sequence`.
    fn owning_statement(ast: &Ast, sequence: NodeId) -> Option<NodeId> {
        let parent = ast.parent(sequence)?;
        match ast.kind(parent) {
            NodeKind::ExpressionStatement { expression } if *expression == sequence => {
                Some(parent)
            }
            _ => None,
        }
    }

    /// Returns true if `sequence` is the callee of a call and ends in a member access.
    fn is_unbound_call(ast: &Ast, sequence: NodeId, last: NodeId) -> bool {
        let callee_of_call = ast.parent(sequence).is_some_and(|parent| {
            matches!(ast.kind(parent), NodeKind::Call { callee, .. } if *callee == sequence)
        });
        callee_of_call && matches!(ast.kind(last), NodeKind::Member { .. })
    }
}

impl Pass for WildNumbersPass {
    fn name(&self) -> &'static str {
        "wild-numbers"
    }

    fn description(&self) -> &'static str {
        "Strips numeric literals from comma sequences"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let sequences = ast.find_all(ast.root(), |kind| matches!(kind, NodeKind::Sequence { .. }));
        let mut changed = 0;

        for id in sequences.into_iter().rev() {
            let NodeKind::Sequence { expressions } = ast.kind(id) else {
                continue;
            };
            let Some((&last, rest)) = expressions.split_last() else {
                continue;
            };
            let statement = Self::owning_statement(ast, id);

            let kept: Vec<NodeId> = match statement {
                Some(_) => expressions
                    .iter()
                    .copied()
                    .filter(|e| !Self::is_numeric_literal(ast, *e))
                    .collect(),
                None => {
                    let mut kept: Vec<NodeId> = rest
                        .iter()
                        .copied()
                        .filter(|e| !Self::is_numeric_literal(ast, *e))
                        .collect();
                    if kept.is_empty() && Self::is_unbound_call(ast, id, last) {
                        continue;
                    }
                    kept.push(last);
                    kept
                }
            };
            let dropped = expressions.len() - kept.len();
            if dropped == 0 {
                continue;
            }

            ctx.rewrite(
                EventKind::NoiseRemoved,
                ast.span(id),
                format!("dropped {dropped} numeric literal(s) from a sequence"),
            );
            match (kept.as_slice(), statement) {
                ([], Some(statement)) => {
                    remove_statement(ast, statement);
                }
                ([only], _) => ast.replace_with(id, *only),
                _ => ast.replace(id, NodeKind::Sequence { expressions: kept }),
            }
            changed += 1;
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
    fn test_global_alias_resolution() {
        let source = r#"
            var w = window;
            w.foo();
            w["bar"] = 1;
            x = w;
            function f(foo) {
                return w.foo;
            }
            y = w["not valid"];
        "#;
        let run = run_pass(&GlobalAliasPass::new(), source);
        assert_eq!(
            run.output,
            "foo();\nbar = 1;\nx = \"window\";\nfunction f(foo) {\n  return \"window\".foo;\n}\ny = \"window\"[\"not valid\"];\n"
        );
        assert_eq!(run.events.count_kind(EventKind::ArtifactRemoved), 1);
    }

    #[test]
    fn test_configured_global_object() {
        let config = EngineConfig::default().with_global_object("self");
        let run = run_pass_with(
            &GlobalAliasPass::new(),
            "var g = self, w = window; g.postMessage(1); w.alert(2);",
            &config,
            &BoaSandbox::default(),
        );
        assert_eq!(run.output, "var w = window;\npostMessage(1);\nw.alert(2);\n");
    }

    #[test]
    fn test_shadowed_global_is_not_an_alias() {
        let source = "function f(window) { var w = window; return w.x; }";
        let run = run_pass(&GlobalAliasPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }

    #[test]
    fn test_member_normalization() {
        let source = "a['b'] = c[['d']]; e['1x'] = f['default']; g[h] = 1[\"toString\"];";
        let run = run_pass(&MemberNormalizationPass::new(), source);
        assert_eq!(
            run.output,
            "a.b = c.d;\ne[\"1x\"] = f.default;\ng[h] = (1).toString;\n"
        );
        assert_eq!(run.rewrites, 4);
    }

    #[test]
    fn test_wild_numbers() {
        let source = "1, 2, f(), 3; 4, 5; x = (0, 7, y); z = (1, g(), 2);";
        let run = run_pass(&WildNumbersPass::new(), source);
        assert_eq!(run.output, "f();\nx = y;\nz = (g(), 2);\n");
        assert_eq!(run.rewrites, 4);
    }

    #[test]
    fn test_wild_numbers_keeps_unbound_calls() {
        let run = run_pass(&WildNumbersPass::new(), "(0, a.b)(1); (0, c)(2);");
        assert_eq!(run.output, "(0, a.b)(1);\nc(2);\n");
    }
}
