//! Switch-based control-flow unflattening.
//!
//! The bundler flattens straight-line code into a dispatcher loop:
//!
//! ```text
//! var state = 0;
//! for (;;) {
//!   switch (state) {
//!     case 0: x = 1; state = 2; continue;        var state = 0;
//!     case 2: x = 2; break;                →     x = 1;
//!   }                                            x = 2;
//! }
//! ```
//!
//! # Flow
//!
//! 1. Detection: a `switch` whose case tests are all numbers, that contains a `continue`
//!    and that is the whole body of its closest enclosing loop, a `for`.
//! 2. Seeding: the discriminant is a number, or a variable whose last literal write at or
//!    before the `switch` provides the start state.
//! 3. Simulation: cases are visited in dispatch order. Within a case, statements are
//!    scanned through plain blocks and comma sequences: `state = <number>` moves the
//!    state, `continue` dispatches on it, `break` and `return` end the walk. A case that
//!    ends without either falls through to the next case in declaration order.
//! 4. Rewrite: state assignments, `continue` and `break` are dropped, unreachable
//!    statements removed, and the loop is replaced by its initialiser followed by the
//!    visited case bodies.
//!
//! The whole plan is computed before the tree is touched. Anything the walk cannot model
//! (a revisited case, a `continue` with no preceding state change, a state write nested in
//! an `if` or loop, a non-literal state) aborts the rewrite of that switch with a warning
//! and leaves it as it was.

use rustc_hash::FxHashSet;

use crate::{
    deobfuscation::{context::PassContext, events::EventKind, pass::Pass},
    numeric::{extract_number, number_to_string},
    syntax::{AssignOp, Ast, BindingId, NodeId, NodeKind, ScopeTree, Span},
    Result,
};

/// How a scanned case hands over control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseExit {
    /// `continue`: dispatch again on the current state.
    Continue,
    /// `break` or `return`: the dispatcher is done.
    Terminal,
    /// The case body ran to its end.
    FallThrough,
}

/// Outcome of scanning one case body.
#[derive(Debug, Default)]
struct CaseScan {
    /// Last state assigned in the case.
    state: Option<f64>,
    exit: Option<CaseExit>,
    /// Statements and sequence elements dropped in the rewrite.
    removals: Vec<NodeId>,
}

/// The dispatcher being unflattened.
struct Dispatcher {
    switch: NodeId,
    looped: NodeId,
    /// State variable, if the discriminant is an identifier.
    binding: Option<BindingId>,
    /// Numeric case tests with their case nodes, in declaration order.
    cases: Vec<(f64, NodeId)>,
}

/// A linearisation computed before any mutation.
struct Plan {
    visited: Vec<NodeId>,
    removals: Vec<NodeId>,
    fallthroughs: usize,
}

/// Reverses switch-based control-flow flattening.
pub struct SwitchUnflatteningPass;

impl Default for SwitchUnflatteningPass {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchUnflatteningPass {
    /// Creates a new unflattening pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the closest enclosing `for` if the switch is its entire body.
    fn enclosing_loop(ast: &Ast, switch: NodeId) -> Option<NodeId> {
        let mut parent = ast.parent(switch)?;
        if let NodeKind::Block { body } = ast.kind(parent) {
            if body.len() != 1 {
                return None;
            }
            parent = ast.parent(parent)?;
        }
        match ast.kind(parent) {
            NodeKind::For { .. } => Some(parent),
            _ => None,
        }
    }

    fn contains_continue(ast: &Ast, switch: NodeId) -> bool {
        ast.preorder(switch)
            .into_iter()
            .any(|id| matches!(ast.kind(id), NodeKind::Continue { .. }))
    }

    /// Last literal written to `binding` at or before `before`.
    fn seed_state(ast: &Ast, scopes: &ScopeTree, binding: BindingId, before: Span) -> Option<f64> {
        let mut seed: Option<(u32, f64)> = None;
        for write in &scopes.binding(binding).writes {
            let value = match ast.kind(*write) {
                NodeKind::Assignment {
                    operator: AssignOp::Assign,
                    value,
                    ..
                } => extract_number(ast, *value),
                NodeKind::VariableDeclarator {
                    init: Some(init), ..
                } => extract_number(ast, *init),
                _ => None,
            };
            let Some(value) = value else {
                continue;
            };
            let start = ast.span(*write).start;
            if start <= before.start && seed.map_or(true, |(closest, _)| closest <= start) {
                seed = Some((start, value));
            }
        }
        seed.map(|(_, value)| value)
    }

    /// Returns the assigned value if `id` is `state = <value>`.
    fn state_assignment(
        ast: &Ast,
        scopes: &ScopeTree,
        binding: Option<BindingId>,
        id: NodeId,
    ) -> Option<NodeId> {
        let NodeKind::Assignment {
            operator: AssignOp::Assign,
            target,
            value,
        } = ast.kind(id)
        else {
            return None;
        };
        (binding.is_some() && scopes.resolve(*target) == binding).then_some(*value)
    }

    /// Checks a statement kept as-is for state writes and jumps the walk cannot follow.
    fn ensure_opaque(
        ast: &Ast,
        scopes: &ScopeTree,
        dispatcher: &Dispatcher,
        id: NodeId,
    ) -> std::result::Result<(), String> {
        if let Some(binding) = dispatcher.binding {
            if scopes
                .binding(binding)
                .writes
                .iter()
                .any(|write| ast.is_within(*write, id))
            {
                return Err("state is written in an unsupported position".to_string());
            }
        }
        for node in ast.preorder(id) {
            let is_loop = |kind: &NodeKind| {
                matches!(
                    kind,
                    NodeKind::For { .. }
                        | NodeKind::ForIn { .. }
                        | NodeKind::While { .. }
                        | NodeKind::DoWhile { .. }
                        | NodeKind::FunctionDeclaration(_)
                        | NodeKind::FunctionExpression(_)
                )
            };
            let target = match ast.kind(node) {
                NodeKind::Continue { label: Some(_) } | NodeKind::Break { label: Some(_) } => {
                    return Err("labelled jump inside a dispatcher case".to_string());
                }
                NodeKind::Continue { label: None } => ast.find_ancestor(node, is_loop),
                NodeKind::Break { label: None } => ast.find_ancestor(node, |kind| {
                    is_loop(kind) || matches!(kind, NodeKind::Switch { .. })
                }),
                _ => continue,
            };
            if target == Some(dispatcher.looped) || target == Some(dispatcher.switch) {
                return Err("conditional jump out of a dispatcher case".to_string());
            }
        }
        Ok(())
    }

    /// Scans a statement list of a case body.
    fn scan_list(
        ast: &Ast,
        scopes: &ScopeTree,
        dispatcher: &Dispatcher,
        list: &[NodeId],
        scan: &mut CaseScan,
    ) -> std::result::Result<(), String> {
        for &stmt in list {
            if scan.exit.is_some() {
                scan.removals.push(stmt);
                continue;
            }
            match ast.kind(stmt) {
                NodeKind::ExpressionStatement { expression } => {
                    Self::scan_expression(ast, scopes, dispatcher, stmt, *expression, scan)?;
                }
                NodeKind::Continue { label: None } => {
                    scan.exit = Some(CaseExit::Continue);
                    scan.removals.push(stmt);
                }
                NodeKind::Break { label: None } => {
                    scan.exit = Some(CaseExit::Terminal);
                    scan.removals.push(stmt);
                }
                NodeKind::Return { .. } => {
                    Self::ensure_opaque(ast, scopes, dispatcher, stmt)?;
                    scan.exit = Some(CaseExit::Terminal);
                }
                NodeKind::Block { body } => {
                    Self::scan_list(ast, scopes, dispatcher, body, scan)?;
                }
                _ => Self::ensure_opaque(ast, scopes, dispatcher, stmt)?,
            }
        }
        Ok(())
    }

    /// Scans an expression statement for state assignments.
    fn scan_expression(
        ast: &Ast,
        scopes: &ScopeTree,
        dispatcher: &Dispatcher,
        stmt: NodeId,
        expression: NodeId,
        scan: &mut CaseScan,
    ) -> std::result::Result<(), String> {
        let elements = match ast.kind(expression) {
            NodeKind::Sequence { expressions } => expressions.clone(),
            _ => vec![expression],
        };
        let mut edges = Vec::new();
        for element in &elements {
            match Self::state_assignment(ast, scopes, dispatcher.binding, *element) {
                Some(value) => {
                    let Some(state) = extract_number(ast, value) else {
                        return Err("state is assigned a non-literal value".to_string());
                    };
                    scan.state = Some(state);
                    edges.push(*element);
                }
                None => Self::ensure_opaque(ast, scopes, dispatcher, *element)?,
            }
        }
        if edges.len() == elements.len() {
            scan.removals.push(stmt);
        } else {
            scan.removals.extend(edges);
        }
        Ok(())
    }

    /// Simulates the dispatcher from `state` and plans the rewrite.
    fn plan(
        ast: &Ast,
        scopes: &ScopeTree,
        dispatcher: &Dispatcher,
        mut state: f64,
    ) -> std::result::Result<Plan, String> {
        let position = |state: f64| dispatcher.cases.iter().position(|(test, _)| *test == state);
        let mut plan = Plan {
            visited: Vec::new(),
            removals: Vec::new(),
            fallthroughs: 0,
        };
        let mut seen = FxHashSet::default();
        let mut index = position(state)
            .ok_or_else(|| format!("no case for start state {}", number_to_string(state)))?;
        let mut assigned = true;

        loop {
            let (test, case) = dispatcher.cases[index];
            if !seen.insert(case) {
                return Err(format!("case {} is visited twice", number_to_string(test)));
            }
            let NodeKind::SwitchCase { consequent, .. } = ast.kind(case) else {
                return Err("switch case expected".to_string());
            };
            let mut scan = CaseScan::default();
            Self::scan_list(ast, scopes, dispatcher, consequent, &mut scan)?;
            plan.visited.push(case);
            plan.removals.append(&mut scan.removals);
            if let Some(next) = scan.state {
                state = next;
                assigned = true;
            }

            let exit = scan.exit.unwrap_or(CaseExit::FallThrough);
            let next = match exit {
                CaseExit::Terminal => break,
                CaseExit::FallThrough if index + 1 < dispatcher.cases.len() => {
                    if scan.state.is_none() {
                        plan.fallthroughs += 1;
                    }
                    Some(index + 1)
                }
                CaseExit::Continue | CaseExit::FallThrough => {
                    if !assigned {
                        return Err(format!(
                            "case {} loops back without changing state",
                            number_to_string(test)
                        ));
                    }
                    assigned = false;
                    position(state)
                }
            };
            match next {
                Some(next) => index = next,
                // No case handles the state: the dispatcher idles out.
                None => break,
            }
        }
        Ok(plan)
    }

    /// Recognises a dispatcher switch.
    ///
    /// Returns `None` for ordinary switches and an error for dispatchers that are not the
    /// body of a `for` loop.
    fn dispatcher(
        ast: &Ast,
        scopes: &ScopeTree,
        switch: NodeId,
    ) -> Option<std::result::Result<Dispatcher, &'static str>> {
        let NodeKind::Switch { discriminant, cases } = ast.kind(switch) else {
            return None;
        };
        let mut tests = Vec::with_capacity(cases.len());
        for case in cases {
            let NodeKind::SwitchCase {
                test: Some(test), ..
            } = ast.kind(*case)
            else {
                return None;
            };
            tests.push((extract_number(ast, *test)?, *case));
        }
        if !Self::contains_continue(ast, switch) {
            return None;
        }
        let Some(looped) = Self::enclosing_loop(ast, switch) else {
            return Some(Err("dispatcher is not the body of a for loop"));
        };
        let binding = match ast.kind(*discriminant) {
            NodeKind::Identifier { .. } => scopes.resolve(*discriminant),
            _ => None,
        };
        Some(Ok(Dispatcher {
            switch,
            looped,
            binding,
            cases: tests,
        }))
    }

    /// Applies a plan: drops jumps and state writes, then splices the case bodies.
    fn apply(ast: &mut Ast, dispatcher: &Dispatcher, plan: Plan) -> Result<()> {
        for removal in plan.removals {
            ast.remove(removal);
        }
        let mut statements = Vec::new();
        if let NodeKind::For {
            init: Some(init), ..
        } = *ast.kind(dispatcher.looped)
        {
            if matches!(ast.kind(init), NodeKind::VariableDeclaration { .. }) {
                statements.push(init);
            } else {
                let span = ast.span(init);
                statements.push(ast.alloc(NodeKind::ExpressionStatement { expression: init }, span));
            }
        }
        for case in plan.visited {
            if let NodeKind::SwitchCase { consequent, .. } = ast.kind(case) {
                statements.extend(consequent.iter().copied());
            }
        }
        if !ast.replace_with_many(dispatcher.looped, statements) {
            return Err(malformed_error!(
                "dispatcher loop at {:?} is not in statement position",
                ast.span(dispatcher.looped)
            ));
        }
        Ok(())
    }
}

impl Pass for SwitchUnflatteningPass {
    fn name(&self) -> &'static str {
        "unflatten"
    }

    fn description(&self) -> &'static str {
        "Linearises switch-based dispatcher loops"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let switches = ast.find_all(ast.root(), |kind| matches!(kind, NodeKind::Switch { .. }));
        let mut changed = 0;

        for switch in switches {
            if !ast.is_live(switch) {
                continue;
            }
            let scopes = ScopeTree::build(ast);
            let span = ast.span(switch);
            let dispatcher = match Self::dispatcher(ast, &scopes, switch) {
                None => continue,
                Some(Err(reason)) => {
                    ctx.warn(span, format!("dispatcher left as is: {reason}"));
                    continue;
                }
                Some(Ok(dispatcher)) => dispatcher,
            };
            ctx.record(EventKind::DispatcherIdentified)
                .location(span)
                .message(format!("dispatcher with {} cases", dispatcher.cases.len()));

            let NodeKind::Switch { discriminant, .. } = *ast.kind(switch) else {
                continue;
            };
            let seed = extract_number(ast, discriminant).or_else(|| {
                dispatcher
                    .binding
                    .and_then(|binding| Self::seed_state(ast, &scopes, binding, span))
            });
            let Some(seed) = seed else {
                ctx.warn(span, "dispatcher start state is unknown");
                continue;
            };

            let plan = match Self::plan(ast, &scopes, &dispatcher, seed) {
                Ok(plan) => plan,
                Err(reason) => {
                    ctx.warn(span, format!("dispatcher left as is: {reason}"));
                    continue;
                }
            };
            if plan.fallthroughs > 0 {
                ctx.warn(
                    span,
                    format!(
                        "{} case(s) without a state change continue in declaration order",
                        plan.fallthroughs
                    ),
                );
            }
            let visited = plan.visited.len();
            Self::apply(ast, &dispatcher, plan)?;
            ctx.rewrite(
                EventKind::ControlFlowRestructured,
                span,
                format!(
                    "linearised {visited} of {} dispatcher cases",
                    dispatcher.cases.len()
                ),
            );
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::run_pass;

    #[test]
    fn test_linearises_dispatcher() {
        let source = r#"
            var state = 0;
            for (;;) {
                switch (state) {
                    case 0:
                        x = 1;
                        state = 2;
                        continue;
                    case 2:
                        x = 2;
                        break;
                }
            }
        "#;
        let run = run_pass(&SwitchUnflatteningPass::new(), source);
        assert_eq!(run.output, "var state = 0;\nx = 1;\nx = 2;\n");
        assert_eq!(run.rewrites, 1);
        assert!(run.events.has(EventKind::DispatcherIdentified));
    }

    #[test]
    fn test_follows_states_out_of_order() {
        let source = r#"
            for (var s = 7;;) {
                switch (s) {
                    case 1: c(); return r;
                    case 7: a(); s = 3, b(); continue;
                    case 3: d(); s = 1; continue;
                }
            }
        "#;
        let run = run_pass(&SwitchUnflatteningPass::new(), source);
        assert_eq!(run.output, "var s = 7;\na();\nb();\nd();\nc();\nreturn r;\n");
    }

    #[test]
    fn test_fallthrough_is_followed_and_flagged() {
        let source = "var s = 0; for (;;) { switch (s) { case 0: a(); case 1: b(); s = 2; continue; case 2: c(); break; } }";
        let run = run_pass(&SwitchUnflatteningPass::new(), source);
        assert_eq!(run.output, "var s = 0;\na();\nb();\nc();\n");
        assert_eq!(run.events.warnings().count(), 1);
    }

    #[test]
    fn test_conditional_state_write_aborts() {
        let source = "var s = 0; for (;;) { switch (s) { case 0: if (x) { s = 1; } else { s = 2; } continue; case 1: a(); break; case 2: b(); break; } }";
        let run = run_pass(&SwitchUnflatteningPass::new(), source);
        assert_eq!(run.rewrites, 0);
        assert!(run.output.contains("switch (s)"));
        assert_eq!(run.events.warnings().count(), 1);
    }

    #[test]
    fn test_revisited_case_aborts() {
        let source = "var s = 0; for (;;) { switch (s) { case 0: a(); s = 1; continue; case 1: s = 0; continue; } }";
        let run = run_pass(&SwitchUnflatteningPass::new(), source);
        assert_eq!(run.rewrites, 0);
        assert!(run.output.contains("case 1:"));
    }

    #[test]
    fn test_non_literal_state_aborts() {
        let source = "var s = 0; for (;;) { switch (s) { case 0: s = f(); continue; case 1: break; } }";
        let run = run_pass(&SwitchUnflatteningPass::new(), source);
        assert_eq!(run.rewrites, 0);
    }

    #[test]
    fn test_non_dispatcher_switches_ignored() {
        let source = r#"
            switch (x) { case 0: a(); break; }
            for (;;) { switch (s) { case "a": continue; } }
            while (y) { switch (0) { case 0: continue; } }
        "#;
        let run = run_pass(&SwitchUnflatteningPass::new(), source);
        assert_eq!(run.rewrites, 0);
        assert!(!run.events.has(EventKind::DispatcherIdentified));
        assert_eq!(run.events.warnings().count(), 1);
    }
}
