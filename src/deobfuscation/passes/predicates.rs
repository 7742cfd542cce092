//! Lookup-table opaque predicate removal.
//!
//! The bundler builds a 2-D array of shared objects at startup and rewrites constants and
//! branch tests as `T[i][j]`. Two cells hold the same object exactly when they encode the
//! same value, so the obfuscated expression only carries its *equivalence class*:
//!
//! ```text
//! var T = (function () { ... g(u, v, 3, 5, 7, 11, 13, 17) ... return q[0]; ... })();
//! x = T[1][2] ? a() : b();        →   x = 3 ? a() : b();
//! ```
//!
//! # Flow
//!
//! 1. Detection: a function expression whose last statement returns `X[<number>]` and that
//!    calls an identifier with at least seven arguments, exactly two of them identifiers
//!    and at least five of them numeric literals. The callee is the index generator; the
//!    closest variable declarator around the function expression holds the table.
//! 2. Extraction: generator and table are re-hosted into the sandbox, which builds the
//!    table once and returns the identity tokens of rows `0..256`, one `;`-separated group
//!    per row, up to column `999`. Holes are `-1` and short rows are padded with `-1`.
//! 3. Classification: classes are numbered from 1 in first-seen order over rows `0..128`
//!    and columns `0..512`; every cell then takes the class of its token.
//! 4. Rewrite: each `T[i][j]` becomes the class of `(i mod 128, j)`, and the table
//!    declaration is dropped once nothing references it.
//!
//! Tables are memoised per run in the context's [`EquivalenceCache`], keyed by the printed
//! generator and table source.
//!
//! [`EquivalenceCache`]: crate::deobfuscation::EquivalenceCache

use rustc_hash::FxHashMap;

use crate::{
    deobfuscation::{
        context::PassContext,
        events::EventKind,
        pass::Pass,
        passes::utils::{function_body, index_value, remove_declarator},
    },
    sandbox::SandboxValue,
    syntax::{print_node, Ast, NodeId, NodeKind, ScopeTree},
    Error, Result,
};

/// Rows evaluated per table.
const TABLE_ROWS: usize = 256;
/// Columns evaluated per row.
const TABLE_COLUMNS: usize = 999;
/// Rows that seed the class numbering; lookups wrap the row index at this bound.
const SEED_ROWS: usize = 128;
/// Columns that seed the class numbering.
const SEED_COLUMNS: usize = 512;

/// Minimum argument count of the index generator call.
const MIN_GENERATOR_ARGS: usize = 7;
/// Minimum numeric literal arguments of the index generator call.
const MIN_GENERATOR_NUMBERS: usize = 5;

/// Equivalence classes of a lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceTable {
    classes: Vec<Option<u32>>,
    count: u32,
}

impl EquivalenceTable {
    /// Classifies a table from its identity tokens in row-major order.
    ///
    /// Negative tokens mark missing cells and never get a class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sandbox`] if `tokens` does not cover the full table.
    pub fn from_tokens(tokens: &[i64]) -> Result<Self> {
        if tokens.len() != TABLE_ROWS * TABLE_COLUMNS {
            return Err(Error::Sandbox(format!(
                "expected {} table cells, got {}",
                TABLE_ROWS * TABLE_COLUMNS,
                tokens.len()
            )));
        }

        let mut class_of_token: FxHashMap<i64, u32> = FxHashMap::default();
        let mut count = 0;
        for row in 0..SEED_ROWS {
            for &token in &tokens[row * TABLE_COLUMNS..row * TABLE_COLUMNS + SEED_COLUMNS] {
                if token >= 0 && !class_of_token.contains_key(&token) {
                    count += 1;
                    class_of_token.insert(token, count);
                }
            }
        }

        let classes = tokens
            .iter()
            .map(|token| class_of_token.get(token).copied())
            .collect();
        Ok(Self { classes, count })
    }

    /// Parses the token rows returned by the sandbox.
    ///
    /// Rows are separated by `;` and tokens by `,`. Rows shorter than the table width are
    /// padded with missing cells.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sandbox`] for non-string answers, a wrong row count, overlong rows
    /// and malformed tokens.
    pub fn from_sandbox(value: &SandboxValue) -> Result<Self> {
        let Some(text) = value.as_str() else {
            return Err(Error::Sandbox(format!(
                "table extraction returned {}",
                value.type_name()
            )));
        };
        let rows: Vec<&str> = text.split(';').collect();
        if rows.len() != TABLE_ROWS {
            return Err(Error::Sandbox(format!(
                "expected {TABLE_ROWS} table rows, got {}",
                rows.len()
            )));
        }

        let mut tokens = Vec::with_capacity(TABLE_ROWS * TABLE_COLUMNS);
        for (index, row) in rows.iter().enumerate() {
            let start = tokens.len();
            if !row.is_empty() {
                for token in row.split(',') {
                    let token = token
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| Error::Sandbox(format!("malformed table token '{token}'")))?;
                    tokens.push(token);
                }
            }
            let width = tokens.len() - start;
            if width > TABLE_COLUMNS {
                return Err(Error::Sandbox(format!(
                    "table row {index} has {width} cells"
                )));
            }
            tokens.resize(start + TABLE_COLUMNS, -1);
        }
        Self::from_tokens(&tokens)
    }

    /// Returns the class of `table[row][column]`.
    #[must_use]
    pub fn class_of(&self, row: usize, column: usize) -> Option<u32> {
        if column >= TABLE_COLUMNS {
            return None;
        }
        self.classes[(row % SEED_ROWS) * TABLE_COLUMNS + column]
    }

    /// Number of distinct classes.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.count as usize
    }
}

/// A located lookup table and its index generator.
struct PredicateTable {
    /// Source of the generator, ready to be evaluated.
    generator: String,
    /// Declarator holding the table.
    declarator: NodeId,
    /// Name the table is declared under.
    name: String,
}

/// Replaces lookup-table predicates with their equivalence class.
pub struct OpaquePredicatePass;

impl Default for OpaquePredicatePass {
    fn default() -> Self {
        Self::new()
    }
}

impl OpaquePredicatePass {
    /// Creates a new opaque predicate pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if `call` looks like a call of the index generator.
    fn is_generator_call(ast: &Ast, call: NodeId) -> bool {
        let NodeKind::Call { callee, arguments } = ast.kind(call) else {
            return false;
        };
        if ast.kind(*callee).as_ident().is_none() || arguments.len() < MIN_GENERATOR_ARGS {
            return false;
        }
        let identifiers = arguments
            .iter()
            .filter(|arg| ast.kind(**arg).as_ident().is_some())
            .count();
        let numbers = arguments
            .iter()
            .filter(|arg| matches!(ast.kind(**arg), NodeKind::NumericLiteral { .. }))
            .count();
        identifiers == 2 && numbers >= MIN_GENERATOR_NUMBERS
    }

    /// Returns true if the last statement of `function` is `return X[<number>]`.
    fn returns_indexed_member(ast: &Ast, function: NodeId) -> bool {
        let Some(&last) = function_body(ast, function).and_then(<[NodeId]>::last) else {
            return false;
        };
        let NodeKind::Return {
            argument: Some(argument),
        } = ast.kind(last)
        else {
            return false;
        };
        matches!(
            ast.kind(*argument),
            NodeKind::Member { property, computed: true, .. } if index_value(ast, *property).is_some()
        )
    }

    /// Prints the declaration of the generator bound to `callee`.
    fn generator_source(ast: &Ast, scopes: &ScopeTree, callee: NodeId) -> Option<String> {
        let binding = scopes.resolve(callee)?;
        let declaration = scopes.binding(binding).declaration;
        match ast.kind(declaration) {
            NodeKind::FunctionDeclaration(_) => Some(print_node(ast, declaration)),
            NodeKind::VariableDeclarator { init: Some(_), .. } => {
                Some(format!("var {};", print_node(ast, declaration)))
            }
            _ => None,
        }
    }

    /// Locates the first lookup table in the program.
    fn locate(ast: &Ast, scopes: &ScopeTree) -> Option<PredicateTable> {
        let functions =
            ast.find_all(ast.root(), |kind| matches!(kind, NodeKind::FunctionExpression(_)));
        for function in functions {
            if !Self::returns_indexed_member(ast, function) {
                continue;
            }
            let Some(call) = ast
                .preorder(function)
                .into_iter()
                .find(|id| Self::is_generator_call(ast, *id))
            else {
                continue;
            };
            let NodeKind::Call { callee, .. } = ast.kind(call) else {
                continue;
            };
            let Some(generator) = Self::generator_source(ast, scopes, *callee) else {
                continue;
            };
            let Some(declarator) =
                ast.find_ancestor(function, |kind| matches!(kind, NodeKind::VariableDeclarator { .. }))
            else {
                continue;
            };
            let NodeKind::VariableDeclarator { id, .. } = ast.kind(declarator) else {
                continue;
            };
            let Some(name) = ast.kind(*id).as_ident() else {
                continue;
            };
            return Some(PredicateTable {
                generator,
                declarator,
                name: name.to_string(),
            });
        }
        None
    }

    /// Builds the snippet that returns the identity token of every cell.
    fn snippet(ast: &Ast, table: &PredicateTable) -> String {
        format!(
            r#"{generator}
var {declarator};
(function (table) {{
  var seen = new Map(), next = 0, rows = [];
  for (var i = 0; i < {TABLE_ROWS}; i++) {{
    var row = table[i], out = [];
    if (row !== null && typeof row === "object") {{
      var width = Math.min(row.length >>> 0, {TABLE_COLUMNS});
      for (var j = 0; j < width; j++) {{
        if (!(j in row)) {{
          out.push(-1);
          continue;
        }}
        var cell = row[j];
        if (!seen.has(cell)) seen.set(cell, next++);
        out.push(seen.get(cell));
      }}
    }}
    rows.push(out.join(","));
  }}
  return rows.join(";");
}})({name});
"#,
            generator = table.generator,
            declarator = print_node(ast, table.declarator),
            name = table.name,
        )
    }

    /// Returns the `T[i][j]` node and its indices for a table reference.
    fn lookup_site(ast: &Ast, reference: NodeId) -> Option<(NodeId, usize, usize)> {
        let inner = ast.parent(reference)?;
        let NodeKind::Member {
            object,
            property: row,
            computed: true,
        } = *ast.kind(inner)
        else {
            return None;
        };
        if object != reference {
            return None;
        }
        let outer = ast.parent(inner)?;
        let NodeKind::Member {
            object,
            property: column,
            computed: true,
        } = *ast.kind(outer)
        else {
            return None;
        };
        if object != inner {
            return None;
        }
        Some((outer, index_value(ast, row)?, index_value(ast, column)?))
    }
}

impl Pass for OpaquePredicatePass {
    fn name(&self) -> &'static str {
        "opaque-predicates"
    }

    fn description(&self) -> &'static str {
        "Replaces lookup-table predicates with their equivalence class"
    }

    fn run(&self, ast: &mut Ast, ctx: &mut PassContext<'_>) -> Result<usize> {
        let scopes = ScopeTree::build(ast);
        let Some(table) = Self::locate(ast, &scopes) else {
            ctx.info("no opaque predicate table found");
            return Ok(0);
        };
        let Some(binding) = ast
            .kind(table.declarator)
            .children()
            .first()
            .and_then(|id| scopes.resolve(*id))
        else {
            return Ok(0);
        };

        let key = format!(
            "{}\n{}",
            table.generator,
            print_node(ast, table.declarator)
        );
        let source = Self::snippet(ast, &table);
        let sandbox = ctx.sandbox;
        let hits = ctx.equivalences.hits();
        let classes = match ctx.equivalences.get_or_try_insert_with(&key, || {
            EquivalenceTable::from_sandbox(&sandbox.evaluate(&source)?)
        }) {
            Ok(classes) => classes,
            Err(err) => {
                ctx.warn(
                    ast.span(table.declarator),
                    format!("extracting table '{}' failed: {err}", table.name),
                );
                return Ok(0);
            }
        };
        let cached = if ctx.equivalences.hits() > hits {
            " (cached)"
        } else {
            ""
        };
        ctx.record(EventKind::TableExtracted)
            .location(ast.span(table.declarator))
            .message(format!(
                "table '{}' has {} equivalence classes{cached}",
                table.name,
                classes.class_count()
            ));

        let mut changed = 0;
        for reference in &scopes.binding(binding).references {
            let Some((site, row, column)) = Self::lookup_site(ast, *reference) else {
                continue;
            };
            let Some(class) = classes.class_of(row, column) else {
                ctx.warn(
                    ast.span(site),
                    format!("{}[{row}][{column}] has no equivalence class", table.name),
                );
                continue;
            };
            ctx.rewrite(
                EventKind::OpaquePredicateRemoved,
                ast.span(site),
                format!("{}[{row}][{column}] -> {class}", table.name),
            );
            ast.replace(
                site,
                NodeKind::NumericLiteral {
                    value: f64::from(class),
                },
            );
            changed += 1;
        }

        let rescan = ScopeTree::build(ast);
        let unreferenced = ast
            .kind(table.declarator)
            .children()
            .first()
            .and_then(|id| rescan.resolve(*id))
            .is_some_and(|binding| rescan.binding(binding).references.is_empty());
        if unreferenced && remove_declarator(ast, table.declarator) {
            ctx.rewrite(
                EventKind::ArtifactRemoved,
                ast.span(table.declarator),
                format!("removed table '{}'", table.name),
            );
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deobfuscation::{EngineConfig, EquivalenceCache, EventLog},
        syntax::{parse, print},
        test::{run_pass_with, ScriptedEvaluator},
    };

    const TABLE: &str = r#"
        function g(e, t, a, n, c, i, r, o) {
            return (((t * a) ^ (r * i) ^ (e * n)) >>> 0) & (c - 1);
        }
        var T = (function () {
            var q = [];
            for (var k = 0; k < 256; k++) {
                q.push((function (u, v) {
                    q[u] = g(u, v, 3, 5, 7, 11, 13, 17);
                    return q[0];
                })(k, 1));
            }
            return q;
        })();
    "#;

    /// Tokens cycling through three identities in row-major order.
    fn cyclic_tokens() -> SandboxValue {
        let rows: Vec<String> = (0..TABLE_ROWS)
            .map(|row| {
                let tokens: Vec<String> = (0..TABLE_COLUMNS)
                    .map(|column| ((row * TABLE_COLUMNS + column) % 3).to_string())
                    .collect();
                tokens.join(",")
            })
            .collect();
        SandboxValue::String(rows.join(";"))
    }

    #[test]
    fn test_classes_follow_first_seen_order() {
        let mut tokens = vec![-1_i64; TABLE_ROWS * TABLE_COLUMNS];
        tokens[0] = 40;
        tokens[1] = 7;
        tokens[2] = 40;
        tokens[TABLE_COLUMNS + 3] = 9;
        // Outside the seed region: same token as a seeded cell, and an unseen token.
        tokens[600] = 7;
        tokens[601] = 55;
        let table = EquivalenceTable::from_tokens(&tokens).unwrap();
        assert_eq!(table.class_count(), 3);
        assert_eq!(table.class_of(0, 0), Some(1));
        assert_eq!(table.class_of(0, 1), Some(2));
        assert_eq!(table.class_of(0, 2), Some(1));
        assert_eq!(table.class_of(129, 3), Some(3));
        assert_eq!(table.class_of(0, 600), Some(2));
        assert_eq!(table.class_of(0, 601), None);
        assert_eq!(table.class_of(0, 5), None);
        assert_eq!(table.class_of(0, 999), None);
    }

    #[test]
    fn test_malformed_answers_rejected() {
        assert!(EquivalenceTable::from_sandbox(&SandboxValue::Number(1.0)).is_err());
        assert!(EquivalenceTable::from_sandbox(&SandboxValue::String("1,x".into())).is_err());
        assert!(EquivalenceTable::from_sandbox(&SandboxValue::String("1,2".into())).is_err());

        let overlong = vec!["0"; TABLE_COLUMNS + 1].join(",");
        let mut rows = vec![String::new(); TABLE_ROWS];
        rows[0] = overlong;
        assert!(EquivalenceTable::from_sandbox(&SandboxValue::String(rows.join(";"))).is_err());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut rows = vec![String::new(); TABLE_ROWS];
        rows[0] = "4,-1,4".to_string();
        rows[1] = "6".to_string();
        let table = EquivalenceTable::from_sandbox(&SandboxValue::String(rows.join(";"))).unwrap();
        assert_eq!(table.class_count(), 2);
        assert_eq!(table.class_of(0, 0), Some(1));
        assert_eq!(table.class_of(0, 1), None);
        assert_eq!(table.class_of(0, 2), Some(1));
        assert_eq!(table.class_of(0, 3), None);
        assert_eq!(table.class_of(129, 0), Some(2));
        assert_eq!(table.class_of(2, 0), None);
    }

    #[test]
    fn test_replaces_lookups_and_removes_table() {
        let source = format!("{TABLE} x = T[1][2] ? a() : b(); y = T[130][5]; z = T[0][4];");
        let sandbox = ScriptedEvaluator::new(cyclic_tokens());
        let run = run_pass_with(
            &OpaquePredicatePass::new(),
            &source,
            &EngineConfig::default(),
            &sandbox,
        );
        assert!(run.output.contains("x = 3 ? a() : b();\ny = 3;\nz = 2;"));
        assert!(!run.output.contains("var T"));
        assert_eq!(run.events.count_kind(EventKind::OpaquePredicateRemoved), 3);
        assert_eq!(run.rewrites, 4);

        let sources = sandbox.sources.borrow();
        assert!(sources[0].starts_with("function g(e, t, a, n, c, i, r, o)"));
        assert!(sources[0].contains("var T = "));
        assert!(sources[0].ends_with("})(T);\n"));
    }

    #[test]
    fn test_unclassified_lookup_keeps_table() {
        let source = format!("{TABLE} x = T[0][1000]; y = T[0][1];");
        let sandbox = ScriptedEvaluator::new(cyclic_tokens());
        let run = run_pass_with(
            &OpaquePredicatePass::new(),
            &source,
            &EngineConfig::default(),
            &sandbox,
        );
        assert!(run.output.contains("x = T[0][1000];\ny = 2;"));
        assert!(run.output.contains("var T = "));
        assert_eq!(run.events.warnings().count(), 1);
    }

    #[test]
    fn test_sandbox_failure_is_a_no_op() {
        let source = format!("{TABLE} x = T[1][2];");
        let sandbox = ScriptedEvaluator::failing();
        let run = run_pass_with(
            &OpaquePredicatePass::new(),
            &source,
            &EngineConfig::default(),
            &sandbox,
        );
        assert_eq!(run.rewrites, 0);
        assert_eq!(run.events.warnings().count(), 1);
    }

    #[test]
    fn test_missing_shape_is_logged() {
        let sandbox = ScriptedEvaluator::failing();
        let run = run_pass_with(
            &OpaquePredicatePass::new(),
            "var T = [[1]]; x = T[0][0];",
            &EngineConfig::default(),
            &sandbox,
        );
        assert_eq!(run.rewrites, 0);
        assert_eq!(sandbox.calls.get(), 0);
        assert!(run.events.has(EventKind::Info));
    }

    #[test]
    fn test_classes_are_memoised_and_stable() {
        let source = format!("{TABLE} x = T[1][2]; y = T[3][4];");
        let config = EngineConfig::default();
        let sandbox = ScriptedEvaluator::new(cyclic_tokens());
        let mut cache = EquivalenceCache::new();

        let mut outputs = Vec::new();
        for _ in 0..2 {
            let mut ast = parse(&source).unwrap();
            let events = EventLog::new();
            let mut ctx = PassContext::new(&config, &sandbox, &events, &mut cache);
            ctx.enter("opaque-predicates");
            OpaquePredicatePass::new().run(&mut ast, &mut ctx).unwrap();
            outputs.push(print(&ast));
        }
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(sandbox.calls.get(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
    }
}
