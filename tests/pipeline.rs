//! End-to-end tests running the full engine over small obfuscated programs.

use jsdeob::{
    deobfuscation::{DeobfuscationEngine, EngineConfig, EventKind},
    Error,
};

fn deobfuscate(source: &str) -> String {
    let engine = DeobfuscationEngine::default();
    let (code, _) = engine.process(source).unwrap();
    code
}

#[test]
fn test_switch_dispatcher_is_linearised() {
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
    let engine = DeobfuscationEngine::default();
    let (code, result) = engine.process(source).unwrap();
    assert!(code.contains("x = 1;\nx = 2;"));
    assert!(!code.contains("switch"));
    assert_eq!(result.events.count_kind(EventKind::ControlFlowRestructured), 1);
}

#[test]
fn test_unflattening_can_be_disabled() {
    let source = "var s = 0; for (;;) { switch (s) { case 0: a(); s = 1; continue; case 1: b(); break; } }";
    let engine = DeobfuscationEngine::new(EngineConfig::default().with_unflattening(false));
    let (code, _) = engine.process(source).unwrap();
    assert!(code.contains("switch (s)"));
}

#[test]
fn test_base64_table_decoded() {
    let source = r#"
        var t = ["aGVsbG8="];
        function f(i) {
            return atob(t[i]);
        }
        x = f(0);
    "#;
    assert_eq!(deobfuscate(source), "x = \"hello\";\n");
}

#[test]
fn test_static_control_flow_eliminated() {
    let source = "x = 1 ? a : b; y = 0 ? a : b; if (!1) { c(); } else { d(); }";
    assert_eq!(deobfuscate(source), "x = a;\ny = b;\nd();\n");
}

#[test]
fn test_empty_consequent_inverted() {
    let source = "if (a == b) {} else { f(); }";
    assert_eq!(deobfuscate(source), "if (a != b) {\n  f();\n}\n");

    let source = "if (a < b) {} else { f(); }";
    assert_eq!(deobfuscate(source), "if (!(a < b)) {\n  f();\n}\n");
}

#[test]
fn test_decoders_feed_later_passes() {
    let source = r#"
        var c = String["fromCharCode"];
        var w = window;
        w["console"]["log"](c(104) + c(105));
        z = (1, 2, w["name"]);
    "#;
    assert_eq!(deobfuscate(source), "console.log(\"hi\");\nz = name;\n");
}

#[test]
fn test_rerun_is_idempotent() {
    let source = r#"
        var w = window;
        var c = String.fromCharCode;
        function add(a, b) {
            return a + b;
        }
        if (!0) {
            w["console"].log(c(104) + c(105));
        } else {
            w.alert(0);
        }
        var n = add(3, 4) * 2, m = Math.floor(7.5);
        g(n, m, (0, 1, h()), 2 || k);
        var s = 0;
        for (;;) {
            switch (s) {
                case 0: g(1); s = 1; continue;
                case 1: g(2); break;
            }
        }
    "#;
    let engine = DeobfuscationEngine::default();
    let (first, result) = engine.process(source).unwrap();
    assert!(result.rewrites() > 0);

    let (second, rerun) = engine.process(&first).unwrap();
    assert_eq!(rerun.rewrites(), 0, "second run rewrote:\n{first}");
    assert_eq!(first, second);
}

#[test]
fn test_opaque_predicates_resolved_in_sandbox() {
    // 4x8 table whose cells share three objects: cell (r, c) holds pool[(r + c) % 3].
    let source = r#"
        function g(r, c, a, b, d, e, f) {
            return (r * a + c * b + e * f) % d;
        }
        var T = (function () {
            var pool = [{}, {}, {}];
            var q = [];
            for (var r = 0; r < 4; r++) {
                q.push((function (u) {
                    var row = [];
                    for (var c = 0; c < 8; c++) {
                        row.push(pool[g(u, c, 1, 1, 3, 0, 0)]);
                    }
                    var holder = [row];
                    return holder[0];
                })(r));
            }
            return q;
        })();
        x = T[1][2] ? a() : b();
        y = T[129][3];
        z = T[0][2];
    "#;
    let engine = DeobfuscationEngine::default();
    let (code, result) = engine.process(source).unwrap();
    assert!(code.contains("x = a();\ny = 2;\nz = 3;\n"), "{code}");
    assert!(!code.contains("var T"));
    assert!(!code.contains("T["));
    assert_eq!(result.events.count_kind(EventKind::OpaquePredicateRemoved), 3);
}

#[test]
fn test_unsupported_operator_is_fatal() {
    let engine = DeobfuscationEngine::default();
    let error = engine.process("a(); x = 1 in 2;").unwrap_err();
    assert!(matches!(error, Error::UnsupportedOperator(_)));
    assert!(error.to_string().contains("'in'"));
}

#[test]
fn test_unrecognised_input_passes_through() {
    let source = "function f(a) {\n  return a.b(c, \"d\");\n}\n";
    let engine = DeobfuscationEngine::default();
    let (code, result) = engine.process(source).unwrap();
    assert_eq!(code, source);
    assert_eq!(result.rewrites(), 0);
}
