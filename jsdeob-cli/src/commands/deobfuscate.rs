use std::path::{Path, PathBuf};

use anyhow::Context;
use jsdeob::deobfuscation::{DeobfuscationEngine, DeobfuscationResult, EngineConfig};
use serde::Serialize;

use crate::{
    app::{DeobfuscateArgs, GlobalOptions},
    output::{print_output, Align, TabWriter},
};

/// Suffix inserted before the extension of the default output file.
const OUTPUT_SUFFIX: &str = ".deobfuscated";

#[derive(Debug, Serialize)]
struct DeobfuscationReport {
    file: String,
    output: String,
    time_ms: u128,
    rewrites: usize,
    stats: StatsReport,
    passes: Vec<PassReport>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    strings_normalized: usize,
    strings_decoded: usize,
    constants_decoded: usize,
    constants_folded: usize,
    branches_simplified: usize,
    expressions_simplified: usize,
    opaque_predicates_removed: usize,
    control_flow_restructured: usize,
    members_normalized: usize,
    noise_removed: usize,
    artifacts_removed: usize,
}

#[derive(Debug, Serialize)]
struct PassReport {
    name: &'static str,
    rewrites: usize,
    time_us: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: &DeobfuscateArgs, global: &GlobalOptions) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read input: {}", args.input.display()))?;

    let engine = DeobfuscationEngine::new(build_config(args));
    let (code, result) = engine
        .process(&source)
        .with_context(|| format!("deobfuscation failed: {}", args.input.display()))?;

    let output_path = resolve_output_path(&args.input, args.output.as_deref());
    std::fs::write(&output_path, code)
        .with_context(|| format!("failed to write output: {}", output_path.display()))?;

    let report = build_report(&args.input, &output_path, &result);

    if let Some(report_file) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(report_file, json)
            .with_context(|| format!("failed to write report: {}", report_file.display()))?;
        eprintln!("Report written to {}", report_file.display());
    }

    print_output(&report, global, |report| {
        display_report(report, args.stats);
    })
}

fn build_config(args: &DeobfuscateArgs) -> EngineConfig {
    let mut config = EngineConfig::default()
        .with_global_object(args.global_object.as_str())
        .with_unflattening(!args.no_unflatten)
        .with_opaque_predicates(!args.no_predicates);
    if let Some(limit) = args.loop_limit {
        config = config.with_loop_limit(limit);
    }
    config
}

fn resolve_output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    let stem = input
        .file_stem()
        .map_or("output", |s| s.to_str().unwrap_or("output"));
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}{OUTPUT_SUFFIX}.js"))
}

fn file_display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn build_report(input: &Path, output: &Path, result: &DeobfuscationResult) -> DeobfuscationReport {
    let derived = result.stats();

    DeobfuscationReport {
        file: file_display_name(input),
        output: file_display_name(output),
        time_ms: result.total_time.as_millis(),
        rewrites: result.rewrites(),
        stats: StatsReport {
            strings_normalized: derived.strings_normalized,
            strings_decoded: derived.strings_decoded,
            constants_decoded: derived.constants_decoded,
            constants_folded: derived.constants_folded,
            branches_simplified: derived.branches_simplified,
            expressions_simplified: derived.expressions_simplified,
            opaque_predicates_removed: derived.opaque_predicates_removed,
            control_flow_restructured: derived.control_flow_restructured,
            members_normalized: derived.members_normalized,
            noise_removed: derived.noise_removed,
            artifacts_removed: derived.artifacts_removed,
        },
        passes: result
            .passes
            .iter()
            .map(|pass| PassReport {
                name: pass.name,
                rewrites: pass.rewrites,
                time_us: pass.elapsed.as_micros(),
                error: pass.error.clone(),
            })
            .collect(),
        warnings: result.events.warnings().map(ToString::to_string).collect(),
        errors: result.events.errors().map(ToString::to_string).collect(),
    }
}

fn display_report(report: &DeobfuscationReport, show_stats: bool) {
    eprintln!(
        "Deobfuscation complete: {} -> {}",
        report.file, report.output
    );
    eprintln!("  Rewrites:    {}", report.rewrites);

    if show_stats {
        display_stats(report);
    }

    #[allow(clippy::cast_precision_loss)]
    let time_secs = report.time_ms as f64 / 1000.0;
    eprintln!("  Time:        {time_secs:.2}s");

    if !report.warnings.is_empty() {
        eprintln!("  Warnings:    {}", report.warnings.len());
        for w in &report.warnings {
            eprintln!("    - {w}");
        }
    }
    if !report.errors.is_empty() {
        eprintln!("  Errors:      {}", report.errors.len());
        for e in &report.errors {
            eprintln!("    - {e}");
        }
    }
}

fn display_stats(report: &DeobfuscationReport) {
    let s = &report.stats;
    let rows = [
        ("Strings normalized", s.strings_normalized),
        ("Strings decoded", s.strings_decoded),
        ("Constants decoded", s.constants_decoded),
        ("Constants folded", s.constants_folded),
        ("Branches simplified", s.branches_simplified),
        ("Expressions simplified", s.expressions_simplified),
        ("Opaque predicates", s.opaque_predicates_removed),
        ("Dispatchers unflattened", s.control_flow_restructured),
        ("Members normalized", s.members_normalized),
        ("Noise removed", s.noise_removed),
        ("Artifacts removed", s.artifacts_removed),
    ];
    for (label, count) in rows.iter().filter(|(_, count)| *count > 0) {
        eprintln!("  {:<24} {count}", format!("{label}:"));
    }

    eprintln!();
    let mut table = TabWriter::new(vec![
        ("Pass", Align::Left),
        ("Rewrites", Align::Right),
        ("Time", Align::Right),
    ])
    .indent("  ");
    for pass in &report.passes {
        #[allow(clippy::cast_precision_loss)]
        let millis = pass.time_us as f64 / 1000.0;
        let name = match &pass.error {
            Some(_) => format!("{} (failed)", pass.name),
            None => pass.name.to_string(),
        };
        table.row(vec![
            name,
            pass.rewrites.to_string(),
            format!("{millis:.2}ms"),
        ]);
    }
    table.print();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        let path = resolve_output_path(Path::new("dir/payload.js"), None);
        assert_eq!(path, Path::new("dir/payload.deobfuscated.js"));

        let explicit = resolve_output_path(Path::new("a.js"), Some(Path::new("b.js")));
        assert_eq!(explicit, Path::new("b.js"));
    }
}
