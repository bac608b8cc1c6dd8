//! Decision assembly: renders the execution trace into the decision's
//! notes field. Shared by both strategies so their output reads the same.

use crate::domain::claim::ClaimDecision;
use crate::domain::trace::TraceEntry;

/// Separator between business notes and the rendered trace block.
pub const TRACE_SEPARATOR: &str = "--- Processing Trace ---";

/// Append the rendered trace to `decision.notes`, preserving any existing
/// notes text before the separator. Purely additive: covered, deductible,
/// and payout are untouched. An empty trace leaves the decision as is.
pub fn assemble(mut decision: ClaimDecision, trace: &[TraceEntry]) -> ClaimDecision {
    if trace.is_empty() {
        return decision;
    }

    let rendered = render_trace(trace);
    decision.notes = Some(match decision.notes.take() {
        Some(notes) if !notes.is_empty() => format!("{notes}\n\n{TRACE_SEPARATOR}\n{rendered}"),
        _ => format!("{TRACE_SEPARATOR}\n{rendered}"),
    });
    decision
}

/// One line per entry: `[stage] <duration>s — key=value | key2=value2`.
pub fn render_trace(trace: &[TraceEntry]) -> String {
    trace
        .iter()
        .map(|entry| {
            let mut line = format!("[{}] {:.3}s", entry.stage, entry.elapsed.as_secs_f64());
            if !entry.annotations.is_empty() {
                let annotations = entry
                    .annotations
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                line.push_str(" \u{2014} ");
                line.push_str(&annotations);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
