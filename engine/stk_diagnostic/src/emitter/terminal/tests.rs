use super::*;
use crate::ErrorCode;
use pretty_assertions::assert_eq;
use stk_ir::{SourceRange, Span};

fn invalid_local() -> Diagnostic {
    Diagnostic::error(ErrorCode::E2001)
        .with_summary("Invalid local value")
        .with_detail("Unsuitable value for local \"x\": number required.")
        .with_range(SourceRange::new("main.stk", Span::new(10, 15)))
}

fn render(diagnostics: &Diagnostics, mode: ColorMode) -> String {
    let mut emitter = TerminalEmitter::new(Vec::new(), mode, false);
    emitter.report(diagnostics).unwrap();
    String::from_utf8(emitter.into_inner()).unwrap()
}

#[test]
fn plain_report() {
    let text = render(&invalid_local().into(), ColorMode::Never);
    assert_eq!(
        text,
        "error[E2001]: Invalid local value\n  --> main.stk:10..15\n  = Unsuitable value for local \"x\": number required.\n\nerror: evaluation failed with 1 error\n"
    );
}

#[test]
fn engine_side_problems_carry_a_note() {
    let cancelled = Diagnostic::error(ErrorCode::E4001)
        .with_summary("Evaluation cancelled")
        .with_detail("The evaluation of local.x was cancelled before it completed.");
    let mut emitter = TerminalEmitter::new(Vec::new(), ColorMode::Never, false);
    emitter.emit(&cancelled).unwrap();
    let text = String::from_utf8(emitter.into_inner()).unwrap();
    assert!(text.contains("  = note: the run was cancelled; results are incomplete\n"));
}

#[test]
fn colors_follow_the_mode() {
    let diags: Diagnostics = invalid_local().into();
    assert!(render(&diags, ColorMode::Always).contains(RED));
    assert!(!render(&diags, ColorMode::Auto).contains('\x1b'));
    assert!(ColorMode::Auto.should_use_colors(true));
}

#[test]
fn summary_counts() {
    let warning = Diagnostic::warning(ErrorCode::E1003).with_summary("Unused");
    let mixed: Diagnostics = [invalid_local(), invalid_local(), warning.clone()]
        .into_iter()
        .collect();
    let warnings: Diagnostics = [warning.clone(), warning].into_iter().collect();

    let mut emitter = TerminalEmitter::new(Vec::new(), ColorMode::Never, false);
    emitter.emit_summary(&mixed).unwrap();
    emitter.emit_summary(&warnings).unwrap();
    emitter.emit_summary(&Diagnostics::new()).unwrap();
    assert_eq!(
        String::from_utf8(emitter.into_inner()).unwrap(),
        "error: evaluation failed with 2 errors and 1 warning\nwarning: 2 warnings emitted\n"
    );
}
