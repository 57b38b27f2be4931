//! Drives a tracker from newline-delimited page signals.
//!
//! ## Input
//!
//! ```text
//! visible | hidden | prerender   visibility change
//! focus | blur                   window focus
//! pagehide                       page teardown
//! click <label>                  click report
//! # ...                          comment
//! ```
//!
//! Unknown lines are logged and skipped; the page keeps running.

use beacon_core::{PageSignal, ScriptedPage, SessionLifecycleTracker};
use std::io::BufRead;
use std::rc::Rc;

#[derive(Debug, PartialEq)]
enum InputLine {
    Signal(PageSignal),
    Click(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DriveSummary {
    pub signals: usize,
    pub clicks: usize,
    pub skipped: usize,
}

/// Feeds every input line to the page (signals) or the tracker (clicks),
/// then tears the tracker down.
pub fn drive<R: BufRead>(
    tracker: Rc<SessionLifecycleTracker>,
    page: &ScriptedPage,
    input: R,
) -> Result<DriveSummary, String> {
    let mut summary = DriveSummary::default();

    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(|err| format!("Failed to read input: {err}"))?;
        match parse_line(&line) {
            None => {}
            Some(Ok(InputLine::Signal(signal))) => {
                page.dispatch(signal);
                summary.signals += 1;
            }
            Some(Ok(InputLine::Click(label))) => {
                tracker.report_click(&label);
                summary.clicks += 1;
            }
            Some(Err(err)) => {
                tracing::warn!(line = index + 1, error = %err, "Skipping input line");
                summary.skipped += 1;
            }
        }
    }

    tracing::debug!(state = ?tracker.state(), "Input finished; tearing down page");
    drop(tracker);

    Ok(summary)
}

fn parse_line(line: &str) -> Option<Result<InputLine, String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("click") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let label = rest.trim();
            if label.is_empty() {
                return Some(Err("click needs a label".to_string()));
            }
            return Some(Ok(InputLine::Click(label.to_string())));
        }
    }

    Some(
        line.parse::<PageSignal>()
            .map(InputLine::Signal)
            .map_err(|err| err.to_string()),
    )
}
