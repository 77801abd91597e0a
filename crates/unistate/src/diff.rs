//! Line diff of two text renderings
//!
//! Used by the tracing reducer to show how a state changed. Works on whole
//! lines with a linear-space Myers diff, so a traced reducer over a large
//! projection stays cheap.

use std::time::Duration;

use similar::{Algorithm, ChangeTag, TextDiff};

/// Upper bound on the time spent looking for a minimal diff
const DIFF_DEADLINE: Duration = Duration::from_millis(200);

/// Kind of a line in a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Unchanged line
    Context,
    /// Line only present in the new text (+)
    Addition,
    /// Line only present in the old text (-)
    Deletion,
}

impl LineKind {
    /// Prefix character for this line type
    pub fn prefix(&self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Addition => '+',
            LineKind::Deletion => '-',
        }
    }
}

/// One line of a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

impl DiffLine {
    fn new(kind: LineKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Compute a line diff from `before` to `after`.
///
/// Deletions are listed before additions when lines were replaced. Large
/// inputs that differ almost everywhere hit the deadline and get a valid but
/// coarser diff instead of a minimal one.
pub fn diff_lines(before: &str, after: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_DEADLINE)
        .diff_slices(&old, &new);

    diff.iter_all_changes()
        .map(|change| {
            let kind = match change.tag() {
                ChangeTag::Equal => LineKind::Context,
                ChangeTag::Insert => LineKind::Addition,
                ChangeTag::Delete => LineKind::Deletion,
            };
            DiffLine::new(kind, change.value())
        })
        .collect()
}

/// Render the diff as `{prefix} {line}` rows, or `None` if nothing changed.
pub fn render_diff(before: &str, after: &str) -> Option<String> {
    if before == after {
        return None;
    }
    let rendered = diff_lines(before, after)
        .iter()
        .map(|line| format!("{} {}", line.kind.prefix(), line.text))
        .collect::<Vec<_>>()
        .join("\n");
    Some(rendered)
}
