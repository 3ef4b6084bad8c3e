//! CN-006: The Injector — pure content splicing.
//!
//! Transforms `(contents, location, body)` into new contents. Pattern
//! locations are matched per line first, then retried against the whole
//! text so patterns may span lines. A matching skip condition makes the
//! whole operation a no-op, which is what makes re-application idempotent.
//! All splits and joins use the dominant line-ending convention already
//! present in the target.

use regex::RegexBuilder;

/// Where to splice the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectLocation {
    /// Absolute 1-based line number (clamped to end of file)
    Line(usize),
    Before(String),
    After(String),
    Prepend,
    Append,
}

/// Outcome of an injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectOutcome {
    Injected(String),
    /// Skip condition already matched — contents unchanged
    Skipped,
}

/// Detect the dominant line-ending convention of a text.
pub fn dominant_eol(text: &str) -> &'static str {
    let crlf = text.matches("\r\n").count();
    let total_lf = text.matches('\n').count();
    let lone_lf = total_lf - crlf;
    if crlf > 0 && crlf >= lone_lf {
        "\r\n"
    } else {
        "\n"
    }
}

/// Splice `body` into `contents` at `location`.
///
/// `trailing_newline` controls whether the body gains or loses a final
/// newline before splicing: with it, the body occupies whole lines; without
/// it, the body's tail merges into the line that follows the splice point.
pub fn inject(
    contents: &str,
    location: &InjectLocation,
    body: &str,
    skip_if: Option<&str>,
    trailing_newline: bool,
) -> Result<InjectOutcome, String> {
    if let Some(pattern) = skip_if {
        let re = build_pattern(pattern, true)?;
        if re.is_match(contents) {
            return Ok(InjectOutcome::Skipped);
        }
    }

    let eol = dominant_eol(contents);
    let text = contents.replace("\r\n", "\n");

    let mut body_final = body.replace("\r\n", "\n");
    if trailing_newline {
        while body_final.ends_with('\n') {
            body_final.pop();
        }
        body_final.push('\n');
    } else {
        while body_final.ends_with('\n') {
            body_final.pop();
        }
    }

    let offset = splice_offset(&text, location)?;

    let mut insert = String::new();
    if offset == text.len() && !text.is_empty() && !text.ends_with('\n') {
        insert.push('\n');
    }
    insert.push_str(&body_final);

    let mut out = String::with_capacity(text.len() + insert.len());
    out.push_str(&text[..offset]);
    out.push_str(&insert);
    out.push_str(&text[offset..]);

    if eol == "\r\n" {
        out = out.replace('\n', "\r\n");
    }

    Ok(InjectOutcome::Injected(out))
}

/// Compile a location/skip pattern. `spanning` allows the pattern to match
/// across lines (`.` matches newlines, `^`/`$` match line boundaries).
fn build_pattern(pattern: &str, spanning: bool) -> Result<regex::Regex, String> {
    RegexBuilder::new(pattern)
        .multi_line(spanning)
        .dot_matches_new_line(spanning)
        .build()
        .map_err(|e| format!("invalid injection pattern '{}': {}", pattern, e))
}

/// Byte offset of the start of a 0-based line within normalized text.
fn line_start_offset(text: &str, line_idx: usize) -> usize {
    if line_idx == 0 {
        return 0;
    }
    let mut seen = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            seen += 1;
            if seen == line_idx {
                return i + 1;
            }
        }
    }
    text.len()
}

/// 0-based index of the line containing a byte offset.
fn line_of_offset(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].matches('\n').count()
}

/// Compute the byte offset at which the body is spliced.
fn splice_offset(text: &str, location: &InjectLocation) -> Result<usize, String> {
    match location {
        InjectLocation::Prepend => Ok(0),
        InjectLocation::Append => Ok(text.len()),
        InjectLocation::Line(n) => {
            let idx = n.saturating_sub(1);
            Ok(line_start_offset(text, idx))
        }
        InjectLocation::Before(pattern) => {
            let line = find_pattern_line(text, pattern, false)?;
            Ok(line_start_offset(text, line))
        }
        InjectLocation::After(pattern) => {
            let line = find_pattern_line(text, pattern, true)?;
            Ok(line_start_offset(text, line + 1))
        }
    }
}

/// Find the 0-based line of the first pattern match. Tries a single-line
/// match first, then retries against the whole text allowing spans.
/// `end` selects the last line of the match instead of the first.
fn find_pattern_line(text: &str, pattern: &str, end: bool) -> Result<usize, String> {
    let single = build_pattern(pattern, false)?;
    for (i, line) in text.split('\n').enumerate() {
        if single.is_match(line) {
            return Ok(i);
        }
    }

    let spanning = build_pattern(pattern, true)?;
    if let Some(m) = spanning.find(text) {
        let offset = if end { m.end().saturating_sub(1) } else { m.start() };
        return Ok(line_of_offset(text, offset));
    }

    Err(format!("injection pattern '{}' not found in target", pattern))
}
