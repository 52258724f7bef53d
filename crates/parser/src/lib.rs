//! Textual front end for quad-ir: a hand-written lexer and a recursive-descent
//! parser, parameterized by dialect. The translator uses it for the embedded
//! polyfill; the CLI uses it for user input.

mod lexer;
mod parser;

pub use lexer::Span;
pub use parser::parse;

use smallvec::SmallVec;
use std::fmt::Write;

/// Render the source lines around `span` with a caret marker, for terminal
/// diagnostics.
pub fn highlight_span(source: &str, span: Span, context_lines: usize) -> String {
    let mut line_ends: SmallVec<[usize; 128]> = SmallVec::new();
    line_ends.extend(source.char_indices().filter_map(|(i, c)| (c == '\n').then_some(i)));
    line_ends.push(source.len());

    let hit = line_ends.partition_point(|&end| end < span.start);
    let first = hit.saturating_sub(context_lines);
    let last = (hit + context_lines).min(line_ends.len() - 1);
    let number_width = (last + 1).to_string().len();

    let mut out = String::new();
    for line in first..=last {
        let start = if line == 0 { 0 } else { line_ends[line - 1] + 1 };
        let end = line_ends[line];
        writeln!(out, "{:>number_width$} | {}", line + 1, &source[start..end]).expect("write to string");
        if line == hit {
            let caret_start = span.start.saturating_sub(start) + number_width + 3;
            for _ in 0..caret_start {
                out.push(' ');
            }
            let width = span.end.max(span.start + 1).min(end + 1) - span.start;
            for _ in 0..width.max(1) {
                out.push('^');
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use qir_data::EvmDialect;

    #[test]
    fn highlight_marks_the_offending_token() {
        let source = "{\n    let x := bad token\n}\n";
        let errors = parse(source, &EvmDialect).unwrap_err();
        let span = errors[0].span.clone().expect("parser diagnostics carry spans");
        let rendered = highlight_span(source, span, 1);
        assert!(rendered.contains("let x := bad token"), "{rendered}");
        assert!(rendered.contains('^'), "{rendered}");
    }
}
