//! Code-point-indexed source text.
//!
//! All offsets in the pipeline are counted in Unicode scalar values, not
//! UTF-8 bytes or UTF-16 units, so multi-unit characters (emoji and
//! friends) are always lexed as single units. Conversion to and from
//! `&str` happens only at the I/O boundary.

use std::fmt;

use serde::Serialize;

/// A half-open range of code-point offsets into source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

impl TextSpan {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Span covering `start..end`.
    pub fn from_bounds(start: usize, end: usize) -> Self {
        debug_assert!(end >= start, "span end before start");
        Self {
            start,
            length: end - start,
        }
    }

    pub fn end(self) -> usize {
        self.start + self.length
    }
}

/// An owned sequence of Unicode scalar values.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct CodePointString {
    code_points: Vec<char>,
}

impl CodePointString {
    pub fn len(&self) -> usize {
        self.code_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code_points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<char> {
        self.code_points.get(index).copied()
    }

    pub fn substring(&self, start: usize, end: usize) -> CodePointString {
        self.code_points
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .copied()
            .collect()
    }
}

impl From<&str> for CodePointString {
    fn from(value: &str) -> Self {
        value.chars().collect()
    }
}

impl FromIterator<char> for CodePointString {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        Self {
            code_points: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CodePointString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.code_points {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CodePointString {
    // Renders like a string literal instead of a char vector.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

/// One line of a [`SourceText`], with and without its trailing line break.
#[derive(Debug, Clone, Copy)]
pub struct TextLine {
    start: usize,
    length: usize,
    length_including_line_break: usize,
}

impl TextLine {
    pub fn span(&self) -> TextSpan {
        TextSpan::new(self.start, self.length)
    }

    pub fn span_including_line_break(&self) -> TextSpan {
        TextSpan::new(self.start, self.length_including_line_break)
    }
}

/// Immutable line-indexed view over input text.
pub struct SourceText {
    text: CodePointString,
    lines: Vec<TextLine>,
}

impl SourceText {
    pub fn new(text: &str) -> Self {
        let text = CodePointString::from(text);
        let lines = parse_lines(&text);
        Self { text, lines }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Code point at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<char> {
        self.text.get(index)
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// Index of the line containing `position`, by binary search over the
    /// precomputed line spans.
    pub fn line_index(&self, position: usize) -> usize {
        let mut lower = 0;
        let mut upper = self.lines.len() - 1;

        while lower <= upper {
            let index = lower + (upper - lower) / 2;
            let Some(start) = self.lines.get(index).map(|line| line.start) else {
                break;
            };

            if position == start {
                return index;
            }

            if start > position {
                if index == 0 {
                    break;
                }
                upper = index - 1;
            } else {
                lower = index + 1;
            }
        }

        lower.saturating_sub(1)
    }

    pub fn substring(&self, span: TextSpan) -> CodePointString {
        self.text.substring(span.start, span.end())
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.text.fmt(f)
    }
}

fn parse_lines(text: &CodePointString) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut position = 0;
    let mut line_start = 0;

    while position < text.len() {
        let line_break_width = line_break_width(text, position);
        if line_break_width == 0 {
            position += 1;
        } else {
            lines.push(make_line(position, line_start, line_break_width));
            position += line_break_width;
            line_start = position;
        }
    }

    lines.push(make_line(position, line_start, 0));
    lines
}

fn make_line(position: usize, line_start: usize, line_break_width: usize) -> TextLine {
    let length = position - line_start;
    TextLine {
        start: line_start,
        length,
        length_including_line_break: length + line_break_width,
    }
}

fn line_break_width(text: &CodePointString, position: usize) -> usize {
    match (text.get(position), text.get(position + 1)) {
        (Some('\r'), Some('\n')) => 2,
        (Some('\r' | '\n'), _) => 1,
        _ => 0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_one_line() {
        let text = SourceText::new("");
        assert_eq!(text.lines().len(), 1);
    }

    #[test]
    fn line_count_for_mixed_line_breaks() {
        for (input, expected) in [
            (".", 1),
            (".\r\n", 2),
            (".\r\n\r\n", 3),
            ("a\nb", 2),
            ("a\rb", 2),
        ] {
            let text = SourceText::new(input);
            assert_eq!(text.lines().len(), expected, "input {input:?}");
        }
    }

    #[test]
    fn line_index_finds_containing_line() {
        let text = SourceText::new("ab\ncd\nef");
        assert_eq!(text.line_index(0), 0);
        assert_eq!(text.line_index(1), 0);
        assert_eq!(text.line_index(3), 1);
        assert_eq!(text.line_index(4), 1);
        assert_eq!(text.line_index(6), 2);
        assert_eq!(text.line_index(7), 2);
    }

    #[test]
    fn crlf_belongs_to_the_line_it_terminates() {
        let text = SourceText::new("ab\r\ncd");
        let first = text.lines()[0];
        assert_eq!(first.span().length, 2);
        assert_eq!(first.span_including_line_break().length, 4);
        assert_eq!(text.line_index(4), 1);
    }

    #[test]
    fn offsets_count_code_points_not_utf8_bytes() {
        let text = SourceText::new("a😀b");
        assert_eq!(text.len(), 3);
        assert_eq!(text.get(1), Some('😀'));
        assert_eq!(text.substring(TextSpan::new(1, 1)).to_string(), "😀");
    }

    #[test]
    fn substring_round_trips() {
        let text = SourceText::new("var x = 10");
        assert_eq!(text.substring(TextSpan::new(4, 1)).to_string(), "x");
        assert_eq!(text.substring(TextSpan::from_bounds(0, 3)).to_string(), "var");
    }
}
