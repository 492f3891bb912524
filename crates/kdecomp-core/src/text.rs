//! Output text buffer.
//!
//! [`TextBuffer`] is a `String` that knows the configured indent unit and
//! line separator, so emitters never hard-code either. Line counting is
//! done on separators, which keeps the tracer in step with what was
//! actually written regardless of platform.

use std::fmt;

/// Default indent unit.
pub const DEFAULT_INDENT: &str = "   ";

/// Growable source text with a fixed indent unit and line separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    indent: String,
    line_separator: String,
}

impl Default for TextBuffer {
    fn default() -> Self {
        TextBuffer::new(DEFAULT_INDENT, "\n")
    }
}

impl TextBuffer {
    pub fn new(indent: &str, line_separator: &str) -> Self {
        TextBuffer {
            text: String::new(),
            indent: indent.to_string(),
            line_separator: line_separator.to_string(),
        }
    }

    /// An empty buffer with the same indent and separator as `self`.
    pub fn fork(&self) -> Self {
        TextBuffer::new(&self.indent, &self.line_separator)
    }

    pub fn append(&mut self, s: &str) -> &mut Self {
        self.text.push_str(s);
        self
    }

    pub fn append_char(&mut self, c: char) -> &mut Self {
        self.text.push(c);
        self
    }

    pub fn append_indent(&mut self, level: usize) -> &mut Self {
        for _ in 0..level {
            self.text.push_str(&self.indent);
        }
        self
    }

    pub fn append_line_separator(&mut self) -> &mut Self {
        self.text.push_str(&self.line_separator);
        self
    }

    /// Indent, text, separator.
    pub fn append_line(&mut self, level: usize, s: &str) -> &mut Self {
        self.append_indent(level).append(s).append_line_separator()
    }

    /// Append another buffer's text.
    pub fn append_buffer(&mut self, other: &TextBuffer) -> &mut Self {
        self.text.push_str(&other.text);
        self
    }

    pub fn insert(&mut self, at: usize, s: &str) {
        self.text.insert_str(at, s);
    }

    pub fn truncate(&mut self, len: usize) {
        self.text.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn line_separator(&self) -> &str {
        &self.line_separator
    }

    pub fn indent_unit(&self) -> &str {
        &self.indent
    }

    /// The indent string for `level`.
    pub fn indent_string(&self, level: usize) -> String {
        self.indent.repeat(level)
    }

    /// Number of line separators in the whole buffer.
    pub fn count_lines(&self) -> u32 {
        count_lines(&self.text, &self.line_separator)
    }

    /// Number of line separators written at or after byte `start`.
    pub fn count_lines_from(&self, start: usize) -> u32 {
        self.text
            .get(start..)
            .map_or(0, |tail| count_lines(tail, &self.line_separator))
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Count occurrences of `separator` in `text`.
pub fn count_lines(text: &str, separator: &str) -> u32 {
    if separator.is_empty() {
        return 0;
    }
    text.matches(separator).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_chain() {
        let mut buf = TextBuffer::new("  ", "\n");
        buf.append_indent(2).append("x").append_line_separator();
        buf.append_line(1, "y");
        assert_eq!(buf.as_str(), "    x\n  y\n");
        assert_eq!(buf.count_lines(), 2);
    }

    #[test]
    fn counts_from_offset() {
        let mut buf = TextBuffer::new("\t", "\r\n");
        buf.append_line(0, "a");
        let mark = buf.len();
        buf.append_line(1, "b").append_line(1, "c");
        assert_eq!(buf.count_lines_from(mark), 2);
        assert_eq!(buf.count_lines_from(buf.len() + 10), 0);
        assert_eq!(buf.as_str(), "a\r\n\tb\r\n\tc\r\n");
    }

    #[test]
    fn insert_and_truncate() {
        let mut buf = TextBuffer::default();
        buf.append("class A {}");
        buf.insert(0, "package a\n\n");
        assert_eq!(buf.count_lines(), 2);
        buf.truncate(9);
        assert_eq!(buf.as_str(), "package a");
        assert_eq!(buf.fork().indent_string(2), "      ");
    }
}
