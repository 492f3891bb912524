//! Bytecode-offset to source-line tracing.
//!
//! Emission threads a [`BytecodeMappingTracer`] through every append so that
//! each bytecode offset a method body touches can be mapped to the output
//! line it ended up on. Per-method tracers are collected in a
//! [`SourceMapper`], which can shift them by a file-level header offset and
//! dump the whole table as text.

use std::collections::BTreeMap;

use crate::record::LineNumber;

// ============================================================================
// Tracer
// ============================================================================

/// Running bytecode-offset → source-line accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytecodeMappingTracer {
    current_line: u32,
    mapping: BTreeMap<u32, u32>,
    line_numbers: Option<Vec<LineNumber>>,
}

impl BytecodeMappingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracer whose current line starts at `line`.
    pub fn starting_at(line: u32) -> Self {
        BytecodeMappingTracer {
            current_line: line,
            ..Self::default()
        }
    }

    pub fn current_source_line(&self) -> u32 {
        self.current_line
    }

    pub fn increment_current_source_line(&mut self) {
        self.current_line += 1;
    }

    pub fn increment_current_source_line_by(&mut self, n: u32) {
        self.current_line += n;
    }

    pub fn set_current_source_line(&mut self, line: u32) {
        self.current_line = line;
    }

    /// Map `offset` to the current line. The first mapping for an offset wins.
    pub fn add_mapping(&mut self, offset: u32) {
        self.mapping.entry(offset).or_insert(self.current_line);
    }

    pub fn add_mappings(&mut self, offsets: impl IntoIterator<Item = u32>) {
        for offset in offsets {
            self.add_mapping(offset);
        }
    }

    /// Merge another tracer's mappings into this one. Existing entries win.
    pub fn add_tracer(&mut self, other: &BytecodeMappingTracer) {
        for (&offset, &line) in &other.mapping {
            self.mapping.entry(offset).or_insert(line);
        }
    }

    pub fn mapping(&self) -> &BTreeMap<u32, u32> {
        &self.mapping
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn set_line_number_table(&mut self, table: Vec<LineNumber>) {
        self.line_numbers = (!table.is_empty()).then_some(table);
    }

    /// Emitted line → original line, using the method's `LineNumberTable`.
    ///
    /// An offset maps to the entry with the greatest `start_pc` not after it.
    pub fn original_lines_mapping(&self) -> BTreeMap<u32, u32> {
        let mut out = BTreeMap::new();
        let Some(table) = &self.line_numbers else {
            return out;
        };
        for (&offset, &line) in &self.mapping {
            let original = table
                .iter()
                .filter(|e| e.start_pc <= offset)
                .max_by_key(|e| e.start_pc);
            if let Some(entry) = original {
                out.entry(line).or_insert(entry.line);
            }
        }
        out
    }
}

// ============================================================================
// Source Mapper
// ============================================================================

/// Per-class, per-method offset tables for one output file.
#[derive(Debug, Clone, Default)]
pub struct SourceMapper {
    classes: BTreeMap<String, BTreeMap<String, BTreeMap<u32, u32>>>,
    original_lines: BTreeMap<u32, u32>,
    total_offset: u32,
}

impl SourceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a method's tracer under `class` and `method_key`.
    pub fn add_tracer(&mut self, class: &str, method_key: &str, tracer: &BytecodeMappingTracer) {
        let methods = self.classes.entry(class.to_string()).or_default();
        let table = methods.entry(method_key.to_string()).or_default();
        for (&offset, &line) in tracer.mapping() {
            table.entry(offset).or_insert(line);
        }
        for (line, original) in tracer.original_lines_mapping() {
            self.original_lines.entry(line).or_insert(original);
        }
    }

    /// Shift all lines by `lines` (header lines written before the class body).
    pub fn add_total_offset(&mut self, lines: u32) {
        self.total_offset += lines;
    }

    pub fn total_offset(&self) -> u32 {
        self.total_offset
    }

    /// The offset table for one method, already shifted by the total offset.
    pub fn method_table(&self, class: &str, method_key: &str) -> Option<BTreeMap<u32, u32>> {
        let table = self.classes.get(class)?.get(method_key)?;
        Some(
            table
                .iter()
                .map(|(&offset, &line)| (offset, line + self.total_offset))
                .collect(),
        )
    }

    /// All tables, shifted: class → method key → offset → line.
    pub fn tables(&self) -> BTreeMap<String, BTreeMap<String, BTreeMap<u32, u32>>> {
        self.classes
            .iter()
            .map(|(class, methods)| {
                let shifted = methods
                    .iter()
                    .map(|(key, table)| {
                        let table = table
                            .iter()
                            .map(|(&offset, &line)| (offset, line + self.total_offset))
                            .collect();
                        (key.clone(), table)
                    })
                    .collect();
                (class.clone(), shifted)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.values().all(|m| m.values().all(|t| t.is_empty()))
    }

    /// Render the tables as a text block.
    pub fn dump(&self, indent: &str, line_separator: &str) -> String {
        let mut out = String::new();
        for (class, methods) in &self.classes {
            out.push_str(&format!("class '{}' {{{}", class, line_separator));
            let mut first = true;
            for (key, table) in methods {
                if table.is_empty() {
                    continue;
                }
                if !first {
                    out.push_str(line_separator);
                }
                first = false;
                out.push_str(&format!("{}method '{}' {{{}", indent, key, line_separator));
                for (&offset, &line) in table {
                    out.push_str(&format!(
                        "{0}{0}{1:<6x}{0}{0}{2}{3}",
                        indent,
                        offset,
                        line + self.total_offset,
                        line_separator
                    ));
                }
                out.push_str(&format!("{}}}{}", indent, line_separator));
            }
            out.push_str(&format!("}}{}", line_separator));
            out.push_str(line_separator);
        }
        if !self.original_lines.is_empty() {
            out.push_str("Lines mapping:");
            out.push_str(line_separator);
            for (line, original) in &self.original_lines {
                out.push_str(&format!(
                    "{} <-> {}{}",
                    original,
                    line + self.total_offset,
                    line_separator
                ));
            }
        }
        out
    }
}
