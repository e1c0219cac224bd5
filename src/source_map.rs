use sourcemap::{SourceMap, SourceMapBuilder};

use crate::errors::{InlinerError, Result};
use crate::rewriter::Rewrite;

/// Line/column lookup over a text, columns counted in chars
struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(index, _)| index + 1));
        Self { text, starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&start| start <= offset) - 1;
        let column = self.text[self.starts[line]..offset].chars().count();
        (line as u32, column as u32)
    }
}

struct RewriteMapper<'a> {
    builder: SourceMapBuilder,
    source_id: u32,
    original: LineIndex<'a>,
    output: LineIndex<'a>,
}

impl RewriteMapper<'_> {
    fn map(&mut self, output_offset: usize, original_offset: usize) {
        let (dst_line, dst_col) = self.output.position(output_offset);
        let (src_line, src_col) = self.original.position(original_offset);
        self.builder
            .add_raw(dst_line, dst_col, src_line, src_col, Some(self.source_id), None, false);
    }

    /// Map the start of an unchanged span and every line start inside it
    fn map_unchanged(&mut self, original_from: usize, original_to: usize, output_from: usize) {
        self.map(output_from, original_from);
        let span = &self.original.text[original_from..original_to];
        let line_starts: Vec<usize> = span
            .match_indices('\n')
            .map(|(index, _)| index + 1)
            .filter(|&start| start < span.len())
            .collect();
        for start in line_starts {
            self.map(output_from + start, original_from + start);
        }
    }
}

/// Source map from a rewritten template back to the original.
///
/// Every line of an unchanged span maps to its original line; each edit maps
/// its output start to the original edit start.
pub fn build_source_map(original: &str, rewrite: &Rewrite, file_name: &str) -> SourceMap {
    let mut builder = SourceMapBuilder::new(Some(file_name));
    let source_id = builder.add_source(file_name);
    builder.set_source_contents(source_id, Some(original));

    let mut mapper = RewriteMapper {
        builder,
        source_id,
        original: LineIndex::new(original),
        output: LineIndex::new(&rewrite.code),
    };

    let mut original_cursor = 0;
    let mut output_cursor = 0;
    for edit in &rewrite.edits {
        if edit.range.start > original_cursor {
            mapper.map_unchanged(original_cursor, edit.range.start, output_cursor);
        }
        output_cursor += edit.range.start - original_cursor;
        if !edit.replacement.is_empty() {
            mapper.map(output_cursor, edit.range.start);
        }
        output_cursor += edit.replacement.len();
        original_cursor = edit.range.end;
    }
    if original_cursor < original.len() {
        mapper.map_unchanged(original_cursor, original.len(), output_cursor);
    }

    mapper.builder.into_sourcemap()
}

/// Serialize a source map to JSON
pub fn source_map_to_json(map: &SourceMap) -> Result<String> {
    let mut bytes = Vec::new();
    map.to_writer(&mut bytes)
        .map_err(|e| InlinerError::SourceMapError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| InlinerError::SourceMapError(e.to_string()))
}
