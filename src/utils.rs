use std::fmt;

/// Calculates the 1-based line and column number for a given byte offset in the source text.
/// This function is designed to be called only when a diagnostic is created, as it iterates
/// through the source text to determine the position.
pub fn get_line_and_column(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// A line/column range, rendered as `(startLine:startCol,endLine:endCol)`.
/// The end column points one past the last character of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl LineRange {
    pub fn from_offsets(source: &str, start: usize, end: usize) -> Self {
        let (start_line, start_column) = get_line_and_column(source, start);
        let (end_line, end_column) = get_line_and_column(source, end);
        LineRange {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}:{},{}:{})",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}
