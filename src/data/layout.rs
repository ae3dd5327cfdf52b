use std::path::Path;

use log::debug;

use super::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Fixed line layout
// ---------------------------------------------------------------------------

/// Lines `0..9` hold `Key: Value` metadata.
pub const METADATA_LINES: usize = 9;
/// Line 9 is reserved and never read; the grid header sits on line 10.
pub const HEADER_LINE: usize = 10;
/// Numeric rows start here and run to the end of the file.
pub const FIRST_DATA_LINE: usize = 11;

/// One `Key: Value` line from the metadata block, both sides trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    /// 1-based line number in the source file.
    pub line: usize,
    pub key: String,
    pub value: String,
}

/// The three slices of a measurement file, before any domain decoding.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub metadata: Vec<MetadataEntry>,
    /// Column names from the header line, in file order.
    pub schema: Vec<String>,
    /// Numeric rows, each exactly `schema.len()` wide.
    pub rows: Vec<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read a whole file into memory, then parse it. The handle is closed
/// before parsing starts.
pub fn read_file(path: &Path) -> Result<RawFile> {
    let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {}", text.len(), path.display());
    parse(&text)
}

/// Split file content into metadata entries, grid schema and numeric rows.
pub fn parse(text: &str) -> Result<RawFile> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= FIRST_DATA_LINE {
        return Err(DataError::malformed(
            lines.len(),
            format!(
                "expected at least {} lines, found {}",
                FIRST_DATA_LINE + 1,
                lines.len()
            ),
        ));
    }

    let metadata = lines[..METADATA_LINES]
        .iter()
        .enumerate()
        .map(|(i, line)| parse_metadata_line(i + 1, line))
        .collect::<Result<Vec<_>>>()?;

    let schema: Vec<String> = lines[HEADER_LINE]
        .split('\t')
        .map(|tok| tok.trim().to_string())
        .collect();

    let rows = parse_grid(&lines[FIRST_DATA_LINE..], schema.len())?;

    Ok(RawFile {
        metadata,
        schema,
        rows,
    })
}

fn parse_metadata_line(line_no: usize, line: &str) -> Result<MetadataEntry> {
    let (key, value) = line
        .split_once(':')
        .ok_or_else(|| DataError::malformed(line_no, format!("no ':' in metadata line '{line}'")))?;
    Ok(MetadataEntry {
        line: line_no,
        key: key.trim().to_string(),
        value: value.trim().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Grid block
// ---------------------------------------------------------------------------

/// Tab-separated numeric block. Every line, blank ones included, must have
/// exactly `width` numeric tokens; only the final line terminator is optional.
fn parse_grid(lines: &[&str], width: usize) -> Result<Vec<Vec<f64>>> {
    let block = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(block.as_bytes());

    let mut rows = Vec::with_capacity(lines.len());
    // 1-based line within the block that the next record must start on.
    let mut expected = 1;
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e
                .position()
                .map(|p| p.line() as usize + FIRST_DATA_LINE)
                .unwrap_or(FIRST_DATA_LINE + 1);
            DataError::malformed(line, e.to_string())
        })?;
        let line_no = record
            .position()
            .map(|p| p.line() as usize + FIRST_DATA_LINE)
            .unwrap_or(FIRST_DATA_LINE + rows.len() + 1);

        // The reader silently drops empty lines; a gap means one was here.
        if line_no > expected + FIRST_DATA_LINE {
            return Err(blank_line(expected));
        }
        expected = line_no - FIRST_DATA_LINE + 1;

        if record.len() != width {
            return Err(DataError::malformed(
                line_no,
                format!("expected {width} values, found {}", record.len()),
            ));
        }

        let row = record
            .iter()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| DataError::malformed(line_no, format!("'{tok}' is not a number")))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    if expected <= lines.len() {
        return Err(blank_line(expected));
    }
    Ok(rows)
}

fn blank_line(block_line: usize) -> DataError {
    DataError::malformed(block_line + FIRST_DATA_LINE, "blank line in data block")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> String {
        [
            "ID: 101",
            "TypeExp: DISNEU",
            "TypeTheo: F2",
            "TypeCurrent: NC",
            "A1: 1.0",
            "A2: 12.0",
            "Z1: 1.0",
            "Z2: 6.0",
            "KinVar: [Q2, X, Y]",
            "this line is never read",
            "Q2\tX\tY\tdata\ttheory\ttotErrorUncor\tchi2Corr",
            "4.0\t0.1\t0.5\t1.0\t1.05\t0.1\t0.25",
            "8.0\t0.2\t0.5\t0.9\t0.95\t0.1\t0.5",
        ]
        .join("\n")
    }

    #[test]
    fn splits_file_into_three_blocks() {
        let raw = parse(&sample_text()).unwrap();
        assert_eq!(raw.metadata.len(), METADATA_LINES);
        assert_eq!(raw.metadata[0].key, "ID");
        assert_eq!(raw.metadata[0].value, "101");
        assert_eq!(raw.metadata[8].value, "[Q2, X, Y]");
        assert_eq!(
            raw.schema,
            vec!["Q2", "X", "Y", "data", "theory", "totErrorUncor", "chi2Corr"]
        );
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[1], vec![8.0, 0.2, 0.5, 0.9, 0.95, 0.1, 0.5]);
    }

    #[test]
    fn reserved_line_is_ignored_whatever_it_holds() {
        let text = sample_text().replace("this line is never read", "garbage\twithout: structure");
        assert!(parse(&text).is_ok());
    }

    #[test]
    fn metadata_value_keeps_everything_after_first_colon() {
        let text = sample_text().replace("TypeTheo: F2", "TypeTheo: ratio: F2/F2");
        let raw = parse(&text).unwrap();
        assert_eq!(raw.metadata[2].value, "ratio: F2/F2");
    }

    #[test]
    fn trailing_newline_and_crlf_are_tolerated() {
        let text = sample_text().replace('\n', "\r\n") + "\r\n";
        let raw = parse(&text).unwrap();
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.schema.last().map(String::as_str), Some("chi2Corr"));
    }

    #[test]
    fn short_file_is_malformed() {
        let text: String = sample_text().lines().take(11).collect::<Vec<_>>().join("\n");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, DataError::MalformedFile { line: 11, .. }));
    }

    #[test]
    fn metadata_without_separator_is_malformed() {
        let text = sample_text().replace("TypeCurrent: NC", "TypeCurrent NC");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, DataError::MalformedFile { line: 4, .. }));
    }

    #[test]
    fn non_numeric_token_reports_its_line() {
        let text = sample_text().replace("8.0\t0.2", "8.0\tabc");
        match parse(&text).unwrap_err() {
            DataError::MalformedFile { line, reason } => {
                assert_eq!(line, 13);
                assert!(reason.contains("abc"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn blank_line_inside_data_is_malformed() {
        let text = sample_text().replace("0.25\n8.0", "0.25\n\n8.0");
        assert!(matches!(
            parse(&text).unwrap_err(),
            DataError::MalformedFile { line: 13, .. }
        ));
    }

    #[test]
    fn blank_first_data_line_does_not_shift_the_block() {
        let text = sample_text().replace("chi2Corr\n4.0", "chi2Corr\n\n4.0");
        assert!(matches!(
            parse(&text).unwrap_err(),
            DataError::MalformedFile { line: 12, .. }
        ));
    }

    #[test]
    fn blank_lines_after_data_are_malformed() {
        let text = sample_text() + "\n\n";
        assert!(matches!(
            parse(&text).unwrap_err(),
            DataError::MalformedFile { line: 14, .. }
        ));
    }

    #[test]
    fn ragged_row_is_malformed() {
        let text = sample_text().replace("\t0.5\t0.9", "\t0.9");
        assert!(matches!(
            parse(&text).unwrap_err(),
            DataError::MalformedFile { line: 13, .. }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_file(Path::new("/definitely/not/here.dat")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
