use log::{debug, info};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

lazy_static::lazy_static! {
    /// Lines have to start like a number to be considered data, everything else is a header.
    static ref DATA_LINE: Regex = Regex::new(r"^[-0-9.]").unwrap();
    static ref DELIMITER: Regex = Regex::new(r"[,\t]").unwrap();
    /// Tokens handed to the float parser; anything else is a group label.
    static ref NUMBER_TOKEN: Regex = Regex::new(r"^[-+]?([0-9.]|NaN$|Infinity$)").unwrap();
}

/// Characters that delimit payloads in the model text format.
const RESERVED_LABEL_CHARS: &[char] = &['(', ')', '[', ']', ',', '='];

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read dataset file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Invalid value '{value}' on line {line}")]
    InvalidValue { line: usize, value: String },
    #[error("Group is already defined on line {line}: '{first}' and '{second}'")]
    DuplicateGroup {
        line: usize,
        first: String,
        second: String,
    },
    #[error("Group label '{label}' on line {line} contains one of ( ) [ ] , =")]
    InvalidGroup { line: usize, label: String },
    #[error("No values found on line {line}")]
    NoValues { line: usize },
    #[error("Invalid input length in row {row}. Expected {expected}, found {found}")]
    InconsistentLength {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// A single sample: the target `y`, an optional group label and the inputs `x⃗`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub y: f64,
    pub group: Option<String>,
    pub x: Vec<f64>,
}

impl DataRow {
    pub fn new(y: f64, x: Vec<f64>) -> Self {
        Self { y, group: None, x }
    }

    pub fn with_group(y: f64, group: impl Into<String>, x: Vec<f64>) -> Self {
        Self {
            y,
            group: Some(group.into()),
            x,
        }
    }
}

/// The full dataset of a run, with the x length and group labels derived once.
#[derive(Debug, Clone)]
pub struct DataInput {
    rows: Vec<DataRow>,
    x_length: usize,
    groups: Arc<[String]>,
}

impl DataInput {
    /// Builds a dataset, checking that every row carries the same number of inputs.
    ///
    /// # Arguments
    /// * `rows` - The samples, in file order
    ///
    /// # Returns
    /// * `Result<Self, DataError>` - `DataError::InconsistentLength` names the first offending row
    pub fn new(rows: Vec<DataRow>) -> Result<Self, DataError> {
        let x_length = rows.first().map(|row| row.x.len()).unwrap_or(0);
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.x.len() != x_length)
            .map(|(i, row)| (i, row.x.len()))
        {
            return Err(DataError::InconsistentLength {
                row,
                expected: x_length,
                found,
            });
        }

        let groups: BTreeSet<&str> = rows.iter().filter_map(|r| r.group.as_deref()).collect();
        let groups: Arc<[String]> = groups.into_iter().map(String::from).collect();

        Ok(Self {
            rows,
            x_length,
            groups,
        })
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn x_length(&self) -> usize {
        self.x_length
    }

    /// Distinct group labels, sorted.
    pub fn groups(&self) -> &Arc<[String]> {
        &self.groups
    }

    /// The dataset used when no file is given on the command line.
    pub fn sample() -> Self {
        Self {
            rows: vec![
                DataRow::new(3.0, vec![0.0]),
                DataRow::new(-17.0, vec![5.0]),
                DataRow::new(15.0, vec![-3.0]),
            ],
            x_length: 1,
            groups: Arc::from(Vec::new()),
        }
    }
}

enum Token<'a> {
    Number(f64),
    Label(&'a str),
}

fn parse_token(token: &str, line: usize) -> Result<Token<'_>, DataError> {
    if !NUMBER_TOKEN.is_match(token) {
        return parse_label(token, line);
    }
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Token::Number(value)),
        Ok(_) => Err(DataError::InvalidValue {
            line,
            value: token.to_string(),
        }),
        Err(_) => parse_label(token, line),
    }
}

fn parse_label(token: &str, line: usize) -> Result<Token<'_>, DataError> {
    if token.contains(RESERVED_LABEL_CHARS) {
        return Err(DataError::InvalidGroup {
            line,
            label: token.to_string(),
        });
    }
    Ok(Token::Label(token))
}

/// Parses dataset text: comma or tab delimited, first number is `y`, the remaining ones are `x⃗`.
///
/// At most one non-numeric token per line is taken as the group label; labels may not
/// contain `( ) [ ] , =`. Lines that do not
/// start with a digit, `-` or `.` are skipped, so header lines are tolerated.
pub fn parse_rows(content: &str) -> Result<Vec<DataRow>, DataError> {
    let mut rows = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if !DATA_LINE.is_match(line) {
            debug!("Skipping non-data line {}: {}", line_number, line);
            continue;
        }

        let mut values = Vec::new();
        let mut group: Option<&str> = None;
        for token in DELIMITER.split(line).map(str::trim).filter(|t| !t.is_empty()) {
            match parse_token(token, line_number)? {
                Token::Number(value) => values.push(value),
                Token::Label(label) => {
                    if let Some(first) = group {
                        return Err(DataError::DuplicateGroup {
                            line: line_number,
                            first: first.to_string(),
                            second: label.to_string(),
                        });
                    }
                    group = Some(label);
                }
            }
        }

        if values.is_empty() {
            return Err(DataError::NoValues { line: line_number });
        }
        let y = values.remove(0);
        rows.push(DataRow {
            y,
            group: group.map(String::from),
            x: values,
        });
    }

    Ok(rows)
}

/// Loads a dataset file into a validated `DataInput`.
pub fn load_data(path: &Path) -> Result<DataInput, DataError> {
    let content = fs::read_to_string(path)?;
    let input = DataInput::new(parse_rows(&content)?)?;
    info!(
        "Loaded {} rows with {} inputs and {} groups from '{}'",
        input.rows().len(),
        input.x_length(),
        input.groups().len(),
        path.display()
    );
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn assert_example_rows(rows: &[DataRow]) {
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].y, 10.2);
        assert_eq!(rows[0].x, vec![20.2, 30.2]);
        assert_eq!(rows[1].y, -10.1);
        assert_eq!(rows[1].x, vec![-20.1, -30.1]);
    }

    #[test]
    fn test_load_csv_with_header_and_groups() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("example_with_header.csv");
        let mut file = File::create(&file_path).unwrap();

        writeln!(file, "y,group,x1,x2").unwrap();
        writeln!(file, "10.2,a,20.2,30.2").unwrap();
        writeln!(file, "-10.1,b,-20.1,-30.1").unwrap();

        let input = load_data(&file_path).unwrap();
        assert_example_rows(input.rows());
        assert_eq!(input.rows()[0].group.as_deref(), Some("a"));
        assert_eq!(input.rows()[1].group.as_deref(), Some("b"));
        assert_eq!(input.x_length(), 2);
        assert_eq!(&input.groups()[..], &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_load_tsv_without_header() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("example_without_header.tsv");
        let mut file = File::create(&file_path).unwrap();

        writeln!(file, "10.2\t20.2\t30.2").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  -10.1\t-20.1\t-30.1  ").unwrap();

        let input = load_data(&file_path).unwrap();
        assert_example_rows(input.rows());
        assert!(input.groups().is_empty());
    }

    #[test]
    fn test_second_group_is_rejected() {
        let result = parse_rows("1.0,a,b,2.0");
        assert!(matches!(result, Err(DataError::DuplicateGroup { line: 1, .. })));
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let result = parse_rows("1.0,2.0\n.5,NaN");
        assert!(matches!(result, Err(DataError::InvalidValue { line: 2, .. })));
    }

    #[test]
    fn test_line_without_values_is_rejected() {
        let result = parse_rows("-abc");
        assert!(matches!(result, Err(DataError::NoValues { line: 1 })));
    }

    #[test]
    fn test_inconsistent_x_length() {
        let rows = vec![DataRow::new(1.0, vec![1.0]), DataRow::new(2.0, vec![1.0, 2.0])];
        let result = DataInput::new(rows);
        assert!(matches!(
            result,
            Err(DataError::InconsistentLength {
                row: 1,
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_groups_are_sorted_and_distinct() {
        let rows = vec![
            DataRow::with_group(1.0, "def", vec![]),
            DataRow::new(1.0, vec![]),
            DataRow::with_group(1.0, "abc", vec![]),
            DataRow::with_group(1.0, "def", vec![]),
        ];
        let input = DataInput::new(rows).unwrap();
        assert_eq!(&input.groups()[..], &["abc".to_string(), "def".to_string()]);
    }

    #[test]
    fn test_word_like_numbers_are_group_labels() {
        let rows = parse_rows("1.0,inf,2.0\n2.0,nan,3.0\n3.0,Inf,4.0").unwrap();
        let groups: Vec<&str> = rows.iter().filter_map(|r| r.group.as_deref()).collect();
        assert_eq!(groups, vec!["inf", "nan", "Inf"]);
        assert_eq!(rows[0].x, vec![2.0]);
    }

    #[test]
    fn test_infinity_is_rejected() {
        let result = parse_rows("1.0,-Infinity");
        assert!(matches!(result, Err(DataError::InvalidValue { line: 1, .. })));
    }

    #[test]
    fn test_label_with_format_characters_is_rejected() {
        let result = parse_rows("1.0,a,2.0\n1.0,site(a),2.0");
        match result {
            Err(DataError::InvalidGroup { line, label }) => {
                assert_eq!(line, 2);
                assert_eq!(label, "site(a)");
            }
            other => panic!("unexpected result {:?}", other),
        }
        for label in ["b]x", "[c", "k=v"] {
            let content = format!("1.0,{},2.0", label);
            assert!(matches!(parse_rows(&content), Err(DataError::InvalidGroup { .. })));
        }
    }
}
