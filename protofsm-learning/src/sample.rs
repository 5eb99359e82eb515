//! Loading symbol sequences from files.
//!
//! Two formats are understood. The text format has one session per line, the session name is
//! separated from the whitespace separated symbols by a colon:
//! ```text
//! # comment
//! alice: HELLO AUTH DATA BYE
//! bob:
//! ```
//! A session without symbols stands for the empty sequence. The csv format lists one
//! observed symbol per row as `session,symbol`, the sequence of a session consists of its
//! symbols in the order of the rows.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use protofsm_core::math;
use tracing::{debug, trace};

use crate::{prefixtree::Sequences, SampleParseError};

/// The file formats a sample can be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    Text,
    Csv,
}

/// Parses the text format from the given lines.
pub fn try_from_lines<I: Iterator<Item = String>>(
    lines: I,
) -> Result<Sequences<String>, SampleParseError> {
    let mut sequences = math::Map::default();
    for (number, line) in lines.enumerate().map(|(i, line)| (i + 1, line)) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (session, symbols) = line
            .split_once(':')
            .ok_or(SampleParseError::MissingDelimiter(number))?;
        let session = session.trim();
        if session.is_empty() {
            return Err(SampleParseError::EmptySession(number));
        }
        if sequences.contains_key(session) {
            return Err(SampleParseError::DuplicateSession(
                number,
                session.to_string(),
            ));
        }
        let symbols: Vec<String> = symbols.split_whitespace().map(str::to_string).collect();
        trace!("line {number}: session {session} with {symbols:?}");
        sequences.insert(session.to_string(), symbols);
    }
    debug!("parsed {} sessions", sequences.len());
    Ok(sequences)
}

/// Parses the text format from a string.
pub fn try_from_str(input: &str) -> Result<Sequences<String>, SampleParseError> {
    try_from_lines(input.lines().map(|l| l.to_string()))
}

/// Parses the text format from a reader.
pub fn try_from_read<R: BufRead>(read: R) -> Result<Sequences<String>, SampleParseError> {
    let lines = read.lines().collect::<Result<Vec<_>, _>>()?;
    try_from_lines(lines.into_iter())
}

/// Parses the csv format. Rows may have surrounding whitespace and lines starting with `#`
/// are ignored. A row consisting of a session name only, or one with an empty symbol,
/// declares the session without adding a symbol to it.
pub fn try_from_csv<R: Read>(read: R) -> Result<Sequences<String>, SampleParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(read);

    let mut sequences: Sequences<String> = math::Map::default();
    for (number, record) in reader.records().enumerate().map(|(i, r)| (i + 1, r)) {
        let record = record?;
        let Some(session) = record.get(0).filter(|session| !session.is_empty()) else {
            return Err(SampleParseError::EmptySession(
                record.position().map_or(number, |p| p.line() as usize),
            ));
        };
        let sequence = sequences.entry(session.to_string()).or_default();
        if let Some(symbol) = record.get(1).filter(|symbol| !symbol.is_empty()) {
            sequence.push(symbol.to_string());
        }
    }
    debug!("parsed {} sessions from csv", sequences.len());
    Ok(sequences)
}

/// Opens the file at `path` and parses it in the given format.
pub fn load<P: AsRef<Path>>(
    path: P,
    format: SampleFormat,
) -> Result<Sequences<String>, SampleParseError> {
    let file = File::open(path.as_ref())?;
    debug!("loading {format:?} sample from {}", path.as_ref().display());
    match format {
        SampleFormat::Text => try_from_read(BufReader::new(file)),
        SampleFormat::Csv => try_from_csv(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn parse_text() {
        let sample = try_from_str(
            r#"
            # a comment
            alice: HELLO AUTH  DATA BYE
            bob:HELLO BYE
            carol:
            "#,
        )
        .unwrap();
        assert_eq!(sample.len(), 3);
        assert_eq!(sample["alice"], vec!["HELLO", "AUTH", "DATA", "BYE"]);
        assert_eq!(sample["bob"], vec!["HELLO", "BYE"]);
        assert!(sample["carol"].is_empty());
        assert_eq!(
            sample.keys().collect::<Vec<_>>(),
            vec!["alice", "bob", "carol"]
        );
    }

    #[test]
    fn text_errors() {
        assert!(matches!(
            try_from_str("a: x\nno delimiter"),
            Err(SampleParseError::MissingDelimiter(2))
        ));
        assert!(matches!(
            try_from_str(" : x"),
            Err(SampleParseError::EmptySession(1))
        ));
        match try_from_str("a: x\n\na: y") {
            Err(SampleParseError::DuplicateSession(3, session)) => assert_eq!(session, "a"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn read_text() {
        let sample = try_from_read("s1: a b\ns2: a c\n".as_bytes()).unwrap();
        assert_eq!(sample["s2"], vec!["a", "c"]);
    }

    #[test_log::test]
    fn parse_csv() {
        let input = "\
# session,symbol
s1,HELLO
s2 , HELLO
s1,BYE
s3
s2,DATA
";
        let sample = try_from_csv(input.as_bytes()).unwrap();
        assert_eq!(sample.len(), 3);
        assert_eq!(sample["s1"], vec!["HELLO", "BYE"]);
        assert_eq!(sample["s2"], vec!["HELLO", "DATA"]);
        assert!(sample["s3"].is_empty());
    }

    #[test]
    fn csv_requires_session() {
        assert!(matches!(
            try_from_csv("s1,a\n,b\n".as_bytes()),
            Err(SampleParseError::EmptySession(2))
        ));
    }
}
