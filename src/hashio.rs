//! Hash lists with metadata, and the record lines the clustering tools print.
//!
//! Input is one pair per line, `<hash>[,<metadata>]`. The hash may carry a
//! `hash=` prefix. Everything after the first comma is metadata; a line with
//! no comma gets `idx=<n>`, where `n` counts pairs from 1 across all inputs.
//! Blank lines are skipped.

use crate::error::{Error, Result};
use crate::hash256::{Hash256, HashAndMetadata};

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

const STDIN_NAME: &str = "-";

/// Parses one non-empty line. `counter` names the pair when the line has no metadata.
pub fn parse_line(line: &str, counter: usize) -> Result<HashAndMetadata<String>> {
    let line = line.trim_end_matches('\r');
    let (hex, metadata) = match line.split_once(',') {
        Some((hex, metadata)) => (hex, metadata.to_string()),
        None => (line, format!("idx={}", counter)),
    };
    Ok(HashAndMetadata::new(Hash256::from_hex(hex)?, metadata))
}

/// Iterates the pairs of one input, numbering metadata-less lines from `counter`.
pub struct PairReader<R> {
    lines: io::Lines<R>,
    source: PathBuf,
    line: usize,
    counter: usize,
}

impl<R: BufRead> PairReader<R> {
    pub fn new(reader: R, counter: usize) -> Self {
        Self {
            lines: reader.lines(),
            source: PathBuf::from(STDIN_NAME),
            line: 0,
            counter,
        }
    }

    /// Names the input in I/O errors.
    pub fn named<P: Into<PathBuf>>(mut self, source: P) -> Self {
        self.source = source.into();
        self
    }

    /// The counter the next pair will get.
    pub fn counter(&self) -> usize {
        self.counter
    }
}

impl<R: BufRead> Iterator for PairReader<R> {
    type Item = Result<HashAndMetadata<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(source) => {
                    return Some(Err(Error::Io {
                        path: self.source.clone(),
                        source,
                    }))
                }
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }

            let parsed = parse_line(&text, self.counter).map_err(|e| Error::Line {
                line: self.line,
                source: Box::new(e),
            });
            self.counter += 1;
            return Some(parsed);
        }
    }
}

/// Reads every pair of one input.
pub fn read_pairs<R: BufRead>(reader: R, counter: usize) -> Result<Vec<HashAndMetadata<String>>> {
    PairReader::new(reader, counter).collect()
}

/// Feeds every pair of the given files, or of stdin when `paths` is empty, to `f`
/// in input order. The metadata counter runs on across files.
pub fn for_each_pair<P, F>(paths: &[P], mut f: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(HashAndMetadata<String>) -> Result<()>,
{
    let mut counter = 1;

    if paths.is_empty() {
        let stdin = io::stdin();
        for pair in PairReader::new(stdin.lock(), counter) {
            f(pair?)?;
        }
        return Ok(());
    }

    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = PairReader::new(BufReader::new(file), counter).named(path);
        for pair in reader.by_ref() {
            f(pair?)?;
        }
        counter = reader.counter();
    }
    Ok(())
}

/// Loads all pairs of the given files, or of stdin when `paths` is empty.
pub fn read_pairs_from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<HashAndMetadata<String>>> {
    let mut pairs = Vec::new();
    for_each_pair(paths, |pair| {
        pairs.push(pair);
        Ok(())
    })?;
    Ok(pairs)
}

/// `clidx=..,clusz=..,hash=..,<metadata>`: one member of a snowball cluster.
pub struct SnowballRecord<'a, M> {
    pub clidx: usize,
    pub clusz: usize,
    pub hash: &'a Hash256,
    pub metadata: &'a M,
}

impl<M: fmt::Display> fmt::Display for SnowballRecord<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clidx={},clusz={},hash={},{}",
            self.clidx, self.clusz, self.hash, self.metadata
        )
    }
}

/// `clidx=..,hash1=..,hash2=..,is_center=0|1,d=..,<metadata>`: one greedy assignment.
pub struct StreamingRecord<'a, M> {
    pub clidx: u32,
    pub hash1: &'a Hash256,
    pub hash2: &'a Hash256,
    pub is_center: bool,
    pub d: usize,
    pub metadata: &'a M,
}

impl<M: fmt::Display> fmt::Display for StreamingRecord<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clidx={},hash1={},hash2={},is_center={},d={},{}",
            self.clidx,
            self.hash1,
            self.hash2,
            u8::from(self.is_center),
            self.d,
            self.metadata
        )
    }
}

/// `clidx=..,clusz=..,hash1=..,hash2=..,d=..,<metadata>`: one match of a radial listing.
pub struct RadialRecord<'a, M> {
    pub clidx: usize,
    pub clusz: usize,
    pub hash1: &'a Hash256,
    pub hash2: &'a Hash256,
    pub d: usize,
    pub metadata: &'a M,
}

impl<M: fmt::Display> fmt::Display for RadialRecord<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clidx={},clusz={},hash1={},hash2={},d={},{}",
            self.clidx, self.clusz, self.hash1, self.hash2, self.d, self.metadata
        )
    }
}

/// `d=..,match=..,<metadata>`: one haystack match of a needle.
pub struct MatchRecord<'a, M> {
    pub d: usize,
    pub hash: &'a Hash256,
    pub metadata: &'a M,
}

impl<M: fmt::Display> fmt::Display for MatchRecord<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d={},match={},{}", self.d, self.hash, self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const H1: &str = "f8f8f0cee0f4a84f06370a22038f63f0b36e2ed596621e1d33e6b39c4e9c9b22";
    const H2: &str = "30a10efd71cc3d429013d48d0ffffc52e34e0e17ada952a9d29685211ea9e5af";

    #[test]
    fn lines_parse() {
        let text = format!("{},photo.jpg\nhash={}\n\n{},a,b\n", H1, H2, H1);
        let pairs = read_pairs(Cursor::new(text), 1).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].hash().to_hex(), H1);
        assert_eq!(pairs[0].metadata(), "photo.jpg");
        assert_eq!(pairs[1].hash().to_hex(), H2);
        assert_eq!(pairs[1].metadata(), "idx=2");
        assert_eq!(pairs[2].metadata(), "a,b");
    }

    #[test]
    fn crlf_is_tolerated() {
        let pairs = read_pairs(Cursor::new(format!("{}\r\n", H1)), 7).unwrap();
        assert_eq!(pairs[0].metadata(), "idx=7");
    }

    #[test]
    fn bad_line_reports_position() {
        let text = format!("{}\nnot-a-hash,x\n", H1);
        match read_pairs(Cursor::new(text), 1) {
            Err(Error::Line { line, source }) => {
                assert_eq!(line, 2);
                assert!(matches!(*source, Error::Format { ref input } if input == "not-a-hash"));
            }
            other => panic!("expected line error, got {:?}", other),
        }
    }

    #[test]
    fn counter_runs_across_readers() {
        let mut first = PairReader::new(Cursor::new(format!("{}\n{}\n", H1, H2)), 1);
        let pairs: Vec<_> = first.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(pairs.len(), 2);
        let second = PairReader::new(Cursor::new(format!("{}\n", H1)), first.counter());
        let pairs = second.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(pairs[0].metadata(), "idx=3");
    }

    #[test]
    fn missing_file_names_its_path() {
        let err = read_pairs_from_paths(&["/nonexistent/hashes.txt"]).unwrap_err();
        match err {
            Error::Io { path, .. } => assert_eq!(path, PathBuf::from("/nonexistent/hashes.txt")),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn records_format() {
        let h1 = Hash256::from_hex(H1).unwrap();
        let h2 = Hash256::from_hex(H2).unwrap();
        let meta = "x.jpg".to_string();

        let snowball = SnowballRecord { clidx: 1, clusz: 3, hash: &h1, metadata: &meta };
        assert_eq!(snowball.to_string(), format!("clidx=1,clusz=3,hash={},x.jpg", H1));

        let streaming = StreamingRecord {
            clidx: 0,
            hash1: &h1,
            hash2: &h2,
            is_center: false,
            d: 12,
            metadata: &meta,
        };
        assert_eq!(
            streaming.to_string(),
            format!("clidx=0,hash1={},hash2={},is_center=0,d=12,x.jpg", H1, H2)
        );

        let radial = RadialRecord {
            clidx: 2,
            clusz: 1,
            hash1: &h1,
            hash2: &h1,
            d: 0,
            metadata: &meta,
        };
        assert_eq!(
            radial.to_string(),
            format!("clidx=2,clusz=1,hash1={},hash2={},d=0,x.jpg", H1, H1)
        );

        let matched = MatchRecord { d: 5, hash: &h2, metadata: &meta };
        assert_eq!(matched.to_string(), format!("d=5,match={},x.jpg", H2));
    }
}
