//! Record Stream Splitter: re-assembles a concatenated, possibly
//! gzip-compressed stream of XML fragments into parsed records, one at a
//! time, without holding more than the current fragment in memory.

use crate::config::{FRAGMENT_CLOSE, FRAGMENT_OPEN};
use crate::xml::{parse_fragment, XmlNode};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};

/// One delimited record, parsed plus the raw text it was parsed from. The
/// raw text rides along so any downstream failure can surface the
/// offending fragment.
#[derive(Debug)]
pub struct Fragment {
    pub root: XmlNode,
    pub raw: String,
}

/// Forward-only iterator over the fragments of a record stream. Consumed
/// exactly once; re-open the stream to restart.
pub struct FragmentStream {
    lines: Lines<BufReader<Box<dyn Read>>>,
    buf: String,
    in_fragment: bool,
}

impl FragmentStream {
    /// Opens a record stream, decompressing transparently when the path
    /// carries a `.gz` suffix.
    pub fn open(path: &str) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open record stream: {}", path))?;
        if path.ends_with(".gz") {
            Ok(Self::from_reader(GzDecoder::new(file)))
        } else {
            Ok(Self::from_reader(file))
        }
    }

    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self {
            lines: BufReader::new(Box::new(reader) as Box<dyn Read>).lines(),
            buf: String::new(),
            in_fragment: false,
        }
    }
}

/// The legacy exporter double-escaped apostrophes in attribute values;
/// collapse the artifact before parsing.
fn repair_line(line: &str) -> Cow<'_, str> {
    if line.contains("&amp;apos;") {
        Cow::Owned(line.replace("&amp;apos;", "&apos;"))
    } else {
        Cow::Borrowed(line)
    }
}

impl Iterator for FragmentStream {
    type Item = Result<Fragment>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(e).context("Failed to read line from record stream"))
                }
            };
            let line = repair_line(&line);

            if line.trim_start().starts_with(FRAGMENT_OPEN) {
                self.buf.clear();
                self.in_fragment = true;
            }
            if !self.in_fragment {
                continue;
            }
            self.buf.push_str(&line);
            self.buf.push('\n');

            if line.contains(FRAGMENT_CLOSE) {
                self.in_fragment = false;
                let raw = std::mem::take(&mut self.buf);
                return Some(match parse_fragment(&raw) {
                    Ok(root) => Ok(Fragment { root, raw }),
                    Err(e) => {
                        Err(e.context(format!("Unparsable record fragment:\n{}", raw)))
                    }
                });
            }
        }
    }
}
