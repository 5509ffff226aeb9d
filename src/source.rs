//! Reading subtitle files and choosing a decoder for them.

use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use nom::bytes::complete::tag;
use nom::combinator::opt;
use nom::IResult;

use crate::caption::Timeline;
use crate::error::Result;
use crate::{parser, sami};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Sami,
    Srt,
}

impl Format {
    /// Guesses the format from a file extension, falling back to SRT.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("smi") | Some("sami") => Format::Sami,
            _ => Format::Srt,
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smi" | "sami" => Ok(Format::Sami),
            "srt" => Ok(Format::Srt),
            other => Err(format!("unknown subtitle format '{}'", other)),
        }
    }
}

pub fn decode(format: Format, input: &str) -> Result<Timeline> {
    let input = strip_bom(input);
    match format {
        Format::Sami => sami::decode(input),
        Format::Srt => parser::decode(input),
    }
}

/// Reads a whole file, or standard input when `path` is `-`, with any UTF-8
/// byte order mark removed.
pub fn read_input(path: &str) -> Result<String> {
    let data = if path == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(strip_bom(&data).to_string())
}

pub fn strip_bom(input: &str) -> &str {
    match optional_bom(input) {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

fn optional_bom(input: &str) -> IResult<&str, Option<&str>> {
    opt(tag("\u{FEFF}"))(input)
}
