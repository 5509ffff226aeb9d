//! Decoder for SubRip (`.srt`) subtitles.

use std::time::Duration;

use log::{debug, trace};
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, space0};
use nom::combinator::map_res;
use nom::error::{make_error, ErrorKind};
use nom::IResult;

use crate::caption::{Caption, Timeline};
use crate::error::{Result, SubtitleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Index,
    Timestamp,
    Text,
}

pub fn decode(input: &str) -> Result<Timeline> {
    decode_lines(input.lines())
}

/// Decodes SRT blocks from individual lines, without their line terminators.
///
/// A block is only kept once the blank line that ends it has been seen, so a
/// final block cut off by the end of input is dropped.
pub fn decode_lines<I, S>(lines: I) -> Result<Timeline>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut timeline = Timeline::new();
    let mut state = State::Index;
    let mut caption = Caption {
        index: 0,
        start: Duration::ZERO,
        end: None,
        text: String::new(),
    };

    for line in lines {
        let line = line.as_ref();
        state = match state {
            State::Index => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                caption.index = line
                    .parse()
                    .map_err(|_| SubtitleError::MalformedIndex(line.to_string()))?;
                State::Timestamp
            }
            State::Timestamp => {
                let (start, end) = match show_hide(line) {
                    Ok((_, times)) => times,
                    Err(_) => return Err(SubtitleError::MalformedTimestamp(line.to_string())),
                };
                caption.start = start;
                // A zero end is how an open-ended caption is written out.
                caption.end = Some(end).filter(|end| !end.is_zero());
                caption.text.clear();
                State::Text
            }
            State::Text if line.trim().is_empty() => {
                trace!("block {} complete", caption.index);
                timeline.push(caption.clone());
                State::Index
            }
            State::Text => {
                if !caption.text.is_empty() {
                    caption.text.push('\n');
                }
                caption.text.push_str(line);
                State::Text
            }
        };
    }

    if state != State::Index {
        debug!("dropping unterminated block {}", caption.index);
    }
    debug!("decoded {} SRT captions", timeline.len());
    Ok(timeline)
}

fn show_hide(input: &str) -> IResult<&str, (Duration, Duration)> {
    let (input, _) = space0(input)?;
    let (input, show_at) = timestamp(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = tag("-->")(input)?;
    let (input, _) = space0(input)?;
    let (input, hide_at) = timestamp(input)?;

    Ok((input, (show_at, hide_at)))
}

fn timestamp(input: &str) -> IResult<&str, Duration> {
    let start = input;
    let (input, hours) = number(input)?;
    let (input, _) = char(':')(input)?;
    let (input, minutes) = number(input)?;
    let (input, _) = char(':')(input)?;
    let (input, seconds) = number(input)?;
    let (input, _) = char(',')(input)?;
    let (input, millis) = number(input)?;

    match total_millis(hours, minutes, seconds, millis) {
        Some(total) => Ok((input, Duration::from_millis(total))),
        None => Err(nom::Err::Error(make_error(start, ErrorKind::TooLarge))),
    }
}

fn total_millis(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<u64> {
    hours
        .checked_mul(60 * 60 * 1000)?
        .checked_add(minutes.checked_mul(60 * 1000)?)?
        .checked_add(seconds.checked_mul(1000)?)?
        .checked_add(millis)
}

fn number(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse())(input)
}
