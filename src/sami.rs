//! Decoder for SAMI (`.smi`) subtitles.
//!
//! SAMI never states when a caption ends. A caption is closed by the next
//! `<SYNC>` that carries text, including a blank placeholder such as `&nbsp;`
//! whose only purpose is to clear the screen. Lines joined by `<BR>` belong to
//! the caption they follow.

use std::time::Duration;

use log::{debug, trace};

use crate::caption::{Caption, Timeline};
use crate::error::{Result, SubtitleError};
use crate::markup::{Token, Tokenizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FindTag,
    Sync,
    Text,
    Br,
}

/// Per-decode state. A fresh decoder is built for every call to [`decode`].
struct Decoder {
    timeline: Timeline,
    next_ts: Duration,
    pending_break: bool,
}

pub fn decode(input: &str) -> Result<Timeline> {
    decode_tokens(Tokenizer::new(input))
}

/// Decodes an already tokenized SAMI document.
///
/// Exhausting the iterator is treated the same as [`Token::End`].
pub fn decode_tokens<'a, I>(tokens: I) -> Result<Timeline>
where
    I: IntoIterator<Item = Token<'a>>,
{
    let mut decoder = Decoder {
        timeline: Timeline::new(),
        next_ts: Duration::ZERO,
        pending_break: false,
    };
    decoder.run(tokens.into_iter())?;
    debug!("decoded {} SAMI captions", decoder.timeline.len());
    Ok(decoder.timeline)
}

impl Decoder {
    fn run<'a, I>(&mut self, mut tokens: I) -> Result<()>
    where
        I: Iterator<Item = Token<'a>>,
    {
        let mut state = State::FindTag;
        let mut token = Token::End;

        loop {
            state = match state {
                State::FindTag => {
                    token = match tokens.next() {
                        None | Some(Token::End) => return Ok(()),
                        Some(Token::Error(msg)) => return Err(SubtitleError::MalformedMarkup(msg)),
                        Some(token) => token,
                    };
                    if token.raw().trim().is_empty() {
                        continue;
                    }
                    next_state(&token)
                }
                State::Sync => {
                    self.sync(&token)?;
                    State::FindTag
                }
                State::Text => {
                    if let Token::Text { text, .. } = &token {
                        self.text(text);
                    }
                    State::FindTag
                }
                State::Br => {
                    self.pending_break = true;
                    State::FindTag
                }
            };
        }
    }

    fn sync(&mut self, token: &Token<'_>) -> Result<()> {
        let malformed = || SubtitleError::MalformedTimestamp(token.raw().to_string());
        let attr = match token {
            Token::StartTag { attrs, .. } => attrs.first().ok_or_else(malformed)?,
            _ => return Err(malformed()),
        };
        let millis: u64 = attr.value.trim().parse().map_err(|_| malformed())?;
        self.next_ts = Duration::from_millis(millis);
        trace!("sync at {:?}", self.next_ts);
        Ok(())
    }

    fn text(&mut self, text: &str) {
        let text = text.trim();

        // Comment bodies inside <STYLE> arrive as text.
        if text.starts_with("<!--") && text.ends_with("-->") {
            trace!("dropping comment text");
            return;
        }

        if self.pending_break {
            self.pending_break = false;
            if let Some(last) = self.timeline.last_mut() {
                last.text.push('\n');
                last.text.push_str(text);
            }
            return;
        }

        // A zero end counts as unset, so a blank at 0 does not seal the caption.
        if let Some(last) = self.timeline.last_mut() {
            if last.end.map_or(true, |end| end.is_zero()) {
                last.end = Some(self.next_ts);
            }
        }

        if !text.is_empty() {
            self.timeline.push(Caption {
                index: 0,
                start: self.next_ts,
                end: None,
                text: text.to_string(),
            });
        }
    }
}

fn next_state(token: &Token<'_>) -> State {
    match token {
        Token::StartTag { name, .. } if name == "sync" => State::Sync,
        Token::StartTag { name, .. } if name == "br" => State::Br,
        Token::Text { .. } => State::Text,
        _ => {
            trace!("ignoring {:?}", token.raw());
            State::FindTag
        }
    }
}
