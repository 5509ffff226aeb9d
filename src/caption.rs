use std::fmt;
use std::ops::Index;
use std::slice;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// One displayed subtitle unit.
///
/// Lines within `text` are separated by `\n` and are shown stacked under the
/// same timestamp. An `end` of `None` means the caption stays up until the
/// next one starts, or until the end of the media for the final caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub index: i64,
    pub start: Duration,
    pub end: Option<Duration>,
    pub text: String,
}

/// Where a timestamp falls relative to a single caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitStatus {
    /// The caption has a set end that precedes its start.
    Invalid,
    Early,
    Hit,
    Late,
}

impl Caption {
    /// How long the caption is shown, or `None` when it is open-ended.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_sub(self.start))
    }

    /// The caption text with tag-like markup (`<font ...>`, `</i>`) removed.
    pub fn text_without_markup(&self) -> String {
        strip_markup(&self.text)
    }

    pub fn check_hit(&self, ts: Duration) -> HitStatus {
        match self.end {
            Some(end) if end < self.start => HitStatus::Invalid,
            _ if ts < self.start => HitStatus::Early,
            Some(end) if ts >= end => HitStatus::Late,
            _ => HitStatus::Hit,
        }
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}({:?}-", self.index, self.text, self.start)?;
        match self.end {
            Some(end) => write!(f, "{:?})", end),
            None => f.write_str("open)"),
        }
    }
}

pub fn strip_markup(text: &str) -> String {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    let markup = MARKUP.get_or_init(|| Regex::new(r"</?[^<>]+?>").unwrap());
    markup.replace_all(text, "").into_owned()
}

/// Captions of one subtitle track, in non-decreasing `start` order.
///
/// Only the decoders in this crate append to a timeline, and they do so in the
/// order the captions appear in the source, which keeps it sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    captions: Vec<Caption>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Caption> {
        self.captions.iter()
    }

    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    /// Finds the first caption starting at or after `ts`.
    ///
    /// This is a lower-bound search, not a hit test: the returned caption may
    /// not be on screen at `ts`, so callers should confirm with
    /// [`Caption::check_hit`].
    pub fn find(&self, ts: Duration) -> Option<&Caption> {
        let idx = self.captions.partition_point(|c| c.start < ts);
        self.captions.get(idx)
    }

    /// The caption on screen at `ts`, if any. When captions overlap, the one
    /// that started last wins.
    pub fn caption_at(&self, ts: Duration) -> Option<&Caption> {
        let started = self.captions.partition_point(|c| c.start <= ts);
        self.captions[..started]
            .iter()
            .rev()
            .find(|c| c.check_hit(ts) == HitStatus::Hit)
    }

    /// Returns a copy of the timeline with markup stripped from every caption.
    pub fn without_markup(&self) -> Timeline {
        let captions = self
            .captions
            .iter()
            .map(|c| Caption {
                text: c.text_without_markup(),
                ..c.clone()
            })
            .collect();
        Timeline { captions }
    }

    pub(crate) fn push(&mut self, caption: Caption) {
        self.captions.push(caption);
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Caption> {
        self.captions.last_mut()
    }
}

impl Index<usize> for Timeline {
    type Output = Caption;

    fn index(&self, idx: usize) -> &Caption {
        &self.captions[idx]
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Caption;
    type IntoIter = slice::Iter<'a, Caption>;

    fn into_iter(self) -> Self::IntoIter {
        self.captions.iter()
    }
}

impl IntoIterator for Timeline {
    type Item = Caption;
    type IntoIter = std::vec::IntoIter<Caption>;

    fn into_iter(self) -> Self::IntoIter {
        self.captions.into_iter()
    }
}
