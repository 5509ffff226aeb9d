use crate::caption::{Caption, Timeline};
use crate::error::Result;

use std::io::{BufWriter, Write};
use std::time::Duration;

use log::debug;

/// Writes `timeline` to `dst` in SRT format.
///
/// Blocks are numbered by position starting at 1; the stored `index` of each
/// caption is ignored. An open-ended caption is written with a zero end time.
pub fn serialise<W: Write>(timeline: &Timeline, dst: W) -> Result<()> {
    let mut writer = BufWriter::new(dst);
    write_captions(&mut writer, timeline)?;
    writer.flush()?;
    debug!("wrote {} SRT blocks", timeline.len());
    Ok(())
}

pub fn to_string(timeline: &Timeline) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec never fails.
    write_captions(&mut buf, timeline).ok();
    String::from_utf8_lossy(&buf).into_owned()
}

fn write_captions<W: Write>(buf: &mut W, timeline: &Timeline) -> Result<()> {
    for (idx, caption) in timeline.iter().enumerate() {
        write_caption(buf, idx + 1, caption)?;
    }
    Ok(())
}

fn write_caption<W: Write>(buf: &mut W, seq: usize, caption: &Caption) -> Result<()> {
    writeln!(buf, "{}", seq)?;
    write_ts(buf, caption.start)?;
    write!(buf, " --> ")?;
    write_ts(buf, caption.end.unwrap_or_default())?;
    writeln!(buf)?;
    // A blank line would end the block early.
    for line in caption.text.lines().filter(|l| !l.trim().is_empty()) {
        writeln!(buf, "{}", line)?;
    }
    writeln!(buf)?;
    Ok(())
}

fn write_ts<W: Write>(buf: &mut W, timestamp: Duration) -> Result<()> {
    let millis = timestamp.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) / 1000;
    let millis = millis % 1000;
    write!(
        buf,
        "{:02}:{:02}:{:02},{:03}",
        hours, minutes, seconds, millis
    )?;
    Ok(())
}
