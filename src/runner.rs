//! File and stdin translation loop.
//!
//! Inputs are processed strictly in order on the calling thread. A file that
//! cannot be opened or read is reported and skipped; a failed write to the
//! output aborts the run.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use crate::config::{Config, Input};
use crate::error::Result;
use crate::session::StoreSession;
use crate::transform::LineTransformer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub inputs: usize,
    pub skipped: usize,
    pub lines: usize,
}

/// Result of draining one input.
#[derive(Debug, Default)]
pub struct InputOutcome {
    pub lines: usize,
    /// Set when reading stopped early.
    pub read_error: Option<io::Error>,
}

pub fn run<W: Write>(
    config: &Config,
    transformer: &mut LineTransformer,
    session: &StoreSession,
    out: &mut W,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for input in config.inputs() {
        let reader: Box<dyn BufRead> = match &input {
            Input::Stdin => Box::new(io::stdin().lock()),
            Input::File(path) => match File::open(path) {
                Ok(file) => Box::new(BufReader::new(file)),
                Err(e) => {
                    tracing::error!("Error opening file {}: {}", path.display(), e);
                    summary.skipped += 1;
                    continue;
                }
            },
        };

        let outcome = process_reader(reader, transformer, session, out)?;
        summary.inputs += 1;
        summary.lines += outcome.lines;
        if let Some(e) = outcome.read_error {
            tracing::error!("Error reading {}: {}", input.display_name(), e);
        }

        session.sync();
    }

    Ok(summary)
}

/// Translates every line of `reader` into `out`.
///
/// Read errors end this input and are returned in the outcome; write errors
/// are returned as `Err`.
pub fn process_reader<R: BufRead, W: Write>(
    mut reader: R,
    transformer: &mut LineTransformer,
    session: &StoreSession,
    out: &mut W,
) -> Result<InputOutcome> {
    let mut outcome = InputOutcome::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                outcome.read_error = Some(e);
                break;
            }
        }

        let line = trim_line_end(&buf);
        let translated = if session.persists() {
            let mut learned = session.learned()?;
            transformer.transform_line(line, Some(&mut *learned))
        } else {
            transformer.transform_line(line, None)
        };

        out.write_all(&translated)?;
        out.write_all(b"\n")?;
        outcome.lines += 1;
    }

    out.flush()?;
    Ok(outcome)
}

fn trim_line_end(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}
