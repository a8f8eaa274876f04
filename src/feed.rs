//! JSON-lines item feed, one event per line.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::Event;

pub struct FeedWriter<W: Write> {
    out: W,
    written: usize,
}

impl FeedWriter<Box<dyn Write>> {
    /// Writes to `path`, or to stdout when no path is given.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let out: Box<dyn Write> = match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("unable to create feed file {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(io::stdout())),
        };
        Ok(Self::new(out))
    }
}

impl<W: Write> FeedWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write(&mut self, event: &Event) -> Result<()> {
        serde_json::to_writer(&mut self.out, event).context("unable to serialize event")?;
        self.out.write_all(b"\n").context("unable to write feed")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush().context("unable to flush feed")?;
        Ok(self.out)
    }
}
