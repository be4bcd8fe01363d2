use std::io::{self, Write};

use navnet_curator::ProgressObserver;

const BAR_WIDTH: usize = 76;

/// Carriage-return progress bar for long enumerations, drawn on stderr.
pub struct TerminalProgress<W: Write = io::Stderr> {
    prefix: String,
    out: W,
}

impl TerminalProgress {
    pub fn stderr(prefix: impl Into<String>) -> Self {
        Self::new(prefix, io::stderr())
    }
}

impl<W: Write> TerminalProgress<W> {
    pub fn new(prefix: impl Into<String>, out: W) -> Self {
        Self {
            prefix: prefix.into(),
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn cells(&self) -> usize {
        BAR_WIDTH.saturating_sub(self.prefix.len()).max(1)
    }
}

impl<W: Write> ProgressObserver for TerminalProgress<W> {
    fn on_progress(&mut self, completed: usize, total: usize) {
        let cells = self.cells();
        let filled = if total == 0 {
            cells
        } else {
            (completed.min(total) * cells) / total
        };
        let end = if completed >= total { "\n" } else { "" };
        // cosmetic; write failures are ignored
        let _ = write!(
            self.out,
            "\r{} |{}{}|{}",
            self.prefix,
            "-".repeat(filled),
            " ".repeat(cells - filled),
            end
        );
        let _ = self.out.flush();
    }
}
