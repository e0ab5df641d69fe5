//! Streaming renderer for asynchronous migration runs.

use console::Style;
use std::io::{self, Write};
use std::time::Duration;

use crate::engine::{AsyncRun, ExecutionEvent};

/// Final state of one asynchronous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub elapsed: Duration,
}

pub struct Reporter<W: Write> {
    out: W,
    colored: bool,
}

impl<W: Write> Reporter<W> {
    /// Colours follow the terminal's capabilities.
    pub fn new(out: W) -> Self {
        Self { out, colored: console::colors_enabled() }
    }

    pub fn with_colors(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render every event until the stream closes, then print the elapsed time.
    ///
    /// A `Failure` marks the run failed but never stops the drain. Neither does
    /// a write error: the stream is drained to the end so the engine is never
    /// cut off mid-run, and the first write error is returned afterwards.
    pub fn run(&mut self, run: AsyncRun) -> io::Result<RunOutcome> {
        let mut success = true;
        let mut write_error: Option<io::Error> = None;
        for event in run.events.iter() {
            if let ExecutionEvent::Failure(_) = event {
                success = false;
            }
            if write_error.is_some() {
                continue;
            }
            if let Err(e) = self.render(event).and_then(|()| self.out.flush()) {
                tracing::warn!("output closed, draining remaining engine events: {}", e);
                write_error = Some(e);
            }
        }

        let elapsed = run.started.elapsed();
        tracing::debug!("run finished: success={} elapsed={:?}", success, elapsed);
        if let Some(e) = write_error {
            return Err(e);
        }

        writeln!(self.out)?;
        writeln!(self.out, "{}", format_elapsed(elapsed))?;
        self.out.flush()?;

        Ok(RunOutcome { success, elapsed })
    }

    fn render(&mut self, event: ExecutionEvent) -> io::Result<()> {
        match event {
            ExecutionEvent::InfoLine(text) => writeln!(self.out, "{}", text),
            ExecutionEvent::Failure(text) => {
                let styled = self.style(Style::new().red()).apply_to(text);
                writeln!(self.out, "{}", styled)
            }
            ExecutionEvent::StepApplied { direction, file_name } => {
                let marker = self.style(Style::new().blue()).apply_to(direction.marker());
                writeln!(self.out, "{} {}", marker, file_name)
            }
            ExecutionEvent::Other(value) => writeln!(self.out, "{}", value),
        }
    }

    fn style(&self, style: Style) -> Style {
        style.force_styling(self.colored)
    }
}

/// Seconds under a minute, minutes otherwise.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{:.4} seconds", secs)
    } else {
        format!("{:.4} minutes", secs / 60.0)
    }
}
