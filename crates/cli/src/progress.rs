//! Progress bars on stderr: one bar over the stage's files, one over the
//! current file's rows. Log lines go through [`LogWriter`] so they print
//! above the bars instead of through them.

use std::io::{self, Write};

use cnpj_pipeline::Progress;
use indicatif::{HumanCount, MultiProgress, ProgressBar, ProgressStyle};

const FILES_TEMPLATE: &str = "  {prefix:<8} {bar:40.cyan/blue} {pos}/{len} files [{elapsed_precise}]";
const ROWS_TEMPLATE: &str = "  {msg:<30!} {bar:40.green/white} {human_pos}/{human_len} rows ({per_sec})";
const SPINNER_TEMPLATE: &str = "  {spinner} {msg:<30!} {human_pos} rows ({per_sec})";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

pub struct Bars {
    multi: MultiProgress,
    files: Option<ProgressBar>,
    rows: Option<ProgressBar>,
}

impl Bars {
    pub fn new(multi: MultiProgress) -> Self {
        Self { multi, files: None, rows: None }
    }
}

/// stderr writer that clears the bars for the duration of each write.
#[derive(Clone)]
pub struct LogWriter {
    multi: MultiProgress,
}

impl LogWriter {
    pub fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.multi.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl Progress for Bars {
    fn stage(&mut self, name: &str, files: usize) {
        let bar = self.multi.add(ProgressBar::new(files as u64));
        bar.set_style(style(FILES_TEMPLATE));
        bar.set_prefix(name.to_string());
        self.files = Some(bar);
    }

    fn file_started(&mut self, name: &str, total_rows: Option<u64>) {
        let bar = match total_rows {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(style(ROWS_TEMPLATE));
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(style(SPINNER_TEMPLATE));
                bar
            }
        };
        let bar = self.multi.add(bar);
        bar.set_message(name.to_string());
        self.rows = Some(bar);
    }

    fn rows(&mut self, count: u64) {
        if let Some(bar) = &self.rows {
            bar.inc(count);
        }
    }

    fn file_finished(&mut self, name: &str, rows: u64) {
        if let Some(bar) = self.rows.take() {
            bar.finish_and_clear();
        }
        if let Some(files) = &self.files {
            files.inc(1);
            files.set_message(format!("{name}: {} rows", HumanCount(rows)));
        }
    }

    fn stage_finished(&mut self, _name: &str) {
        if let Some(bar) = self.files.take() {
            bar.finish_and_clear();
        }
    }
}
