/// Observer for long scans. Every method defaults to a no-op; `()` ignores
/// everything.
pub trait Progress {
    /// A stage is about to process `files` files.
    fn stage(&mut self, _name: &str, _files: usize) {}

    /// `total_rows` is known for columnar inputs, not for raw text.
    fn file_started(&mut self, _name: &str, _total_rows: Option<u64>) {}

    /// `count` more rows of the current file were processed.
    fn rows(&mut self, _count: u64) {}

    fn file_finished(&mut self, _name: &str, _rows: u64) {}

    fn stage_finished(&mut self, _name: &str) {}
}

impl Progress for () {}

/// Rows between `Progress::rows` calls.
pub(crate) const ROW_STEP: u64 = 4096;
