//! Progress tracking for a single bulk-select invocation

/// Completion percentage of one bulk select.
///
/// The percentage never decreases while the run is active. `start` resets it
/// to zero, `finish` forces it to 100.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionProgress {
    percent: u8,
    active: bool,
    checkpoints: Vec<u8>,
}

impl SelectionProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run at 0%
    pub fn start(&mut self) {
        self.percent = 0;
        self.active = true;
        self.checkpoints.clear();
        self.checkpoints.push(0);
    }

    /// Move forward to `percent`, returns the value to report if it changed.
    ///
    /// Values below the current percentage are ignored and values above 100
    /// are clamped.
    pub fn advance(&mut self, percent: u8) -> Option<u8> {
        if !self.active {
            return None;
        }
        let percent = percent.min(100);
        if percent <= self.percent {
            return None;
        }
        self.percent = percent;
        self.checkpoints.push(percent);
        Some(percent)
    }

    /// Force the run to 100%
    pub fn finish(&mut self) -> Option<u8> {
        let reported = self.advance(100);
        self.active = false;
        reported
    }

    /// Hide the indicator after an aborted run
    pub fn clear(&mut self) {
        self.percent = 0;
        self.active = false;
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Every value reported during the last run, in order
    pub fn checkpoints(&self) -> &[u8] {
        &self.checkpoints
    }
}

/// Progress of a batched run: `10 + processed / total * 80`, rounded
pub fn batch_percent(processed_pages: usize, total_pages: usize) -> u8 {
    if total_pages == 0 {
        return 90;
    }
    let fraction = processed_pages.min(total_pages) as f64 / total_pages as f64;
    (10.0 + fraction * 80.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let mut progress = SelectionProgress::new();
        progress.start();
        assert_eq!(progress.advance(10), Some(10));
        assert_eq!(progress.advance(5), None);
        assert_eq!(progress.advance(10), None);
        assert_eq!(progress.advance(150), Some(100));
        assert_eq!(progress.checkpoints(), &[0, 10, 100]);
    }

    #[test]
    fn test_finish_and_restart() {
        let mut progress = SelectionProgress::new();
        progress.start();
        progress.advance(50);
        assert_eq!(progress.finish(), Some(100));
        assert!(!progress.is_active());
        assert_eq!(progress.advance(20), None);

        progress.start();
        assert_eq!(progress.percent(), 0);
        assert_eq!(progress.checkpoints(), &[0]);
    }

    #[test]
    fn test_batch_percent() {
        assert_eq!(batch_percent(0, 30), 10);
        assert_eq!(batch_percent(10, 30), 37);
        assert_eq!(batch_percent(30, 30), 90);
        assert_eq!(batch_percent(0, 0), 90);
    }
}
