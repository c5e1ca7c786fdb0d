use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running count on stderr, redrawn in place every `interval` items.
pub struct ProgressCounter {
    label: &'static str,
    interval: u64,
    count: AtomicU64,
}

impl ProgressCounter {
    pub fn new(label: &'static str, interval: u64) -> Self {
        let counter = Self {
            label,
            interval: interval.max(1),
            count: AtomicU64::new(0),
        };
        counter.print(0);
        counter
    }

    /// Add `delta` and redraw when an interval boundary is crossed.
    pub fn inc(&self, delta: u64) {
        let prev = self.count.fetch_add(delta, Ordering::Relaxed);
        let current = prev + delta;
        if prev / self.interval < current / self.interval {
            self.print(current);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        self.print(self.count());
        eprintln!();
    }

    fn print(&self, current: u64) {
        eprint!("\r{}: {}", self.label, current);
        let _ = std::io::stderr().flush();
    }
}
