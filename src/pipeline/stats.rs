//! Statistics for a batch decode run.
//!
//! This module defines the `DecodeStats` structure filled in by the batch driver
//! and printed at the end of an evaluation run.

use std::fmt;

/// Statistics for one batch decode run.
///
/// Tracks how many items were attempted and how they ended, plus throughput.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeStats {
    /// The total number of dataset items handed to the driver.
    pub total_items: usize,
    /// Items that produced a hypothesis.
    pub decoded: usize,
    /// Items skipped because preparation or decoding failed.
    pub failed: usize,
    /// Items never started because the failure limit was reached.
    pub cancelled: usize,
    /// Decoded items that hit the step limit without emitting END.
    pub length_capped: usize,
    /// Wall-clock time of the run in milliseconds.
    pub elapsed_ms: f64,
}

impl DecodeStats {
    /// Creates a new DecodeStats instance with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Items that were actually attempted (decoded or failed).
    pub fn attempted(&self) -> usize {
        self.decoded + self.failed
    }

    /// Items excluded from the corpora.
    pub fn skipped(&self) -> usize {
        self.failed + self.cancelled
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            (self.decoded as f64 / self.total_items as f64) * 100.0
        }
    }

    /// Returns the failure rate as a percentage (0.0 to 100.0).
    pub fn failure_rate(&self) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            (self.failed as f64 / self.total_items as f64) * 100.0
        }
    }

    /// Returns the average time per attempted item in milliseconds.
    pub fn average_item_time_ms(&self) -> f64 {
        if self.attempted() == 0 {
            0.0
        } else {
            self.elapsed_ms / self.attempted() as f64
        }
    }

    /// Returns the processing speed in images per second.
    pub fn images_per_second(&self) -> f64 {
        if self.elapsed_ms == 0.0 {
            0.0
        } else {
            self.attempted() as f64 * 1000.0 / self.elapsed_ms
        }
    }
}

impl fmt::Display for DecodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Decode Statistics:")?;
        writeln!(f, "  Total items: {}", self.total_items)?;
        writeln!(
            f,
            "  Decoded: {} ({:.1}%)",
            self.decoded,
            self.success_rate()
        )?;
        writeln!(f, "  Failed: {} ({:.1}%)", self.failed, self.failure_rate())?;
        if self.cancelled > 0 {
            writeln!(f, "  Cancelled: {}", self.cancelled)?;
        }
        writeln!(f, "  Length-capped: {}", self.length_capped)?;
        writeln!(
            f,
            "  Average time per image: {:.2} ms",
            self.average_item_time_ms()
        )?;
        writeln!(
            f,
            "  Processing speed: {:.2} images/sec",
            self.images_per_second()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DecodeStats;

    #[test]
    fn rates_handle_zero_items() {
        let stats = DecodeStats::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.failure_rate(), 0.0);
        assert_eq!(stats.images_per_second(), 0.0);
        assert_eq!(stats.average_item_time_ms(), 0.0);
    }

    #[test]
    fn rates_compute_percentages() {
        let stats = DecodeStats {
            total_items: 10,
            decoded: 7,
            failed: 2,
            cancelled: 1,
            length_capped: 1,
            elapsed_ms: 900.0,
        };
        assert_eq!(stats.success_rate(), 70.0);
        assert_eq!(stats.failure_rate(), 20.0);
        assert_eq!(stats.skipped(), 3);
        assert_eq!(stats.average_item_time_ms(), 100.0);
        assert_eq!(stats.images_per_second(), 10.0);
    }

    #[test]
    fn display_formats_metrics() {
        let stats = DecodeStats {
            total_items: 10,
            decoded: 8,
            failed: 2,
            cancelled: 0,
            length_capped: 3,
            elapsed_ms: 1250.0,
        };

        let display = stats.to_string();
        assert!(display.contains("Decode Statistics:"));
        assert!(display.contains("Total items: 10"));
        assert!(display.contains("Decoded: 8 (80.0%)"));
        assert!(display.contains("Failed: 2 (20.0%)"));
        assert!(!display.contains("Cancelled"));
        assert!(display.contains("Length-capped: 3"));
        assert!(display.contains("Average time per image: 125.00 ms"));
        assert!(display.contains("Processing speed: 8.00 images/sec"));
    }
}
