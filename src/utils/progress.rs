//! Progress display using indicatif.
//!
//! Spinners are drawn on stderr so they never mix with the report tables
//! printed on stdout.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Spinner counting records while a source is read.
pub struct ProgressBar {
    bar: IndicatifBar,
}

impl ProgressBar {
    /// Create a spinner for a stream of unknown length.
    pub fn new_spinner(label: &str) -> Self {
        let bar = IndicatifBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} {pos} records")
                .expect("Invalid spinner template"),
        );
        bar.set_message(label.to_string());

        Self { bar }
    }

    /// Increment progress by 1
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the spinner from the terminal.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_counts() {
        let spinner = ProgressBar::new_spinner("Reading events");
        spinner.inc();
        spinner.inc();
        assert_eq!(spinner.position(), 2);
        spinner.finish_and_clear();
    }
}
