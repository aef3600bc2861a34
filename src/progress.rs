//! Progress-reporting collaborator for the fingerprint stages.
//!
//! Kept decoupled from the pipeline by a small trait so that neither
//! [`crate::pipeline::Pipeline`] nor [`crate::stage`] ever hold a concrete
//! `indicatif` type.

use indicatif::{ProgressBar, ProgressStyle};

/// Receives per-file completion notifications during a fingerprint stage.
pub trait ProgressReporter {
    /// Called once a file has finished its read for the current stage.
    fn file_done(&self);

    /// Called once, before a stage begins, with the number of candidate
    /// files it will process.
    fn start_stage(&self, _label: &str, _total: u64) {}

    /// Called once a stage has finished.
    fn finish_stage(&self) {}
}

/// No-op reporter used when `-progress` is not set.
pub struct Silent;

impl ProgressReporter for Silent {
    fn file_done(&self) {}
}

/// Renders an `indicatif` bar, activated by `-progress`.
pub struct Bar {
    inner: ProgressBar,
}

impl Bar {
    /// Creates a hidden bar; [`ProgressReporter::start_stage`] gives it a
    /// length and draws it.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix}: [{bar:40.cyan/blue}] {pos}/{len}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { inner: bar }
    }
}

impl Default for Bar {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for Bar {
    fn file_done(&self) {
        self.inner.inc(1);
    }

    fn start_stage(&self, label: &str, total: u64) {
        self.inner.set_length(total);
        self.inner.set_position(0);
        self.inner.set_prefix(label.to_string());
        self.inner.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    }

    fn finish_stage(&self) {
        self.inner.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
}
