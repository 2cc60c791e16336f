//! Progress bar helpers.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use sinoflash::Progress;

use crate::use_fancy_output;

/// Percentage bar on stderr, hidden when quiet or not on a terminal.
pub(crate) fn percent_bar(quiet: bool) -> ProgressBar {
    if quiet || !use_fancy_output() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(100);
    #[allow(clippy::unwrap_used)] // Static template string
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb
}

/// Move `pb` to the percentage `progress` represents.
pub(crate) fn update(pb: &ProgressBar, progress: Progress) {
    pb.set_position(percent(progress));
}

fn percent(progress: Progress) -> u64 {
    if progress.total == 0 {
        return 100;
    }
    (progress.done as u64 * 100 / progress.total as u64).min(100)
}
