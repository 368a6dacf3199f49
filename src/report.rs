use colored::*;
use tracing::info;

use crate::engine::RunOutcome;

/// Grouped-by-digest listing of duplicate paths. This, plus any filesystem
/// mutations, is the user-facing artifact of a run.
pub fn print_duplicates(outcome: &RunOutcome) {
    for set in &outcome.sets {
        println!(
            "{}  {} bytes x {}",
            set.digest.dimmed(),
            set.size,
            set.members.len()
        );
        for member in &set.members {
            println!("    {}", member.path.display());
        }
    }
}

/// Final summary. Always distinguishes files compared, duplicates found, and
/// actions failed, so a clean run is tellable from one with partial failures.
pub fn print_summary(outcome: &RunOutcome) {
    let stats = &outcome.stats;

    println!();
    info!(
        "Scan: {}, Hash: {}",
        format!("{:.2}s", stats.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", stats.hash_duration.as_secs_f64()).green(),
    );
    info!(
        "{} files compared, {} zero-byte files skipped, {} scan errors",
        format!("{}", stats.files_cataloged).cyan(),
        stats.zero_byte_files,
        stats.scan_errors,
    );
    info!(
        "{} unique-size groups eliminated, {} hardlinked entries collapsed, {} hash failures",
        stats.unique_size_eliminations, stats.hardlink_eliminations, stats.hash_failures,
    );
    info!(
        "{} duplicate sets, {} files with duplicates, {} bytes wasted",
        format!("{}", stats.duplicate_sets).red(),
        format!("{}", stats.duplicate_files).red(),
        format!("{}", stats.wasted_bytes).red(),
    );

    if let Some(actions) = &outcome.actions {
        info!(
            "{} relinked, {} deleted, {} bytes reclaimed, {} actions failed",
            actions.linked,
            actions.deleted,
            format!("{}", actions.bytes_reclaimed).green(),
            if actions.failed.is_empty() {
                "0".normal()
            } else {
                format!("{}", actions.failed.len()).red()
            },
        );
    }
}
