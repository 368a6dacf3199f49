use serde::Deserialize;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{info, warn};

use crate::model::DuplicateSet;

/// What to do with the redundant members of a confirmed duplicate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidateMode {
    Hardlink,
    Delete,
}

#[derive(Debug, Default)]
pub struct ActionReport {
    pub linked: u64,
    pub deleted: u64,
    pub bytes_reclaimed: u64,
    pub failed: Vec<(PathBuf, String)>,
}

impl ActionReport {
    pub fn merge(&mut self, other: ActionReport) {
        self.linked += other.linked;
        self.deleted += other.deleted;
        self.bytes_reclaimed += other.bytes_reclaimed;
        self.failed.extend(other.failed);
    }
}

/// Consolidate one duplicate set. Members arrive sorted by path, so the first
/// member is the canonical one on every run regardless of scan order. Each
/// redundant member is handled independently; a failure is recorded and the
/// rest of the set is still attempted.
pub fn consolidate(set: &DuplicateSet, mode: ConsolidateMode) -> ActionReport {
    let mut report = ActionReport::default();
    let Some((canonical, redundant)) = set.members.split_first() else {
        return report;
    };

    for member in redundant {
        let outcome = match mode {
            ConsolidateMode::Hardlink => {
                if member.device != canonical.device {
                    Err(format!(
                        "cannot hardlink across devices ({} is on device {}, canonical on {})",
                        member.path.display(),
                        member.device,
                        canonical.device
                    ))
                } else {
                    replace_with_link(&canonical.path, &member.path)
                        .map_err(|err| err.to_string())
                }
            }
            ConsolidateMode::Delete => {
                fs::remove_file(&member.path).map_err(|err| err.to_string())
            }
        };

        match outcome {
            Ok(()) => {
                match mode {
                    ConsolidateMode::Hardlink => {
                        report.linked += 1;
                        info!(
                            "Relinked {} -> {}",
                            member.path.display(),
                            canonical.path.display()
                        );
                    }
                    ConsolidateMode::Delete => {
                        report.deleted += 1;
                        info!(
                            "Deleted {} (kept {})",
                            member.path.display(),
                            canonical.path.display()
                        );
                    }
                }
                report.bytes_reclaimed += set.size;
            }
            Err(err) => {
                warn!("Action failed for {}: {}", member.path.display(), err);
                report.failed.push((member.path.clone(), err));
            }
        }
    }

    report
}

/// Replace `target` with a hardlink to `canonical` without a window where the
/// target path is missing: the link is created under a temporary name in the
/// same directory, then renamed over the original.
fn replace_with_link(canonical: &Path, target: &Path) -> io::Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let name = target
        .file_name()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "target has no file name"))?;
    let tmp = dir.join(format!(
        ".{}.dupelink.{}.tmp",
        name.to_string_lossy(),
        process::id()
    ));

    fs::hard_link(canonical, &tmp)?;
    if let Err(err) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}
