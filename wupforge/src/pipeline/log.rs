//! Per-title build log.
//!
//! Every build writes a plain-text log co-located with its output bundle,
//! one timestamped line per stage. The log is advisory: a failed write is
//! reported but never fails the build.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

pub(crate) struct BuildLog {
    file: File,
    started: Instant,
}

impl BuildLog {
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: File::create(path)?,
            started: Instant::now(),
        })
    }

    /// Record the start of a pipeline stage.
    pub(crate) fn stage(&mut self, message: &str) {
        info!("{}", message);
        let elapsed = self.started.elapsed().as_secs_f64();
        if let Err(e) = writeln!(self.file, "[{:>8.1}s] {}", elapsed, message) {
            warn!("failed to write build log line: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_stage_lines_are_appended() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("build.log");

        let mut log = BuildLog::create(&path).unwrap();
        log.stage("first stage");
        log.stage("second stage");

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first stage"));
        assert!(lines[1].ends_with("second stage"));
    }
}
