//! Disc-image toolkit wrapper: extraction, rebuild, ticket extraction.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Tool, ToolError, ToolResult, ToolSet};

/// Wrapper for the disc-image toolkit executable.
pub struct DiscToolkit {
    tool: Tool,
}

impl DiscToolkit {
    /// Create a toolkit wrapper from the tool set.
    pub fn new(tools: &ToolSet) -> Self {
        Self {
            tool: tools.disc_toolkit(),
        }
    }

    /// Extract the data partition of `image` into `dest`, dropping the
    /// update partition.
    pub fn extract_image(&self, image: &Path, dest: &Path) -> ToolResult<()> {
        fs::create_dir_all(dest).map_err(|e| ToolError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let args: Vec<OsString> = vec![
            "extract".into(),
            image.as_os_str().to_owned(),
            "--dest".into(),
            dest.as_os_str().to_owned(),
            "--psel".into(),
            "data,-update".into(),
            "-ovv".into(),
        ];
        self.tool.run(&args)
    }

    /// Rebuild the tree at `src` into a single normalized disc image at
    /// `dest`. `alt_endpoint` tags the image for the alternate
    /// online-service endpoint.
    pub fn rebuild_image(&self, src: &Path, dest: &Path, alt_endpoint: bool) -> ToolResult<PathBuf> {
        let mut args: Vec<OsString> = vec![
            "copy".into(),
            src.as_os_str().to_owned(),
            "--dest".into(),
            dest.as_os_str().to_owned(),
            "-ovv".into(),
            "--links".into(),
            "--iso".into(),
        ];
        if alt_endpoint {
            args.push("--wiimmfi".into());
        }
        self.tool.run(&args)?;

        if !dest.is_file() {
            return Err(ToolError::MissingOutput {
                tool: self.tool.name(),
                path: dest.to_path_buf(),
            });
        }
        Ok(dest.to_path_buf())
    }

    /// Extract the title's ticket and metadata blobs from `image` into
    /// `dest` as `rvlt.tmd` and `rvlt.tik`.
    ///
    /// The toolkit nests its output under `DATA/` for some image layouts;
    /// both locations are accepted.
    pub fn extract_tickets(&self, image: &Path, dest: &Path) -> ToolResult<()> {
        let staging = tempfile::tempdir().map_err(|e| ToolError::Io {
            path: PathBuf::from("tickets staging"),
            source: e,
        })?;
        let ticket_dir = staging.path().join("tickets");

        let args: Vec<OsString> = vec![
            "extract".into(),
            image.as_os_str().to_owned(),
            "--psel".into(),
            "data".into(),
            "--psel".into(),
            "-update".into(),
            "--files".into(),
            "+tmd.bin".into(),
            "--files".into(),
            "+ticket.bin".into(),
            "--dest".into(),
            ticket_dir.as_os_str().to_owned(),
            "-vv1".into(),
        ];
        self.tool.run(&args)?;

        fs::create_dir_all(dest).map_err(|e| ToolError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        self.move_ticket(&ticket_dir, "tmd.bin", &dest.join("rvlt.tmd"))?;
        self.move_ticket(&ticket_dir, "ticket.bin", &dest.join("rvlt.tik"))?;
        Ok(())
    }

    fn move_ticket(&self, ticket_dir: &Path, name: &str, dest: &Path) -> ToolResult<()> {
        let direct = ticket_dir.join(name);
        let nested = ticket_dir.join("DATA").join(name);
        let source = if direct.is_file() {
            direct
        } else if nested.is_file() {
            nested
        } else {
            return Err(ToolError::MissingOutput {
                tool: self.tool.name(),
                path: direct,
            });
        };

        fs::rename(&source, dest).map_err(|e| ToolError::Io {
            path: dest.to_path_buf(),
            source: e,
        })
    }
}
