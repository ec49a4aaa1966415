//! Streaming-format converter wrapper.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use super::{Tool, ToolError, ToolResult, ToolSet};

/// Wrapper for the disc-to-streaming-format converter.
///
/// The converter writes its chunked output into the working directory, so it
/// is always run from inside the destination content directory.
pub struct FormatConverter {
    tool: Tool,
}

impl FormatConverter {
    /// Create a converter wrapper from the tool set.
    pub fn new(tools: &ToolSet) -> Self {
        Self {
            tool: tools.nfs_converter(),
        }
    }

    /// Convert `image` into the streaming container format under
    /// `content_dir`, applying the variant's patch `flags`.
    pub fn convert(&self, image: &Path, content_dir: &Path, flags: &[&str]) -> ToolResult<()> {
        fs::create_dir_all(content_dir).map_err(|e| ToolError::Io {
            path: content_dir.to_path_buf(),
            source: e,
        })?;

        let mut args: Vec<OsString> = flags.iter().map(OsString::from).collect();
        args.push("-iso".into());
        args.push(image.as_os_str().to_owned());
        self.tool.run_in(content_dir, &args)
    }
}
