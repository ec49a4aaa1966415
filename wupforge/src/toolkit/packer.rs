//! Bundle packager/encryptor wrapper.

use std::ffi::OsString;
use std::path::Path;

use super::{Tool, ToolResult, ToolSet};

/// Wrapper for the packager that encrypts an assembled build tree into the
/// final installable bundle.
pub struct Packager {
    tool: Tool,
}

impl Packager {
    /// Create a packager wrapper from the tool set.
    pub fn new(tools: &ToolSet) -> Self {
        Self {
            tool: tools.packager(),
        }
    }

    /// Encrypt the build tree at `src` into the bundle at `dest` with the
    /// shared platform key.
    pub fn pack(&self, src: &Path, dest: &Path, common_key: &str) -> ToolResult<()> {
        let args: Vec<OsString> = vec![
            "-in".into(),
            src.as_os_str().to_owned(),
            "-out".into(),
            dest.as_os_str().to_owned(),
            "-encryptKeyWith".into(),
            common_key.into(),
        ];
        self.tool.run(&args)
    }
}
