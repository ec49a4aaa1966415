//! Wrappers around the external tools the pipeline drives.
//!
//! Every collaborator is an opaque executable invoked with explicit inputs
//! and outputs: the disc toolkit, the streaming-format converter, the
//! packager, and the provisioning downloader. Wrappers capture tool output,
//! log it, and map non-success exits into [`ToolError::Failed`].

mod nfs;
mod packer;
mod wit;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, info};

pub use nfs::FormatConverter;
pub use packer::Packager;
pub use wit::DiscToolkit;

/// Result type for tool invocations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur while driving an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{tool} did not produce {}", path.display())]
    MissingOutput {
        tool: &'static str,
        path: PathBuf,
    },

    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One external executable.
#[derive(Debug, Clone)]
pub struct Tool {
    name: &'static str,
    path: PathBuf,
}

impl Tool {
    pub(crate) fn new(name: &'static str, path: PathBuf) -> Self {
        Self { name, path }
    }

    /// Tool name used in log lines and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the tool with `args`, inheriting the current working directory.
    pub fn run(&self, args: &[OsString]) -> ToolResult<()> {
        self.run_inner(args, None)
    }

    /// Run the tool with `args` from inside `dir`. Some tools write their
    /// outputs into the working directory rather than taking a destination
    /// argument.
    pub fn run_in(&self, dir: &Path, args: &[OsString]) -> ToolResult<()> {
        self.run_inner(args, Some(dir))
    }

    fn run_inner(&self, args: &[OsString], dir: Option<&Path>) -> ToolResult<()> {
        info!(
            tool = self.name,
            command = %format_command(&self.path, args),
            "running external tool"
        );

        let mut command = Command::new(&self.path);
        command.args(args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| ToolError::Launch {
            tool: self.name,
            source: e,
        })?;

        debug!(
            tool = self.name,
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "external tool finished"
        );

        if !output.status.success() {
            return Err(ToolError::Failed {
                tool: self.name,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

fn format_command(path: &Path, args: &[OsString]) -> String {
    let mut line = path.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Locations of every external tool under one configurable root.
#[derive(Debug, Clone)]
pub struct ToolSet {
    root: PathBuf,
}

impl ToolSet {
    /// Create a tool set rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The disc-image toolkit executable.
    pub fn disc_toolkit(&self) -> Tool {
        Tool::new("wit", self.root.join("WIT").join("wit"))
    }

    /// The disc-to-streaming-format converter executable.
    pub fn nfs_converter(&self) -> Tool {
        Tool::new("nfs2iso2nfs", self.root.join("EXE").join("nfs2iso2nfs"))
    }

    /// The bundle packager/encryptor executable.
    pub fn packager(&self) -> Tool {
        Tool::new("nuspacker", self.root.join("JAR").join("nuspacker"))
    }

    /// The provisioning downloader executable.
    pub fn downloader(&self) -> Tool {
        Tool::new("jnustool", self.root.join("JAR").join("jnustool"))
    }

    /// Directory the provisioning downloader runs from and stages into.
    pub fn downloader_dir(&self) -> PathBuf {
        self.root.join("JAR")
    }

    /// Catalog of loader stubs for GameCube titles.
    pub fn stub_catalog_dir(&self) -> PathBuf {
        self.root.join("DOL")
    }

    /// Skeleton tree GameCube titles are rebuilt from.
    pub fn skeleton_dir(&self) -> PathBuf {
        self.root.join("BASE")
    }
}
