//! Wupforge - repackage GameCube and Wii disc images as installable Wii U packages
//!
//! This library drives the full conversion of a retail disc image into one
//! installable WUP bundle for the Wii U's Wii-compatibility loader:
//!
//! - Header sniffing that classifies a disc image and constructs the matching
//!   [`title::Title`] variant
//! - A multi-stage build pipeline (manifests, artwork, disc normalization,
//!   streaming-format conversion, encryption) in [`pipeline`]
//! - A bounded batch driver that fans independent per-title builds out over a
//!   worker pool in [`batch`]
//!
//! External tools (disc toolkit, format converter, packager, downloader) are
//! wrapped in [`toolkit`] and invoked with explicit inputs and outputs.

pub mod artwork;
pub mod batch;
pub mod config;
mod fsutil;
pub mod manifest;
pub mod pipeline;
pub mod provision;
pub mod texture;
pub mod title;
pub mod toolkit;

pub use config::KeyConfig;
pub use pipeline::{BuildError, BuildOutput, BuildStatus, TitleBuilder};
pub use title::{create_title, SourceImage, Title, TitleOptions, TitleVariant};
