//! # Kodegen MSI Bundler
//!
//! Builds Windows Installer (`.msi`) packages from a directory layout using the
//! WiX v3 toolset.
//!
//! The crate models the installed layout as a [`PackageTree`] of folders and
//! files, renders it into a WiX source document, and drives `candle` and
//! `light` to produce the installer. The WiX binaries are downloaded once into
//! a local cache.
//!
//! ## Features
//!
//! - **Deduplicated layout**: overlapping globs and repeated calls never
//!   produce duplicate folders or files
//! - **Stable upgrade codes**: GUIDs are cached per version in a JSON file so
//!   new releases upgrade old ones in place
//! - **Deterministic output**: the same tree always renders the same document
//! - **Pluggable toolchain**: the [`Toolchain`] trait keeps network and process
//!   access out of the package model
//!
//! ## Usage
//!
//! ```bash
//! kodegen_bundler_msi                      # build from ./msi.toml
//! kodegen_bundler_msi app/msi.toml -o app.msi
//! kodegen_bundler_msi --wxs -              # print the .wxs document only
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod builder;
pub mod cli;
pub mod error;
pub mod manifest;
pub mod package;
pub mod toolchain;
pub mod utils;
pub mod wxs;

pub use builder::{BuildArtifact, Builder};
pub use error::{Error, Result};
pub use manifest::Manifest;
pub use package::{Arch, FileEntry, GuidCache, GuidSource, Package, PackageOptions, PackageTree};
pub use toolchain::{Stage, Toolchain, WixToolchain};
