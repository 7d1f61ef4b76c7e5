//! Command line argument parsing.

use crate::manifest::DEFAULT_MANIFEST;
use clap::Parser;
use std::path::PathBuf;

/// Windows Installer bundler driven by the WiX toolset
#[derive(Parser, Debug, Clone)]
#[command(
    name = "kodegen_bundler_msi",
    version,
    about = "Build a Windows Installer (.msi) from a directory layout",
    long_about = "Build a Windows Installer (.msi) from a directory layout.

The layout, product metadata and toolset location are read from a TOML manifest.
The WiX toolset is downloaded into the cache directory on first use.

Usage:
  kodegen_bundler_msi
  kodegen_bundler_msi path/to/msi.toml --output dist/MyApp.msi
  kodegen_bundler_msi --wxs build/setup.wxs"
)]
pub struct Args {
    /// Build manifest
    #[arg(index = 1, value_name = "MANIFEST", default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Installer path (overrides [build] output)
    #[arg(short, long, value_name = "PATH", env = "KODEGEN_MSI_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Only render the WiX document to PATH ("-" for stdout); skips the toolset
    #[arg(long, value_name = "PATH")]
    pub wxs: Option<PathBuf>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
