//! Build manifest (`msi.toml`).
//!
//! ```toml
//! [package]
//! name = "MyApp"
//! manufacturer = "Example Inc."
//! arch = "x64"
//! version = "1.2.0"
//! guids = "guids.json"
//!
//! [[contents]]
//! base = "dist"
//! glob = "**/*"
//! target = "MyApp"
//!
//! [toolchain]
//! cache_dir = "cache/wix"
//! runner = "wine"
//!
//! [build]
//! intermediate_dir = "build"
//! output = "dist/MyApp.msi"
//! ```
//!
//! Relative paths are resolved against the directory holding the manifest.

use crate::builder::DEFAULT_INTERMEDIATE_DIR;
use crate::error::{Error, ErrorExt, Result};
use crate::package::{Arch, GuidSource, Package, PackageOptions};
use crate::toolchain::{DEFAULT_WIX_URL, WixToolchain};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "msi.toml";

/// Default toolset cache, relative to the manifest.
pub const DEFAULT_CACHE_DIR: &str = "cache/wix";

/// Upper bounds of an MSI `ProductVersion` (major.minor.build).
const MAX_MAJOR: u64 = 255;
const MAX_MINOR: u64 = 255;
const MAX_BUILD: u64 = 65535;

/// Parsed build manifest with paths resolved.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Product metadata.
    pub package: PackageSection,

    /// Content to install, applied in order.
    #[serde(default)]
    pub contents: Vec<ContentSection>,

    /// Toolset provisioning.
    #[serde(default)]
    pub toolchain: ToolchainSection,

    /// Output locations.
    #[serde(default)]
    pub build: BuildSection,

    /// Directory relative paths were resolved against.
    #[serde(skip)]
    root: PathBuf,
}

/// `[package]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    /// Product name.
    #[serde(default)]
    pub name: String,
    /// Manufacturer.
    #[serde(default)]
    pub manufacturer: String,
    /// `x86` or `x64`.
    #[serde(default)]
    pub arch: Arch,
    /// Semantic version.
    #[serde(default = "default_version")]
    pub version: String,
    /// GUID cache file. Without it GUIDs change on every run.
    pub guids: Option<PathBuf>,
}

/// `[[contents]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentSection {
    /// Directory the pattern is matched in.
    pub base: PathBuf,
    /// Glob pattern relative to `base`.
    #[serde(default = "default_glob")]
    pub glob: String,
    /// Destination folder under the install root, `/`-separated.
    pub target: Option<String>,
}

/// `[toolchain]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainSection {
    /// Where the WiX binaries are cached.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Archive URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Expected SHA-256 of the archive.
    pub sha256: Option<String>,
    /// Program used to run the `.exe` tools (e.g. `wine`).
    pub runner: Option<PathBuf>,
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            url: default_url(),
            sha256: None,
            runner: None,
        }
    }
}

/// `[build]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Directory for `setup.wxs` and `setup.wixobj`.
    pub intermediate_dir: Option<PathBuf>,
    /// Installer path. Defaults to `<name>-<version>-<arch>.msi` next to the manifest.
    pub output: Option<PathBuf>,
}

fn default_version() -> String {
    PackageOptions::default().version
}

fn default_glob() -> String {
    "**/*".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_url() -> String {
    DEFAULT_WIX_URL.to_string()
}

impl Manifest {
    /// Reads and validates a manifest, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).fs_context("reading manifest", path)?;
        let manifest = Self::parse(&contents)?;
        let root = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(manifest.resolve_paths(root))
    }

    /// Parses and validates manifest text without touching paths.
    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: Self =
            toml::from_str(contents).map_err(|e| Error::Manifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        validate_product_version(&self.package.version)?;

        for content in &self.contents {
            if content.glob.trim().is_empty() {
                return Err(Error::Manifest(format!(
                    "empty glob for contents base {}",
                    content.base.display()
                )));
            }
        }

        Ok(())
    }

    fn resolve_paths(mut self, root: &Path) -> Self {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() { p.to_path_buf() } else { root.join(p) }
        };

        self.package.guids = self.package.guids.as_deref().map(resolve);
        for content in &mut self.contents {
            content.base = resolve(&content.base);
        }
        self.toolchain.cache_dir = resolve(&self.toolchain.cache_dir);
        self.build.intermediate_dir = Some(resolve(
            self.build
                .intermediate_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_INTERMEDIATE_DIR)),
        ));
        self.build.output = self.build.output.as_deref().map(resolve);
        self.root = root.to_path_buf();
        self
    }

    /// Package construction options described by this manifest.
    pub fn package_options(&self) -> PackageOptions {
        PackageOptions {
            name: self.package.name.clone(),
            manufacturer: self.package.manufacturer.clone(),
            arch: self.package.arch,
            version: self.package.version.clone(),
            guids: match &self.package.guids {
                Some(path) => GuidSource::File(path.clone()),
                None => GuidSource::default(),
            },
        }
    }

    /// Creates the package and ingests every `[[contents]]` entry.
    pub fn create_package(&self) -> Result<Package> {
        if self.package.guids.is_none() {
            log::warn!("No GUID cache configured; upgrade code will change on every build");
        }

        let mut package = Package::new(self.package_options())?;

        for content in &self.contents {
            let mut folder = package.tree().root();
            if let Some(target) = &content.target {
                for segment in target.split('/').filter(|s| !s.is_empty()) {
                    folder = package.tree_mut().folder(folder, segment);
                }
            }
            let added = package.add_contents_to(folder, &content.base, &content.glob)?;
            log::info!(
                "{}: {} file(s) from {}",
                content.glob,
                added,
                content.base.display()
            );
        }

        Ok(package)
    }

    /// WiX toolchain described by `[toolchain]`.
    pub fn toolchain(&self) -> WixToolchain {
        let mut toolchain =
            WixToolchain::new(&self.toolchain.cache_dir).with_url(&self.toolchain.url);
        if let Some(sha256) = &self.toolchain.sha256 {
            toolchain = toolchain.with_sha256(sha256);
        }
        if let Some(runner) = &self.toolchain.runner {
            toolchain = toolchain.with_runner(runner);
        }
        toolchain
    }

    /// Intermediate directory for the build.
    pub fn intermediate_dir(&self) -> PathBuf {
        self.build
            .intermediate_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INTERMEDIATE_DIR))
    }

    /// Installer output path.
    pub fn output(&self) -> PathBuf {
        self.build.output.clone().unwrap_or_else(|| {
            let name = if self.package.name.is_empty() {
                "setup"
            } else {
                self.package.name.as_str()
            };
            self.root.join(format!(
                "{}-{}-{}.msi",
                name, self.package.version, self.package.arch
            ))
        })
    }
}

/// Checks that `version` is plain `major.minor.patch` within MSI limits.
///
/// Windows Installer only understands numeric versions, so pre-release and
/// build metadata are rejected here rather than by the compiler later.
fn validate_product_version(version: &str) -> Result<()> {
    let parsed = semver::Version::parse(version).map_err(|e| {
        Error::Manifest(format!(
            "package.version '{}' is not a semantic version: {}",
            version, e
        ))
    })?;

    if !parsed.pre.is_empty() || !parsed.build.is_empty() {
        return Err(Error::Manifest(format!(
            "package.version '{}' must be numeric (no pre-release or build metadata)",
            version
        )));
    }

    if parsed.major > MAX_MAJOR || parsed.minor > MAX_MINOR || parsed.patch > MAX_BUILD {
        return Err(Error::Manifest(format!(
            "package.version '{}' exceeds MSI limits ({}.{}.{})",
            version, MAX_MAJOR, MAX_MINOR, MAX_BUILD
        )));
    }

    Ok(())
}
