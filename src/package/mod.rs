//! In-memory model of an MSI package.
//!
//! A [`Package`] combines product metadata, the GUIDs that identify the product
//! across releases, and the [`PackageTree`] of files to install.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_msi::package::{Arch, GuidSource, Package, PackageOptions};
//!
//! # fn example() -> kodegen_bundler_msi::Result<()> {
//! let mut package = Package::new(PackageOptions {
//!     name: "MyApp".into(),
//!     manufacturer: "Example Inc.".into(),
//!     arch: Arch::X64,
//!     version: "1.2.0".into(),
//!     guids: GuidSource::File("guids.json".into()),
//! })?;
//!
//! package.add_contents("dist", "**/*")?;
//! let wxs = package.render()?;
//! # Ok(())
//! # }
//! ```

mod guids;
mod ids;
mod tree;

pub use guids::{GuidCache, UPGRADE_KEY, is_canonical_guid, new_guid};
pub use ids::IdAllocator;
pub use tree::{FileEntry, FileId, FolderId, FolderNode, PackageTree};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Target architecture of the installer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Arch {
    /// 32-bit, installs under `Program Files (x86)` on 64-bit Windows.
    #[default]
    X86,
    /// 64-bit, installs under `Program Files`.
    X64,
}

impl Arch {
    /// Platform tag used in the package element (`x86` / `x64`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X64 => "x64",
        }
    }

    /// Well-known id of the install root directory.
    pub fn root_folder_id(&self) -> &'static str {
        match self {
            Arch::X86 => "ProgramFilesFolder",
            Arch::X64 => "ProgramFiles64Folder",
        }
    }

    /// Whether components must be marked as 64-bit.
    pub fn is_64bit(&self) -> bool {
        matches!(self, Arch::X64)
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x86" | "i686" | "i386" => Ok(Arch::X86),
            "x64" | "x86_64" | "amd64" => Ok(Arch::X64),
            other => Err(Error::InvalidArch(other.to_string())),
        }
    }
}

impl TryFrom<String> for Arch {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the package GUIDs come from.
#[derive(Debug, Clone)]
pub enum GuidSource {
    /// Caller-owned mapping, never persisted.
    InMemory(BTreeMap<String, String>),
    /// JSON file, loaded if present and written on every new entry.
    File(PathBuf),
}

impl Default for GuidSource {
    fn default() -> Self {
        GuidSource::InMemory(BTreeMap::new())
    }
}

/// Construction options for [`Package`].
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Product name. Default: empty.
    pub name: String,
    /// Manufacturer. Default: empty.
    pub manufacturer: String,
    /// Target architecture. Default: [`Arch::X86`].
    pub arch: Arch,
    /// Product version. Default: `0.1.0`.
    pub version: String,
    /// GUID store. Default: empty in-memory map.
    pub guids: GuidSource,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            manufacturer: String::new(),
            arch: Arch::default(),
            version: "0.1.0".to_string(),
            guids: GuidSource::default(),
        }
    }
}

/// An installer package under construction.
#[derive(Debug)]
pub struct Package {
    name: String,
    manufacturer: String,
    arch: Arch,
    version: String,
    upgrade_code: String,
    version_guid: String,
    guids: GuidCache,
    tree: PackageTree,
}

impl Package {
    /// Creates an empty package and resolves its GUIDs.
    ///
    /// The version GUID is looked up under the version string and the upgrade
    /// code under [`UPGRADE_KEY`]; either is generated (and persisted, for a
    /// file-backed source) on first use.
    pub fn new(options: PackageOptions) -> Result<Self> {
        let mut guids = match options.guids {
            GuidSource::InMemory(map) => GuidCache::in_memory(map),
            GuidSource::File(path) => GuidCache::load(path)?,
        };

        let version_guid = guids.get_or_create(&options.version)?;
        let upgrade_code = guids.get_or_create(UPGRADE_KEY)?;

        log::debug!(
            "Package {} {} ({}): upgrade code {}",
            options.name,
            options.version,
            options.arch,
            upgrade_code
        );

        Ok(Self {
            tree: PackageTree::new(options.arch.root_folder_id()),
            name: options.name,
            manufacturer: options.manufacturer,
            arch: options.arch,
            version: options.version,
            upgrade_code,
            version_guid,
            guids,
        })
    }

    /// Product name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Manufacturer.
    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// Target architecture.
    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Product version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Upgrade code, stable across versions.
    pub fn upgrade_code(&self) -> &str {
        &self.upgrade_code
    }

    /// GUID unique to this version.
    pub fn version_guid(&self) -> &str {
        &self.version_guid
    }

    /// The GUID cache backing this package.
    pub fn guids(&self) -> &GuidCache {
        &self.guids
    }

    /// Files and folders to install.
    pub fn tree(&self) -> &PackageTree {
        &self.tree
    }

    /// Mutable access to the file tree.
    pub fn tree_mut(&mut self) -> &mut PackageTree {
        &mut self.tree
    }

    /// Returns the folder `name` directly under the install root, creating it if needed.
    pub fn folder(&mut self, name: &str) -> FolderId {
        let root = self.tree.root();
        self.tree.folder(root, name)
    }

    /// Adds every match of `pattern` under `base` to the install root.
    pub fn add_contents(&mut self, base: impl AsRef<Path>, pattern: &str) -> Result<usize> {
        let added = self.tree.add_contents(base.as_ref(), pattern)?;
        log::info!(
            "Added {} file(s) from {} matching {}",
            added,
            base.as_ref().display(),
            pattern
        );
        Ok(added)
    }

    /// Adds every match of `pattern` under `base` to `folder`.
    pub fn add_contents_to(
        &mut self,
        folder: FolderId,
        base: impl AsRef<Path>,
        pattern: &str,
    ) -> Result<usize> {
        self.tree.add_contents_to(folder, base, pattern)
    }

    /// First file named `name`, searched depth-first from the install root.
    pub fn find(&self, name: &str) -> Option<&FileEntry> {
        self.tree.find(name).map(|id| self.tree.file(id))
    }

    /// Visits every file in the package once, in document order.
    pub fn traverse_files<F>(&self, visit: F)
    where
        F: FnMut(&FileEntry),
    {
        self.tree.traverse_files(visit)
    }

    /// Renders the WiX source document for this package.
    pub fn render(&self) -> Result<String> {
        crate::wxs::render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let package = Package::new(PackageOptions::default()).unwrap();
        assert_eq!(package.name(), "");
        assert_eq!(package.manufacturer(), "");
        assert_eq!(package.arch(), Arch::X86);
        assert_eq!(package.version(), "0.1.0");
        assert_eq!(
            package.tree().folder_node(package.tree().root()).id(),
            "ProgramFilesFolder"
        );
    }

    #[test]
    fn test_upgrade_code_comes_from_reserved_key() {
        let mut seeded = BTreeMap::new();
        seeded.insert(UPGRADE_KEY.to_string(), "11111111-2222-3333-4444-555555555555".to_string());
        let package = Package::new(PackageOptions {
            version: "2.0.0".into(),
            guids: GuidSource::InMemory(seeded),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(package.upgrade_code(), "11111111-2222-3333-4444-555555555555");
        assert!(is_canonical_guid(package.version_guid()));
        assert_ne!(package.version_guid(), package.upgrade_code());
        assert_eq!(package.guids().get("2.0.0"), Some(package.version_guid()));
    }

    #[test]
    fn test_arch_parsing() {
        assert_eq!("x64".parse::<Arch>().unwrap(), Arch::X64);
        assert_eq!("x86_64".parse::<Arch>().unwrap(), Arch::X64);
        assert_eq!("x86".parse::<Arch>().unwrap(), Arch::X86);
        assert!(matches!("arm64".parse::<Arch>(), Err(Error::InvalidArch(_))));
        assert_eq!(Arch::X64.root_folder_id(), "ProgramFiles64Folder");
        assert!(Arch::X64.is_64bit());
        assert!(!Arch::X86.is_64bit());
    }
}
