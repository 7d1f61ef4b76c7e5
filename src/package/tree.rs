//! Destination folder/file hierarchy of an installer package.
//!
//! The tree is an arena: folders and files live in two vectors owned by
//! [`PackageTree`] and refer to each other through copyable [`FolderId`] and
//! [`FileId`] handles. Child maps are ordered, so every walk over the tree is
//! deterministic for a given construction sequence.
//!
//! ```no_run
//! use kodegen_bundler_msi::package::PackageTree;
//!
//! # fn example() -> kodegen_bundler_msi::Result<()> {
//! let mut tree = PackageTree::new("ProgramFilesFolder");
//! let root = tree.root();
//! let app = tree.folder(root, "MyApp");
//! tree.add_contents_to(app, "dist", "**/*")?;
//!
//! if let Some(exe) = tree.find("myapp.exe") {
//!     println!("{}", tree.file(exe).source().display());
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Context, ErrorExt, Result};
use crate::package::guids::new_guid;
use crate::package::ids::IdAllocator;
use path_absolutize::Absolutize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Suffix that turns a file id into its component id.
const COMPONENT_SUFFIX: &str = "C";

/// Glob matching used for content ingestion.
const MATCH_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

/// Handle to a folder inside a [`PackageTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(usize);

/// Handle to a file inside a [`PackageTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

/// One destination directory.
#[derive(Debug, Clone)]
pub struct FolderNode {
    name: Option<String>,
    id: String,
    parent: Option<FolderId>,
    folders: BTreeMap<String, FolderId>,
    files: BTreeMap<String, FileId>,
}

impl FolderNode {
    /// Display name; `None` for the install root.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Directory element id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parent folder; `None` for the install root.
    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    /// Child folder with the given name.
    pub fn child(&self, name: &str) -> Option<FolderId> {
        self.folders.get(name).copied()
    }

    /// Child folders in name order.
    pub fn folders(&self) -> impl Iterator<Item = (&str, FolderId)> {
        self.folders.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Files directly in this folder, in name order.
    pub fn files(&self) -> impl Iterator<Item = (&str, FileId)> {
        self.files.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// One source file to be installed.
#[derive(Debug, Clone)]
pub struct FileEntry {
    folder: FolderId,
    name: String,
    source: PathBuf,
    guid: String,
    file_id: String,
    component_id: String,
}

impl FileEntry {
    /// Folder the file is installed into.
    pub fn folder(&self) -> FolderId {
        self.folder
    }

    /// File name at the destination.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of the file on the build machine.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Component GUID, fresh for every build.
    pub fn guid(&self) -> &str {
        &self.guid
    }

    /// File element id.
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Component element id.
    pub fn component_id(&self) -> &str {
        &self.component_id
    }
}

/// Folder/file hierarchy rooted at the installation directory.
#[derive(Debug, Clone)]
pub struct PackageTree {
    folders: Vec<FolderNode>,
    files: Vec<FileEntry>,
    ids: IdAllocator,
}

impl PackageTree {
    /// Creates a tree whose root directory carries the fixed id `root_id`.
    pub fn new(root_id: impl Into<String>) -> Self {
        Self {
            folders: vec![FolderNode {
                name: None,
                id: root_id.into(),
                parent: None,
                folders: BTreeMap::new(),
                files: BTreeMap::new(),
            }],
            files: Vec::new(),
            ids: IdAllocator::new(),
        }
    }

    /// The installation root.
    pub fn root(&self) -> FolderId {
        FolderId(0)
    }

    /// Folder behind a handle.
    pub fn folder_node(&self, id: FolderId) -> &FolderNode {
        &self.folders[id.0]
    }

    /// File behind a handle.
    pub fn file(&self, id: FileId) -> &FileEntry {
        &self.files[id.0]
    }

    /// Total number of files in the tree.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of folders in the tree, root included.
    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    /// Returns the child folder `name` of `parent`, creating it if needed.
    pub fn folder(&mut self, parent: FolderId, name: &str) -> FolderId {
        if let Some(existing) = self.folders[parent.0].folders.get(name) {
            return *existing;
        }

        let handle = FolderId(self.folders.len());
        self.folders.push(FolderNode {
            name: Some(name.to_string()),
            id: self.ids.next_id(),
            parent: Some(parent),
            folders: BTreeMap::new(),
            files: BTreeMap::new(),
        });
        self.folders[parent.0].folders.insert(name.to_string(), handle);
        handle
    }

    /// Adds a file under `folder` unless one with that name is already there.
    ///
    /// Returns `None` when the name was taken; the existing entry is kept.
    pub fn add_file(&mut self, folder: FolderId, name: &str, source: PathBuf) -> Option<FileId> {
        if self.folders[folder.0].files.contains_key(name) {
            return None;
        }

        let handle = FileId(self.files.len());
        let file_id = self.ids.next_id();
        self.files.push(FileEntry {
            folder,
            name: name.to_string(),
            source,
            guid: new_guid(),
            component_id: format!("{file_id}{COMPONENT_SUFFIX}"),
            file_id,
        });
        self.folders[folder.0].files.insert(name.to_string(), handle);
        Some(handle)
    }

    /// Expands `pattern` under `base` into the installation root.
    ///
    /// See [`add_contents_to`](Self::add_contents_to).
    pub fn add_contents(&mut self, base: impl AsRef<Path>, pattern: &str) -> Result<usize> {
        let root = self.root();
        self.add_contents_to(root, base, pattern)
    }

    /// Expands `pattern` relative to `base` and mirrors every match under `target`.
    ///
    /// Wildcards never match a leading `.`, so hidden files and directories are
    /// only picked up when the pattern names them literally.
    ///
    /// Directories become (possibly empty) folders; regular files become
    /// entries in the folder matching their relative parent path. A name that
    /// already exists in its folder is skipped, so overlapping patterns and
    /// repeated calls never produce duplicates. Returns the number of files
    /// added by this call.
    pub fn add_contents_to(
        &mut self,
        target: FolderId,
        base: impl AsRef<Path>,
        pattern: &str,
    ) -> Result<usize> {
        let base = base
            .as_ref()
            .absolutize()
            .fs_context("resolving content base directory", base.as_ref())?
            .into_owned();
        let base_str = base
            .to_str()
            .with_context(|| format!("base directory {} is not valid UTF-8", base.display()))?;
        let full_pattern = Path::new(&glob::Pattern::escape(base_str)).join(pattern);
        let full_pattern = full_pattern
            .to_str()
            .context("glob pattern is not valid UTF-8")?;

        log::debug!("Scanning {}", full_pattern);

        let mut added = 0;
        for entry in glob::glob_with(full_pattern, MATCH_OPTIONS)? {
            let path = entry?;
            let relative = path.strip_prefix(&base)?;
            let segments = segments(relative)?;

            let Some((last, parents)) = segments.split_last() else {
                continue;
            };

            let mut folder = target;
            for segment in parents {
                folder = self.folder(folder, segment);
            }

            let metadata = std::fs::metadata(&path).fs_context("reading metadata", &path)?;
            if metadata.is_file() {
                if self.add_file(folder, last, path.clone()).is_some() {
                    added += 1;
                } else {
                    log::debug!("Skipping {}: {} already in package", path.display(), last);
                }
            } else {
                self.folder(folder, last);
            }
        }

        Ok(added)
    }

    /// Depth-first search for a file by name.
    ///
    /// Each folder's own files are checked before its children are searched.
    pub fn find(&self, name: &str) -> Option<FileId> {
        self.find_in(self.root(), name)
    }

    fn find_in(&self, folder: FolderId, name: &str) -> Option<FileId> {
        let node = self.folder_node(folder);
        if let Some(file) = node.files.get(name) {
            return Some(*file);
        }
        node.folders
            .values()
            .find_map(|child| self.find_in(*child, name))
    }

    /// Visits every file exactly once: child folders first, then own files.
    pub fn traverse_files<F>(&self, mut visit: F)
    where
        F: FnMut(&FileEntry),
    {
        self.traverse_from(self.root(), &mut visit);
    }

    fn traverse_from<F>(&self, folder: FolderId, visit: &mut F)
    where
        F: FnMut(&FileEntry),
    {
        let node = self.folder_node(folder);
        for child in node.folders.values() {
            self.traverse_from(*child, visit);
        }
        for file in node.files.values() {
            visit(self.file(*file));
        }
    }

    /// Destination path of a folder relative to the install root.
    pub fn folder_path(&self, folder: FolderId) -> PathBuf {
        let mut names = Vec::new();
        let mut current = Some(folder);
        while let Some(id) = current {
            let node = self.folder_node(id);
            if let Some(name) = node.name() {
                names.push(name);
            }
            current = node.parent();
        }
        names.iter().rev().collect()
    }
}

fn segments(relative: &Path) -> Result<Vec<String>> {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s),
            _ => None,
        })
        .map(|s| {
            s.to_str()
                .map(str::to_string)
                .with_context(|| format!("path {} is not valid UTF-8", relative.display()))
        })
        .collect()
}
