//! WiX source (`.wxs`) generation.
//!
//! Turns a [`Package`] into a WiX v3 document: product metadata, major-upgrade
//! detection, one component per file and a single feature that references
//! every component.
//!
//! Output is a pure function of the package. Rendering the same package twice
//! yields byte-identical text.

use crate::error::{Error, Result};
use crate::package::{FolderId, Package, PackageTree};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

const WIX_NAMESPACE: &str = "http://schemas.microsoft.com/wix/2006/wi";
const LANGUAGE_EN_US: &str = "1033";
const INSTALLER_VERSION: &str = "405";
const LOWEST_VERSION: &str = "0.0.0";
const NEWER_VERSION_PROPERTY: &str = "NEWERVERSIONDETECTED";
const OLDER_VERSION_PROPERTY: &str = "OLDERVERSIONBEINGUPGRADED";
const NEWER_VERSION_MESSAGE: &str = "A newer version of this software is already installed.";

/// Renders the complete WiX document for `package`.
pub fn render(package: &Package) -> Result<String> {
    let mut doc = WxsWriter::new();

    doc.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    doc.start("Wix", &[("xmlns", WIX_NAMESPACE)])?;

    doc.start(
        "Product",
        &[
            ("Id", "*"),
            ("UpgradeCode", package.upgrade_code()),
            ("Name", package.name()),
            ("Version", package.version()),
            ("Manufacturer", package.manufacturer()),
            ("Language", LANGUAGE_EN_US),
        ],
    )?;

    doc.empty(
        "Package",
        &[
            ("InstallerVersion", INSTALLER_VERSION),
            ("Compressed", "yes"),
            ("Comments", "Windows Installer Package"),
            ("Platform", package.arch().as_str()),
        ],
    )?;

    doc.empty(
        "Media",
        &[("Id", "1"), ("Cabinet", "product.cab"), ("EmbedCab", "yes")],
    )?;

    upgrade_block(&mut doc, package)?;

    doc.start("Condition", &[("Message", NEWER_VERSION_MESSAGE)])?;
    doc.text(&format!("NOT {NEWER_VERSION_PROPERTY}"))?;
    doc.end("Condition")?;

    doc.start("Directory", &[("Id", "TARGETDIR"), ("Name", "SourceDir")])?;
    let tree = package.tree();
    directory(&mut doc, tree, tree.root(), win64_flag(package))?;
    doc.end("Directory")?;

    doc.start("InstallExecuteSequence", &[])?;
    doc.empty("RemoveExistingProducts", &[("After", "InstallValidate")])?;
    doc.end("InstallExecuteSequence")?;

    feature(&mut doc, package)?;

    doc.end("Product")?;
    doc.end("Wix")?;

    doc.finish()
}

/// Detects newer installs (to block) and older installs (to replace).
fn upgrade_block(doc: &mut WxsWriter, package: &Package) -> Result<()> {
    doc.start("Upgrade", &[("Id", package.upgrade_code())])?;
    doc.empty(
        "UpgradeVersion",
        &[
            ("Minimum", package.version()),
            ("OnlyDetect", "yes"),
            ("Property", NEWER_VERSION_PROPERTY),
        ],
    )?;
    doc.empty(
        "UpgradeVersion",
        &[
            ("Minimum", LOWEST_VERSION),
            ("Maximum", package.version()),
            ("IncludeMinimum", "yes"),
            ("IncludeMaximum", "no"),
            ("Property", OLDER_VERSION_PROPERTY),
        ],
    )?;
    doc.end("Upgrade")
}

fn directory(doc: &mut WxsWriter, tree: &PackageTree, folder: FolderId, win64: &str) -> Result<()> {
    let node = tree.folder_node(folder);

    let mut attrs = vec![("Id", node.id())];
    if let Some(name) = node.name() {
        attrs.push(("Name", name));
    }

    if node.folders().next().is_none() && node.files().next().is_none() {
        return doc.empty("Directory", &attrs);
    }

    doc.start("Directory", &attrs)?;

    for (_, child) in node.folders() {
        directory(doc, tree, child, win64)?;
    }

    for (_, file) in node.files() {
        let entry = tree.file(file);
        let source = entry.source().display().to_string();

        doc.start(
            "Component",
            &[
                ("Id", entry.component_id()),
                ("Guid", entry.guid()),
                ("Win64", win64),
            ],
        )?;
        doc.empty(
            "File",
            &[
                ("Id", entry.file_id()),
                ("Name", entry.name()),
                ("Source", source.as_str()),
                ("KeyPath", "yes"),
            ],
        )?;
        doc.end("Component")?;
    }

    doc.end("Directory")
}

fn feature(doc: &mut WxsWriter, package: &Package) -> Result<()> {
    let mut refs = Vec::with_capacity(package.tree().file_count());
    package.traverse_files(|f| refs.push(f.component_id().to_string()));

    if refs.is_empty() {
        return doc.empty("Feature", &[("Id", "Complete"), ("Level", "1")]);
    }

    doc.start("Feature", &[("Id", "Complete"), ("Level", "1")])?;
    for id in &refs {
        doc.empty("ComponentRef", &[("Id", id.as_str())])?;
    }
    doc.end("Feature")
}

fn win64_flag(package: &Package) -> &'static str {
    if package.arch().is_64bit() { "yes" } else { "no" }
}

/// Thin wrapper over the indenting quick-xml writer.
struct WxsWriter {
    inner: Writer<Vec<u8>>,
}

impl WxsWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner
            .write_event(event)
            .map_err(|e| Error::GenericError(format!("writing wxs document: {e}")))
    }

    fn element<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        let mut el = BytesStart::new(name);
        for attr in attrs {
            el.push_attribute(*attr);
        }
        el
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Start(Self::element(name, attrs)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Empty(Self::element(name, attrs)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::new(text)))
    }

    fn finish(self) -> Result<String> {
        let mut out = String::from_utf8(self.inner.into_inner())
            .map_err(|e| Error::GenericError(format!("wxs document is not UTF-8: {e}")))?;
        out.push('\n');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Arch, PackageOptions};
    use std::path::PathBuf;

    fn package(arch: Arch) -> Package {
        Package::new(PackageOptions {
            name: "Demo & Co".into(),
            manufacturer: "Example".into(),
            arch,
            version: "1.2.0".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_empty_package_has_required_structure() {
        let pkg = package(Arch::X86);
        let wxs = render(&pkg).unwrap();

        assert!(wxs.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(wxs.contains(&format!("UpgradeCode=\"{}\"", pkg.upgrade_code())));
        assert!(wxs.contains("Name=\"Demo &amp; Co\""));
        assert!(wxs.contains("Language=\"1033\""));
        assert!(wxs.contains("Platform=\"x86\""));
        assert!(wxs.contains("<Directory Id=\"ProgramFilesFolder\"/>"));
        assert!(wxs.contains(">NOT NEWERVERSIONDETECTED</Condition>"));
        assert!(wxs.contains("<RemoveExistingProducts After=\"InstallValidate\"/>"));
        assert!(wxs.contains("<Feature Id=\"Complete\" Level=\"1\"/>"));
    }

    #[test]
    fn test_upgrade_ranges_bracket_current_version() {
        let wxs = render(&package(Arch::X86)).unwrap();
        assert!(wxs.contains(
            "<UpgradeVersion Minimum=\"1.2.0\" OnlyDetect=\"yes\" Property=\"NEWERVERSIONDETECTED\"/>"
        ));
        assert!(wxs.contains(
            "<UpgradeVersion Minimum=\"0.0.0\" Maximum=\"1.2.0\" IncludeMinimum=\"yes\" IncludeMaximum=\"no\" Property=\"OLDERVERSIONBEINGUPGRADED\"/>"
        ));
    }

    #[test]
    fn test_components_follow_arch_and_tree() {
        let mut pkg = package(Arch::X64);
        let bin = pkg.folder("bin");
        pkg.tree_mut()
            .add_file(bin, "app.exe", PathBuf::from("/src/bin/app.exe"));

        let wxs = render(&pkg).unwrap();
        assert!(wxs.contains("<Directory Id=\"ProgramFiles64Folder\">"));
        assert!(wxs.contains("<Directory Id=\"U0\" Name=\"bin\">"));
        assert!(wxs.contains("Id=\"U1C\""));
        assert!(wxs.contains("Win64=\"yes\""));
        assert!(wxs.contains(
            "<File Id=\"U1\" Name=\"app.exe\" Source=\"/src/bin/app.exe\" KeyPath=\"yes\"/>"
        ));
        assert!(wxs.contains("<ComponentRef Id=\"U1C\"/>"));
    }

    #[test]
    fn test_x86_components_are_not_win64() {
        let mut pkg = package(Arch::X86);
        let root = pkg.tree().root();
        pkg.tree_mut()
            .add_file(root, "app.exe", PathBuf::from("/src/app.exe"));

        let wxs = render(&pkg).unwrap();
        assert!(wxs.contains("<Directory Id=\"ProgramFilesFolder\">"));
        assert!(wxs.contains("Win64=\"no\""));
        assert!(!wxs.contains("Win64=\"yes\""));
    }

    #[test]
    fn test_indentation_is_two_spaces() {
        let wxs = render(&package(Arch::X86)).unwrap();
        assert!(wxs.contains("\n  <Product "));
        assert!(wxs.contains("\n    <Package "));
    }
}
