//! Build orchestration.
//!
//! [`Builder`] drives one package through the toolchain:
//! 1. Renders the `.wxs` document
//! 2. Provisions the toolchain
//! 3. Writes the document to the intermediate directory
//! 4. Compiles it to a `.wixobj`
//! 5. Links the installer
//!
//! Every stage must succeed before the next one starts.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_msi::{Builder, Package, PackageOptions, WixToolchain};
//!
//! # async fn example() -> kodegen_bundler_msi::Result<()> {
//! let mut package = Package::new(PackageOptions::default())?;
//! package.add_contents("dist", "**/*")?;
//!
//! let builder = Builder::new(WixToolchain::new("cache/wix"));
//! let artifact = builder.build(&package, "dist/setup.msi").await?;
//! println!("{} ({} bytes, sha256 {})", artifact.path.display(), artifact.size, artifact.checksum);
//! # Ok(())
//! # }
//! ```

use crate::error::{Context, ErrorExt, Result};
use crate::package::Package;
use crate::toolchain::{Stage, Toolchain};
use crate::utils::fs;
use std::path::{Path, PathBuf};

/// Default directory for the intermediate `.wxs` and `.wixobj` files.
pub const DEFAULT_INTERMEDIATE_DIR: &str = "build";

const WXS_FILE: &str = "setup.wxs";
const WIXOBJ_FILE: &str = "setup.wixobj";

/// The installer produced by a successful build.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    /// Installer path.
    pub path: PathBuf,

    /// Rendered document the installer was built from.
    pub wxs: PathBuf,

    /// Installer size in bytes.
    pub size: u64,

    /// SHA-256 checksum of the installer, lowercase hex.
    pub checksum: String,
}

/// Turns packages into installers with a given toolchain.
#[derive(Debug, Clone)]
pub struct Builder<T> {
    toolchain: T,
    intermediate_dir: PathBuf,
}

impl<T: Toolchain> Builder<T> {
    /// Builder writing intermediates to [`DEFAULT_INTERMEDIATE_DIR`].
    pub fn new(toolchain: T) -> Self {
        Self {
            toolchain,
            intermediate_dir: PathBuf::from(DEFAULT_INTERMEDIATE_DIR),
        }
    }

    /// Writes intermediates to `dir` instead.
    pub fn intermediate_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.intermediate_dir = dir.into();
        self
    }

    /// The toolchain in use.
    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Where the rendered document is written.
    pub fn wxs_path(&self) -> PathBuf {
        self.intermediate_dir.join(WXS_FILE)
    }

    /// Where the compiled object is written.
    pub fn wixobj_path(&self) -> PathBuf {
        self.intermediate_dir.join(WIXOBJ_FILE)
    }

    /// Builds `package` into an installer at `output`.
    pub async fn build(&self, package: &Package, output: impl AsRef<Path>) -> Result<BuildArtifact> {
        let output = output.as_ref();

        log::info!(
            "Building {} {} ({}) with {} file(s)",
            package.name(),
            package.version(),
            package.arch(),
            package.tree().file_count()
        );

        let wxs = package.render()?;

        self.toolchain
            .ensure_provisioned()
            .await
            .context("failed to provision toolchain")?;

        let wxs_path = self.wxs_path();
        fs::write_file(&wxs_path, &wxs).await?;
        log::debug!("Wrote {}", wxs_path.display());

        let wixobj_path = self.wixobj_path();
        self.toolchain
            .invoke(Stage::Compile, &wxs_path, &wixobj_path)
            .await
            .with_context(|| format!("{} failed", Stage::Compile))?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating output directory", parent)?;
        }

        self.toolchain
            .invoke(Stage::Link, &wixobj_path, output)
            .await
            .with_context(|| format!("{} failed", Stage::Link))?;

        let data = tokio::fs::read(output)
            .await
            .fs_context("reading installer", output)?;
        let checksum = sha256_hex(&data);

        log::info!("✓ Created {}", output.display());

        Ok(BuildArtifact {
            path: output.to_path_buf(),
            wxs: wxs_path,
            size: data.len() as u64,
            checksum,
        })
    }
}

fn sha256_hex(data: &[u8]) -> String {
    use sha2::Digest as _;
    hex::encode(sha2::Sha256::digest(data))
}
