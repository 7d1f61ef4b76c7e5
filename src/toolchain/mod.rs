//! External packaging toolchain.
//!
//! The build driver only needs two things from a toolchain: make sure its
//! binaries are present, and run one build stage. [`Toolchain`] captures that
//! seam so the package model and document generation can be exercised without
//! network or process access.
//!
//! | Stage | WiX binary | Input | Output |
//! |-------|------------|-------|--------|
//! | [`Stage::Compile`] | `candle.exe` | `.wxs` | `.wixobj` |
//! | [`Stage::Link`] | `light.exe` | `.wixobj` | `.msi` |

mod wix;

pub use wix::{DEFAULT_WIX_URL, WixToolchain};

use crate::error::Result;
use std::fmt;
use std::future::Future;
use std::path::Path;

/// One step of turning a `.wxs` document into an installer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Source document to object file.
    Compile,
    /// Object file to installer.
    Link,
}

impl Stage {
    /// Short name of the WiX tool for this stage.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Stage::Compile => "candle",
            Stage::Link => "light",
        }
    }

    /// Executable file name inside the toolset directory.
    pub fn executable(&self) -> &'static str {
        match self {
            Stage::Compile => "candle.exe",
            Stage::Link => "light.exe",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// A packaging toolchain the build driver can provision and invoke.
pub trait Toolchain {
    /// Makes the toolchain binaries available locally.
    ///
    /// Called before every build; implementations return quickly once provisioned.
    fn ensure_provisioned(&self) -> impl Future<Output = Result<()>> + Send;

    /// Runs `stage` reading `input` and producing `output`.
    ///
    /// A stage that cannot be started or exits unsuccessfully is an error.
    fn invoke(
        &self,
        stage: Stage,
        input: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}
