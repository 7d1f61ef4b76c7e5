//! Command line interface for kodegen_bundler_msi.

mod args;

pub use args::Args;

use crate::builder::Builder;
use crate::error::Result;
use crate::manifest::Manifest;
use std::io::Write;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(args).await
}

/// Runs the command described by `args`.
pub async fn execute(args: Args) -> Result<i32> {
    let manifest = Manifest::load(&args.manifest)?;
    let package = manifest.create_package()?;

    if let Some(wxs_path) = &args.wxs {
        let wxs = package.render()?;
        if wxs_path.as_os_str() == "-" {
            std::io::stdout().write_all(wxs.as_bytes())?;
        } else {
            crate::utils::fs::write_file(wxs_path, &wxs).await?;
            log::info!("Wrote {}", wxs_path.display());
        }
        return Ok(0);
    }

    let output = args.output.clone().unwrap_or_else(|| manifest.output());
    let builder = Builder::new(manifest.toolchain()).intermediate_dir(manifest.intermediate_dir());
    let artifact = builder.build(&package, &output).await?;

    println!("✓ {} ({} bytes)", artifact.path.display(), artifact.size);
    println!("  sha256: {}", artifact.checksum);

    Ok(0)
}
