//! WiX v3 toolset provisioning and invocation.

use crate::{
    bail,
    error::{Context, Error, ErrorExt, Result},
    toolchain::{Stage, Toolchain},
    utils::{fs, http},
};
use std::path::{Path, PathBuf};

/// WiX 3.14 binaries archive.
pub const DEFAULT_WIX_URL: &str =
    "https://github.com/wixtoolset/wix3/releases/download/wix3141rtm/wix314-binaries.zip";

const ARCHIVE_NAME: &str = "wix-binaries.zip";

/// WiX toolset cached in a local directory.
///
/// The cache directory existing at all means the toolset is provisioned; its
/// contents are not re-verified.
#[derive(Debug, Clone)]
pub struct WixToolchain {
    cache_dir: PathBuf,
    url: String,
    sha256: Option<String>,
    runner: Option<PathBuf>,
}

impl WixToolchain {
    /// Toolset cached in `cache_dir`, downloaded from [`DEFAULT_WIX_URL`].
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            url: DEFAULT_WIX_URL.to_string(),
            sha256: None,
            runner: None,
        }
    }

    /// Downloads the archive from `url` instead.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Requires the downloaded archive to have this SHA-256 hash.
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Runs the tools through `runner` (e.g. `wine`).
    pub fn with_runner(mut self, runner: impl Into<PathBuf>) -> Self {
        self.runner = Some(runner.into());
        self
    }

    /// Cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the executable for `stage`.
    pub fn tool_path(&self, stage: Stage) -> PathBuf {
        self.cache_dir.join(stage.executable())
    }

    async fn provision(&self) -> Result<()> {
        let data = http::download_and_verify(&self.url, self.sha256.as_deref())
            .await
            .context("failed to download WiX toolset")?;

        let archive = self.cache_dir.join(ARCHIVE_NAME);
        fs::write_file(&archive, &data).await?;

        http::extract_zip(&data, &self.cache_dir)
            .await
            .context("failed to extract WiX toolset")?;

        log::info!("extraction complete: {}", self.cache_dir.display());
        Ok(())
    }
}

impl Toolchain for WixToolchain {
    async fn ensure_provisioned(&self) -> Result<()> {
        let exists = tokio::fs::try_exists(&self.cache_dir)
            .await
            .fs_context("checking toolset cache", &self.cache_dir)?;
        if exists {
            log::debug!("WiX toolset already cached at {}", self.cache_dir.display());
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .fs_context("creating toolset cache", &self.cache_dir)?;

        if let Err(e) = self.provision().await {
            // An empty or half-extracted cache would otherwise count as provisioned.
            if let Err(cleanup) = fs::remove_dir_all(&self.cache_dir).await {
                log::warn!("failed to clean up toolset cache: {}", cleanup);
            }
            return Err(e);
        }

        Ok(())
    }

    async fn invoke(&self, stage: Stage, input: &Path, output: &Path) -> Result<()> {
        let tool = self.tool_path(stage);

        let mut command = match &self.runner {
            Some(runner) => {
                let mut command = tokio::process::Command::new(runner);
                command.arg(&tool);
                command
            }
            None => tokio::process::Command::new(&tool),
        };
        command.arg(input).arg("-out").arg(output);

        log::info!(
            "Running {} {} -out {}",
            stage,
            input.display(),
            output.display()
        );

        let result = command.output().await.map_err(|error| Error::CommandFailed {
            command: tool.display().to_string(),
            error,
        })?;

        if !result.status.success() {
            // candle and light report diagnostics on stdout.
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stdout = String::from_utf8_lossy(&result.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(Error::ToolFailed {
                tool: stage.tool_name().to_string(),
                code: result.status.code(),
                stderr: detail.trim().to_string(),
            });
        }

        if !output.exists() {
            bail!("{} reported success but {} was not created", stage, output.display());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_existing_cache_dir_counts_as_provisioned() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = WixToolchain::new(dir.path()).with_url("http://127.0.0.1:9/unreachable.zip");
        toolchain.ensure_provisioned().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_download_removes_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("wix");
        let toolchain = WixToolchain::new(&cache).with_url("http://127.0.0.1:9/unreachable.zip");

        assert!(toolchain.ensure_provisioned().await.is_err());
        assert!(!cache.exists());
    }

    #[tokio::test]
    async fn test_missing_tool_is_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = WixToolchain::new(dir.path());
        let err = toolchain
            .invoke(Stage::Compile, &dir.path().join("setup.wxs"), &dir.path().join("setup.wixobj"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[test]
    fn test_tool_paths() {
        let toolchain = WixToolchain::new("cache/wix");
        assert_eq!(toolchain.tool_path(Stage::Compile), Path::new("cache/wix").join("candle.exe"));
        assert_eq!(toolchain.tool_path(Stage::Link), Path::new("cache/wix").join("light.exe"));
    }
}
