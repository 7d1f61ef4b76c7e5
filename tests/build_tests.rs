use kodegen_bundler_msi::error::{Error, Result};
use kodegen_bundler_msi::{Builder, Package, PackageOptions, Stage, Toolchain};
use std::path::Path;
use std::sync::Mutex;

/// Records calls and writes placeholder outputs instead of running WiX.
#[derive(Default)]
struct FakeToolchain {
    calls: Mutex<Vec<String>>,
    fail_provision: bool,
    fail_stage: Option<Stage>,
}

impl FakeToolchain {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Toolchain for FakeToolchain {
    async fn ensure_provisioned(&self) -> Result<()> {
        self.calls.lock().unwrap().push("provision".to_string());
        if self.fail_provision {
            return Err(Error::GenericError("network unreachable".into()));
        }
        Ok(())
    }

    async fn invoke(&self, stage: Stage, input: &Path, output: &Path) -> Result<()> {
        assert!(input.exists(), "{stage} input {} missing", input.display());
        self.calls.lock().unwrap().push(stage.tool_name().to_string());

        if self.fail_stage == Some(stage) {
            return Err(Error::ToolFailed {
                tool: stage.tool_name().to_string(),
                code: Some(1),
                stderr: "error CNDL0104".into(),
            });
        }

        std::fs::write(output, format!("{stage} output"))?;
        Ok(())
    }
}

fn demo_package(dir: &Path) -> Package {
    let dist = dir.join("dist");
    std::fs::create_dir_all(dist.join("bin")).unwrap();
    std::fs::write(dist.join("bin").join("app.exe"), "MZ").unwrap();

    let mut package = Package::new(PackageOptions {
        name: "Demo".into(),
        version: "1.2.0".into(),
        ..Default::default()
    })
    .unwrap();
    package.add_contents(&dist, "**/*").unwrap();
    package
}

#[tokio::test]
async fn test_build_runs_stages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let package = demo_package(dir.path());
    let builder = Builder::new(FakeToolchain::default()).intermediate_dir(dir.path().join("build"));
    let output = dir.path().join("out").join("Demo.msi");

    let artifact = builder.build(&package, &output).await.unwrap();

    assert_eq!(builder.toolchain().calls(), vec!["provision", "candle", "light"]);
    assert_eq!(artifact.path, output);
    assert_eq!(artifact.size, "light output".len() as u64);
    assert_eq!(artifact.checksum.len(), 64);

    let wxs = std::fs::read_to_string(&artifact.wxs).unwrap();
    assert_eq!(artifact.wxs, dir.path().join("build").join("setup.wxs"));
    assert_eq!(wxs, package.render().unwrap());
}

#[tokio::test]
async fn test_provisioning_failure_stops_build() {
    let dir = tempfile::tempdir().unwrap();
    let package = demo_package(dir.path());
    let toolchain = FakeToolchain {
        fail_provision: true,
        ..Default::default()
    };
    let builder = Builder::new(toolchain).intermediate_dir(dir.path().join("build"));

    let err = builder
        .build(&package, dir.path().join("Demo.msi"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Context(_, _)));
    assert_eq!(builder.toolchain().calls(), vec!["provision"]);
    assert!(!builder.wxs_path().exists());
}

#[tokio::test]
async fn test_compile_failure_skips_link() {
    let dir = tempfile::tempdir().unwrap();
    let package = demo_package(dir.path());
    let toolchain = FakeToolchain {
        fail_stage: Some(Stage::Compile),
        ..Default::default()
    };
    let builder = Builder::new(toolchain).intermediate_dir(dir.path().join("build"));
    let output = dir.path().join("Demo.msi");

    let err = builder.build(&package, &output).await.unwrap_err();

    match err {
        Error::Context(_, inner) => assert!(matches!(*inner, Error::ToolFailed { .. })),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(builder.toolchain().calls(), vec!["provision", "candle"]);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_link_failure_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let package = demo_package(dir.path());
    let toolchain = FakeToolchain {
        fail_stage: Some(Stage::Link),
        ..Default::default()
    };
    let builder = Builder::new(toolchain).intermediate_dir(dir.path().join("build"));

    let err = builder
        .build(&package, dir.path().join("Demo.msi"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("light"));
    assert_eq!(builder.toolchain().calls(), vec!["provision", "candle", "light"]);
}
