//! Kodegen MSI Bundler - Windows Installer packages from a directory layout.

use kodegen_bundler_msi::cli;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("Fatal error: {e}");

            if let Some(hint) = e.recovery_hint() {
                eprintln!("\n💡 {hint}");
            }

            process::exit(1);
        }
    }
}
