//! ImageMonkey Releaser - builds, pushes and releases ImageMonkey docker images.
//!
//! This binary is the only place that turns an error into a diagnostic and an
//! exit code.

use imagemonkey_releaser::cli;
use imagemonkey_releaser::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = cli::run().await {
        // never quiet for fatal errors
        let output = OutputManager::new(false);
        output.error(&format!("Fatal error: {e}"));

        let suggestions = e.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("\n💡 Recovery suggestions:");
            for suggestion in suggestions {
                eprintln!("    {suggestion}");
            }
        }

        process::exit(1);
    }
}
