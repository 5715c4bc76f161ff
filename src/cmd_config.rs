//! `check-config` subcommand.

use std::path::Path;

use cellvisor_config::{ConfigLoader, ConfigValidator};

/// Load the file, then print each validation warning.
pub(crate) fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    println!(
        "{}: ok ({} warning(s))",
        path.display(),
        result.warnings.len()
    );
    Ok(())
}
