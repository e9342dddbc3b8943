//! Init command - write a starter crowd.toml

use anyhow::{Context, Result};
use console::style;
use passive_crowd::config::{EXAMPLE_CONFIG, PROJECT_CONFIG_FILE};
use std::path::Path;

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    let dir = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !dir.is_dir() {
        anyhow::bail!("Path is not a directory: {}", dir.display());
    }

    println!("\n{} Initializing passive-crowd\n", style("▶").bold());

    let config_path = dir.join(PROJECT_CONFIG_FILE);
    if config_path.exists() && !force {
        println!(
            "{} Config already exists at {} (use --force to overwrite)",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );

    println!("\n{}", style("Next steps:").bold());
    println!("  1. Edit {} to tune the run", PROJECT_CONFIG_FILE);
    println!("  2. Run {}", style("passive-crowd demo").cyan());
    println!(
        "  3. Plot it with {}",
        style("passive-crowd demo --format svg -o crowd.svg").cyan()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use passive_crowd::config::DemoConfig;

    #[test]
    fn test_init_writes_parseable_config() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), false).unwrap();
        let content = std::fs::read_to_string(dir.path().join(PROJECT_CONFIG_FILE)).unwrap();
        let config: DemoConfig = toml::from_str(&content).unwrap();
        assert_eq!(config.annotators.count, 20);
    }

    #[test]
    fn test_init_keeps_existing_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "# mine\n").unwrap();

        run(dir.path(), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        run(dir.path(), true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EXAMPLE_CONFIG);
    }

    #[test]
    fn test_init_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("nope"), false).is_err());
    }
}
