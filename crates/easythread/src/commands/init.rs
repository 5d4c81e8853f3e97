//! Init command - write a default easythread.toml

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{ProjectConfig, CONFIG_FILE};
use crate::{Output, OutputFormat};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory (default: current)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

const HEADER: &str = "# easythread configuration\n\
# marker:     comment token that marks a function for relocation\n\
# capture:    \"forward\" copies outer variables into the worker, \"none\" sends nothing\n\
# extensions: module extensions the transform looks at\n\n";

pub fn run(args: InitArgs, output: Output) -> Result<()> {
    fs::create_dir_all(&args.path)
        .with_context(|| format!("could not create {}", args.path.display()))?;
    let config_path = args.path.join(CONFIG_FILE);

    let created = if config_path.exists() && !args.force {
        false
    } else {
        let body = ProjectConfig::default().to_toml()?;
        fs::write(&config_path, format!("{}{}", HEADER, body))
            .with_context(|| format!("could not write {}", config_path.display()))?;
        true
    };

    match output.format {
        OutputFormat::Text => {
            if output.quiet {
                return Ok(());
            }
            if created {
                println!("Created {}", config_path.display());
            } else {
                println!(
                    "Skipped {} (already exists, use --force to overwrite)",
                    config_path.display()
                );
            }
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "created": created,
                "path": config_path.to_string_lossy(),
            });
            println!("{}", serde_json::to_string(&result)?);
        }
    }
    Ok(())
}
