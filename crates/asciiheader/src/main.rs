mod cli;
mod paths;
mod run;

use anyhow::{Context, Result};
use cli::{Command, ConfigAction};
use headerconfig::HeaderConfig;
use paths::AppPaths;
use renderer::PassPlan;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action),
        None => run::run(cli.run),
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Print => {
            let toml = HeaderConfig::default()
                .to_toml_string()
                .context("failed to serialize default configuration")?;
            print!("{toml}");
            Ok(())
        }
        ConfigAction::Check { path } => {
            let config = HeaderConfig::load(&path)
                .with_context(|| format!("configuration {} is invalid", path.display()))?;
            let effects = config.effects();
            let plan = PassPlan::for_effects(&effects);
            println!("{}: ok", path.display());
            println!("  preset:  {}", config.effects.preset);
            println!("  lights:  {}", config.lights.len());
            println!("  passes:  {:?}", plan.passes());
            if let Some(model) = &config.model.path {
                println!("  model:   {}", model.display());
            }
            if let Some(atlas) = &config.ascii.atlas {
                println!("  atlas:   {}", atlas.display());
            }
            Ok(())
        }
        ConfigAction::Where => {
            let paths = AppPaths::discover()?;
            let file = paths.config_file();
            println!("Configuration directories:");
            println!("  config:  {}", paths.config_dir().display());
            println!(
                "  file:    {} ({})",
                file.display(),
                if file.is_file() { "present" } else { "missing" }
            );
            Ok(())
        }
    }
}
