//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::document::{ensure_depth, to_toml};
use crate::application::ElementForest;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::infrastructure::ServiceContainer;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let command = cli
        .command
        .as_ref()
        .ok_or_else(|| CliError::Usage("no command given, see --help".to_string()))?;

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Flatten { file, output } => _flatten(&container, file, output.as_deref()),
        Commands::Unflatten {
            file,
            tree,
            keys,
            output,
        } => _unflatten(&container, file, *tree, *keys, output.as_deref()),
        Commands::Tree { file, keys } => _tree(&container, file, *keys),
        Commands::Config { command } => _config(&container, command),
        Commands::Completion { .. } => Ok(()),
    }
}

#[instrument(level = "debug", skip(container))]
fn _flatten(container: &ServiceContainer, file: &Path, out: Option<&Path>) -> CliResult<()> {
    ensure_distinct(file, out)?;
    let service = &container.tree_service;
    let flat = service.flatten_document(file)?;
    let count = flat.records.len();
    emit(service.render(&flat, out)?, out, &format!("{} records", count))
}

#[instrument(level = "debug", skip(container))]
fn _unflatten(
    container: &ServiceContainer,
    file: &Path,
    tree: bool,
    keys: bool,
    out: Option<&Path>,
) -> CliResult<()> {
    ensure_distinct(file, out)?;
    let service = &container.tree_service;
    let roots = service.unflatten_records(file)?;

    if tree {
        for root in &roots {
            ensure_depth(root)?;
            let rendered = if keys {
                root.to_keyed_tree_string()
            } else {
                root.to_tree_string()
            };
            output::info(&rendered);
        }
        return Ok(());
    }

    let mut docs = service.to_documents(&roots)?;
    let summary = format!("{} root(s)", docs.len());
    let rendered = if docs.len() == 1 {
        service.render(&docs.remove(0), out)?
    } else {
        service.render(&ElementForest { roots: docs }, out)?
    };
    emit(rendered, out, &summary)
}

#[instrument(level = "debug", skip(container))]
fn _tree(container: &ServiceContainer, file: &Path, keys: bool) -> CliResult<()> {
    let root = container.tree_service.build(file)?;
    ensure_depth(&root)?;
    let rendered = if keys {
        root.to_keyed_tree_string()
    } else {
        root.to_tree_string()
    };
    output::info(&rendered);
    Ok(())
}

fn _config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::header("# effective settings");
            output::data(&to_toml(container.settings.as_ref())?)?;
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::info(&path.display()),
            None => output::error("no config directory available on this platform"),
        },
    }
    Ok(())
}

fn ensure_distinct(input: &Path, out: Option<&Path>) -> CliResult<()> {
    match out {
        Some(out) if out == input => Err(CliError::InvalidArgs(format!(
            "output would overwrite input: {}",
            input.display()
        ))),
        _ => Ok(()),
    }
}

fn emit(rendered: Option<String>, out: Option<&Path>, summary: &str) -> CliResult<()> {
    match (rendered, out) {
        (Some(text), _) => output::data(&text)?,
        (None, Some(path)) => output::success(&format!("wrote {} to {}", summary, path.display())),
        (None, None) => {}
    }
    Ok(())
}
