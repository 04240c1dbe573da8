//! Command dispatch: loads the chart, runs one engine operation, prints the result.

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::ChartService;
use crate::application::ApplicationError;
use crate::cli::args::{BoardArg, Cli, Commands, ConfigCommands, FilterArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{render_board, Filters, Point, Size};
use crate::infrastructure::{InfraError, ServiceContainer};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Cli::command()
            .print_help()
            .map_err(|e| CliError::from(InfraError::io("print help", e)));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.file.as_deref())?;
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Boards => cmd_boards(&container),
        Commands::Tree { board, collapse } => cmd_tree(&container, board, collapse),
        Commands::Layout {
            board,
            filters,
            write,
        } => cmd_layout(&container, board, filters, *write),
        Commands::Visible { board, filters } => cmd_visible(&container, board, filters),
        Commands::Chain { board, id } => cmd_chain(&container, board, id),
        Commands::Fit {
            board,
            filters,
            width,
            height,
        } => cmd_fit(&container, board, filters, Size::new(*width, *height)),
        Commands::Move { board, id, x, y } => {
            cmd_move(&container, board, id, Point::new(*x, *y))
        }
        Commands::Export { board, filters } => cmd_export(&container, board, filters),
        Commands::Config { command } => cmd_config(&container, command),
        Commands::Completion { .. } => Ok(()),
    }
}

/// Load the chart and make the requested board (or the first one) active.
fn open_board(container: &ServiceContainer, board: &BoardArg) -> CliResult<(ChartService, String)> {
    let mut chart = container.load_chart()?;
    let name = match &board.board {
        Some(name) => name.clone(),
        None => chart.active_board().map(str::to_string).ok_or_else(|| {
            CliError::Usage(format!(
                "no boards in {}",
                container.settings.data_file.display()
            ))
        })?,
    };
    chart.switch_board(&name)?;
    debug!(board = %name, "board opened");
    Ok((chart, name))
}

fn open_filtered(
    container: &ServiceContainer,
    board: &BoardArg,
    filters: &FilterArgs,
) -> CliResult<(ChartService, String)> {
    if filters.country.is_some() && filters.region.is_none() {
        output::warning("--country is ignored without --region");
    }
    let (mut chart, name) = open_board(container, board)?;
    chart.set_visibility_filter(&name, filters.to_filters())?;
    Ok((chart, name))
}

#[instrument(level = "debug", skip(container))]
fn cmd_boards(container: &ServiceContainer) -> CliResult<()> {
    let chart = container.load_chart()?;
    let names: Vec<&str> = chart.board_names().collect();
    if names.is_empty() {
        output::warning(&format!(
            "no boards in {}",
            container.settings.data_file.display()
        ));
        return Ok(());
    }
    for name in names {
        let board = chart.board(name)?;
        output::info(&format!("{name}\t{}", board.len()));
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_tree(container: &ServiceContainer, board: &BoardArg, collapse: &[String]) -> CliResult<()> {
    let (chart, name) = open_board(container, board)?;
    let filters = Filters {
        collapsed_ids: collapse.iter().cloned().collect(),
        ..Filters::default()
    };
    output::info(&render_board(chart.board(&name)?, &filters));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_layout(
    container: &ServiceContainer,
    board: &BoardArg,
    filters: &FilterArgs,
    write: bool,
) -> CliResult<()> {
    let (mut chart, name) = open_filtered(container, board, filters)?;
    let placed = chart.apply_auto_layout(&name)?;
    if placed.is_empty() {
        output::warning("no visible people, nothing laid out");
        return Ok(());
    }
    for person in &placed {
        if let Some(pos) = person.position {
            output::info(&format!("{}\t{}\t{}", person.id, pos.x, pos.y));
        }
    }
    if write {
        container.save_chart(&chart)?;
        output::success(&format!(
            "{} positions written to {}",
            placed.len(),
            container.settings.data_file.display()
        ));
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_visible(container: &ServiceContainer, board: &BoardArg, filters: &FilterArgs) -> CliResult<()> {
    let (chart, name) = open_filtered(container, board, filters)?;
    for person in chart.visible(&name)? {
        output::info(&format!("{}\t{}\t{}", person.id, person.name, person.level.as_str()));
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_chain(container: &ServiceContainer, board: &BoardArg, id: &str) -> CliResult<()> {
    let (chart, name) = open_board(container, board)?;
    let arena = chart.board(&name)?;
    if !arena.contains(id) {
        return Err(CliError::InvalidArgs(format!("unknown person '{id}' in board '{name}'")));
    }
    let chain = chart.get_reporting_chain(&name, id)?;
    for (depth, person) in arena.iter_preorder().filter(|(_, p)| chain.contains(&p.id)) {
        output::info(&format!("{}{person}", "  ".repeat(depth)));
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_fit(
    container: &ServiceContainer,
    board: &BoardArg,
    filters: &FilterArgs,
    size: Size,
) -> CliResult<()> {
    let (mut chart, _) = open_filtered(container, board, filters)?;
    chart.set_viewport_size(size);
    if !chart.fit_to_screen() {
        output::warning("no positioned people visible, run 'layout --write' first");
        return Ok(());
    }
    let viewport = chart.viewport();
    output::action("zoom", &format!("{:.4}", viewport.zoom()));
    output::action("pan", &viewport.pan());
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_move(container: &ServiceContainer, board: &BoardArg, id: &str, to: Point) -> CliResult<()> {
    let (mut chart, name) = open_board(container, board)?;
    chart.update_node_position(&name, id, to)?;
    container.save_chart(&chart)?;
    output::success(&format!("{id} moved to {to}"));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_export(container: &ServiceContainer, board: &BoardArg, filters: &FilterArgs) -> CliResult<()> {
    let (chart, name) = open_filtered(container, board, filters)?;
    let export = chart.export_board(&name)?;
    let json = serde_json::to_string_pretty(&export).map_err(|e| {
        ApplicationError::OperationFailed {
            context: format!("serialize board '{name}'"),
            source: Box::new(e),
        }
    })?;
    output::info(&json);
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    let local = local_config_path(&container.settings.data_file);
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(global) => output::action("global", &describe(container, &global)),
                None => output::action("global", &"(no config directory)"),
            }
            output::action("local", &describe(container, &local));
            output::action("data", &container.settings.data_file.display());
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path()
                    .ok_or_else(|| CliError::Usage("no config directory on this system".into()))?
            } else {
                local
            };
            if container.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .map_err(|e| InfraError::io(format!("create {}", path.display()), e))?;
            container
                .fs
                .write(&path, &Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("created {}", path.display()));
            Ok(())
        }
    }
}

fn describe(container: &ServiceContainer, path: &Path) -> String {
    let state = if container.fs.is_file(path) {
        "exists"
    } else {
        "not found"
    };
    format!("{} ({state})", path.display())
}
