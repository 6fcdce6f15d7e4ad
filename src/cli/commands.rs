//! Command dispatch

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::application::DomainResultExt;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path};
use crate::domain::tree::Shift;
use crate::domain::{grade_outline, GradeBook, TreeNodeConvert};
use crate::infrastructure::di::ServiceContainer;

/// Run a parsed command. Shell completion is handled before settings load.
pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    match &cli.command {
        Commands::Show { prefix } => cmd_show(cli, container, prefix),
        Commands::Students { filter } => cmd_students(cli, container, filter),
        Commands::Grades {
            alias,
            assignments,
            tree,
        } => cmd_grades(cli, container, alias, assignments, *tree),
        Commands::Project {
            alias,
            qualified_name,
        } => cmd_project(cli, container, alias, qualified_name),
        Commands::Set {
            alias,
            qualified_name,
            grade,
        } => cmd_set(cli, container, alias, qualified_name, grade),
        Commands::Add {
            qualified_name,
            weight,
            extra_credit,
        } => cmd_add(cli, container, qualified_name, weight, *extra_credit),
        Commands::MoveUp { qualified_name } => cmd_move(cli, container, qualified_name, Shift::Up),
        Commands::MoveDown { qualified_name } => {
            cmd_move(cli, container, qualified_name, Shift::Down)
        }
        Commands::Remove { qualified_name } => cmd_remove(cli, container, qualified_name),
        Commands::Check => cmd_check(cli, container),
        Commands::Config { command } => cmd_config(cli, container, command),
        Commands::Completion { .. } => Err(CliError::InvalidArgs(
            "completion is generated before settings load".into(),
        )),
    }
}

fn load(cli: &Cli, container: &ServiceContainer) -> CliResult<(PathBuf, GradeBook)> {
    let path = container.gradebook_path(cli.file.clone())?;
    let book = container.gradebook.load(&path)?;
    Ok((path, book))
}

#[instrument(level = "debug", skip(cli, container))]
fn cmd_show(cli: &Cli, container: &ServiceContainer, prefix: &str) -> CliResult<()> {
    let (_, book) = load(cli, container)?;
    let tree = book.assignments();
    if prefix == "all" {
        output::info(&tree.to_tree_string());
        return Ok(());
    }
    let matches = tree.assignments_under(prefix);
    if matches.is_empty() {
        output::warning(&format!("no assignment under {prefix}"));
    }
    for idx in matches {
        output::header(&format!(
            "{} ({})",
            tree.qualified_name(idx),
            tree.data(idx).weight_display()
        ));
        for line in tree.weight_info(idx).lines() {
            output::detail(&line);
        }
    }
    Ok(())
}

fn cmd_students(cli: &Cli, container: &ServiceContainer, filter: &str) -> CliResult<()> {
    let (_, book) = load(cli, container)?;
    for student in book.students_matching(filter) {
        output::info(&format!("{}\t{}", student.alias(), student));
    }
    Ok(())
}

#[instrument(level = "debug", skip(cli, container))]
fn cmd_grades(
    cli: &Cli,
    container: &ServiceContainer,
    alias: &str,
    assignments: &str,
    tree: bool,
) -> CliResult<()> {
    let (path, book) = load(cli, container)?;
    let student = book.student(alias).in_gradebook(&path)?;
    output::header(student);
    if tree {
        output::info(&grade_outline(&book, alias).in_gradebook(&path)?);
        return Ok(());
    }
    let views = book.grade_views(alias).in_gradebook(&path)?;
    for view in views {
        let qualified_name = view.qualified_name();
        if assignments != "all" && !qualified_name.starts_with(assignments) {
            continue;
        }
        let display = view.display_string();
        output::info(&format!(
            "{}{}  {}",
            "  ".repeat(view.depth()),
            view.assignment(),
            output::swatch(&display, view.color())
        ));
    }
    Ok(())
}

fn cmd_project(
    cli: &Cli,
    container: &ServiceContainer,
    alias: &str,
    qualified_name: &str,
) -> CliResult<()> {
    let (path, book) = load(cli, container)?;
    let view = book
        .get_grade(alias, qualified_name)
        .in_gradebook(&path)?;
    output::header(&format!("{} / {}", alias, view.qualified_name()));
    for line in view.projection_string().lines() {
        output::detail(&line);
    }
    Ok(())
}

fn cmd_set(
    cli: &Cli,
    container: &ServiceContainer,
    alias: &str,
    qualified_name: &str,
    grade: &str,
) -> CliResult<()> {
    let path = container.gradebook_path(cli.file.clone())?;
    let change = container
        .gradebook
        .set_grade(&path, alias, qualified_name, grade)?;
    if change.changed {
        output::action("Set", &format!("{qualified_name} = {}", change.display));
    } else {
        output::warning(&format!("{qualified_name} already {}", change.display));
    }
    for (name, display) in &change.aggregates {
        output::detail(&format!("{name}: {display}"));
    }
    Ok(())
}

fn cmd_add(
    cli: &Cli,
    container: &ServiceContainer,
    qualified_name: &str,
    weight: &str,
    extra_credit: bool,
) -> CliResult<()> {
    let path = container.gradebook_path(cli.file.clone())?;
    container
        .gradebook
        .add_assignment(&path, qualified_name, weight, extra_credit)?;
    output::success(&format!("added {qualified_name} ({weight})"));
    Ok(())
}

fn cmd_move(
    cli: &Cli,
    container: &ServiceContainer,
    qualified_name: &str,
    direction: Shift,
) -> CliResult<()> {
    let path = container.gradebook_path(cli.file.clone())?;
    if container
        .gradebook
        .move_assignment(&path, qualified_name, direction)?
    {
        output::success(&format!("moved {qualified_name} {direction:?}"));
    } else {
        output::warning(&format!("{qualified_name} cannot move {direction:?}"));
    }
    Ok(())
}

fn cmd_remove(cli: &Cli, container: &ServiceContainer, qualified_name: &str) -> CliResult<()> {
    let path = container.gradebook_path(cli.file.clone())?;
    container.gradebook.remove_assignment(&path, qualified_name)?;
    output::success(&format!("removed {qualified_name}"));
    Ok(())
}

fn cmd_check(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    let path = container.gradebook_path(cli.file.clone())?;
    let report = container.gradebook.check(&path)?;
    debug!(?report, "checked");
    output::success(&format!(
        "{}: {} students, {} assignments",
        path.display(),
        report.students,
        report.assignments
    ));
    if !report.canonical {
        output::warning("file differs from its canonical form; the next edit rewrites it");
    }
    Ok(())
}

fn cmd_config(cli: &Cli, container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&container.settings.to_toml()?),
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".into());
            output::action("global", &global);
            output::action("local", &local_config_path(&local_dir(cli.file.as_deref())).display());
        }
    }
    Ok(())
}

/// Directory searched for the local config: the gradebook's directory, else cwd.
pub fn local_dir(file: Option<&Path>) -> PathBuf {
    file.and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
