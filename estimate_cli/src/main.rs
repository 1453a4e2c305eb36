//! # Estimator CLI Application
//!
//! Command-line front end for building renovation estimates and viewing
//! their totals. Every mutating command locks the project file, loads it,
//! applies one validated edit and saves it atomically.
//!
//! ```text
//! estimate new flat.est "Flat 12"
//! estimate add-category flat.est "Ground floor"
//! estimate add-detail flat.est "Ground floor" Kitchen --width 3 --height 4.2
//! estimate add-work flat.est "Ground floor/Kitchen" Tiling --qty 12.6 --price 35 --unit m²
//! estimate summary flat.est
//! estimate export flat.est report.typ
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use estimate_core::editor::{add_line_item, remove_line_item};
use estimate_core::export::{export_to_file, render, ExportFormat};
use estimate_core::file_io::{load_project, load_project_with_lock_check, save_project, FileLock};
use estimate_core::money::format_money;
use estimate_core::project::{ItemKind, LineItem, Node, NodePath, Project};
use estimate_core::structure::{add_category, add_detail, remove_node, rename_node, validate_project_name};
use estimate_core::summary::summarize_project;

#[derive(Debug, Parser)]
#[command(name = "estimate", version, about = "Renovation cost estimator")]
struct Cli {
    /// Log filter used when neither ESTIMATE_LOG nor RUST_LOG is set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Identifier recorded in lock files
    #[arg(long, global = true, env = "ESTIMATE_USER", default_value = "estimator")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new, empty project file
    New { file: PathBuf, name: String },

    /// Add a category at the top level or under PARENT
    AddCategory {
        file: PathBuf,
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },

    /// Add a room (detail node) under a category
    AddDetail {
        file: PathBuf,
        parent: String,
        name: String,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
    },

    /// Add a work item to a node
    AddWork(ItemArgs),

    /// Add a material item to a node
    AddMaterial(ItemArgs),

    /// Remove an empty node
    Remove { file: PathBuf, path: String },

    /// Rename a node
    Rename {
        file: PathBuf,
        path: String,
        new_name: String,
    },

    /// Remove a line item by its index (as shown by `tree`)
    RemoveItem {
        file: PathBuf,
        path: String,
        kind: KindArg,
        index: usize,
    },

    /// Print the project tree with its line items
    Tree { file: PathBuf },

    /// Print the totals summary
    Summary {
        file: PathBuf,
        /// Print the summary tree as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Write a report document
    Export {
        file: PathBuf,
        out: PathBuf,
        /// Defaults to the output file's extension (.typ → typst, else text)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
}

#[derive(Debug, clap::Args)]
struct ItemArgs {
    file: PathBuf,
    path: String,
    name: String,
    #[arg(long)]
    qty: Decimal,
    #[arg(long)]
    price: Decimal,
    /// Unit of measure; the project's default unit when omitted
    #[arg(long, default_value = "")]
    unit: String,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Work,
    Material,
}

impl From<KindArg> for ItemKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Work => ItemKind::Work,
            KindArg::Material => ItemKind::Material,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Typst,
    Text,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Typst => ExportFormat::Typst,
            FormatArg::Text => ExportFormat::Text,
        }
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_env("ESTIMATE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::New { file, name } => {
            if file.exists() {
                bail!("{} already exists", file.display());
            }
            let name = validate_project_name(&name)?;
            let project = Project::new(name);
            save_project(&project, &file).with_context(|| format!("creating {}", file.display()))?;
            info!(file = %file.display(), "project created");
            println!("Created project '{}' in {}", project.meta.name, file.display());
        }

        Command::AddCategory { file, name, parent } => {
            let parent = parent.as_deref().map(parse_path).transpose()?;
            edit(&file, &cli.user, |project| {
                add_category(project, parent.as_ref(), &name)?;
                Ok(())
            })?;
        }

        Command::AddDetail {
            file,
            parent,
            name,
            width,
            height,
        } => {
            let parent = parse_path(&parent)?;
            edit(&file, &cli.user, |project| {
                add_detail(project, &parent, &name, width, height)?;
                Ok(())
            })?;
        }

        Command::AddWork(args) => add_item(args, ItemKind::Work, &cli.user)?,
        Command::AddMaterial(args) => add_item(args, ItemKind::Material, &cli.user)?,

        Command::Remove { file, path } => {
            let path = parse_path(&path)?;
            let removed = edit(&file, &cli.user, |project| Ok(remove_node(project, &path)?))?;
            println!("Removed {} '{}'", removed.kind_label(), removed.name());
        }

        Command::Rename { file, path, new_name } => {
            let path = parse_path(&path)?;
            edit(&file, &cli.user, |project| {
                rename_node(project, &path, &new_name)?;
                Ok(())
            })?;
        }

        Command::RemoveItem {
            file,
            path,
            kind,
            index,
        } => {
            let path = parse_path(&path)?;
            let removed = edit(&file, &cli.user, |project| {
                Ok(remove_line_item(project, &path, kind.into(), index)?)
            })?;
            println!("Removed '{}'", removed.name);
        }

        Command::Tree { file } => {
            let (project, lock) = load_project_with_lock_check(&file).with_context(|| format!("loading {}", file.display()))?;
            if let Some(lock) = lock {
                eprintln!("note: {} is being edited by {} ({})", file.display(), lock.user_id, lock.machine);
            }
            print_tree(&project);
        }

        Command::Summary { file, json } => {
            let project = load(&file)?;
            let summary = summarize_project(Some(&project));
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", render(&summary, ExportFormat::Text, chrono::Utc::now()));
            }
        }

        Command::Export { file, out, format } => {
            let project = load(&file)?;
            let summary = summarize_project(Some(&project));
            let format = format.map(ExportFormat::from).unwrap_or_else(|| ExportFormat::from_path(&out));
            export_to_file(&summary, format, &out).with_context(|| format!("exporting to {}", out.display()))?;
            println!("Wrote {:?} report to {}", format, out.display());
        }
    }

    Ok(())
}

fn add_item(args: ItemArgs, kind: ItemKind, user: &str) -> Result<()> {
    let path = parse_path(&args.path)?;
    let mut item = LineItem::new(args.name, args.unit, args.qty, args.price);
    item.notes = args.notes;
    edit(&args.file, user, |project| {
        add_line_item(project, &path, kind, item)?;
        Ok(())
    })
}

fn parse_path(raw: &str) -> Result<NodePath> {
    raw.parse::<NodePath>()
        .with_context(|| format!("invalid node path '{raw}'"))
}

fn load(file: &Path) -> Result<Project> {
    load_project(file).with_context(|| format!("loading {}", file.display()))
}

/// Lock, load, apply one edit, save. The edit's result is returned only
/// once the project has been written.
fn edit<T>(file: &Path, user: &str, apply: impl FnOnce(&mut Project) -> Result<T>) -> Result<T> {
    let _lock = FileLock::acquire(file, user).with_context(|| format!("locking {}", file.display()))?;
    let mut project = load(file)?;
    let outcome = apply(&mut project)?;
    save_project(&project, file).with_context(|| format!("saving {}", file.display()))?;

    let summary = summarize_project(Some(&project));
    println!(
        "Saved. Overall total: {} {}",
        format_money(summary.overall_total()),
        summary.currency
    );
    Ok(outcome)
}

fn print_tree(project: &Project) {
    println!("{} ({})", project.meta.name, project.settings.currency);
    for category in &project.categories {
        println!("  [category] {}", category.name);
        print_items(&category.works, &category.materials, 2);
        for child in &category.children {
            print_node(child, 2);
        }
    }
}

fn print_node(node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Category(c) => println!("{indent}[category] {}", c.name),
        Node::Detail(d) => println!("{indent}[detail] {} ({} x {}, {})", d.name, d.width, d.height, d.area().round_dp(2)),
    }
    print_items(node.works(), node.materials(), depth + 1);
    for child in node.children() {
        print_node(child, depth + 1);
    }
}

fn print_items(works: &[LineItem], materials: &[LineItem], depth: usize) {
    let indent = "  ".repeat(depth);
    for (label, items) in [("work", works), ("material", materials)] {
        for (index, item) in items.iter().enumerate() {
            println!(
                "{indent}{label} #{index}: {} - {} {} x {} = {}{}",
                item.name,
                item.quantity,
                item.unit,
                format_money(item.unit_price),
                format_money(item.total()),
                item.notes.as_deref().map(|n| format!(" ({n})")).unwrap_or_default(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("estimate_cli_{}_{}.est", name, std::process::id()))
    }

    #[test]
    fn edit_returns_outcome_after_saving() {
        let file = temp_file("edit_saved");
        let mut project = Project::new("Flat");
        add_category(&mut project, None, "Attic").unwrap();
        save_project(&project, &file).unwrap();

        let attic = parse_path("Attic").unwrap();
        let removed = edit(&file, "tester", |project| Ok(remove_node(project, &attic)?)).unwrap();
        assert_eq!(removed.name(), "Attic");
        assert!(load(&file).unwrap().categories.is_empty());

        let _ = fs::remove_file(&file);
    }

    #[test]
    fn failed_edit_leaves_file_untouched() {
        let file = temp_file("edit_failed");
        let project = Project::new("Flat");
        save_project(&project, &file).unwrap();
        let before = fs::read_to_string(&file).unwrap();

        let missing = parse_path("Cellar").unwrap();
        assert!(edit(&file, "tester", |project| Ok(remove_node(project, &missing)?)).is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), before);

        let _ = fs::remove_file(&file);
    }

    #[test]
    fn new_project_name_survives_reload() {
        let file = temp_file("long_name");
        let name = validate_project_name("  Full refurbishment of the three-storey house on Elm Street ").unwrap();
        save_project(&Project::new(name.clone()), &file).unwrap();
        assert_eq!(load(&file).unwrap().meta.name, name);

        let _ = fs::remove_file(&file);
    }
}
