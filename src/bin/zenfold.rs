// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use zenfold::{
    check, codec,
    config::FolderSpec,
    path,
    probe::{BrowserProbe, SysinfoProbe},
    reconcile::{self, apply, Plan},
    session::{SessionDocument, Workspace},
};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  zenfold [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Name of the browser profile to operate on.
    #[arg(short, long, global = true, value_name = "name")]
    profile: Option<String>,

    /// Name of the workspace to operate on.
    #[arg(short, long, global = true, value_name = "name")]
    workspace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let globals = Globals {
            profile: self.profile,
            workspace: self.workspace,
        };

        match self.command {
            Command::List(opts) => run_list(&globals, opts),
            Command::Tabs => run_tabs(&globals),
            Command::Dump(opts) => run_dump(&globals, opts),
            Command::Diff(opts) => run_diff(&globals, opts),
            Command::Apply(opts) => run_apply(&globals, opts),
            Command::Check => run_check(&globals),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List workspaces, with folders under --verbose.
    #[command(override_usage = "zenfold list [options]")]
    List(ListOptions),

    /// List pinned tabs of the selected workspace.
    #[command(override_usage = "zenfold tabs [options]")]
    Tabs,

    /// Dump the decompressed session JSON.
    #[command(override_usage = "zenfold dump [options]")]
    Dump(DumpOptions),

    /// Show the plan that apply would execute.
    #[command(override_usage = "zenfold diff [options]")]
    Diff(DiffOptions),

    /// Reconcile the session with the folder spec and write it back.
    #[command(override_usage = "zenfold apply [options]")]
    Apply(ApplyOptions),

    /// Audit the session's structural invariants.
    #[command(override_usage = "zenfold check [options]")]
    Check,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    /// Show folders and tab counts per workspace.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DumpOptions {
    /// Write JSON to a file instead of stdout.
    #[arg(short, long, value_name = "file")]
    output: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DiffOptions {
    /// Path to the folder spec instead of the default location.
    #[arg(short, long, value_name = "file")]
    config: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ApplyOptions {
    /// Path to the folder spec instead of the default location.
    #[arg(short, long, value_name = "file")]
    config: Option<String>,

    /// Skip the confirmation prompt and the running-browser refusal.
    #[arg(short = 'y', long = "yes")]
    assume_yes: bool,
}

/// Selection shared by every command, passed explicitly instead of held as
/// ambient state.
#[derive(Debug, Clone)]
struct Globals {
    profile: Option<String>,
    workspace: Option<String>,
}

impl Globals {
    fn read_session(&self) -> Result<(PathBuf, SessionDocument)> {
        let session_path = path::session_file(self.profile.as_deref())?;
        let doc = codec::read(&session_path)?;
        Ok((session_path, doc))
    }

    fn select_workspace<'a>(&self, doc: &'a SessionDocument) -> Result<&'a Workspace> {
        match &self.workspace {
            Some(name) => Ok(doc.resolve_workspace(name)?),
            None => doc
                .spaces
                .first()
                .ok_or_else(|| anyhow!("session contains no workspaces")),
        }
    }

    fn load_spec(&self, config: Option<&str>) -> Result<FolderSpec> {
        let spec_path = match config {
            Some(raw) => path::expand_path(raw)?,
            None => path::default_config_path()?,
        };
        let mut spec = FolderSpec::load(&spec_path)?;

        if let Some(name) = &self.workspace {
            spec.retain_workspace(name);
            if spec.workspaces.is_empty() {
                bail!("folder spec declares no workspace named {name:?}");
            }
        }

        Ok(spec)
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_list(globals: &Globals, opts: ListOptions) -> Result<()> {
    let (_, doc) = globals.read_session()?;

    for space in &doc.spaces {
        println!("{} ({})", space.name, space.id);
        if !opts.verbose {
            continue;
        }

        for folder in doc.folders_in_order(&space.id)? {
            let name = doc.folder_name(&folder.id).unwrap_or("<unnamed>");
            let count = doc.tabs_in_folder(&folder.id).len();
            println!("  {name} ({count} tabs, {})", folder.id);
        }
    }

    Ok(())
}

fn run_tabs(globals: &Globals) -> Result<()> {
    let (_, doc) = globals.read_session()?;
    let workspace = globals.select_workspace(&doc)?;

    for tab in doc.pinned_tabs(&workspace.id) {
        let folder = tab
            .group_id
            .as_deref()
            .and_then(|id| doc.folder_name(id))
            .unwrap_or("-");
        println!("{}  {}  [{folder}]", tab.id, tab.url);
    }

    Ok(())
}

fn run_dump(globals: &Globals, opts: DumpOptions) -> Result<()> {
    let (_, doc) = globals.read_session()?;
    let json = serde_json::to_string_pretty(&doc)?;

    match opts.output {
        Some(output) => fs::write(output, json)?,
        None => println!("{json}"),
    }

    Ok(())
}

fn run_diff(globals: &Globals, opts: DiffOptions) -> Result<()> {
    let (_, doc) = globals.read_session()?;
    let spec = globals.load_spec(opts.config.as_deref())?;

    let plan = reconcile::compute_plan(&doc, &spec)?;
    if plan.is_empty() {
        println!("session already matches the folder spec");
    }
    for operation in &plan.operations {
        println!("{operation}");
    }

    // Differences are the output of diff, never its failure.
    report_warnings(&plan);
    Ok(())
}

fn run_apply(globals: &Globals, opts: ApplyOptions) -> Result<()> {
    let (session_path, mut doc) = globals.read_session()?;
    let spec = globals.load_spec(opts.config.as_deref())?;

    let plan = reconcile::compute_plan(&doc, &spec)?;
    if plan.is_empty() {
        info!("session already matches the folder spec, nothing to apply");
        report_warnings(&plan);
        return Ok(());
    }
    for operation in &plan.operations {
        println!("{operation}");
    }

    // Advisory only: the browser overwrites the session from memory on
    // exit, so a write while it runs is lost or worse.
    if SysinfoProbe::new().browser_running() {
        if opts.assume_yes {
            warn!("Zen appears to be running, the applied session may be overwritten");
        } else {
            bail!("Zen appears to be running; close it first or re-run with --yes");
        }
    }

    if !opts.assume_yes {
        let confirmed = inquire::Confirm::new(&format!(
            "apply {} operations to {}?",
            plan.operations.len(),
            session_path.display()
        ))
        .with_default(false)
        .prompt()?;
        if !confirmed {
            info!("apply aborted");
            return Ok(());
        }
    }

    // INVARIANT: No backup, no write.
    let backup_path = codec::backup(&session_path)?;
    info!("backup written to {:?}", backup_path.display());

    apply::apply(&mut doc, &plan)?;
    codec::write(&session_path, &doc)?;
    info!("applied {} operations", plan.operations.len());

    report_warnings(&plan);
    Ok(())
}

fn run_check(globals: &Globals) -> Result<()> {
    let (session_path, doc) = globals.read_session()?;

    let findings = check::check(&doc);
    if findings.is_empty() {
        println!("no inconsistencies in {}", session_path.display());
        return Ok(());
    }

    for finding in &findings {
        println!("{finding}");
    }
    bail!("found {} inconsistencies", findings.len())
}

fn report_warnings(plan: &Plan) {
    for warning in &plan.warnings {
        warn!("{warning}");
    }
}
