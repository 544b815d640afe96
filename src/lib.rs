// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod server;
pub mod types;
pub mod watch;

use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::loader::{project_root, resolve};
use crate::config::{ConfigFile, ConfigSource};
use crate::dag::{ExecutionPlan, TaskRegistry, Target};
use crate::errors::Result;
use crate::orchestrator::Orchestrator;

/// High-level entry point used by `main.rs`.
///
/// Loads the config (file or preset), runs the requested task and, when that
/// run started the dev server, keeps rebuilding on file changes until
/// Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let (cfg, source) = resolve(&config_path, args.preset.map(Into::into))?;
    let root = project_root(&config_path);

    let task = args
        .task
        .clone()
        .unwrap_or_else(|| cfg.default_task().to_string());
    let target = Target::task(task);

    if args.dry_run {
        print_dry_run(&cfg, &source, &target)?;
        return Ok(());
    }

    info!(config = %source, root = %root.display(), target = %target, "starting");
    let mut orchestrator = Orchestrator::new(root, cfg)?;

    let summary = match orchestrator.run_target(&target).await {
        Ok(summary) => summary,
        Err(e) => {
            orchestrator.shutdown().await;
            return Err(e.into());
        }
    };

    if !summary.started_server {
        debug!("no dev server in this run; done");
        return Ok(());
    }

    if args.once {
        orchestrator.shutdown().await;
        return Ok(());
    }

    orchestrator.watch(ctrl_c()).await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Validate, then print tasks, the plan for `target` and watch bindings.
fn print_dry_run(cfg: &ConfigFile, source: &ConfigSource, target: &Target) -> Result<()> {
    let registry = TaskRegistry::from_tasks(cfg.tasks())?;
    let plan = ExecutionPlan::build(&registry, target)?;

    println!("assetflow dry-run");
    println!("  config: {source}");
    println!(
        "  server: http://{}:{} serving '{}'",
        cfg.server().host,
        cfg.server().port,
        cfg.server().root
    );
    println!();

    println!("tasks ({}):", cfg.tasks().len());
    for (name, task) in cfg.tasks().iter() {
        println!("  - {name} [{}]", task.kind_label());
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if let Some(src) = &task.src {
            println!("      src: {src:?}");
        }
        if !task.exclude.is_empty() {
            println!("      exclude: {:?}", task.exclude);
        }
        if !task.steps.is_empty() {
            let steps: Vec<&str> = task.steps.iter().map(|s| s.kind()).collect();
            println!("      steps: {}", steps.join(" -> "));
        }
        if let Some(dest) = &task.dest {
            println!("      dest: {dest}");
        }
        if let Some(clean) = &task.clean {
            println!("      clean: {clean}");
        }
        if let Some(sequence) = &task.sequence {
            let items: Vec<String> = sequence
                .iter()
                .map(|item| match item.names().as_slice() {
                    [single] => single.to_string(),
                    many => format!("[{}]", many.join(", ")),
                })
                .collect();
            println!("      sequence: {}", items.join(", "));
        }
        if let Some(reload) = task.reload {
            println!("      reload: {}", reload.as_message());
        }
    }
    println!();

    println!("plan for '{target}':");
    for (i, group) in plan.groups(&registry).iter().enumerate() {
        println!("  {}. {}", i + 1, group.join(" | "));
    }
    if plan.starts_server(&registry) {
        println!("  (starts the dev server, then watches)");
    }
    println!();

    println!("watch ({}):", cfg.watch_bindings().len());
    for binding in cfg.watch_bindings() {
        println!("  - {} -> {}", binding.pattern, binding.tasks.join(", "));
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
