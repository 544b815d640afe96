// src/dag/plan.rs

//! Execution plans: what a `run(target)` call will execute, in which order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::config::model::SequenceItem;
use crate::dag::registry::{TaskAction, TaskRegistry};
use crate::errors::ConfigError;
use crate::types::TaskName;

/// What to run.
///
/// - `Task`: a single task (a `sequence` task expands to its directive).
/// - `Sequence`: each element fully completes, prerequisites included,
///   before the next one starts.
/// - `Parallel`: all elements launch together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Task(TaskName),
    Sequence(Vec<Target>),
    Parallel(Vec<Target>),
}

impl Target {
    pub fn task(name: impl Into<TaskName>) -> Self {
        Target::Task(name.into())
    }

    pub fn sequence<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Target::Sequence(names.into_iter().map(|n| Target::Task(n.into())).collect())
    }

    pub fn parallel<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Target::Parallel(names.into_iter().map(|n| Target::Task(n.into())).collect())
    }

    pub fn from_items(items: &[SequenceItem]) -> Self {
        Target::Sequence(
            items
                .iter()
                .map(|item| match item {
                    SequenceItem::Task(name) => Target::Task(name.clone()),
                    SequenceItem::Parallel(names) => Target::parallel(names.iter().cloned()),
                })
                .collect(),
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, items: &[Target], sep: &str| -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, "{sep}")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        };
        match self {
            Target::Task(name) => write!(f, "{name}"),
            Target::Sequence(items) => join(f, items, " -> "),
            Target::Parallel(items) => {
                write!(f, "(")?;
                join(f, items, " | ")?;
                write!(f, ")")
            }
        }
    }
}

/// One element of a top-level sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Tasks the stage was asked to run (several for a parallel set).
    pub roots: Vec<TaskName>,
    /// Roots plus their transitive prerequisites not already run by an
    /// earlier stage, prerequisites first.
    pub tasks: Vec<TaskName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    stages: Vec<Stage>,
}

impl ExecutionPlan {
    pub fn build(registry: &TaskRegistry, target: &Target) -> Result<Self, ConfigError> {
        if !registry.is_validated() {
            return Err(ConfigError::Invalid(
                "task registry must be validated before planning".to_string(),
            ));
        }

        let mut stage_roots = Vec::new();
        expand(registry, target, &mut stage_roots)?;

        let mut seen = HashSet::new();
        let stages = stage_roots
            .into_iter()
            .map(|roots| {
                let mut tasks = Vec::new();
                for root in roots.iter() {
                    collect_closure(registry, root, &mut seen, &mut tasks);
                }
                Stage { roots, tasks }
            })
            .collect();

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Every task of the plan, in execution-compatible order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.stages
            .iter()
            .flat_map(|s| s.tasks.iter().map(String::as_str))
    }

    pub fn contains(&self, task: &str) -> bool {
        self.tasks().any(|t| t == task)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(|s| s.tasks.is_empty())
    }

    /// Whether running this plan starts the dev server.
    pub fn starts_server(&self, registry: &TaskRegistry) -> bool {
        self.tasks().any(|t| {
            registry
                .resolve(t)
                .is_ok_and(|def| matches!(def.action, Some(TaskAction::Serve)))
        })
    }

    /// Layered view: each group only depends on earlier groups.
    ///
    /// Stages never share a group; within a stage a task sits one layer
    /// above its deepest prerequisite from the same stage.
    pub fn groups(&self, registry: &TaskRegistry) -> Vec<Vec<TaskName>> {
        let mut groups = Vec::new();

        for stage in self.stages.iter() {
            let in_stage: HashSet<&str> = stage.tasks.iter().map(String::as_str).collect();
            let mut level: HashMap<&str, usize> = HashMap::new();
            let mut layers: BTreeMap<usize, Vec<TaskName>> = BTreeMap::new();

            for task in stage.tasks.iter() {
                let depth = registry
                    .prerequisites_of(task)
                    .map(|prereqs| {
                        prereqs
                            .iter()
                            .filter(|p| in_stage.contains(p.as_str()))
                            .filter_map(|p| level.get(p.as_str()).map(|l| l + 1))
                            .max()
                            .unwrap_or(0)
                    })
                    .unwrap_or(0);
                level.insert(task.as_str(), depth);
                layers.entry(depth).or_default().push(task.clone());
            }

            for (_, mut layer) in layers {
                layer.sort();
                groups.push(layer);
            }
        }

        groups
    }
}

fn expand(
    registry: &TaskRegistry,
    target: &Target,
    out: &mut Vec<Vec<TaskName>>,
) -> Result<(), ConfigError> {
    match target {
        Target::Task(name) => {
            let def = registry.resolve(name)?;
            match &def.sequence {
                Some(items) => expand(registry, &Target::from_items(items), out)?,
                None => out.push(vec![name.clone()]),
            }
        }
        Target::Sequence(items) => {
            for item in items.iter() {
                expand(registry, item, out)?;
            }
        }
        Target::Parallel(items) => {
            let mut roots = Vec::new();
            collect_parallel(registry, items, &mut roots)?;
            if !roots.is_empty() {
                out.push(roots);
            }
        }
    }
    Ok(())
}

fn collect_parallel(
    registry: &TaskRegistry,
    items: &[Target],
    roots: &mut Vec<TaskName>,
) -> Result<(), ConfigError> {
    for item in items.iter() {
        match item {
            Target::Task(name) => {
                if registry.resolve(name)?.is_composite() {
                    return Err(ConfigError::Invalid(format!(
                        "sequence task '{name}' cannot run inside a parallel set"
                    )));
                }
                if !roots.contains(name) {
                    roots.push(name.clone());
                }
            }
            Target::Parallel(inner) => collect_parallel(registry, inner, roots)?,
            Target::Sequence(_) => {
                return Err(ConfigError::Invalid(
                    "a sequence cannot be nested inside a parallel set".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Post-order walk over prerequisites; `seen` spans the whole plan so each
/// task is scheduled once.
fn collect_closure(
    registry: &TaskRegistry,
    task: &str,
    seen: &mut HashSet<TaskName>,
    out: &mut Vec<TaskName>,
) {
    if !seen.insert(task.to_string()) {
        return;
    }
    if let Ok(prereqs) = registry.prerequisites_of(task) {
        let mut prereqs: Vec<&TaskName> = prereqs.iter().collect();
        prereqs.sort();
        for prereq in prereqs {
            collect_closure(registry, prereq, seen, out);
        }
    }
    out.push(task.to_string());
}
