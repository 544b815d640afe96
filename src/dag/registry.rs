// src/dag/registry.rs

//! Task registry: named task definitions plus the prerequisite graph.
//!
//! Nodes are task names, edges point from a task to what must finish before
//! it (`Prerequisite`) or to a member of its `sequence` directive
//! (`Sequence`). `validate()` links the edges and runs an explicit
//! depth-first traversal with a per-node marker, which both detects cycles
//! and yields a deterministic topological order (prerequisites first, ties
//! broken by name).

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use crate::config::model::{SequenceItem, TaskConfig};
use crate::errors::ConfigError;
use crate::pipeline::Pipeline;
use crate::types::{ReloadKind, TaskName};

/// Tag on each graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Prerequisite,
    Sequence,
}

/// What a task does once its prerequisites are done.
#[derive(Debug, Clone)]
pub enum TaskAction {
    Pipeline(Arc<Pipeline>),
    /// Remove a directory (relative to the project root).
    Clean { path: PathBuf },
    /// Start the dev server.
    Serve,
}

impl TaskAction {
    pub fn label(&self) -> &'static str {
        match self {
            TaskAction::Pipeline(_) => "pipeline",
            TaskAction::Clean { .. } => "clean",
            TaskAction::Serve => "serve",
        }
    }
}

/// A registered task.
#[derive(Debug, Clone)]
pub struct TaskDef {
    pub name: TaskName,
    pub prerequisites: Vec<TaskName>,
    /// `None` for grouping tasks and sequence directives.
    pub action: Option<TaskAction>,
    pub reload: Option<ReloadKind>,
    pub sequence: Option<Vec<SequenceItem>>,
}

impl TaskDef {
    /// Grouping task: no action, only prerequisites.
    pub fn group<I, S>(name: impl Into<TaskName>, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            name: name.into(),
            prerequisites: prerequisites.into_iter().map(Into::into).collect(),
            action: None,
            reload: None,
            sequence: None,
        }
    }

    pub fn with_action(mut self, action: TaskAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn from_config(name: &str, cfg: &TaskConfig) -> Result<Self, ConfigError> {
        let action = if let Some(src) = &cfg.src {
            let pipeline = Pipeline::from_config(src, &cfg.exclude, cfg.dest.as_deref(), &cfg.steps)
                .map_err(|e| ConfigError::Invalid(format!("task '{name}': {e}")))?;
            Some(TaskAction::Pipeline(Arc::new(pipeline)))
        } else if let Some(path) = &cfg.clean {
            Some(TaskAction::Clean {
                path: PathBuf::from(path),
            })
        } else if cfg.serve {
            Some(TaskAction::Serve)
        } else {
            None
        };

        Ok(Self {
            name: name.to_string(),
            prerequisites: cfg.after.clone(),
            action,
            reload: cfg.reload,
            sequence: cfg.sequence.clone(),
        })
    }

    pub fn is_composite(&self) -> bool {
        self.sequence.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Registry of tasks and their prerequisite graph.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    graph: Graph<TaskName, EdgeKind>,
    index: HashMap<TaskName, NodeIndex>,
    defs: BTreeMap<TaskName, TaskDef>,
    /// Filled by `validate()`; empty while unvalidated.
    order: Vec<TaskName>,
    validated: bool,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and validate every task of a config.
    pub fn from_tasks(tasks: &BTreeMap<TaskName, TaskConfig>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, cfg) in tasks.iter() {
            registry.register(TaskDef::from_config(name, cfg)?)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn register(&mut self, def: TaskDef) -> Result<(), ConfigError> {
        if self.index.contains_key(&def.name) {
            return Err(ConfigError::DuplicateTask(def.name));
        }
        let node = self.graph.add_node(def.name.clone());
        self.index.insert(def.name.clone(), node);
        self.defs.insert(def.name.clone(), def);
        self.validated = false;
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&TaskDef, ConfigError> {
        self.defs
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn prerequisites_of(&self, name: &str) -> Result<&[TaskName], ConfigError> {
        Ok(&self.resolve(name)?.prerequisites)
    }

    /// Tasks that list `name` in their prerequisites. Requires `validate()`.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let Some(&node) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter(|e| *e.weight() == EdgeKind::Prerequisite)
            .map(|e| self.graph[e.source()].as_str())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskDef> {
        self.defs.values()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Deterministic topological order (prerequisites first). Empty until
    /// `validate()` succeeded.
    pub fn topological_order(&self) -> &[TaskName] {
        &self.order
    }

    /// Link edges and check the graph is acyclic.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.validated = false;
        self.order.clear();
        self.graph.clear_edges();

        for def in self.defs.values() {
            let from = self.index[&def.name];
            for prereq in def.prerequisites.iter() {
                let to = *self.index.get(prereq).ok_or_else(|| ConfigError::UnknownPrerequisite {
                    task: def.name.clone(),
                    prerequisite: prereq.clone(),
                })?;
                self.graph.add_edge(from, to, EdgeKind::Prerequisite);
            }
            for item in def.sequence.iter().flatten() {
                for member in item.names() {
                    let to = *self
                        .index
                        .get(member)
                        .ok_or_else(|| ConfigError::UnknownTask(member.to_string()))?;
                    self.graph.add_edge(from, to, EdgeKind::Sequence);
                }
            }
        }

        self.order = self.depth_first_order()?;
        self.validated = true;
        debug!(order = ?self.order, "task registry validated");
        Ok(())
    }

    fn depth_first_order(&self) -> Result<Vec<TaskName>, ConfigError> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut path: Vec<NodeIndex> = Vec::new();

        // BTreeMap keys: roots visited in name order.
        for name in self.defs.keys() {
            let node = self.index[name];
            if marks[node.index()] == Mark::Unvisited {
                self.visit(node, &mut marks, &mut path, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit(
        &self,
        node: NodeIndex,
        marks: &mut [Mark],
        path: &mut Vec<NodeIndex>,
        order: &mut Vec<TaskName>,
    ) -> Result<(), ConfigError> {
        marks[node.index()] = Mark::Visiting;
        path.push(node);

        let mut next: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        next.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        next.dedup();

        for succ in next {
            match marks[succ.index()] {
                Mark::Visiting => {
                    let start = path.iter().position(|n| *n == succ).unwrap_or(0);
                    let mut cycle: Vec<TaskName> =
                        path[start..].iter().map(|n| self.graph[*n].clone()).collect();
                    cycle.push(self.graph[succ].clone());
                    return Err(ConfigError::CyclicDependency(cycle));
                }
                Mark::Unvisited => self.visit(succ, marks, path, order)?,
                Mark::Done => {}
            }
        }

        path.pop();
        marks[node.index()] = Mark::Done;
        order.push(self.graph[node].clone());
        Ok(())
    }
}
