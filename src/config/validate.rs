// src/config/validate.rs

use std::net::IpAddr;
use std::path::{Component, Path};

use globset::GlobBuilder;

use crate::config::model::{ConfigFile, RawConfigFile, SequenceItem, TaskConfig};
use crate::dag::registry::TaskRegistry;
use crate::errors::ConfigError;

type Result<T> = std::result::Result<T, ConfigError>;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConfigError;

    fn try_from(raw: RawConfigFile) -> Result<Self> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_server(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task_shape(name, task)?;
    }
    validate_references(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(ConfigError::Invalid(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(ConfigError::Invalid(
            "[server].port must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.server.host.parse::<IpAddr>().is_err() {
        return Err(ConfigError::Invalid(format!(
            "[server].host must be an IP address (got '{}')",
            cfg.server.host
        )));
    }
    ensure_project_relative("[server].root", &cfg.server.root)
}

fn validate_task_shape(name: &str, task: &TaskConfig) -> Result<()> {
    let kinds = [
        task.is_pipeline(),
        task.clean.is_some(),
        task.serve,
        task.is_composite(),
    ];
    if kinds.iter().filter(|k| **k).count() > 1 {
        return Err(ConfigError::Invalid(format!(
            "task '{name}' mixes action kinds; use only one of `src`, `clean`, `serve`, `sequence`"
        )));
    }

    if task.is_composite() && !task.after.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "task '{name}' has a `sequence`; put prerequisites in the sequence instead of `after`"
        )));
    }

    if !task.is_pipeline()
        && (!task.steps.is_empty() || task.dest.is_some() || !task.exclude.is_empty())
    {
        return Err(ConfigError::Invalid(format!(
            "task '{name}' sets `steps`, `dest` or `exclude` without `src`"
        )));
    }

    if let Some(src) = &task.src {
        if src.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "task '{name}' has an empty `src` list"
            )));
        }
        for pattern in src.iter().chain(task.exclude.iter()) {
            validate_glob(name, pattern)?;
        }
    }

    if let Some(dest) = &task.dest {
        ensure_project_relative(&format!("task '{name}' dest"), dest)?;
    }
    if let Some(clean) = &task.clean {
        ensure_project_relative(&format!("task '{name}' clean"), clean)?;
    }

    if let Some(seq) = &task.sequence {
        if seq.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "task '{name}' has an empty `sequence`"
            )));
        }
        if seq
            .iter()
            .any(|item| matches!(item, SequenceItem::Parallel(names) if names.is_empty()))
        {
            return Err(ConfigError::Invalid(format!(
                "task '{name}' has an empty parallel set in its `sequence`"
            )));
        }
    }

    Ok(())
}

fn validate_glob(task: &str, pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "task '{task}' has an empty glob pattern"
        )));
    }
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|_| ())
        .map_err(|e| ConfigError::Invalid(format!("task '{task}': invalid glob '{pattern}': {e}")))
}

/// Output and clean paths must stay inside the project root.
fn ensure_project_relative(what: &str, path: &str) -> Result<()> {
    let p = Path::new(path);
    let escapes = p.is_absolute()
        || p
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if path.trim().is_empty() || escapes {
        return Err(ConfigError::Invalid(format!(
            "{what} must be a relative path inside the project (got '{path}')"
        )));
    }
    Ok(())
}

fn validate_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            match cfg.task.get(dep) {
                None => {
                    return Err(ConfigError::UnknownPrerequisite {
                        task: name.clone(),
                        prerequisite: dep.clone(),
                    });
                }
                Some(dep_task) if dep_task.is_composite() => {
                    return Err(ConfigError::Invalid(format!(
                        "task '{name}' cannot list sequence task '{dep}' in `after`"
                    )));
                }
                Some(_) => {}
            }
        }

        for item in task.sequence.iter().flatten() {
            for member in item.names() {
                let Some(member_task) = cfg.task.get(member) else {
                    return Err(ConfigError::UnknownTask(member.to_string()));
                };
                if matches!(item, SequenceItem::Parallel(_)) && member_task.is_composite() {
                    return Err(ConfigError::Invalid(format!(
                        "task '{name}': sequence task '{member}' cannot run inside a parallel set"
                    )));
                }
            }
        }
    }

    for binding in cfg.watch.iter() {
        if binding.tasks.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "watch binding '{}' has no tasks",
                binding.pattern
            )));
        }
        validate_glob("[[watch]]", &binding.pattern)?;
        for task in binding.tasks.iter() {
            if !cfg.task.contains_key(task) {
                return Err(ConfigError::UnknownTask(task.clone()));
            }
        }
    }

    if let Some(default_task) = &cfg.config.default_task {
        if !cfg.task.contains_key(default_task) {
            return Err(ConfigError::UnknownTask(default_task.clone()));
        }
    }

    Ok(())
}

/// Cycle detection over prerequisite and sequence edges.
fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    TaskRegistry::from_tasks(&cfg.task).map(|_| ())
}
