#![allow(dead_code)]

use std::sync::Arc;

use assetflow::config::ConfigFile;
use assetflow::dag::TaskRegistry;
use assetflow::engine::TaskRunner;
use assetflow_test_utils::FakeExecutor;

/// Validated registry + runner backed by `fake`.
pub fn fake_runner(cfg: &ConfigFile, fake: &FakeExecutor) -> TaskRunner {
    let registry = TaskRegistry::from_tasks(cfg.tasks()).expect("config must validate");
    TaskRunner::new(Arc::new(registry), Arc::new(fake.clone())).expect("registry is validated")
}
