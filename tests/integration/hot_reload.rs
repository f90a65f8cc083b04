//! Live reload of fragment files against a bootstrapped project.

use anyhow::Result;
use serial_test::serial;
use std::time::Duration;

use seedmap::reload::WatcherState;
use seedmap::runtime::SeedMapper;
use seedmap::test_utils::{TestProject, mapper_fragment, order_fragment};

fn watched(project: &TestProject) -> Result<SeedMapper> {
    let loaded = project.load_with(|config| {
        config.hot_reload.enabled = true;
        config.hot_reload.debounce_ms = 20;
        config.hot_reload.poll_interval_ms = 20;
    })?;
    Ok(SeedMapper::from_project(loaded)?)
}

async fn wait_for_version(mapper: &SeedMapper, version: u64) -> bool {
    for _ in 0..300 {
        if mapper.registry().version() >= version {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
#[serial]
async fn test_edited_fragment_replaces_statements() -> Result<()> {
    let project = TestProject::order()?;
    let mut mapper = watched(&project)?;
    let before = mapper.registry().snapshot();
    assert!(before.statement("demo.OrderMapper.topOrders").is_some());

    assert_eq!(mapper.start_hot_reload(), WatcherState::Watching);
    tokio::time::sleep(Duration::from_millis(80)).await;
    project.write("mapper/OrderMapper.xml", &order_fragment("recentOrders"))?;

    assert!(wait_for_version(&mapper, 2).await, "registry was not reloaded");
    let registry = mapper.registry();
    assert!(registry.statement("demo.OrderMapper.recentOrders").is_some());
    assert!(registry.statement("demo.OrderMapper.topOrders").is_none());
    // generated statements survive the swap
    assert!(registry.statement("demo.OrderMapper.getById").is_some());
    assert!(registry.statement("demo.UserMapper.getById").is_some());

    // snapshots taken earlier are unaffected
    assert!(before.statement("demo.OrderMapper.topOrders").is_some());
    assert_eq!(before.version, 1);

    mapper.shutdown().await;
    assert_eq!(mapper.watcher_state(), WatcherState::Stopped);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_new_fragment_file_is_picked_up() -> Result<()> {
    let project = TestProject::order()?;
    let mut mapper = watched(&project)?;
    mapper.start_hot_reload();
    tokio::time::sleep(Duration::from_millis(80)).await;

    project.write("mapper/Reports.xml", &mapper_fragment("demo.ReportMapper", "monthly"))?;

    assert!(wait_for_version(&mapper, 2).await, "registry was not reloaded");
    assert!(mapper.registry().statement("demo.ReportMapper.monthly").is_some());
    assert!(mapper.registry().statement("demo.OrderMapper.topOrders").is_some());

    mapper.shutdown().await;
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_broken_fragment_leaves_registry_untouched() -> Result<()> {
    let project = TestProject::order()?;
    let mut mapper = watched(&project)?;
    mapper.start_hot_reload();
    tokio::time::sleep(Duration::from_millis(80)).await;

    project.write(
        "mapper/OrderMapper.xml",
        "<mapper><select id=\"broken\">SELECT 1</select></mapper>",
    )?;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let registry = mapper.registry();
    assert_eq!(registry.version(), 1);
    assert!(registry.statement("demo.OrderMapper.topOrders").is_some());
    assert!(registry.statement("demo.OrderMapper.broken").is_none());
    assert_eq!(mapper.watcher_state(), WatcherState::Watching);

    // a later fix is still picked up
    project.write("mapper/OrderMapper.xml", &order_fragment("fixedOrders"))?;
    assert!(wait_for_version(&mapper, 2).await, "registry was not reloaded");
    assert!(mapper.registry().statement("demo.OrderMapper.fixedOrders").is_some());

    mapper.shutdown().await;
    Ok(())
}
