//! The `Order` scenario: custom template, fragment merge, registry load.

use anyhow::Result;
use serial_test::serial;
use std::path::PathBuf;

use seedmap::document::DocumentOrigin;
use seedmap::registry::SqlCommand;
use seedmap::runtime::SeedMapper;
use seedmap::templating::Dialect;
use seedmap::test_utils::{CRUD_TEMPLATE, TestProject};

fn order_project() -> Result<TestProject> {
    let project = TestProject::order()?;
    project.write("templates/mysql.tera", CRUD_TEMPLATE)?;
    Ok(project)
}

fn bootstrap(project: &TestProject) -> Result<SeedMapper> {
    let loaded = project.load_with(|config| {
        config.templates.dir = Some(PathBuf::from("templates"));
    })?;
    Ok(SeedMapper::from_project(loaded)?)
}

#[test]
#[serial]
fn test_order_document_is_rendered_from_custom_template() -> Result<()> {
    let project = order_project()?;
    let mapper = bootstrap(&project)?;

    let order = mapper.documents().document("demo.OrderMapper").unwrap();
    assert_eq!(order.origin, DocumentOrigin::Generated);

    let content = &order.content;
    assert!(content.contains("<id column=\"id\" property=\"id\"/>"));
    assert!(content.contains("<result column=\"gmt_create\" property=\"gmtCreate\"/>"));
    assert!(content.contains("<result column=\"status\" property=\"status\"/>"));
    assert!(!content.contains("remark"));
    assert!(content.contains("#{status, typeHandler=EnumTypeHandler}"));
    assert!(content.contains("version = version+1"));
    assert!(content.contains("WHERE id = #{id}"));
    assert!(content.contains("id=\"topOrders\""));
    assert!(!content.contains("<!--_ext_mapper_-->"));
    Ok(())
}

#[test]
#[serial]
fn test_order_statements_are_registered() -> Result<()> {
    let project = order_project()?;
    let mapper = bootstrap(&project)?;
    let registry = mapper.registry();

    assert_eq!(registry.version(), 1);
    for (id, command) in [
        ("select", SqlCommand::Select),
        ("insert", SqlCommand::Insert),
        ("update", SqlCommand::Update),
        ("delete", SqlCommand::Delete),
        ("topOrders", SqlCommand::Select),
    ] {
        let statement = registry
            .statement(&format!("demo.OrderMapper.{id}"))
            .unwrap_or_else(|| panic!("missing statement {id}"));
        assert_eq!(statement.command, command);
        assert_eq!(statement.namespace, "demo.OrderMapper");
    }

    let top = registry.statement("demo.OrderMapper.topOrders").unwrap();
    assert_eq!(top.result_map.as_deref(), Some("demo.OrderMapper.baseResultMap"));

    let snapshot = registry.snapshot();
    assert!(snapshot.result_maps.contains_key("demo.OrderMapper.baseResultMap"));
    assert!(snapshot.result_maps.contains_key("demo.UserMapper.baseResultMap"));
    Ok(())
}

#[test]
#[serial]
fn test_order_document_set_layout() -> Result<()> {
    let project = order_project()?;
    project.write(
        "seedmap/commonSql.xml",
        "<mapper namespace=\"common\"><sql id=\"page\">LIMIT #{offset}, #{size}</sql></mapper>",
    )?;
    let mapper = bootstrap(&project)?;
    let set = mapper.documents();

    assert_eq!(
        set.namespaces(),
        ["demo.OrderMapper", "demo.ReportMapper", "demo.UserMapper", "common"]
    );

    let report = set.document("demo.ReportMapper").unwrap();
    assert_eq!(report.origin, DocumentOrigin::Placeholder);
    assert!(mapper.registry().snapshot().statements_in("demo.ReportMapper").next().is_none());
    assert!(mapper.registry().snapshot().is_namespace_loaded("demo.ReportMapper"));

    assert!(set.documents.iter().all(|d| d.origin != DocumentOrigin::Leftover));
    assert_eq!(set.documents.last().unwrap().origin, DocumentOrigin::Shared);
    assert!(mapper.registry().snapshot().sql_fragments.contains_key("common.page"));

    let key = set.primary_keys.lookup("Order").unwrap();
    assert_eq!(key.key_column, "id");
    assert_eq!(key.key_member, "id");
    Ok(())
}

#[test]
#[serial]
fn test_builtin_delete_matches_logic_delete() -> Result<()> {
    let project = TestProject::order()?;

    for dialect in Dialect::ALL {
        let loaded = project.load_with(|config| config.dialect = dialect)?;
        let mapper = SeedMapper::from_project(loaded)?;
        let registry = mapper.registry();

        // Order declares a logic delete column, User does not
        let order = registry.statement("demo.OrderMapper.delete").unwrap();
        assert_eq!(order.command, SqlCommand::Update, "{dialect}");
        let user = registry.statement("demo.UserMapper.delete").unwrap();
        assert_eq!(user.command, SqlCommand::Delete, "{dialect}");
        assert!(user.sql.contains("DELETE FROM"), "{dialect}");
    }
    Ok(())
}
