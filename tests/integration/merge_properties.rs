//! Properties of the merge step observed through whole builds.

use anyhow::Result;
use seedmap::core::MapperError;
use seedmap::document::DocumentOrigin;
use seedmap::runtime::SeedMapper;
use seedmap::test_utils::{ORDER_MODEL, TestProject, mapper_fragment, order_fragment};

fn occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn test_every_fragment_is_merged_at_most_once() -> Result<()> {
    let project = TestProject::new()?;
    project.write("model.toml", ORDER_MODEL)?;
    project.write("mapper/OrderMapper.xml", &order_fragment("topOrders"))?;
    project.write("mapper/a/Extra.xml", &mapper_fragment("demo.OrderMapper", "extraOrders"))?;
    project.write("mapper/b/Users.xml", &mapper_fragment("demo.UserMapper", "activeUsers"))?;
    project.write("mapper/b/Reports.xml", &mapper_fragment("demo.ReportMapper", "monthly"))?;

    let set = project.load()?.build()?;
    let all: String = set.documents.iter().map(|d| d.content.as_str()).collect();
    for statement in ["topOrders", "extraOrders", "activeUsers", "monthly"] {
        assert_eq!(occurrences(&all, &format!("id=\"{statement}\"")), 1, "{statement}");
    }
    assert!(set.documents.iter().all(|d| d.origin != DocumentOrigin::Leftover));

    let report = set.document("demo.ReportMapper").unwrap();
    assert_eq!(report.origin, DocumentOrigin::Placeholder);
    assert!(report.content.contains("id=\"monthly\""));
    Ok(())
}

#[test]
fn test_exact_filename_wins_over_namespace() -> Result<()> {
    let project = TestProject::new()?;
    project.write("model.toml", ORDER_MODEL)?;
    // named after OrderMapper but declaring UserMapper's namespace
    project.write("mapper/OrderMapper.xml", &mapper_fragment("demo.UserMapper", "byFilename"))?;

    let set = project.load()?.build()?;
    assert!(set.document("demo.OrderMapper").unwrap().content.contains("id=\"byFilename\""));
    assert!(!set.document("demo.UserMapper").unwrap().content.contains("id=\"byFilename\""));
    Ok(())
}

#[test]
fn test_file_named_after_a_mapper_is_not_taken_by_namespace() -> Result<()> {
    let project = TestProject::order()?;
    // named after UserMapper but declaring OrderMapper's namespace
    project.write("mapper/UserMapper.xml", &mapper_fragment("demo.OrderMapper", "byUserFile"))?;

    let set = project.load()?.build()?;
    assert!(set.document("demo.UserMapper").unwrap().content.contains("id=\"byUserFile\""));
    assert!(!set.document("demo.OrderMapper").unwrap().content.contains("id=\"byUserFile\""));
    assert!(set.document("demo.OrderMapper").unwrap().content.contains("id=\"topOrders\""));
    Ok(())
}

#[test]
fn test_leftovers_sharing_a_filename_are_all_registered() -> Result<()> {
    let project = TestProject::order()?;
    for (dir, ns, statement) in [("x", "legacy.X", "fromX"), ("y", "legacy.Y", "fromY")] {
        project.write(
            &format!("mapper/{dir}/Common.xml"),
            &format!("<mapper namespace=\"{ns}\"><select id=\"{statement}\">SELECT 1</select></mapper>"),
        )?;
    }

    let mapper = SeedMapper::from_project(project.load()?)?;
    let leftovers: Vec<_> = mapper
        .documents()
        .documents
        .iter()
        .filter(|d| d.origin == DocumentOrigin::Leftover)
        .map(|d| d.resource.as_str())
        .collect();
    assert_eq!(leftovers, ["mapper/x/Common.xml", "mapper/y/Common.xml"]);

    let registry = mapper.registry();
    assert!(registry.statement("legacy.X.fromX").is_some());
    assert!(registry.statement("legacy.Y.fromY").is_some());
    Ok(())
}

#[test]
fn test_unclaimed_fragments_pass_through_verbatim() -> Result<()> {
    let project = TestProject::order()?;
    let stray = mapper_fragment("legacy.StrayMapper", "oldQuery");
    project.write("mapper/legacy/StrayMapper.xml", &stray)?;
    project.write(
        "seedmap/commonSql.xml",
        "<mapper namespace=\"common\"><sql id=\"page\">LIMIT #{offset}, #{size}</sql></mapper>",
    )?;

    let set = project.load()?.build()?;
    let leftover = set.document("legacy.StrayMapper").unwrap();
    assert_eq!(leftover.origin, DocumentOrigin::Leftover);
    assert_eq!(leftover.content, stray);

    let last = set.documents.last().unwrap();
    assert_eq!(last.origin, DocumentOrigin::Shared);
    assert_eq!(last.namespace, "common");
    Ok(())
}

#[test]
fn test_missing_namespace_fails_the_build() -> Result<()> {
    let project = TestProject::order()?;
    project.write("mapper/Broken.xml", "<mapper><select id=\"x\">SELECT 1</select></mapper>")?;

    let err = project.load()?.build().unwrap_err();
    assert!(matches!(err, MapperError::DocumentBuild { .. }));
    match err.root_cause() {
        MapperError::MissingNamespace { filename } => assert_eq!(filename, "Broken.xml"),
        other => panic!("unexpected cause: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_rendering_is_idempotent() -> Result<()> {
    let project = TestProject::order()?;
    let loaded = project.load()?;

    let first = loaded.build()?;
    let second = loaded.build()?;
    assert_eq!(first.documents, second.documents);
    assert_eq!(first.primary_keys, second.primary_keys);
    Ok(())
}
