use async_trait::async_trait;
use compliance_graph::{EdgeAnnotations, LicenseGraph, LicenseGraphBuilder, ResolutionSet, TargetNode};
use compliance_notice::{NoticeDigest, NoticeError, NoticeIndex};
use compliance_projectmetadata::{Index, IndexConfig};
use compliance_vfs::{FileReader, FileStat, FileSystem, MemFs};
use pretty_assertions::assert_eq;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Every open takes `delay`.
struct SlowFs {
    inner: MemFs,
    delay: Duration,
}

#[async_trait]
impl FileSystem for SlowFs {
    async fn stat(&self, path: &str) -> io::Result<FileStat> {
        self.inner.stat(path).await
    }

    async fn open(&self, path: &str) -> io::Result<FileReader> {
        tokio::time::sleep(self.delay).await;
        self.inner.open(path).await
    }
}

fn annotated(annotations: &[&str]) -> EdgeAnnotations {
    annotations.iter().copied().collect()
}

/// img (container) -> app -> libz, app -(dynamic)-> libc, img -> tool
fn product() -> anyhow::Result<LicenseGraph> {
    let mut builder = LicenseGraphBuilder::new();
    builder.add_target(
        TargetNode::new("out/img.meta_lic")
            .container(true)
            .with_built("img/")
            .with_install_map("out/target/", "system/"),
    )?;
    builder.add_target(
        TargetNode::new("out/app.meta_lic")
            .with_project("packages/app")
            .with_condition("notice")
            .with_license_text("packages/app/NOTICE")
            .with_installed("out/target/bin/app"),
    )?;
    builder.add_target(
        TargetNode::new("out/libz.a.meta_lic")
            .with_project("external/zlib")
            .with_condition("notice")
            .with_license_text("external/zlib/LICENSE")
            .with_built("out/obj/libz.a"),
    )?;
    builder.add_target(
        TargetNode::new("out/libc.so.meta_lic")
            .with_condition("notice")
            .with_license_text("bionic/NOTICE"),
    )?;
    builder.add_target(
        TargetNode::new("out/tool.meta_lic")
            .with_package_name("Tool")
            .with_license_text("external/zlib/LICENSE")
            .with_installed("out/target/bin/tool"),
    )?;
    builder
        .add_root("out/img.meta_lic")
        .add_dependency("out/img.meta_lic", "out/app.meta_lic", annotated(&[]))
        .add_dependency("out/app.meta_lic", "out/libz.a.meta_lic", annotated(&["static"]))
        .add_dependency("out/app.meta_lic", "out/libc.so.meta_lic", annotated(&["dynamic"]))
        .add_dependency("out/img.meta_lic", "out/tool.meta_lic", annotated(&[]));
    Ok(builder.build()?)
}

fn source_tree() -> MemFs {
    MemFs::new()
        .with_file("packages/app/NOTICE", "APP")
        .with_file(
            "packages/app/METADATA",
            "name: \"app\"\nthird_party {\n  version: \"2.0\"\n}\n",
        )
        .with_file("external/zlib/LICENSE", "ZLIB")
        .with_file("external/zlib/METADATA", "name: \"zlib\"\n")
}

#[tokio::test]
async fn identical_bodies_share_one_text() -> anyhow::Result<()> {
    let mut builder = LicenseGraphBuilder::new();
    builder.add_target(TargetNode::new("A.meta_lic").with_license_text("LICENSE_A"))?;
    builder.add_target(TargetNode::new("B.meta_lic").with_license_text("LICENSE_B"))?;
    builder
        .add_root("A.meta_lic")
        .add_dependency("A.meta_lic", "B.meta_lic", annotated(&["static"]));
    let graph = builder.build()?;
    let fs = MemFs::new()
        .with_file("LICENSE_A", "X")
        .with_file("LICENSE_B", "X");

    let notices = NoticeIndex::build(Arc::new(fs), &graph, None).await?;

    let digest = NoticeDigest::of(b"X");
    assert_eq!(notices.texts().count(), 1);
    assert_eq!(notices.hash_text(&digest), Some(&b"X"[..]));
    assert_eq!(notices.hash("LICENSE_A"), Some(&digest));
    assert_eq!(notices.hash("LICENSE_B"), Some(&digest));

    let reverse = notices.reverse(&digest);
    assert!(reverse.len() >= 2);
    let a = graph.find("A.meta_lic").unwrap();
    let b = graph.find("B.meta_lic").unwrap();
    assert!(reverse.iter().all(|nr| nr.attaches_to() == a));
    assert!(reverse.iter().any(|nr| nr.notice_for() == b && nr.path().len() == 1));
    Ok(())
}

#[tokio::test]
async fn unnamed_target_falls_back_to_file_name() -> anyhow::Result<()> {
    let mut builder = LicenseGraphBuilder::new();
    builder.add_target(
        TargetNode::new("vendor/pkg/foo.whatever9")
            .with_project("vendor/pkg")
            .with_license_text("vendor/pkg/NOTICE"),
    )?;
    builder.add_root("vendor/pkg/foo.whatever9");
    let graph = builder.build()?;
    let fs = MemFs::new()
        .with_file("vendor/pkg/METADATA", "")
        .with_file("vendor/pkg/NOTICE", "vendor notice");

    let notices = NoticeIndex::build(Arc::new(fs), &graph, None).await?;

    let resolutions = notices.resolutions();
    assert_eq!(resolutions.len(), 1);
    assert_eq!(notices.library_name(&resolutions[0]), "foo");
    assert_eq!(notices.project_name("vendor/pkg"), None);
    Ok(())
}

#[tokio::test]
async fn attributes_libraries_and_install_paths() -> anyhow::Result<()> {
    let graph = product()?;
    let index = Index::with_config(
        Arc::new(source_tree()),
        IndexConfig {
            concurrent_readers: 2,
        },
    );

    let notices = NoticeIndex::build_with_index(index, &graph, None).await?;

    let app_text = NoticeDigest::of(b"APP");
    let zlib_text = NoticeDigest::of(b"ZLIB");

    let resolutions = notices.resolutions();
    let named: Vec<&str> = resolutions
        .iter()
        .map(|nr| notices.library_name(nr))
        .collect();
    assert_eq!(named, vec!["app_v_2.0", "zlib", "Tool"]);
    let img = graph.roots()[0];
    assert!(resolutions.iter().all(|nr| nr.attaches_to() == img));
    assert_eq!(
        notices.install_paths(&resolutions[0]),
        vec!["img/system/bin/app"]
    );

    assert_eq!(notices.hashes(), vec![zlib_text.clone(), app_text.clone()]);
    // zlib is linked into app but installs nothing of its own.
    assert_eq!(notices.hash_libs(&zlib_text), vec!["Tool"]);
    assert_eq!(
        notices.hash_lib_installs(&zlib_text, "Tool"),
        vec!["img/system/bin/tool"]
    );
    assert!(notices.hash_lib_installs(&zlib_text, "zlib").is_empty());
    assert_eq!(
        notices.hash_lib_installs(&app_text, "app_v_2.0"),
        vec!["img/system/bin/app"]
    );
    assert_eq!(
        notices.install_paths_for("app_v_2.0"),
        vec!["img/system/bin/app"]
    );
    assert_eq!(notices.reverse(&zlib_text).len(), 2);

    assert_eq!(notices.project_name("packages/app"), Some("app_v_2.0"));
    assert_eq!(notices.project_name("external/zlib"), Some("zlib"));
    assert_eq!(notices.hash("bionic/NOTICE"), None);
    assert_eq!(notices.shipped().len(), 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn library_metadata_is_read_in_parallel() -> anyhow::Result<()> {
    let mut builder = LicenseGraphBuilder::new();
    builder.add_target(
        TargetNode::new("out/img.meta_lic")
            .container(true)
            .with_built("img/")
            .with_install_map("lib/", "system/lib/"),
    )?;
    builder.add_root("out/img.meta_lic");
    let mut mem = MemFs::new();
    for i in 0..20 {
        let project = format!("vendor/p{i}");
        let target = format!("out/lib{i}.meta_lic");
        builder.add_target(
            TargetNode::new(&target)
                .with_project(&project)
                .with_license_text(format!("{project}/LICENSE"))
                .with_installed(format!("lib/lib{i}.so")),
        )?;
        builder.add_dependency("out/img.meta_lic", &target, annotated(&[]));
        mem.insert(&format!("{project}/METADATA"), format!("name: \"lib{i}\""));
        mem.insert(&format!("{project}/LICENSE"), format!("license {i}"));
    }
    let graph = builder.build()?;
    let index = Index::with_config(
        Arc::new(SlowFs {
            inner: mem,
            delay: Duration::from_millis(20),
        }),
        IndexConfig {
            concurrent_readers: 5,
        },
    );

    let notices = NoticeIndex::build_with_index(index.clone(), &graph, None).await?;

    let snapshot = index.snapshot();
    assert_eq!(snapshot.with_metadata, 20);
    assert!(snapshot.pool.peak_in_flight > 1, "{:?}", snapshot.pool);
    assert!(snapshot.pool.peak_in_flight <= 5, "{:?}", snapshot.pool);
    assert_eq!(notices.project_name("vendor/p7"), Some("lib7"));
    assert_eq!(notices.install_paths_for("lib7"), vec!["img/system/lib/lib7.so"]);
    Ok(())
}

#[tokio::test]
async fn explicit_resolution_set_limits_the_index() -> anyhow::Result<()> {
    let graph = product()?;
    let tool = graph.find("out/tool.meta_lic").unwrap();
    let mut rs = ResolutionSet::new();
    rs.insert(tool, tool);

    let notices = NoticeIndex::build(Arc::new(source_tree()), &graph, Some(rs)).await?;

    let resolutions = notices.resolutions();
    assert_eq!(resolutions.len(), 1);
    assert_eq!(resolutions[0].notice_for(), tool);
    assert_eq!(notices.texts().count(), 1);
    assert_eq!(notices.hash("packages/app/NOTICE"), None);
    Ok(())
}

#[tokio::test]
async fn missing_license_text_fails_construction() -> anyhow::Result<()> {
    let graph = product()?;
    let fs = MemFs::new().with_file("external/zlib/LICENSE", "ZLIB");

    let err = match NoticeIndex::build(Arc::new(fs), &graph, None).await {
        Ok(_) => panic!("construction must fail without packages/app/NOTICE"),
        Err(err) => err,
    };
    let NoticeError::LicenseText { path, .. } = &err;
    assert_eq!(path, "packages/app/NOTICE");
    assert!(err.to_string().contains("\"packages/app/NOTICE\""));
    Ok(())
}
