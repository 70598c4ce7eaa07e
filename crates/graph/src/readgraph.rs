use crate::builder::LicenseGraphBuilder;
use crate::error::{GraphError, Result};
use crate::graph::LicenseGraph;
use crate::types::{EdgeAnnotations, InstallMap, TargetNode, META_LIC_SUFFIX};
use compliance_vfs::{FileSystem, ReaderPool};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tokio::io::AsyncReadExt;
use tokio::task::JoinSet;

/// `name: value` or `name: "quoted value"`
static META_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([^:]*):\s+"?([^"]*)"?$"#).expect("valid license metadata line regex")
});

/// One parsed license metadata file
#[derive(Debug)]
struct MetaFile {
    node: TargetNode,
    deps: Vec<(String, EdgeAnnotations)>,
}

/// Reads `files` and the closure of their `dep:` entries into a [`LicenseGraph`].
///
/// File names lacking the `.meta_lic` suffix get it appended; the given
/// files become the graph roots. Each file is read once, at most
/// `pool.capacity()` at a time. The first failure aborts the read.
pub async fn read_license_graph<S: AsRef<str>>(
    fs: Arc<dyn FileSystem>,
    pool: &ReaderPool,
    files: &[S],
) -> Result<LicenseGraph> {
    if files.is_empty() {
        return Err(GraphError::NoInput);
    }
    pool.check()?;

    let mut builder = LicenseGraphBuilder::new();
    let mut scheduled = HashSet::new();
    let mut tasks = JoinSet::new();

    for file in files {
        let file = file.as_ref();
        let root = if file.ends_with(META_LIC_SUFFIX) {
            file.to_string()
        } else {
            format!("{file}{META_LIC_SUFFIX}")
        };
        builder.add_root(root.clone());
        if scheduled.insert(root.clone()) {
            spawn_read(&mut tasks, fs.clone(), pool.clone(), root);
        }
    }

    while let Some(joined) = tasks.join_next().await {
        // Dropping `tasks` on error aborts the readers still in flight.
        let MetaFile { node, deps } = joined??;
        let target = node.name().to_string();
        for (dependency, annotations) in deps {
            if scheduled.insert(dependency.clone()) {
                spawn_read(&mut tasks, fs.clone(), pool.clone(), dependency.clone());
            }
            builder.add_dependency(target.clone(), dependency, annotations);
        }
        builder.add_target(node)?;
    }

    let graph = builder.build()?;
    log::info!(
        "Read license graph: {} targets, {} edges, {} roots",
        graph.target_count(),
        graph.edge_count(),
        graph.roots().len()
    );
    Ok(graph)
}

fn spawn_read(
    tasks: &mut JoinSet<Result<MetaFile>>,
    fs: Arc<dyn FileSystem>,
    pool: ReaderPool,
    file: String,
) {
    tasks.spawn(async move {
        let _permit = pool.acquire().await?;
        log::debug!("Reading license metadata {file}");
        read_meta_file(fs.as_ref(), file).await
    });
}

async fn read_meta_file(fs: &dyn FileSystem, file: String) -> Result<MetaFile> {
    let mut reader = match fs.open(&file).await {
        Ok(reader) => reader,
        Err(source) => return Err(GraphError::Open { file, source }),
    };
    let mut data = String::new();
    if let Err(source) = reader.read_to_string(&mut data).await {
        return Err(GraphError::Read { file, source });
    }
    match parse_meta_file(&file, &data) {
        Ok(parsed) => Ok(parsed),
        Err(message) => Err(GraphError::Parse { file, message }),
    }
}

fn parse_meta_file(file: &str, data: &str) -> std::result::Result<MetaFile, String> {
    let mut node = TargetNode::new(file);
    let mut deps = Vec::new();

    for (index, line) in data.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let Some(captures) = META_LINE.captures(line) else {
            return Err(format!("unparseable line {line_no}: {line:?}"));
        };
        let (key, value) = (&captures[1], &captures[2]);
        let added = if key == "dep" {
            parse_dependency(value).map(|dep| deps.push(dep))
        } else {
            add_field(&mut node, key, value)
        };
        if let Err(err) = added {
            return Err(format!("{err} line {line_no}: {line:?}"));
        }
    }

    Ok(MetaFile { node, deps })
}

fn add_field(node: &mut TargetNode, key: &str, value: &str) -> std::result::Result<(), String> {
    match key {
        "license_package_name" => {
            if !node.package_name.is_empty() {
                return Err(format!(
                    "too many package names {:?} and {value:?}",
                    node.package_name
                ));
            }
            node.package_name = value.to_string();
        }
        "module_type" => node.module_types.push(value.to_string()),
        "module_class" => node.module_classes.push(value.to_string()),
        "root" => node.projects.push(value.to_string()),
        "license_kind" => node.license_kinds.push(value.to_string()),
        "license_condition" => {
            node.license_conditions.insert(value.to_string());
        }
        "license_text" => node.license_texts.push(value.to_string()),
        "is_container" => {
            node.is_container = match value {
                "true" => true,
                "false" => false,
                _ => return Err(format!("invalid boolean is_container {value:?}")),
            }
        }
        "built" => node.built.push(value.to_string()),
        "installed" => node.installed.push(value.to_string()),
        "install_map" => {
            let Some((from_path, container_path)) = value.split_once(':') else {
                return Err(format!("invalid install map {value:?}"));
            };
            node.install_map.push(InstallMap {
                from_path: from_path.to_string(),
                container_path: container_path.to_string(),
            });
        }
        "source" => node.sources.push(value.to_string()),
        _ => return Err(format!("unknown metadata key {key:?} for value {value:?}")),
    }
    Ok(())
}

/// `file[:annotation...]`
fn parse_dependency(value: &str) -> std::result::Result<(String, EdgeAnnotations), String> {
    let mut fields = value.split(':');
    let dependency = fields.next().unwrap_or_default();
    if dependency.is_empty() {
        return Err(format!("invalid deps {value:?}"));
    }
    let annotations = fields.filter(|a| !a.is_empty()).collect();
    Ok((dependency.to_string(), annotations))
}
