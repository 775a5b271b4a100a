//! Project builds produce the same tree whatever the pool size.

use crate::common::{TestWorkspace, parent, pom, request};
use anyhow::Result;
use pomr::session::RequestKind;

fn layout(workspace: &TestWorkspace) -> Result<pomr::model::DocumentSource> {
    let modules: Vec<String> = (0..6).map(|i| format!("\"m{i}\"")).collect();
    let root = workspace.document(
        "",
        &pom(
            "org.acme",
            "root",
            "1.0",
            &format!(
                "packaging = \"pom\"\nmodules = [{}, \"platform\"]\n\n[properties]\nlevel = \"root\"\n",
                modules.join(", ")
            ),
        ),
    )?;
    workspace.document(
        "platform",
        &pom(
            "org.acme",
            "platform",
            "1.0",
            "packaging = \"pom\"\n\n[[dependency-management]]\ngroup-id = \"org.lib\"\nartifact-id = \"core\"\nversion = \"4.2\"\n",
        ),
    )?;
    for i in 0..6 {
        let imports = if i % 2 == 0 {
            "\n[[dependency-management]]\ngroup-id = \"org.acme\"\nartifact-id = \"platform\"\nversion = \"1.0\"\ntype = \"pom\"\nscope = \"import\"\n\n[[dependencies]]\ngroup-id = \"org.lib\"\nartifact-id = \"core\"\n"
        } else {
            ""
        };
        let profiles = "\n[[profiles]]\nid = \"fast\"\nactivation = { property = { name = \"fast\" } }\nproperties = { speed = \"high\" }\n";
        workspace.document(
            &format!("m{i}"),
            &format!(
                "artifact-id = \"m{i}\"\ndescription = \"${{level}} / ${{project.artifact-id}}\"\n{imports}{profiles}{}",
                parent("org.acme", "root", "1.0")
            ),
        )?;
    }
    Ok(root)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_size_does_not_change_the_result() -> Result<()> {
    pomr::test_utils::init_test_logging(None);
    let workspace = TestWorkspace::new()?;
    let root = layout(&workspace)?;

    let mut renderings = Vec::new();
    let mut documents = Vec::new();
    for parallelism in [1, 4, 1, 8] {
        let session = workspace.session();
        let build = request(root.clone(), RequestKind::Project)
            .with_max_parallel(parallelism)
            .with_user_property("fast", "yes");
        let result = session.build(&build).await?;
        renderings.push(result.to_string());
        documents.push(
            result
                .flatten()
                .into_iter()
                .map(|r| r.effective_document.as_deref().cloned())
                .collect::<Vec<_>>(),
        );
    }

    assert!(renderings.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(documents.windows(2).all(|pair| pair[0] == pair[1]));

    let rendered = &renderings[0];
    assert!(rendered.starts_with("org.acme:root:1.0\n"));
    assert!(rendered.contains("  org.acme:m0:1.0 [fast]\n"));
    let m0 = documents[0][1].as_ref().unwrap();
    assert_eq!(m0.description.as_deref(), Some("root / m0"));
    assert_eq!(m0.dependencies[0].version.as_deref(), Some("4.2"));
    assert_eq!(m0.properties.get("speed").map(String::as_str), Some("high"));
    Ok(())
}
