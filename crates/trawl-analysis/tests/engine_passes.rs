use std::error::Error;
use std::fs;

use tempfile::tempdir;
use trawl_analysis::{
    AttributionAnalyzer, CommitLinkAnalyzer, EngineSettings, Importer, InterlinkAnalyzer,
    LINK_CERTAINTY,
};
use trawl_core::IdentityContext;
use trawl_store::{FragmentKind, SqliteStore, Store};

const BUGS_JSON: &str = r#"{
  "bugs": [
    {
      "number": 1234,
      "title": "Parser crash",
      "comments": [
        { "author": { "name": "Ann Lee", "email": "ann@example.org" },
          "text": "The parser crashes on empty input." },
        { "author": { "name": "Bob Stone" },
          "text": "(In reply to comment #0)\n> The parser crashes on empty input.\n\nConfirmed here." }
      ]
    },
    {
      "number": 5678,
      "title": "Slow startup",
      "comments": [
        { "author": { "name": "Carl Weber", "email": "carl@example.org" },
          "text": "Startup takes ages." }
      ]
    }
  ]
}"#;

#[test]
fn passes_resolve_attribute_and_link_an_imported_project() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let workspace = temp.path();
    let bugs_path = workspace.join("bugs.json");
    fs::write(&bugs_path, BUGS_JSON)?;

    let imported = Importer::new(workspace).import_bugs("demo", &bugs_path)?;
    assert_eq!(imported.bugs, 2);
    assert_eq!(imported.comments, 3);
    assert_eq!(imported.identities, 3);

    let store = SqliteStore::open(workspace)?;
    let project = store.find_project("demo")?.ok_or("project")?;
    let committer = store.insert_identity(
        project.id,
        IdentityContext::Source,
        Some("A. Lee"),
        Some("ANN@example.org"),
    )?;
    let see_bug = store.upsert_commit(project.id, "aaa111", Some(committer), "see bug 1234", 1)?;
    let bare = store.upsert_commit(project.id, "bbb222", Some(committer), "1234", 2)?;
    let url = store.upsert_commit(
        project.id,
        "ccc333",
        None,
        "Speed up startup\n\nhttps://bugs.example.org/show_bug.cgi?id=5678",
        3,
    )?;
    store.upsert_commit(project.id, "ddd444", None, "fixes bug 4242", 4)?;

    let settings = EngineSettings::default();

    let interlink = InterlinkAnalyzer::with_settings(workspace, settings.clone());
    let first = interlink.run("demo")?;
    assert_eq!(first.identities, 4);
    assert_eq!(first.clusters, 3);
    assert_eq!(first.email_merges, 1);

    let partition = |users: Vec<trawl_store::UserRecord>| {
        let mut clusters = users
            .into_iter()
            .map(|user| {
                let mut ids = user.identity_ids;
                ids.sort_unstable();
                ids
            })
            .collect::<Vec<_>>();
        clusters.sort();
        clusters
    };
    let before = partition(store.list_users(project.id)?);
    let identities = store.list_identities(project.id)?;
    let ann = identities
        .iter()
        .find(|identity| identity.name.as_deref() == Some("Ann Lee"))
        .ok_or("ann")?;
    assert!(before.contains(&vec![ann.id, committer]));
    assert_eq!(before.iter().map(Vec::len).sum::<usize>(), identities.len());

    interlink.run("demo")?;
    assert_eq!(partition(store.list_users(project.id)?), before);

    let attribution = AttributionAnalyzer::with_settings(workspace, &settings).run("demo")?;
    assert_eq!(attribution.bugs, 2);
    assert_eq!(attribution.comments, 3);

    let bug = store.find_bug(project.id, 1234)?.ok_or("bug 1234")?;
    let reply = store
        .list_comments(bug.id)?
        .into_iter()
        .find(|comment| comment.ordinal == 1)
        .ok_or("reply comment")?;
    let fragments = store.list_comment_fragments(reply.id)?;
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].kind, FragmentKind::Quote);
    assert_eq!(fragments[0].back_reference, Some(0));
    assert_eq!(fragments[0].speaker_id, Some(ann.id));
    assert_eq!(fragments[1].kind, FragmentKind::Paragraph);
    assert_eq!(fragments[1].text, "Confirmed here.");

    let linked = CommitLinkAnalyzer::with_settings(workspace, &settings).run("demo")?;
    assert_eq!(linked.commits_scanned, 4);
    assert_eq!(linked.links_written, 2);
    assert_eq!(linked.unresolved_references, 1);

    let links = store.list_commit_links(project.id)?;
    let bug_5678 = store.find_bug(project.id, 5678)?.ok_or("bug 5678")?;
    assert!(
        links
            .iter()
            .any(|link| link.commit_id == see_bug && link.bug_id == bug.id && link.certainty == 2)
    );
    assert!(links.iter().all(|link| link.commit_id != bare));
    assert!(links.iter().any(|link| link.commit_id == url
        && link.bug_id == bug_5678.id
        && link.certainty == LINK_CERTAINTY));

    let relinked = CommitLinkAnalyzer::with_settings(workspace, &settings).run("demo")?;
    assert_eq!(relinked.links_cleared, 2);
    assert_eq!(store.list_commit_links(project.id)?.len(), 2);
    Ok(())
}

#[test]
fn passes_reject_unknown_projects() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let settings = EngineSettings::default();

    let err = InterlinkAnalyzer::with_settings(temp.path(), settings.clone())
        .run("missing")
        .expect_err("unknown project");
    assert!(err.to_string().contains("unknown project 'missing'"));

    assert!(
        CommitLinkAnalyzer::with_settings(temp.path(), &settings)
            .run("missing")
            .is_err()
    );
    Ok(())
}

#[test]
fn analyzers_reject_invalid_workspace_config() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let config_dir = temp.path().join(".trawl");
    fs::create_dir_all(&config_dir)?;
    fs::write(
        config_dir.join("config.toml"),
        "[attribution]\nstrategy = \"klingon\"\n",
    )?;

    assert!(AttributionAnalyzer::new(temp.path()).is_err());
    assert!(InterlinkAnalyzer::new(temp.path()).is_err());
    assert!(CommitLinkAnalyzer::new(temp.path()).is_err());
    Ok(())
}
