//! Integration test: JSON manifests over a local HTTP server, downloaded by the
//! engine to folders and CBZ archives.

mod common;

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use ripper_core::adapter::AdapterRegistry;
use ripper_core::config::RipperConfig;
use ripper_core::output::FsOutputWriter;
use ripper_core::queue::{JobStatus, OutputFormat};
use ripper_core::store::StateDb;
use ripper_core::Engine;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-png";
const JPG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];

fn routes() -> HashMap<String, Vec<u8>> {
    let mut r = HashMap::new();
    r.insert(
        "series/index.json".to_string(),
        br#"{"chapters":[
            {"title":"Arrival","url":"ch1.json"},
            {"title":"Storm: Part 2","url":"ch2.json"},
            {"title":"Lost","url":"ch3.json"}
        ]}"#
        .to_vec(),
    );
    r.insert(
        "series/ch1.json".to_string(),
        br#"{"pages":["img/1-1.png","img/1-2"]}"#.to_vec(),
    );
    r.insert(
        "series/ch2.json".to_string(),
        br#"{"pages":["img/2-1.jpg"]}"#.to_vec(),
    );
    r.insert(
        "series/ch3.json".to_string(),
        br#"{"pages":["img/3-1.png","img/missing.png"]}"#.to_vec(),
    );
    r.insert("series/img/1-1.png".to_string(), PNG.to_vec());
    r.insert("series/img/1-2".to_string(), JPG.to_vec());
    r.insert("series/img/2-1.jpg".to_string(), JPG.to_vec());
    r.insert("series/img/3-1.png".to_string(), PNG.to_vec());
    r
}

async fn engine_at(state: &std::path::Path) -> Engine {
    let registry = AdapterRegistry::with_defaults(&RipperConfig::default());
    let store = StateDb::open_at(state.join("state.db")).await.unwrap();
    let engine = Engine::new(registry, Arc::new(FsOutputWriter::new()), Arc::new(store));
    engine.startup().await.unwrap();
    engine
}

#[tokio::test]
async fn chapters_download_to_folders_and_archives() {
    let server = common::http_server::start(routes());
    let save = tempdir().unwrap();
    let state = tempdir().unwrap();
    let engine = engine_at(state.path()).await;

    let rows = engine
        .list_chapters(
            &server.url("series/index.json"),
            Some(true),
            &CancellationToken::new(),
        )
        .await
        .expect("list chapters");
    let names: Vec<_> = rows.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, ["1 - Arrival", "2 - Storm: Part 2", "3 - Lost"]);

    let selection: Vec<_> = rows.iter().rev().cloned().collect();
    engine
        .enqueue(
            &selection,
            &[OutputFormat::Folder, OutputFormat::Archive],
            save.path(),
        )
        .unwrap();
    let summary = engine.start_all(2, None).await.expect("run");
    assert_eq!(summary.claimed, 6);
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.failed, 2);

    let ch1 = save.path().join("1 - Arrival");
    assert_eq!(std::fs::read(ch1.join("001.png")).unwrap(), PNG);
    assert_eq!(std::fs::read(ch1.join("002.jpg")).unwrap(), JPG);

    let cbz = save.path().join("2 - Storm_ Part 2.cbz");
    let mut archive = zip::ZipArchive::new(std::fs::File::open(&cbz).unwrap()).unwrap();
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_name("001.jpg").unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes, JPG);

    // The chapter with a missing page fails and writes nothing.
    assert!(!save.path().join("3 - Lost").exists());
    assert!(!save.path().join("3 - Lost.cbz").exists());
    for job in engine.snapshot() {
        if job.chapter.title == "Lost" {
            assert_eq!(job.status, JobStatus::Error);
            assert_eq!(job.progress.pages_done, 1);
            assert!(job.error.unwrap().contains("page 2 of 2"));
        } else {
            assert_eq!(job.status, JobStatus::Completed);
        }
    }
}

#[tokio::test]
async fn failed_jobs_survive_a_restart_and_can_be_requeued() {
    let server = common::http_server::start(routes());
    let save = tempdir().unwrap();
    let state = tempdir().unwrap();

    {
        let engine = engine_at(state.path()).await;
        let rows = engine
            .list_chapters(
                &server.url("series/index.json"),
                Some(false),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        engine
            .enqueue(&rows, &[OutputFormat::Folder], save.path())
            .unwrap();
        engine.start_all(1, None).await.unwrap();
        engine.shutdown().await.unwrap();
    }

    let engine = engine_at(state.path()).await;
    let jobs = engine.snapshot();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].chapter.title, "Lost");
    assert_eq!(jobs[0].status, JobStatus::Error);

    engine.requeue(jobs[0].id).unwrap();
    let summary = engine.start_all(1, None).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert!(server.requests() > 0);
}

#[tokio::test]
async fn file_manifests_work_without_a_server() {
    let src = tempdir().unwrap();
    std::fs::write(
        src.path().join("title.json"),
        br#"{"chapters":[{"title":"Local","url":"local/ch.json"}]}"#,
    )
    .unwrap();
    std::fs::create_dir_all(src.path().join("local")).unwrap();
    std::fs::write(
        src.path().join("local/ch.json"),
        br#"{"pages":["a.png"]}"#,
    )
    .unwrap();
    std::fs::write(src.path().join("local/a.png"), PNG).unwrap();

    let save = tempdir().unwrap();
    let state = tempdir().unwrap();
    let engine = engine_at(state.path()).await;
    let title = url::Url::from_file_path(src.path().join("title.json")).unwrap();
    let rows = engine
        .list_chapters(title.as_str(), None, &CancellationToken::new())
        .await
        .unwrap();
    engine
        .enqueue(&rows, &[OutputFormat::Archive], save.path())
        .unwrap();
    let summary = engine.start_all(1, None).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert!(save.path().join("Local.cbz").exists());
}
