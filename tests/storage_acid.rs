//! Crash recovery integration tests for PixRecall.
//!
//! A crash is simulated by dropping the `PixRecall` handle without calling
//! `close()`. redb commits durably in `commit()`, and its shadow paging
//! leaves the file either with or without a transaction, never half of one.

mod common;

use std::sync::Arc;

use common::*;
use pixrecall::{HybridQuery, PhotoId};
use tempfile::tempdir;

fn provider() -> Arc<SceneProvider> {
    Arc::new(SceneProvider::new().with_text("beach", [1.0, 0.0, 0.0, 0.0]))
}

#[test]
fn test_committed_photo_survives_crash() {
    let dir = tempdir().unwrap();

    let id = {
        let app = open_in(dir.path(), provider());
        let image = write_scene(dir.path(), "a.jpg", &Scene::new(&[], [1.0, 0.0, 0.0, 0.0], "crash-safe"));
        app.process_image(&image).unwrap().photo_id
        // no close()
    };

    let app = open_in(dir.path(), provider());
    let stored = app.get_photo(id).unwrap().expect("committed photo must survive");
    assert_eq!(stored.caption, "crash-safe");
    assert_eq!(stored.embedding, vec![1.0, 0.0, 0.0, 0.0]);
    app.close().unwrap();
}

#[test]
fn test_bulk_ingest_survives_crash_and_is_searchable() {
    let dir = tempdir().unwrap();
    let album = dir.path().join("album");

    {
        let app = open_in(dir.path(), provider());
        register_people(&app, dir.path(), &[("Alice", ALICE)]);
        for i in 0..50 {
            let faces: &[[f32; FACE_DIM]] = if i % 5 == 0 { &[ALICE] } else { &[] };
            write_scene(
                &album,
                &format!("p{:02}.jpg", i),
                &Scene::new(faces, [1.0, i as f32 * 0.01, 0.0, 0.0], "p"),
            );
        }
        let report = app.process_folder(&album).unwrap();
        assert_eq!(report.succeeded, 50);
    }

    let app = open_in(dir.path(), provider());
    assert_eq!(app.photo_count().unwrap(), 50);
    assert_eq!(app.reference_count(), 1);

    let hits = app
        .search(&HybridQuery::new("beach").with_people(["Alice"]).with_top_k(50))
        .unwrap();
    assert_eq!(hits.len(), 10);
}

#[test]
fn test_multiple_crash_cycles() {
    let dir = tempdir().unwrap();
    let refs = dir.path().join("refs");

    let first: PhotoId;
    {
        let app = open_in(dir.path(), provider());
        let portrait = write_scene(&refs, "alice.json", &Scene::portrait(ALICE));
        app.register("Alice", &portrait).unwrap();
        let image = write_scene(dir.path(), "one.jpg", &Scene::new(&[ALICE], [1.0, 0.0, 0.0, 0.0], "one"));
        first = app.process_image(&image).unwrap().photo_id;
    }

    let second: PhotoId;
    {
        let app = open_in(dir.path(), provider());
        assert!(app.get_photo(first).unwrap().is_some());

        let portrait = write_scene(&refs, "bob.json", &Scene::portrait(BOB));
        app.register("Bob", &portrait).unwrap();
        let image = write_scene(dir.path(), "two.jpg", &Scene::new(&[BOB, ALICE], [0.0, 1.0, 0.0, 0.0], "two"));
        second = app.process_image(&image).unwrap().photo_id;
    }

    let app = open_in(dir.path(), provider());
    assert_eq!(app.photo_count().unwrap(), 2);
    assert_eq!(app.reference_count(), 2);
    assert!(app.get_photo(second).unwrap().unwrap().contains_all(["Alice", "Bob"]));
    app.close().unwrap();
}
