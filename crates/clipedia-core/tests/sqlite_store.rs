use chrono::{Duration, TimeZone, Utc};
use clipedia_core::{Item, ItemKind, Store, StoreImpl};
use tempfile::tempdir;

fn item_at(content: &str, secs: i64) -> Item {
    let mut item = Item::new(content, ItemKind::Text);
    item.captured_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs);
    item
}

#[test]
fn migrations_create_schema_and_record_version() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("mig.db");
    let store = StoreImpl::new_with(&db, true).expect("store");
    let status = store.migration_status().unwrap();
    assert_eq!(status.current, status.latest);
    assert!(status.pending.is_empty());

    let conn = rusqlite::Connection::open(&db).unwrap();
    let has_custom_tags: i64 = conn
        .query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name='custom_tags'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(has_custom_tags, 1);
}

#[test]
fn without_auto_migrate_everything_is_pending() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new_with(dir.path().join("lazy.db"), false).expect("store");
    let status = store.migration_status().unwrap();
    assert_eq!(status.current, 0);
    assert_eq!(status.pending.len() as i64, status.latest);
    store.migrate_all().unwrap();
    assert!(store.migration_status().unwrap().pending.is_empty());
}

#[test]
fn pages_come_back_pinned_first_then_newest() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new(dir.path().join("order.db")).expect("store");
    let old = item_at("old", 0);
    let mid = item_at("mid", 10);
    let new = item_at("new", 20);
    for it in [&old, &mid, &new] {
        store.insert(it).unwrap();
    }
    store.set_pinned(&old.id, true).unwrap();

    let all: Vec<String> = store.page(0, 10).unwrap().into_iter().map(|i| i.content).collect();
    assert_eq!(all, ["old", "new", "mid"]);
    assert!(store.page(0, 10).unwrap()[0].pinned);

    let second: Vec<String> = store.page(1, 1).unwrap().into_iter().map(|i| i.content).collect();
    assert_eq!(second, ["new"]);
    assert!(store.page(3, 10).unwrap().is_empty());
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn item_fields_survive_storage() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new(dir.path().join("fields.db")).expect("store");
    let mut item = item_at("fn main() {}", 5);
    item.source_app = Some("editor".into());
    item.tags = vec!["code".into(), "code:rust".into()];
    store.insert(&item).unwrap();

    let got = store.get(&item.id).unwrap().expect("stored item");
    assert_eq!(got, item);
    assert!(store.get("missing").unwrap().is_none());
}

#[test]
fn capture_tags_text_and_rejects_duplicate_ids() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new(dir.path().join("cap.db")).expect("store");
    let item = store
        .capture("https://example.com/docs", ItemKind::Text, Some("browser"))
        .unwrap();
    assert!(item.has_tag("url"));
    let stored = store.get(&item.id).unwrap().unwrap();
    assert_eq!(stored.tags, item.tags);
    assert_eq!(stored.source_app.as_deref(), Some("browser"));
    assert!(store.insert(&item).is_err());
}

#[test]
fn delete_and_clear_cascade_tags() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("del.db");
    let store = StoreImpl::new(&db).expect("store");
    let a = item_at("a", 0);
    let b = item_at("b", 1);
    store.insert(&a).unwrap();
    store.insert(&b).unwrap();
    store.add_tag(&a.id, "work").unwrap();

    store.delete(&a.id).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert!(store.list_all_tags().unwrap().is_empty());

    store.clear().unwrap();
    assert_eq!(store.count().unwrap(), 0);
    let conn = rusqlite::Connection::open(&db).unwrap();
    let orphans: i64 = conn
        .query_row("SELECT COUNT(*) FROM item_tags", [], |r| r.get(0))
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn item_tags_add_remove_and_keep_insertion_order() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new(dir.path().join("tags.db")).expect("store");
    let it = item_at("taggable", 0);
    store.insert(&it).unwrap();
    store.add_tag(&it.id, "y").unwrap();
    store.add_tag(&it.id, "x").unwrap();
    store.add_tag(&it.id, "y").unwrap();
    assert_eq!(store.get(&it.id).unwrap().unwrap().tags, ["y", "x"]);

    store.remove_tag(&it.id, "y").unwrap();
    assert_eq!(store.get(&it.id).unwrap().unwrap().tags, ["x"]);

    // unknown item is a no-op
    store.add_tag("nope", "x").unwrap();
}

#[test]
fn custom_tags_merge_with_tags_in_use() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new(dir.path().join("custom.db")).expect("store");
    let it = item_at("see https://example.com", 0);
    store.insert(&it).unwrap();
    store.add_tag(&it.id, "url").unwrap();
    store.add_tag(&it.id, "work").unwrap();

    store.create_custom_tag("work", Some("#ff0000")).unwrap();
    store.create_custom_tag("later", None).unwrap();
    assert!(store.create_custom_tag("later", None).is_err());
    store.update_tag_color("later", "#00ff00").unwrap();

    let tags = store.list_all_tags().unwrap();
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["later", "url", "work"]);
    assert_eq!(tags[0].color.as_deref(), Some("#00ff00"));
    assert!(tags[1].system);
    assert!(!tags[2].system);
    assert_eq!(tags[2].color.as_deref(), Some("#ff0000"));

    store.delete_custom_tag("work").unwrap();
    assert_eq!(store.get(&it.id).unwrap().unwrap().tags, ["url"]);
    let names: Vec<String> = store.list_all_tags().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["later", "url"]);
}

#[test]
fn search_plain_and_pattern() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new(dir.path().join("search.db")).expect("store");
    let a = item_at("Error: disk full", 0);
    let b = item_at("all good", 1);
    let c = item_at("error code 42", 2);
    for it in [&a, &b, &c] {
        store.insert(it).unwrap();
    }
    store.add_tag(&b.id, "errors-later").unwrap();

    let plain: Vec<String> = store.search("error", false).unwrap().into_iter().map(|i| i.content).collect();
    assert_eq!(plain, ["error code 42", "all good", "Error: disk full"]);

    let pattern: Vec<String> = store.search(r"^error\b", true).unwrap().into_iter().map(|i| i.content).collect();
    assert_eq!(pattern, ["error code 42", "Error: disk full"]);

    // unbalanced pattern falls back to substring matching
    assert!(store.search("(", true).unwrap().is_empty());
}

#[test]
fn items_by_tag_follows_collection_order() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new(dir.path().join("by_tag.db")).expect("store");
    let a = item_at("oldest", 0);
    let b = item_at("middle", 1);
    let c = item_at("newest", 2);
    for it in [&a, &b, &c] {
        store.insert(it).unwrap();
    }
    store.add_tag(&a.id, "keep").unwrap();
    store.add_tag(&c.id, "keep").unwrap();
    store.add_tag(&b.id, "other").unwrap();
    store.set_pinned(&a.id, true).unwrap();

    let hits: Vec<String> = store.items_by_tag("keep").unwrap().into_iter().map(|i| i.content).collect();
    assert_eq!(hits, ["oldest", "newest"]);
    assert_eq!(store.items_by_tag("keep").unwrap()[1].tags, ["keep"]);
    assert!(store.items_by_tag("missing").unwrap().is_empty());

    store.remove_tag(&a.id, "keep").unwrap();
    let hits: Vec<String> = store.items_by_tag("keep").unwrap().into_iter().map(|i| i.content).collect();
    assert_eq!(hits, ["newest"]);
}
