use crate::filter::{SearchMatcher, SearchMode};
use crate::{collection_order, merge_tag_infos, Item, ItemKind, MigrationStatus, Store, TagInfo};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use include_dir::{include_dir, Dir};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

static MIGRATIONS: Dir = include_dir!("$CARGO_MANIFEST_DIR/migrations");

const ITEM_COLUMNS: &str = "id, content, kind, captured_at, pinned, source_app";

pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

pub type StoreImpl = SqliteStore;

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::new_with(path, true)
    }

    pub fn new_with<P: AsRef<Path>>(path: P, auto_migrate: bool) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .with_context(|| format!("opening database {}", path.display()))?;
        conn.pragma_update(None, "foreign_keys", 1)?;
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.busy_timeout(std::time::Duration::from_millis(5000));
        let store = Self {
            path,
            conn: Mutex::new(conn),
        };
        if auto_migrate {
            store.migrate_all()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sorted_migrations() -> Vec<(u32, &'static include_dir::File<'static>)> {
        let mut files: Vec<_> = MIGRATIONS
            .files()
            .filter(|f| f.path().extension().map(|e| e == "sql").unwrap_or(false))
            .filter_map(|f| {
                let stem = f.path().file_stem()?.to_string_lossy();
                Some((crate::parse_version_prefix(&stem)?, f))
            })
            .collect();
        files.sort_by_key(|(ver, _)| *ver);
        files
    }

    pub fn migrate_all(&self) -> anyhow::Result<()> {
        let conn = self.conn();
        let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        for (ver, file) in Self::sorted_migrations() {
            if i64::from(ver) <= current {
                continue;
            }
            let sql = file.contents_utf8().ok_or_else(|| {
                anyhow::anyhow!("invalid utf-8 in migration {}", file.path().display())
            })?;
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(sql)
                .with_context(|| format!("applying migration {}", file.path().display()))?;
            tx.execute_batch(&format!("PRAGMA user_version = {ver}"))?;
            tx.commit()?;
            tracing::debug!(version = ver, "applied migration");
        }
        Ok(())
    }

    pub fn migration_status(&self) -> anyhow::Result<MigrationStatus> {
        let conn = self.conn();
        let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        let files = Self::sorted_migrations();
        let latest = files.last().map(|(v, _)| i64::from(*v)).unwrap_or(0);
        let pending = files
            .iter()
            .filter(|(v, _)| i64::from(*v) > current)
            .map(|(_, f)| f.path().display().to_string())
            .collect();
        Ok(MigrationStatus {
            current,
            latest,
            pending,
        })
    }

    fn tags_for(conn: &Connection, id: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt =
            conn.prepare_cached("SELECT tag FROM item_tags WHERE item_id = ?1 ORDER BY pos, rowid")?;
        let tags = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags)
    }

    fn query_items(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> anyhow::Result<Vec<Item>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut item = row?;
            item.tags = Self::tags_for(conn, &item.id)?;
            out.push(item);
        }
        Ok(out)
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<anyhow::Result<Item>> {
    Ok(decode_item(
        row.get(0)?,
        row.get(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, i64>(4)? != 0,
        row.get(5)?,
    ))
}

/// A malformed `kind` or timestamp surfaces as an error on the whole read.
fn decode_item(
    id: String,
    content: String,
    kind: String,
    captured_at: String,
    pinned: bool,
    source_app: Option<String>,
) -> anyhow::Result<Item> {
    let kind = kind.parse::<ItemKind>().map_err(anyhow::Error::msg)?;
    let captured_at = DateTime::parse_from_rfc3339(&captured_at)
        .with_context(|| format!("item {id}: bad captured_at {captured_at:?}"))?
        .with_timezone(&Utc);
    Ok(Item {
        id,
        content,
        kind,
        captured_at,
        pinned,
        tags: Vec::new(),
        source_app,
    })
}

impl Store for SqliteStore {
    fn insert(&self, item: &Item) -> anyhow::Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO items (id, content, kind, captured_at, pinned, source_app) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.id,
                item.content,
                item.kind.as_str(),
                format_ts(&item.captured_at),
                item.pinned as i64,
                item.source_app,
            ],
        )
        .with_context(|| format!("inserting item {}", item.id))?;
        for (pos, tag) in item.tags.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO item_tags (item_id, tag, pos) VALUES (?1, ?2, ?3)",
                params![item.id, tag, pos as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn count(&self) -> anyhow::Result<usize> {
        let conn = self.conn();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Item>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY pinned DESC, captured_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        );
        Self::query_items(&conn, &sql, params![limit as i64, offset as i64])
    }

    fn get(&self, id: &str) -> anyhow::Result<Option<Item>> {
        let conn = self.conn();
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
        let row = conn
            .query_row(&sql, [id], row_to_item)
            .optional()?
            .transpose()?;
        match row {
            Some(mut item) => {
                item.tags = Self::tags_for(&conn, &item.id)?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    fn search(&self, pattern: &str, is_regex: bool) -> anyhow::Result<Vec<Item>> {
        let matcher = SearchMatcher::new(pattern, SearchMode::from_regex_flag(is_regex));
        let conn = self.conn();
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items");
        let mut items = Self::query_items(&conn, &sql, [])?;
        items.retain(|item| matcher.matches(item));
        items.sort_by(collection_order);
        Ok(items)
    }

    fn items_by_tag(&self, tag: &str) -> anyhow::Result<Vec<Item>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id IN (SELECT item_id FROM item_tags WHERE tag = ?1) ORDER BY pinned DESC, captured_at DESC, rowid DESC"
        );
        Self::query_items(&conn, &sql, [tag])
    }

    fn set_pinned(&self, id: &str, pinned: bool) -> anyhow::Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE items SET pinned = ?1 WHERE id = ?2",
            params![pinned as i64, id],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str) -> anyhow::Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM items", [])?;
        Ok(())
    }

    fn add_tag(&self, id: &str, tag: &str) -> anyhow::Result<()> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row("SELECT 1 FROM items WHERE id = ?1", [id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Ok(());
        }
        conn.execute(
            "INSERT OR IGNORE INTO item_tags (item_id, tag, pos)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(pos) + 1, 0) FROM item_tags WHERE item_id = ?1))",
            params![id, tag],
        )?;
        Ok(())
    }

    fn remove_tag(&self, id: &str, tag: &str) -> anyhow::Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM item_tags WHERE item_id = ?1 AND tag = ?2",
            params![id, tag],
        )?;
        Ok(())
    }

    fn list_all_tags(&self) -> anyhow::Result<Vec<TagInfo>> {
        let conn = self.conn();
        let in_use: Vec<String> = conn
            .prepare("SELECT DISTINCT tag FROM item_tags")?
            .query_map([], |r| r.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        let custom: Vec<(String, Option<String>)> = conn
            .prepare("SELECT name, color FROM custom_tags")?
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(merge_tag_infos(in_use.iter().map(String::as_str), custom))
    }

    fn create_custom_tag(&self, name: &str, color: Option<&str>) -> anyhow::Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO custom_tags (name, color) VALUES (?1, ?2)",
            params![name, color],
        )
        .with_context(|| format!("creating tag {name}"))?;
        Ok(())
    }

    fn update_tag_color(&self, name: &str, color: &str) -> anyhow::Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO custom_tags (name, color) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET color = excluded.color",
            params![name, color],
        )?;
        Ok(())
    }

    fn delete_custom_tag(&self, name: &str) -> anyhow::Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM custom_tags WHERE name = ?1", params![name])?;
        tx.execute("DELETE FROM item_tags WHERE tag = ?1", params![name])?;
        tx.commit()?;
        Ok(())
    }
}
