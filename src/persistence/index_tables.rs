use std::path::{Path, PathBuf};

use fjall::{Database, Keyspace, KeyspaceCreateOptions, PersistMode};
use roaring::RoaringBitmap;
use tracing::info;

use crate::error::FolioError;
use crate::models::{DocId, IndexEntry};
use crate::Result;

/// Bumped whenever the on-disk layout changes
pub const FORMAT_VERSION: u32 = 1;

const META_CF: &str = "meta";
const PATH_TO_ID_CF: &str = "path_to_id";
const ID_TO_PATH_CF: &str = "id_to_path";
const ENTRIES_CF: &str = "entries";
const POSTINGS_CF: &str = "postings";
const FORWARD_CF: &str = "forward";

const VERSION_KEY: &[u8] = b"format_version";
const SCHEMA_KEY: &[u8] = b"schema";
const LAST_ID_KEY: &[u8] = b"last_id";

/// Everything read back from disk when an index is opened
#[derive(Debug, Default)]
pub struct StoredIndex {
    pub last_id: Option<DocId>,
    pub path_to_id: Vec<(String, DocId)>,
    pub id_to_path: Vec<(DocId, String)>,
    pub entries: Vec<IndexEntry>,
    /// (field, token, documents)
    pub postings: Vec<(String, String, RoaringBitmap)>,
    /// (field, document, tokens)
    pub forward: Vec<(String, DocId, Vec<String>)>,
}

/// Mutations flushed together by one commit. `None` values delete the key.
#[derive(Debug, Default)]
pub struct TableBatch {
    pub last_id: Option<DocId>,
    pub paths: Vec<(String, Option<DocId>)>,
    pub ids: Vec<(DocId, Option<String>)>,
    pub entries: Vec<(DocId, Option<IndexEntry>)>,
    pub postings: Vec<(String, String, Option<RoaringBitmap>)>,
    pub forward: Vec<(String, DocId, Option<Vec<String>>)>,
}

impl TableBatch {
    pub fn is_empty(&self) -> bool {
        self.last_id.is_none()
            && self.paths.is_empty()
            && self.ids.is_empty()
            && self.entries.is_empty()
            && self.postings.is_empty()
            && self.forward.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
            + self.ids.len()
            + self.entries.len()
            + self.postings.len()
            + self.forward.len()
    }
}

/// Fjall-backed tables holding a persisted index.
pub struct IndexTables {
    dir: PathBuf,
    db: Database,
    meta: Keyspace,
    path_to_id: Keyspace,
    id_to_path: Keyspace,
    entries: Keyspace,
    postings: Keyspace,
    forward: Keyspace,
}

fn storage_err(e: impl ToString) -> FolioError {
    FolioError::Storage(e.to_string())
}

impl IndexTables {
    /// Open (or create) the tables in `dir`. An existing index written with
    /// another format version or schema fingerprint is refused.
    pub fn open(dir: &Path, schema: &str) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            FolioError::StorageUnavailable(format!("{}: {}", dir.display(), e))
        })?;
        let db = Database::builder(dir).open().map_err(|e| {
            FolioError::StorageUnavailable(format!("failed to open index database: {}", e))
        })?;

        let open_cf = |name: &str| {
            db.keyspace(name, || KeyspaceCreateOptions::default())
                .map_err(|e| {
                    FolioError::StorageUnavailable(format!("failed to open {} table: {}", name, e))
                })
        };
        let meta = open_cf(META_CF)?;
        let path_to_id = open_cf(PATH_TO_ID_CF)?;
        let id_to_path = open_cf(ID_TO_PATH_CF)?;
        let entries = open_cf(ENTRIES_CF)?;
        let postings = open_cf(POSTINGS_CF)?;
        let forward = open_cf(FORWARD_CF)?;

        let tables = Self {
            dir: dir.to_path_buf(),
            db,
            meta,
            path_to_id,
            id_to_path,
            entries,
            postings,
            forward,
        };
        tables.check_or_stamp(schema)?;
        Ok(tables)
    }

    fn check_or_stamp(&self, schema: &str) -> Result<()> {
        let version = self.meta.get(VERSION_KEY).map_err(storage_err)?;
        match version {
            Some(bytes) => {
                let actual = decode_u32(META_CF, bytes.as_ref())?;
                if actual != FORMAT_VERSION {
                    return Err(FolioError::IncompatibleVersion {
                        expected: FORMAT_VERSION,
                        actual,
                    });
                }
                let stored = self.meta.get(SCHEMA_KEY).map_err(storage_err)?;
                let stored = stored.map(|s| String::from_utf8_lossy(s.as_ref()).into_owned());
                if stored.as_deref() != Some(schema) {
                    return Err(FolioError::IncompatibleIndex(format!(
                        "{} was built with a different field schema; rebuild required",
                        self.dir.display()
                    )));
                }
            }
            None => {
                if !self.path_to_id.is_empty().map_err(storage_err)? {
                    return Err(FolioError::corrupt(META_CF, "missing format version"));
                }
                self.stamp(schema)?;
                info!(dir = %self.dir.display(), version = FORMAT_VERSION, "created index");
            }
        }
        Ok(())
    }

    fn stamp(&self, schema: &str) -> Result<()> {
        let mut batch = self.db.batch();
        batch.insert(&self.meta, VERSION_KEY, FORMAT_VERSION.to_be_bytes());
        batch.insert(&self.meta, SCHEMA_KEY, schema.as_bytes());
        batch.commit().map_err(storage_err)?;
        self.db.persist(PersistMode::SyncAll).map_err(storage_err)?;
        Ok(())
    }

    /// Read every table into memory
    pub fn load(&self) -> Result<StoredIndex> {
        let mut stored = StoredIndex {
            last_id: self
                .meta
                .get(LAST_ID_KEY)
                .map_err(storage_err)?
                .map(|v| decode_u32(META_CF, v.as_ref()))
                .transpose()?,
            ..Default::default()
        };

        for (key, val) in Self::scan(&self.path_to_id)? {
            stored
                .path_to_id
                .push((decode_str(PATH_TO_ID_CF, &key)?, decode_u32(PATH_TO_ID_CF, &val)?));
        }
        for (key, val) in Self::scan(&self.id_to_path)? {
            stored
                .id_to_path
                .push((decode_u32(ID_TO_PATH_CF, &key)?, decode_str(ID_TO_PATH_CF, &val)?));
        }
        for (_, val) in Self::scan(&self.entries)? {
            let entry: IndexEntry = bincode::deserialize(&val)
                .map_err(|e| FolioError::corrupt(ENTRIES_CF, e))?;
            stored.entries.push(entry);
        }
        for (key, val) in Self::scan(&self.postings)? {
            let (field, token) = split_key(POSTINGS_CF, &key)?;
            let list = RoaringBitmap::deserialize_from(val.as_slice())
                .map_err(|e| FolioError::corrupt(POSTINGS_CF, e))?;
            stored
                .postings
                .push((field, decode_str(POSTINGS_CF, token)?, list));
        }
        for (key, val) in Self::scan(&self.forward)? {
            let (field, id) = split_key(FORWARD_CF, &key)?;
            let tokens: Vec<String> = bincode::deserialize(&val)
                .map_err(|e| FolioError::corrupt(FORWARD_CF, e))?;
            stored
                .forward
                .push((field, decode_u32(FORWARD_CF, id)?, tokens));
        }
        Ok(stored)
    }

    fn scan(keyspace: &Keyspace) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        for kv in keyspace.iter() {
            let key = kv.key().map_err(storage_err)?;
            let key_bytes = key.as_ref().to_vec();
            if let Some(val) = keyspace.get(&key_bytes).map_err(storage_err)? {
                out.push((key_bytes, val.as_ref().to_vec()));
            }
        }
        Ok(out)
    }

    /// Apply `batch` atomically and sync it to disk
    pub fn write(&self, batch: &TableBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut out = self.db.batch();

        if let Some(last) = batch.last_id {
            out.insert(&self.meta, LAST_ID_KEY, last.to_be_bytes());
        }
        for (path, id) in &batch.paths {
            match id {
                Some(id) => out.insert(&self.path_to_id, path.as_bytes(), id.to_be_bytes()),
                None => out.remove(&self.path_to_id, path.as_bytes()),
            }
        }
        for (id, path) in &batch.ids {
            match path {
                Some(path) => out.insert(&self.id_to_path, id.to_be_bytes(), path.as_bytes()),
                None => out.remove(&self.id_to_path, id.to_be_bytes()),
            }
        }
        for (id, entry) in &batch.entries {
            match entry {
                Some(entry) => out.insert(&self.entries, id.to_be_bytes(), bincode::serialize(entry)?),
                None => out.remove(&self.entries, id.to_be_bytes()),
            }
        }
        for (field, token, list) in &batch.postings {
            let key = join_key(field, token.as_bytes());
            match list {
                Some(list) => {
                    let mut bytes = Vec::with_capacity(list.serialized_size());
                    list.serialize_into(&mut bytes)?;
                    out.insert(&self.postings, key, bytes);
                }
                None => out.remove(&self.postings, key),
            }
        }
        for (field, id, tokens) in &batch.forward {
            let key = join_key(field, &id.to_be_bytes());
            match tokens {
                Some(tokens) => out.insert(&self.forward, key, bincode::serialize(tokens)?),
                None => out.remove(&self.forward, key),
            }
        }

        out.commit().map_err(storage_err)?;
        self.db.persist(PersistMode::SyncAll).map_err(storage_err)?;
        Ok(())
    }

    /// Delete every record and re-stamp the empty tables
    pub fn clear(&self, schema: &str) -> Result<()> {
        let mut batch = self.db.batch();
        for keyspace in [
            &self.meta,
            &self.path_to_id,
            &self.id_to_path,
            &self.entries,
            &self.postings,
            &self.forward,
        ] {
            for (key, _) in Self::scan(keyspace)? {
                batch.remove(keyspace, key);
            }
        }
        batch.commit().map_err(storage_err)?;
        self.stamp(schema)
    }
}

fn join_key(field: &str, rest: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(field.len() + 1 + rest.len());
    key.extend_from_slice(field.as_bytes());
    key.push(0);
    key.extend_from_slice(rest);
    key
}

fn split_key<'a>(table: &'static str, key: &'a [u8]) -> Result<(String, &'a [u8])> {
    let pos = key
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| FolioError::corrupt(table, "key without field separator"))?;
    Ok((decode_str(table, &key[..pos])?, &key[pos + 1..]))
}

fn decode_u32(table: &'static str, bytes: &[u8]) -> Result<u32> {
    let buf: [u8; 4] = bytes
        .try_into()
        .map_err(|_| FolioError::corrupt(table, format!("expected 4 bytes, got {}", bytes.len())))?;
    Ok(u32::from_be_bytes(buf))
}

fn decode_str(table: &'static str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| FolioError::corrupt(table, e))
}
