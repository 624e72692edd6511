use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oracleforge_core::store::{AtomicUpdate, DocumentStore};
use oracleforge_core::ForgeError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;
use uuid::Uuid;

pub mod blob;
pub mod paths;

pub use blob::FsBlobStore;

const FILE_VERSION: u32 = 1;

#[derive(Clone, Serialize, Deserialize)]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    documents: BTreeMap<String, Value>,
}

#[derive(Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    documents: BTreeMap<String, Value>,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self { created_at: now, updated_at: now, documents: BTreeMap::new() }
    }

    fn to_image(&self) -> FileImage {
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            documents: self.documents.clone(),
        }
    }

    fn from_image(img: FileImage) -> Self {
        Self {
            created_at: img.created_at,
            updated_at: img.updated_at,
            documents: img.documents,
        }
    }
}

/// Document store persisted as one JSON file, rewritten atomically on every
/// mutation, with timestamped backups rotated to a bounded count.
pub struct FsDocumentStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
}

impl FsDocumentStore {
    pub async fn open_default() -> Result<Self, ForgeError> {
        let (file, backups) = paths::default_store_file();
        Self::open_with(file, backups, 10).await
    }

    pub async fn open_with(
        path: PathBuf,
        backups_dir: PathBuf,
        max_backups: usize,
    ) -> Result<Self, ForgeError> {
        ensure_parent_dirs(&path)?;
        ensure_dir(&backups_dir)?;
        let state = load_or_init(&path).await?;
        Ok(Self {
            path,
            backups_dir,
            max_backups: max_backups.max(1),
            state: RwLock::new(state),
        })
    }

    async fn save(&self) -> Result<(), ForgeError> {
        let snapshot = {
            let mut s = self.state.write();
            s.updated_at = Utc::now();
            s.to_image()
        };
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;

        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &snapshot))
            .await
            .map_err(|e| ForgeError::Persistence(format!("save task: {e}")))?
            .map_err(io_err)?;
        Ok(())
    }
}

fn io_err(e: std::io::Error) -> ForgeError {
    ForgeError::Persistence(format!("io: {e}"))
}

fn ensure_parent_dirs(path: &Path) -> Result<(), ForgeError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), ForgeError> {
    fs::create_dir_all(path).map_err(io_err)
}

async fn load_or_init(path: &Path) -> Result<State, ForgeError> {
    if path.exists() {
        let p = path.to_path_buf();
        let img: FileImage = task::spawn_blocking(move || {
            let mut f = fs::File::open(&p)?;
            let mut buf = String::new();
            f.read_to_string(&mut buf)?;
            let v = serde_json::from_str::<FileImage>(&buf)?;
            Ok::<FileImage, std::io::Error>(v)
        })
        .await
        .map_err(|e| ForgeError::Persistence(format!("load task: {e}")))?
        .map_err(io_err)?;
        let mut st = State::from_image(img);
        st.updated_at = Utc::now();
        Ok(st)
    } else {
        let st = State::new_empty();
        let img = st.to_image();
        write_with_backup(path, &path.with_extension("backups"), 1, &img).map_err(io_err)?;
        Ok(st)
    }
}

fn write_with_backup(
    path: &Path,
    backups_dir: &Path,
    max_backups: usize,
    img: &FileImage,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(backups_dir)?;

    let json = serde_json::to_vec_pretty(img)?;
    let mut tmp = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    let _ = fs::remove_file(path);
    tmp.persist(path)?;

    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let backup_name = format!("oracleforge-{ts}.json");
    let backup_path = backups_dir.join(backup_name);
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(&json)?;
    btmp.flush()?;
    let _ = fs::remove_file(&backup_path);
    btmp.persist(&backup_path)?;

    rotate_backups(backups_dir, max_backups)?;

    Ok(())
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), std::io::Error> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    entries.sort_by_key(|e| e.metadata().and_then(|m| m.modified()).ok());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            let _ = fs::remove_file(e.path());
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    fn allocate_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn set(&self, path: &str, doc: Value) -> Result<(), ForgeError> {
        if !doc.is_object() {
            return Err(ForgeError::Persistence("document must be a JSON object".into()));
        }
        {
            let mut s = self.state.write();
            s.documents.insert(path.to_string(), doc);
        }
        self.save().await
    }

    async fn get(&self, path: &str) -> Result<Option<Value>, ForgeError> {
        let s = self.state.read();
        Ok(s.documents.get(path).cloned())
    }

    async fn update(&self, path: &str, patch: Value) -> Result<(), ForgeError> {
        let Value::Object(patch) = patch else {
            return Err(ForgeError::Persistence("patch must be a JSON object".into()));
        };
        {
            let mut s = self.state.write();
            let doc = s
                .documents
                .get_mut(path)
                .ok_or(ForgeError::NotFound("document"))?;
            let obj = doc.as_object_mut().ok_or_else(|| {
                ForgeError::Persistence("stored document is not an object".into())
            })?;
            for (k, v) in patch {
                obj.insert(k, v);
            }
        }
        self.save().await
    }

    async fn delete(&self, path: &str) -> Result<(), ForgeError> {
        let removed = {
            let mut s = self.state.write();
            s.documents.remove(path).is_some()
        };
        if removed {
            self.save().await?;
        }
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, ForgeError> {
        let prefix = format!("{collection}/");
        let s = self.state.read();
        Ok(s.documents
            .iter()
            .filter_map(|(path, doc)| {
                let id = path.strip_prefix(&prefix)?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                Some((id.to_string(), doc.clone()))
            })
            .collect())
    }

    async fn run_atomic(&self, path: &str, apply: AtomicUpdate) -> Result<Value, ForgeError> {
        // The read-modify-write happens under the state write lock, which
        // is what serializes concurrent run_atomic calls on one path.
        let next = {
            let mut s = self.state.write();
            let current = s.documents.get(path).cloned();
            let next = apply(current)?;
            if !next.is_object() {
                return Err(ForgeError::Persistence("document must be a JSON object".into()));
            }
            s.documents.insert(path.to_string(), next.clone());
            next
        };
        self.save().await?;
        Ok(next)
    }
}
