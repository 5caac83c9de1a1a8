use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

pub const DATA_FILE: &str = "todos.json";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Where the serialized task list lives. The contract is a single string
/// blob under one fixed slot: `load` answers `Ok(None)` when nothing has
/// been stored yet, and `store` replaces the whole value.
pub trait Backend: Send {
    fn load(&self) -> Result<Option<String>, StorageError>;
    fn store(&self, blob: &str) -> Result<(), StorageError>;
}

/// File-backed blob at `<root>/todos.json`. Writes go through a temp file
/// and a rename so a crash mid-write never leaves a half blob behind.
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn data_path(&self) -> PathBuf {
        self.root.join(DATA_FILE)
    }
}

impl Backend for FileBackend {
    fn load(&self) -> Result<Option<String>, StorageError> {
        let mut file = match File::open(self.data_path()) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn store(&self, blob: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        let path = self.data_path();
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(blob.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

/// In-process blob slot. Stands in for browser local storage when the
/// widget is embedded without a filesystem, and doubles as the test backend.
#[derive(Default)]
pub struct MemoryBackend {
    blob: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }
}

impl Backend for MemoryBackend {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.blob.lock().expect("blob poisoned").clone())
    }

    fn store(&self, blob: &str) -> Result<(), StorageError> {
        *self.blob.lock().expect("blob poisoned") = Some(blob.to_string());
        Ok(())
    }
}
