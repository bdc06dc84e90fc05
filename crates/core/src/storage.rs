//! Key-value storage backends for the local session registry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Minimal string key-value store, modelled on browser local storage.
pub trait Storage: Send + Sync {
	fn get_item(&self, key: &str) -> Result<Option<String>>;

	fn set_item(&self, key: &str, value: &str) -> Result<()>;

	/// Removes `key`; removing a missing key is not an error.
	fn remove_item(&self, key: &str) -> Result<()>;
}

/// Process-local storage, used by tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Storage for MemoryStorage {
	fn get_item(&self, key: &str) -> Result<Option<String>> {
		Ok(self.items.lock().get(key).cloned())
	}

	fn set_item(&self, key: &str, value: &str) -> Result<()> {
		self.items.lock().insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove_item(&self, key: &str) -> Result<()> {
		self.items.lock().remove(key);
		Ok(())
	}
}

/// Directory-backed storage: one `<key>.json` file per item.
#[derive(Debug, Clone)]
pub struct FileStorage {
	dir: PathBuf,
}

impl FileStorage {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn item_path(&self, key: &str) -> Result<PathBuf> {
		if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
			return Err(Error::InvalidArgument(format!("unsupported storage key {key:?}")));
		}
		Ok(self.dir.join(format!("{key}.json")))
	}
}

impl Storage for FileStorage {
	fn get_item(&self, key: &str) -> Result<Option<String>> {
		let path = self.item_path(key)?;
		match fs::read_to_string(&path) {
			Ok(content) => Ok(Some(content)),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(err) => Err(err.into()),
		}
	}

	fn set_item(&self, key: &str, value: &str) -> Result<()> {
		let path = self.item_path(key)?;
		fs::create_dir_all(&self.dir)?;

		// Write-then-rename so readers never observe a half-written registry.
		let tmp = path.with_extension("json.tmp");
		fs::write(&tmp, value)?;
		fs::rename(&tmp, &path)?;
		Ok(())
	}

	fn remove_item(&self, key: &str) -> Result<()> {
		let path = self.item_path(key)?;
		match fs::remove_file(path) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}
