//! Line-oriented `.env` file used as both a configuration source and the
//! place where workflow results (agent ID, request hash) are recorded.
//!
//! Reads go through `dotenvy`'s parser. Writes touch exactly one line and
//! leave every other byte of the file as it was, then replace the file
//! atomically, keeping its permissions and any symlink pointing at it.
//! There is no locking: one writer per file.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Get/set access to persisted key-value pairs.
pub trait KeyValueStore {
    /// Current value of `key`, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Record `key=value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented or persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<Update>;
}

/// What [`KeyValueStore::set`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// An existing `KEY=` line was rewritten.
    Replaced,
    /// The existing line already held exactly this value; nothing was written.
    Unchanged,
    /// The key was absent and a new line was added at the end.
    Appended,
    /// There is no file; nothing was created.
    FileMissing,
}

/// A `.env` file loaded into memory.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    /// Raw file text; `None` when the file does not exist.
    content: Option<String>,
    values: HashMap<String, String>,
}

impl EnvFile {
    /// Load `path`. A missing file yields an empty store that refuses writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no env file");
            return Ok(Self {
                path,
                content: None,
                values: HashMap::new(),
            });
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let values = parse(&content).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), keys = values.len(), "loaded env file");
        Ok(Self {
            path,
            content: Some(content),
            values,
        })
    }

    /// Location of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file existed when loaded.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.content.is_some()
    }
}

impl KeyValueStore for EnvFile {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<Update> {
        if value.contains(['\n', '\r']) {
            bail!("value for {key} spans multiple lines");
        }
        let Some(content) = &self.content else {
            return Ok(Update::FileMissing);
        };

        let (rewritten, update) = rewrite(content, key, value);
        if update != Update::Unchanged {
            write_atomic(&self.path, &rewritten)?;
            tracing::info!(path = %self.path.display(), key, ?update, "env file updated");
        }
        self.content = Some(rewritten);
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(update)
    }
}

/// Parse dotenv text. A key that appears twice keeps its first value, the
/// same line [`rewrite`] replaces.
fn parse(content: &str) -> Result<HashMap<String, String>> {
    let mut values = HashMap::new();
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (key, value) = item?;
        values.entry(key).or_insert(value);
    }
    Ok(values)
}

/// Replace the first `KEY=...` line of `content`, or append one.
///
/// Line endings of the replaced line are kept, so CRLF files stay CRLF.
fn rewrite(content: &str, key: &str, value: &str) -> (String, Update) {
    let replacement = format!("{key}={value}");
    let prefix = format!("{key}=");
    let mut out = String::with_capacity(content.len() + replacement.len() + 1);
    let mut update = None;

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        if update.is_none() && body.starts_with(&prefix) {
            update = Some(if body == replacement {
                Update::Unchanged
            } else {
                Update::Replaced
            });
            out.push_str(&replacement);
            out.push_str(line.strip_prefix(body).unwrap_or_default());
        } else {
            out.push_str(line);
        }
    }

    if let Some(update) = update {
        return (out, update);
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&replacement);
    out.push('\n');
    (out, Update::Appended)
}

/// Replace the file behind `path` with `content`.
///
/// Symlinks are resolved first so the link itself survives, and the new file
/// gets the old file's permissions before any content is written to it.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let target =
        std::fs::canonicalize(path).with_context(|| format!("resolving {}", path.display()))?;
    let permissions = std::fs::metadata(&target)
        .with_context(|| format!("reading metadata of {}", target.display()))?
        .permissions();

    let mut tmp = OsString::from(target.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file =
        File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    file.set_permissions(permissions)
        .with_context(|| format!("setting permissions on {}", tmp.display()))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("writing {}", tmp.display()))?;
    drop(file);

    std::fs::rename(&tmp, &target)
        .with_context(|| format!("renaming {} to {}", tmp.display(), target.display()))?;
    Ok(())
}
