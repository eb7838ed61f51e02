use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::error::AuthError;
use super::token::TokenRecord;

/// Storage abstraction for the persisted token record.
pub trait TokenStore: Send + Sync {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<TokenRecord>, AuthError>;
    fn save(&self, record: &TokenRecord) -> Result<(), AuthError>;
    /// Removing an absent record is not an error.
    fn clear(&self) -> Result<(), AuthError>;
}

/// File-backed token store writing a single JSON document.
///
/// # Example
/// ```no_run
/// use mstodo::auth::{FileTokenStore, TokenRecord, TokenStore};
/// use chrono::{Duration, Utc};
///
/// let store = FileTokenStore::new("/tmp/ms-todo-mcp/tokens.json");
/// let record = TokenRecord {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     expires_at: Utc::now() + Duration::hours(1),
/// };
/// store.save(&record)?;
/// # Ok::<(), mstodo::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(parent)?;
        Ok(())
    }

    /// Unique sibling of the token file used to stage a new record.
    fn staging_path(&self) -> Result<PathBuf, AuthError> {
        let name = self.path.file_name().ok_or_else(|| {
            AuthError::Storage(format!("token path {} has no file name", self.path.display()))
        })?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let mut staged = name.to_os_string();
        staged.push(format!(".{}.{stamp}.partial", std::process::id()));
        Ok(self.path.with_file_name(staged))
    }

    /// Stage `data` next to the token file, then rename it into place so
    /// readers never observe a half-written record.
    fn replace_contents(&self, data: &[u8]) -> Result<(), AuthError> {
        let staged = self.staging_path()?;
        let outcome =
            write_owner_only(&staged, data).and_then(|()| fs::rename(&staged, &self.path));
        if let Err(err) = outcome {
            let _ = fs::remove_file(&staged);
            return Err(AuthError::Storage(format!(
                "writing {}: {err}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(AuthError::Storage(format!(
                    "reading {}: {err}",
                    self.path.display()
                )))
            }
        };
        let record = serde_json::from_str(&raw).map_err(|err| {
            AuthError::Storage(format!("parsing {}: {err}", self.path.display()))
        })?;
        Ok(Some(record))
    }

    fn save(&self, record: &TokenRecord) -> Result<(), AuthError> {
        Self::ensure_parent(&self.path)?;
        let serialized = serde_json::to_vec_pretty(record)?;
        self.replace_contents(&serialized)
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Storage(format!(
                "removing {}: {err}",
                self.path.display()
            ))),
        }
    }
}

/// Create `path` readable by the owner only and flush `data` to disk.
fn write_owner_only(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path)?;
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileTokenStore) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("ms-todo-mcp").join("tokens.json"));
        (dir, store)
    }

    fn sample_record() -> TokenRecord {
        TokenRecord {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: (Utc::now() + Duration::hours(1)).trunc_subsecs(0),
        }
    }

    #[test]
    fn load_missing_file_returns_none() {
        let (_dir, store) = temp_store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn record_round_trip_works() {
        let (_dir, store) = temp_store();
        let record = sample_record();
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), Some(record));
    }

    #[test]
    fn save_overwrites_previous_record() {
        let (_dir, store) = temp_store();
        store.save(&sample_record()).unwrap();
        let mut second = sample_record();
        second.access_token = "second".to_string();
        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap().unwrap().access_token, "second");
    }

    #[test]
    fn clear_removes_record_and_is_idempotent() {
        let (_dir, store) = temp_store();
        store.save(&sample_record()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let (_dir, store) = temp_store();
        FileTokenStore::ensure_parent(store.path()).unwrap();
        fs::write(store.path(), "{not-json").unwrap();
        assert!(matches!(store.load(), Err(AuthError::Storage(_))));
    }

    #[test]
    fn persisted_json_uses_flat_field_names() {
        let (_dir, store) = temp_store();
        store.save(&sample_record()).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["access_token"], "access");
        assert_eq!(json["refresh_token"], "refresh");
        assert!(json["expires_at"].is_string());
    }

    #[test]
    fn save_leaves_only_the_token_file_behind() {
        let (_dir, store) = temp_store();
        store.save(&sample_record()).unwrap();
        store.save(&sample_record()).unwrap();
        let parent = store.path().parent().unwrap();
        let names: Vec<String> = fs::read_dir(parent)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["tokens.json".to_string()]);
    }

    #[test]
    fn save_fails_with_storage_error_when_parent_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("ms-todo-mcp");
        fs::write(&blocker, "not a directory").unwrap();
        let store = FileTokenStore::new(blocker.join("tokens.json"));

        match store.save(&sample_record()) {
            Err(AuthError::Storage(message)) => assert!(message.contains("tokens.json")),
            other => panic!("expected Storage error, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
    }

    #[test]
    fn failed_rename_removes_staged_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory at the target path makes the rename fail.
        let target = dir.path().join("tokens.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("occupant"), "x").unwrap();
        let store = FileTokenStore::new(&target);

        assert!(matches!(
            store.save(&sample_record()),
            Err(AuthError::Storage(_))
        ));
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["tokens.json".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn save_restricts_permissions_to_owner() {
        let (_dir, store) = temp_store();
        store.save(&sample_record()).unwrap();
        let file_mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(store.path().parent().unwrap())
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }
}
