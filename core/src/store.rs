//! store.rs
//! One template file per user under a directory.
//!
//! Writes go to a temp file that is fsynced and renamed over the target, so
//! readers see either the old record or the new one. Writers serialize on a
//! per-user lock file. The lock names its owner (pid and creation time) and is
//! published with a hard link, so it is never observed half-written; a lock
//! whose owner is gone or that outlived `LOCK_STALE_SECS` is broken by the
//! next writer.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::constants::{LOCK_STALE_SECS, MAX_RECORD_LEN, TEMPLATE_EXTENSION};
use crate::crypto::HashAlg;
use crate::record::{decode_template, encode_template, RecordError, Template, Username};
use crate::types::NeuroError;
use crate::utils::now_millis;

static LOCK_SEQ: AtomicU64 = AtomicU64::new(0);

fn unique_suffix() -> String {
    format!("{}.{}", std::process::id(), LOCK_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// Contents of a lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LockOwner {
    pid: u32,
    created_ms: i64,
    seq: u64,
}

impl LockOwner {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            created_ms: now_millis(),
            seq: LOCK_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn encode(&self) -> String {
        format!("pid={}\ncreated={}\nseq={}\n", self.pid, self.created_ms, self.seq)
    }

    fn parse(text: &str) -> Option<Self> {
        let mut pid = None;
        let mut created_ms = None;
        let mut seq = None;
        for line in text.lines() {
            match line.split_once('=') {
                Some(("pid", v)) => pid = v.trim().parse().ok(),
                Some(("created", v)) => created_ms = v.trim().parse().ok(),
                Some(("seq", v)) => seq = v.trim().parse().ok(),
                _ => {}
            }
        }
        Some(Self { pid: pid?, created_ms: created_ms?, seq: seq? })
    }

    fn is_stale(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.created_ms) > LOCK_STALE_SECS * 1_000 || !process_alive(self.pid)
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// elsewhere only the age of the lock decides
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Exclusive writer lock for one username. Removed on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    username: Username,
    token: String,
}

impl StoreLock {
    pub fn username(&self) -> &Username {
        &self.username
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // only remove the file if it is still ours
        match fs::read_to_string(&self.path) {
            Ok(text) if text == self.token => {
                if let Err(e) = fs::remove_file(&self.path) {
                    warn!(path = %self.path.display(), error = %e, "failed to remove template lock");
                }
            }
            Ok(_) => warn!(path = %self.path.display(), "template lock was taken over while held"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "template lock vanished while held"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    alg: HashAlg,
}

impl TemplateStore {
    /// Store rooted at `dir`; records are sealed with `alg`.
    pub fn new(dir: impl Into<PathBuf>, alg: HashAlg) -> Self {
        Self { dir: dir.into(), alg }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn alg(&self) -> HashAlg {
        self.alg
    }

    /// Create the directory if missing.
    pub fn ensure_dir(&self) -> Result<(), NeuroError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// `<dir>/<username>.nlt`
    pub fn path_for(&self, username: &Username) -> PathBuf {
        self.dir.join(format!("{}.{}", username, TEMPLATE_EXTENSION))
    }

    fn lock_path(&self, username: &Username) -> PathBuf {
        self.dir.join(format!(".{}.lock", username))
    }

    fn temp_path(&self, username: &Username) -> PathBuf {
        self.dir.join(format!(".{}.{}.tmp", username, TEMPLATE_EXTENSION))
    }

    pub fn exists(&self, username: &Username) -> bool {
        self.path_for(username).is_file()
    }

    /// Take the writer lock for `username`, breaking it first if its
    /// owner is gone.
    pub fn lock(&self, username: &Username) -> Result<StoreLock, NeuroError> {
        self.ensure_dir()?;
        let path = self.lock_path(username);

        for _ in 0..2 {
            let owner = LockOwner::current();
            let token = owner.encode();
            match self.publish_lock(&path, &token) {
                Ok(()) => return Ok(StoreLock { path, username: username.clone(), token }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if !self.break_if_stale(&path)? {
                        break;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(NeuroError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("template for '{}' is locked by another writer", username),
        )))
    }

    /// Write the lock body to a private file, then hard-link it into place.
    /// The link fails with `AlreadyExists` while another lock is present.
    fn publish_lock(&self, path: &Path, token: &str) -> io::Result<()> {
        let tmp = self.dir.join(format!(".lock.{}.tmp", unique_suffix()));
        if let Err(e) = write_synced(&tmp, token.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        let linked = fs::hard_link(&tmp, path);
        let _ = fs::remove_file(&tmp);
        linked
    }

    /// Remove the lock at `path` if its owner is gone. `Ok(true)` means the
    /// caller may retry.
    fn break_if_stale(&self, path: &Path) -> Result<bool, NeuroError> {
        let seen = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => String::new(),
            Err(e) => return Err(e.into()),
        };
        let owner = LockOwner::parse(&seen);
        if let Some(o) = owner {
            if !o.is_stale(now_millis()) {
                return Ok(false);
            }
        }

        // move it aside first so a lock published meanwhile is not lost
        let aside = self.dir.join(format!(".lock.{}.stale", unique_suffix()));
        match fs::rename(path, &aside) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        }
        let moved = fs::read_to_string(&aside).unwrap_or_default();
        if moved != seen {
            if let Err(e) = fs::hard_link(&aside, path) {
                warn!(path = %path.display(), error = %e, "could not restore a live template lock");
            }
            let _ = fs::remove_file(&aside);
            return Ok(false);
        }
        fs::remove_file(&aside)?;
        warn!(
            path = %path.display(),
            pid = ?owner.map(|o| o.pid),
            "broke orphaned template lock"
        );
        Ok(true)
    }

    fn check_lock(lock: &StoreLock, username: &Username) -> Result<(), NeuroError> {
        if lock.username() != username {
            return Err(NeuroError::validation(format!(
                "lock held for '{}', not '{}'",
                lock.username(),
                username
            )));
        }
        Ok(())
    }

    /// Atomically write `template`. The caller must hold its lock.
    pub fn save(&self, template: &Template, lock: &StoreLock) -> Result<PathBuf, NeuroError> {
        Self::check_lock(lock, &template.username)?;
        let bytes = encode_template(template)?;

        let target = self.path_for(&template.username);
        let tmp = self.temp_path(&template.username);
        if let Err(e) = write_synced(&tmp, &bytes) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        sync_dir(&self.dir)?;

        debug!(user = %template.username, bytes = bytes.len(), "template written");
        Ok(target)
    }

    /// Read and decode the template for `username`.
    pub fn load(&self, username: &Username) -> Result<Template, NeuroError> {
        let path = self.path_for(username);
        let mut file = File::open(&path)?;
        let len = file.metadata()?.len();
        if len > MAX_RECORD_LEN {
            return Err(RecordError::TooLarge { len, max: MAX_RECORD_LEN }.into());
        }

        let mut buf = Zeroizing::new(Vec::new());
        buf.try_reserve_exact(len as usize)?;
        // one extra byte detects a file that grew since the metadata call
        Read::by_ref(&mut file).take(MAX_RECORD_LEN + 1).read_to_end(&mut buf)?;

        let template = decode_template(&buf, self.alg)?;
        if &template.username != username {
            return Err(RecordError::InvalidUsername(format!(
                "record names '{}', file is for '{}'",
                template.username, username
            ))
            .into());
        }
        debug!(user = %username, bytes = buf.len(), "template read");
        Ok(template)
    }

    /// Remove the template. Missing templates are an I/O `NotFound`.
    pub fn delete(&self, username: &Username) -> Result<(), NeuroError> {
        let _lock = self.lock(username)?;
        fs::remove_file(self.path_for(username))?;
        sync_dir(&self.dir)?;
        info!(user = %username, "template deleted");
        Ok(())
    }

    /// Usernames with a stored template, sorted. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<Username>, NeuroError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut users = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) || !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(user) = Username::parse(stem) {
                users.push(user);
            }
        }
        users.sort();
        Ok(users)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
