//! Helpers for tests that touch process-wide environment variables.

use std::ffi::{OsStr, OsString};
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that read or write the environment. A poisoned lock
/// is recovered so one failing test doesn't cascade.
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Sets variables and restores their previous values on drop. Hold
/// [`lock_env`] for as long as this lives.
#[derive(Default)]
pub struct ScopedEnv {
    saved: Vec<(OsString, Option<OsString>)>,
}

impl ScopedEnv {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&mut self, key: &OsStr) {
        if !self.saved.iter().any(|(k, _)| k == key) {
            self.saved.push((key.to_owned(), std::env::var_os(key)));
        }
    }

    pub fn set(&mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
        self.remember(key.as_ref());
        unsafe { std::env::set_var(key, value) };
    }

    pub fn remove(&mut self, key: impl AsRef<OsStr>) {
        self.remember(key.as_ref());
        unsafe { std::env::remove_var(key) };
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => unsafe { std::env::set_var(&key, v) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}
