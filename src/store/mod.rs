// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable session storage.
//!
//! The original client kept its session in the browser's localStorage under
//! the keys `accessToken`, `refreshToken` and `displayName`. This is the
//! native equivalent: one file per key under a scoped directory, written
//! synchronously so a committed login survives a crash. An in-memory
//! variant backs the tests.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{ApiError, Result};

const ACCESS_TOKEN_KEY: &str = "accessToken";
const REFRESH_TOKEN_KEY: &str = "refreshToken";
const DISPLAY_NAME_KEY: &str = "displayName";

/// Access/refresh token pair issued at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
enum Backing {
    Disk(PathBuf),
    Memory(Arc<Mutex<HashMap<String, String>>>),
}

/// Scoped key-value cell for session credentials.
///
/// Reads and writes are immediate and synchronous from the caller's
/// perspective; there is no caching layer on top.
#[derive(Clone)]
pub struct TokenStore {
    backing: Backing,
}

impl TokenStore {
    /// Open a disk-backed store rooted at `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| ApiError::Storage(format!("create {}: {}", dir.display(), e)))?;
        Ok(Self {
            backing: Backing::Disk(dir),
        })
    }

    /// Volatile store for tests.
    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    /// The stored token pair, or `None` when either half is missing.
    pub fn get(&self) -> Option<TokenPair> {
        let access_token = self.read(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.read(REFRESH_TOKEN_KEY)?;
        Some(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn set(&self, pair: &TokenPair) -> Result<()> {
        self.write(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.write(REFRESH_TOKEN_KEY, &pair.refresh_token)
    }

    /// Remove both tokens. The cached display name stays: the original
    /// client only clears the credential keys on logout.
    pub fn clear(&self) {
        self.delete(ACCESS_TOKEN_KEY);
        self.delete(REFRESH_TOKEN_KEY);
    }

    /// Cached display name from a previous profile fetch, if any.
    pub fn display_name(&self) -> Option<String> {
        self.read(DISPLAY_NAME_KEY)
    }

    pub fn set_display_name(&self, name: &str) -> Result<()> {
        self.write(DISPLAY_NAME_KEY, name)
    }

    fn read(&self, key: &str) -> Option<String> {
        match &self.backing {
            Backing::Disk(dir) => fs::read_to_string(dir.join(key))
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            Backing::Memory(map) => map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned(),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        match &self.backing {
            Backing::Disk(dir) => fs::write(dir.join(key), value)
                .map_err(|e| ApiError::Storage(format!("write {}: {}", key, e))),
            Backing::Memory(map) => {
                map.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    fn delete(&self, key: &str) {
        match &self.backing {
            Backing::Disk(dir) => {
                let _ = fs::remove_file(dir.join(key));
            }
            Backing::Memory(map) => {
                map.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(key);
            }
        }
    }
}
