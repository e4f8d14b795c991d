// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Where the image optimizer's content cache keeps its hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStorageMode {
    /// Store hashes in a file (`.assetdag/hashes`), surviving restarts.
    File,
    /// Store hashes in memory only (lost on restart).
    Memory,
}

impl Default for CacheStorageMode {
    fn default() -> Self {
        CacheStorageMode::File
    }
}

/// Device profile requested from the remote page-speed auditor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStrategy {
    Mobile,
    Desktop,
}

impl Default for AuditStrategy {
    fn default() -> Self {
        AuditStrategy::Mobile
    }
}

impl AuditStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStrategy::Mobile => "mobile",
            AuditStrategy::Desktop => "desktop",
        }
    }
}

impl fmt::Display for AuditStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A screenshot viewport, written `WIDTHxHEIGHT` in config (e.g. `1280x800`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid viewport '{s}' (expected WIDTHxHEIGHT)"))?;
        let width = w
            .parse::<u32>()
            .map_err(|_| format!("invalid viewport width in '{s}'"))?;
        let height = h
            .parse::<u32>()
            .map_err(|_| format!("invalid viewport height in '{s}'"))?;
        if width == 0 || height == 0 {
            return Err(format!("viewport '{s}' must have non-zero dimensions"));
        }
        Ok(Viewport { width, height })
    }
}
