//! Build number bookkeeping and `version.h` generation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::ProjectLayout;

pub const DEFAULT_VERSION_PREFIX: &str = "0.3.";

/// Plain-text file holding the last build number.
///
/// Read-modify-write with no locking: concurrent stamping of the same
/// project is not supported.
#[derive(Debug, Clone)]
pub struct BuildCounter {
    path: PathBuf,
}

impl BuildCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last persisted build number, `None` when the file is missing or unparseable
    pub fn read(&self) -> Option<u128> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        contents.lines().next()?.trim().parse().ok()
    }

    /// Last persisted build number, or 0 when it cannot be read
    pub fn current(&self) -> u128 {
        self.read().unwrap_or(0)
    }

    pub fn store(&self, build_number: u128) -> Result<()> {
        write_creating_parent(&self.path, &build_number.to_string())
            .with_context(|| format!("Failed to write build counter {}", self.path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionHeader {
    pub build_number: u128,
    pub version: String,
}

impl VersionHeader {
    pub fn new(prefix: &str, build_number: u128) -> Self {
        Self {
            build_number,
            version: format!("{}{}", prefix, build_number),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "\n#ifndef FIRMWARE_VERSION\n  #define FIRMWARE_VERSION {}\n#endif\n#ifndef DEVICE_VERSION\n  #define DEVICE_VERSION \"{}\"\n#endif\n",
            self.build_number, self.version
        )
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_creating_parent(path, &self.render())
            .with_context(|| format!("Failed to write version header {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct VersionStamper {
    counter: BuildCounter,
    header_path: PathBuf,
    prefix: String,
}

impl VersionStamper {
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            counter: BuildCounter::new(&layout.counter_file),
            header_path: layout.version_header.clone(),
            prefix: DEFAULT_VERSION_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Bumps the build counter and regenerates the version header.
    ///
    /// Never fails: write errors are logged and the computed header is still returned.
    pub fn stamp(&self) -> VersionHeader {
        let build_number = match self.counter.read() {
            Some(previous) => previous.checked_add(1).unwrap_or_else(|| {
                error!(
                    "Build counter {} is at its maximum, starting from 1",
                    self.counter.path().display()
                );
                1
            }),
            None => {
                if self.counter.path().exists() {
                    warn!(
                        "Build counter {} is not a number",
                        self.counter.path().display()
                    );
                }
                info!("Starting build number from 1..");
                1
            }
        };

        match self.counter.store(build_number) {
            Ok(()) => info!("Build number: {}", build_number),
            Err(e) => error!("{:#}", e),
        }

        let header = VersionHeader::new(&self.prefix, build_number);
        match header.write(&self.header_path) {
            Ok(()) => info!(
                "Wrote {} ({})",
                self.header_path.display(),
                header.version
            ),
            Err(e) => error!("{:#}", e),
        }

        header
    }
}

fn write_creating_parent(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)
}
