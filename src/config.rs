use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::header::{quoted_define, trailing_define_token};

pub const SECRET_HEADER: &str = "include/secret.h";
pub const MAIN_SOURCE: &str = "src/main.cpp";
pub const VERSION_HEADER: &str = "include/version.h";
pub const FIRMWARE_BIN: &str = ".pio/build/nodemcu-32s/firmware.bin";
pub const CREDENTIALS_FILE: &str = "firebase-sdk.json";
pub const COUNTER_FILE: &str = "versioning";

pub const DATABASE_URL_KEY: &str = "DATABASE_URL";
pub const USER_EMAIL_KEY: &str = "USER_EMAIL";
pub const DEVICE_NAME_KEY: &str = "DEVICE_NAME";
pub const DEVICE_VERSION_KEY: &str = "DEVICE_VERSION";
pub const FIRMWARE_VERSION_KEY: &str = "FIRMWARE_VERSION";

/// Locations of every file the stamping and publishing steps read or write.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub secret_header: PathBuf,
    pub main_source: PathBuf,
    pub version_header: PathBuf,
    pub firmware_bin: PathBuf,
    pub credentials: PathBuf,
    pub counter_file: PathBuf,
}

impl ProjectLayout {
    /// Creates the default PlatformIO layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            secret_header: root.join(SECRET_HEADER),
            main_source: root.join(MAIN_SOURCE),
            version_header: root.join(VERSION_HEADER),
            firmware_bin: root.join(FIRMWARE_BIN),
            credentials: root.join(CREDENTIALS_FILE),
            counter_file: root.join(COUNTER_FILE),
            root,
        }
    }

    /// Resolves `path` against the project root unless it is already absolute
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    pub fn with_firmware_bin(mut self, path: impl AsRef<Path>) -> Self {
        self.firmware_bin = self.resolve(path);
        self
    }

    pub fn with_credentials(mut self, path: impl AsRef<Path>) -> Self {
        self.credentials = self.resolve(path);
        self
    }

    pub fn with_counter_file(mut self, path: impl AsRef<Path>) -> Self {
        self.counter_file = self.resolve(path);
        self
    }

    pub fn with_version_header(mut self, path: impl AsRef<Path>) -> Self {
        self.version_header = self.resolve(path);
        self
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Values that take precedence over anything found in the header files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub user_email: Option<String>,
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub database_url: String,
    pub user_email: String,
    pub device_name: String,
}

impl DeviceConfig {
    /// Reads the secrets header and the main source of the project
    pub fn load(layout: &ProjectLayout, overrides: &ConfigOverrides) -> DeployResult<Self> {
        let secret = read_or_empty(&layout.secret_header);
        let main_source = read_or_empty(&layout.main_source);
        Self::from_sources(&secret, &main_source, overrides)
    }

    /// Extracts the configuration from already loaded file contents.
    ///
    /// Fails with every absent key listed so the operator can fix them in one go.
    pub fn from_sources(
        secret: &str,
        main_source: &str,
        overrides: &ConfigOverrides,
    ) -> DeployResult<Self> {
        let database_url = overrides
            .database_url
            .clone()
            .or_else(|| quoted_define(secret, DATABASE_URL_KEY));
        let user_email = overrides
            .user_email
            .clone()
            .or_else(|| quoted_define(secret, USER_EMAIL_KEY));
        let device_name = overrides
            .device_name
            .clone()
            .or_else(|| quoted_define(main_source, DEVICE_NAME_KEY));

        if let Some(url) = &database_url {
            info!("Database URL: {}", url);
        }
        if let Some(email) = &user_email {
            info!("User email: {}", email);
        }
        if let Some(name) = &device_name {
            info!("Device name: {}", name);
        }

        match (database_url, user_email, device_name) {
            (Some(database_url), Some(user_email), Some(device_name)) => Ok(Self {
                database_url,
                user_email,
                device_name,
            }),
            (database_url, user_email, device_name) => {
                let missing = [
                    (DATABASE_URL_KEY, database_url.is_none()),
                    (USER_EMAIL_KEY, user_email.is_none()),
                    (DEVICE_NAME_KEY, device_name.is_none()),
                ]
                .into_iter()
                .filter(|(_, is_missing)| *is_missing)
                .map(|(key, _)| key.to_string())
                .collect();
                Err(DeployError::MissingConfig(missing))
            }
        }
    }
}

/// Version metadata of the build about to be published.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareVersion {
    pub version: String,
    pub build_number: String,
}

impl FirmwareVersion {
    pub fn load(path: &Path) -> DeployResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_header(&contents)
    }

    pub fn from_header(contents: &str) -> DeployResult<Self> {
        let version = quoted_define(contents, DEVICE_VERSION_KEY);
        let build_number = trailing_define_token(contents, FIRMWARE_VERSION_KEY);

        match (version, build_number) {
            (Some(version), Some(build_number)) => {
                info!("Firmware version: {}", version);
                info!("Build number: {}", build_number);
                Ok(Self {
                    version,
                    build_number,
                })
            }
            (version, build_number) => {
                let mut missing = Vec::new();
                if version.is_none() {
                    missing.push(DEVICE_VERSION_KEY.to_string());
                }
                if build_number.is_none() {
                    missing.push(FIRMWARE_VERSION_KEY.to_string());
                }
                Err(DeployError::MissingConfig(missing))
            }
        }
    }

    /// The build number as the integer written to the database
    pub fn build_number(&self) -> DeployResult<u64> {
        self.build_number
            .trim()
            .parse()
            .map_err(|_| DeployError::InvalidBuildNumber(self.build_number.clone()))
    }
}

fn read_or_empty(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        warn!("Could not read {}: {}", path.display(), e);
        String::new()
    })
}
