//! The firmware publishing workflow: resolve the device, upload the build, request OTA

use tracing::info;

use crate::config::{ConfigOverrides, DeviceConfig, FirmwareVersion, ProjectLayout};
use crate::db_client::{DatabaseConfig, RealtimeDbClient};
use crate::devices::{resolve_device_path, DevicePath, OTA_COMMAND};
use crate::error::{DeployError, DeployResult};
use crate::firmware::FirmwareArtifact;
use crate::identity::{IdentityClient, ServiceAccount, TokenSource, IDENTITY_TOOLKIT_URL};

/// How the publisher authenticates.
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// Pre-issued OAuth2 access token; the service account file is used when absent
    pub access_token: Option<String>,
    /// Required with `access_token`, overrides the service account's project otherwise
    pub project_id: Option<String>,
    pub identity_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PublishReport {
    pub device_path: DevicePath,
    pub version: String,
    pub build_number: u64,
    pub firmware_size: usize,
    pub encoded_size: usize,
}

#[derive(Debug, Clone)]
pub struct FirmwarePublisher {
    layout: ProjectLayout,
    overrides: ConfigOverrides,
    auth: AuthOptions,
}

impl FirmwarePublisher {
    pub fn new(layout: ProjectLayout) -> Self {
        Self {
            layout,
            overrides: ConfigOverrides::default(),
            auth: AuthOptions::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_auth(mut self, auth: AuthOptions) -> Self {
        self.auth = auth;
        self
    }

    fn token_source(&self) -> DeployResult<TokenSource> {
        if let Some(access_token) = &self.auth.access_token {
            let project_id = self.auth.project_id.clone().ok_or_else(|| {
                DeployError::Credentials("a project id is required with an access token".to_string())
            })?;
            return Ok(TokenSource::Static {
                access_token: access_token.clone(),
                project_id,
            });
        }

        let mut account = ServiceAccount::from_file(&self.layout.credentials)?;
        if let Some(project_id) = &self.auth.project_id {
            account.project_id = project_id.clone();
        }
        Ok(TokenSource::ServiceAccount(account))
    }

    /// Runs every stage in order; the first failure aborts the remaining ones.
    pub async fn publish(&self) -> DeployResult<PublishReport> {
        let config = DeviceConfig::load(&self.layout, &self.overrides)?;

        let source = self.token_source()?;
        let identity_url = self
            .auth
            .identity_url
            .clone()
            .unwrap_or_else(|| IDENTITY_TOOLKIT_URL.to_string());
        let mut identity = IdentityClient::new(source)?.with_identity_url(identity_url);
        let uid = identity.get_uid_by_email(&config.user_email).await?;
        let access_token = identity.access_token().await?;

        let db = RealtimeDbClient::new(DatabaseConfig::new(&config.database_url, access_token)?)?;
        let records = db.get(&uid).await?;
        let device_path = resolve_device_path(&uid, &records, &config.device_name)?;

        let version = FirmwareVersion::load(&self.layout.version_header)?;
        let build_number = version.build_number()?;

        let artifact = FirmwareArtifact::load(&self.layout.firmware_bin)?;

        let bin_path = device_path.firmware_bin();
        db.set(&device_path.firmware_version(), &build_number).await?;
        db.set(&bin_path, artifact.encoded()).await?;
        info!("Firmware uploaded to {}", bin_path);

        db.set(&device_path.restart(), OTA_COMMAND).await?;
        info!("OTA request sent to the device");

        Ok(PublishReport {
            device_path,
            version: version.version,
            build_number,
            firmware_size: artifact.size,
            encoded_size: artifact.encoded().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_access_token_requires_project_id() {
        let dir = TempDir::new().unwrap();
        let publisher = FirmwarePublisher::new(ProjectLayout::new(dir.path())).with_auth(AuthOptions {
            access_token: Some("token".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            publisher.token_source(),
            Err(DeployError::Credentials(_))
        ));
    }

    #[test]
    fn test_missing_credentials_file() {
        let dir = TempDir::new().unwrap();
        let publisher = FirmwarePublisher::new(ProjectLayout::new(dir.path()));
        assert!(matches!(
            publisher.token_source(),
            Err(DeployError::Credentials(_))
        ));
    }

    #[test]
    fn test_static_token_source() {
        let dir = TempDir::new().unwrap();
        let publisher = FirmwarePublisher::new(ProjectLayout::new(dir.path())).with_auth(AuthOptions {
            access_token: Some("token".to_string()),
            project_id: Some("garden-test".to_string()),
            identity_url: None,
        });
        let source = publisher.token_source().unwrap();
        assert_eq!(source.project_id(), "garden-test");
    }
}
