use anyhow::Result;
use object_store::aws::{AmazonS3Builder, AmazonS3ConfigKey};
use object_store::{ObjectStore, local::LocalFileSystem, memory::InMemory};
use std::sync::Arc;
use url::Url;

use crate::config::{Configuration, ExportConfig};

/// Object stores one invocation reads from and writes to
#[derive(Clone, Debug)]
pub struct ObjectStores {
    pub needs: Arc<dyn ObjectStore>,
    pub deals: Arc<dyn ObjectStore>,
    pub export: Arc<dyn ObjectStore>,
}

impl ObjectStores {
    /// Create all object stores from configuration
    pub fn from_config(config: &Configuration) -> Result<Self> {
        Ok(Self {
            needs: create_object_store_from_dsn(&config.sources.needs_dsn)?,
            deals: create_object_store_from_dsn(&config.sources.deals_dsn)?,
            export: create_export_store(&config.export)?,
        })
    }
}

/// Create an object store from a DSN string
pub fn create_object_store_from_dsn(dsn: &str) -> Result<Arc<dyn ObjectStore>> {
    create_store(dsn, false)
}

/// Create the export store; S3 uploads are encrypted when configured
pub fn create_export_store(config: &ExportConfig) -> Result<Arc<dyn ObjectStore>> {
    create_store(&config.dsn, config.server_side_encryption)
}

fn create_store(dsn: &str, encrypt: bool) -> Result<Arc<dyn ObjectStore>> {
    let url =
        Url::parse(dsn).map_err(|e| anyhow::anyhow!("Invalid storage DSN '{}': {}", dsn, e))?;

    match url.scheme() {
        "file" => {
            let path = url.path();
            if path.is_empty() || path == "/" {
                return Err(anyhow::anyhow!(
                    "File DSN must specify a path: file:///path/to/storage"
                ));
            }
            // file:///.data/x is relative to the working directory
            let path = if path.starts_with("/.") {
                &path[1..]
            } else {
                path
            };
            std::fs::create_dir_all(path)?;
            Ok(Arc::new(LocalFileSystem::new_with_prefix(path)?))
        }
        "memory" => Ok(Arc::new(InMemory::new())),
        "s3" => {
            let mut builder = create_s3_builder_from_dsn(&url)?;
            if encrypt {
                builder = with_server_side_encryption(builder)?;
            }
            Ok(Arc::new(builder.build()?))
        }
        scheme => Err(anyhow::anyhow!(
            "Unsupported storage scheme: {}. Supported: file, memory, s3",
            scheme
        )),
    }
}

/// Region used when neither the DSN environment nor `AWS_REGION` names one
pub const DEFAULT_S3_REGION: &str = "ap-northeast-1";

/// Create an S3 builder from a DSN: `s3://[access_key:secret_key@]host[:port]/bucket`.
///
/// Credentials missing from the DSN come from the `AWS_*` environment.
/// Hosts outside `amazonaws.com` are treated as S3-compatible endpoints.
pub fn create_s3_builder_from_dsn(dsn: &Url) -> Result<AmazonS3Builder> {
    let host = dsn
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("Missing S3 host in DSN"))?;
    let bucket = dsn.path().trim_start_matches('/');
    if bucket.is_empty() {
        return Err(anyhow::anyhow!(
            "S3 DSN must specify a bucket: s3://host/bucket"
        ));
    }

    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
    if builder.get_config_value(&AmazonS3ConfigKey::Region).is_none() {
        builder = builder.with_region(DEFAULT_S3_REGION);
    }

    if !dsn.username().is_empty() {
        builder = builder
            .with_access_key_id(dsn.username())
            .with_secret_access_key(dsn.password().unwrap_or_default());
    }

    if !host.ends_with("amazonaws.com") {
        let scheme = if dsn.port() == Some(443) { "https" } else { "http" };
        let endpoint = match dsn.port() {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        };
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(scheme == "http")
            .with_virtual_hosted_style_request(false);
    }

    Ok(builder)
}

/// Encrypt objects with S3-managed keys unless the environment already
/// selected an encryption type
pub fn with_server_side_encryption(builder: AmazonS3Builder) -> Result<AmazonS3Builder> {
    let key: AmazonS3ConfigKey = SERVER_SIDE_ENCRYPTION_KEY.parse()?;
    if builder.get_config_value(&key).is_some() {
        return Ok(builder);
    }

    Ok(builder.with_config(key, SSE_S3))
}

const SERVER_SIDE_ENCRYPTION_KEY: &str = "aws_server_side_encryption";
const SSE_S3: &str = "AES256";
