//! Runtime configuration.
//!
//! Every setting can be given as a flag or through the environment, which is
//! how MCP hosts usually pass configuration to stdio servers.

use std::path::PathBuf;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_bedrockruntime::config::Credentials;
use clap::{Parser, ValueEnum};

use crate::error::{Error, Result};

/// Default Nova Canvas model identifier.
pub const DEFAULT_MODEL_ID: &str = "amazon.nova-canvas-v1:0";

/// How the server talks to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// Stateless `POST /mcp` on localhost
    Http,
}

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "nova-canvas-mcp", version, about)]
pub struct Config {
    /// Bedrock model identifier
    #[arg(long, env = "MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Named AWS profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Static access key id (requires --secret-access-key)
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    /// Static secret access key (requires --access-key-id)
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Directory for images saved without an explicit output path
    #[arg(long, env = "IMAGES_DIR", default_value = "images")]
    pub images_dir: PathBuf,

    /// Transport to serve on
    #[arg(long, env = "MCP_TRANSPORT", value_enum, default_value_t = TransportKind::Stdio)]
    pub transport: TransportKind,

    /// Port for the HTTP transport
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Seconds to wait for the model before giving up (0 waits forever)
    #[arg(long, env = "INVOKE_TIMEOUT_SECS", default_value_t = 300)]
    pub invoke_timeout_secs: u64,

    /// Never open saved images in the default viewer
    #[arg(long, env = "NOVA_CANVAS_NO_OPEN")]
    pub no_open: bool,
}

impl Config {
    /// Timeout for a single model invocation; `None` when disabled.
    pub fn invoke_timeout(&self) -> Option<Duration> {
        (self.invoke_timeout_secs > 0).then(|| Duration::from_secs(self.invoke_timeout_secs))
    }

    /// Static credentials, if a key pair was supplied.
    ///
    /// A key id without a secret (or the reverse) is rejected rather than
    /// silently falling back to the default chain.
    pub fn static_credentials(&self) -> Result<Option<Credentials>> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(key_id), Some(secret)) => Ok(Some(Credentials::new(
                key_id,
                secret,
                self.session_token.clone(),
                None,
                "environment",
            ))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(Error::Config(
                "AWS access key id given without a secret access key".to_string(),
            )),
            (None, Some(_)) => Err(Error::Config(
                "AWS secret access key given without an access key id".to_string(),
            )),
        }
    }

    /// Resolve the AWS SDK configuration.
    ///
    /// Explicit keys win, then the named profile, then the default provider
    /// chain.
    pub async fn aws_sdk_config(&self) -> Result<SdkConfig> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));

        if let Some(credentials) = self.static_credentials()? {
            loader = loader.credentials_provider(credentials);
        } else if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }

        Ok(loader.load().await)
    }
}
