//! Config for the directory client.
use std::{
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

use ldap3::LdapConnSettings;
use rustls::{Certificate, ClientConfig, PrivateKey, RootCertStore};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Prefix of the environment variables read by [`Config::from_env`].
pub const ENV_PREFIX: &str = "AD_DIRECTORY";

/// Directory configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
	/// The URL to connect to the server with. Supports ldap, ldaps, and ldapi
	/// schemes
	pub url: Url,
	/// Connection settings.
	#[serde(default)]
	pub connection: ConnectionConfig,
	/// The DN of the read-only service account used for binding
	pub bind_dn: String,
	/// The password of the service account
	pub bind_password: String,
	/// The DN every search is rooted at, e.g. `dc=example,dc=local`. Relative
	/// bases passed to searches are prepended to it.
	pub base_dn: String,
}

impl Config {
	/// Load the configuration from `AD_DIRECTORY__*` environment variables.
	/// Nested keys are separated by a double underscore, so the connection
	/// timeout is read from `AD_DIRECTORY__CONNECTION__TIMEOUT`.
	pub fn from_env() -> Result<Self, Error> {
		let config = ::config::Config::builder()
			.add_source(
				::config::Environment::with_prefix(ENV_PREFIX)
					.prefix_separator("__")
					.separator("__")
					.try_parsing(true),
			)
			.build()?;
		Ok(config.try_deserialize()?)
	}
}

/// Configuration for how to connect to the LDAP server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
	/// Timeout to establish a connection in seconds.
	pub timeout: u64,

	/// LDAP operation timeout in seconds. For searches this applies per reply.
	pub operation_timeout: u64,

	/// If set, enables the [simple paged search control] and sets the page size
	/// to the given value. Active Directory refuses to return more than its
	/// `MaxPageSize` (1000 by default) entries for an unpaged search.
	///
	/// [simple paged search control]: https://www.rfc-editor.org/rfc/rfc2696.html
	pub page_size: Option<i32>,

	/// TLS config
	pub tls: TLSConfig,
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self { timeout: 10, operation_timeout: 30, page_size: None, tls: TLSConfig::default() }
	}
}

/// TLS Configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TLSConfig {
	/// Use StartTLS extended operation for establishing a secure connection,
	/// rather than TLS on a dedicated port.
	pub starttls: bool,

	/// Disable verification of TLS certificates
	pub no_tls_verify: bool,

	/// TLS root certificates path
	pub root_certificates_path: Option<PathBuf>,

	/// Path of the TLS client key to use for the connection
	pub client_key_path: Option<PathBuf>,

	/// Path of the TLS client certificate to use for the connection
	pub client_certificate_path: Option<PathBuf>,
}

impl ConnectionConfig {
	/// The per-operation timeout as a [`Duration`]
	#[must_use]
	pub fn operation_timeout(&self) -> Duration {
		Duration::from_secs(self.operation_timeout)
	}

	/// Create a [`LdapConnSettings`] based on this [`ConnectionConfig`]
	pub(crate) async fn to_settings(&self) -> Result<LdapConnSettings, Error> {
		let mut settings = LdapConnSettings::new();

		settings = settings.set_conn_timeout(Duration::from_secs(self.timeout));
		settings = settings.set_starttls(self.tls.starttls);
		settings = settings.set_no_tls_verify(self.tls.no_tls_verify);

		if let Some(client_config) = self.tls.client_config().await? {
			settings = settings.set_config(Arc::new(client_config));
		}
		Ok(settings)
	}
}

impl TLSConfig {
	/// Build a rustls client configuration from the configured certificate
	/// files. Returns `None` when no custom root certificates are configured,
	/// in which case ldap3 falls back to its built-in trust roots.
	async fn client_config(&self) -> Result<Option<ClientConfig>, Error> {
		let identity = match (&self.client_key_path, &self.client_certificate_path) {
			(Some(key_path), Some(cert_path)) => Some((key_path, cert_path)),
			(None, None) => None,
			_ => {
				return Err(Error::Invalid(
					"Both a client certificate and key file in PKCS8 format must be specified"
						.to_owned(),
				))
			}
		};

		let Some(root_path) = &self.root_certificates_path else {
			if identity.is_some() {
				return Err(Error::Invalid(
					"A client certificate requires root_certificates_path to be set".to_owned(),
				));
			}
			return Ok(None);
		};

		let mut roots = RootCertStore::empty();
		for certificate in read_certificates(root_path).await? {
			roots.add(&certificate)?;
		}

		let builder = ClientConfig::builder().with_safe_defaults().with_root_certificates(roots);
		let client_config = match identity {
			Some((key_path, cert_path)) => {
				let key = read_private_key(key_path).await?;
				builder.with_client_auth_cert(read_certificates(cert_path).await?, key)?
			}
			None => builder.with_no_client_auth(),
		};
		Ok(Some(client_config))
	}
}

/// Read all PEM encoded certificates from a file
async fn read_certificates(path: &Path) -> Result<Vec<Certificate>, Error> {
	let pem = tokio::fs::read(path).await?;
	let certificates = rustls_pemfile::certs(&mut pem.as_slice())?;
	if certificates.is_empty() {
		return Err(Error::Invalid(format!("No certificates found in {}", path.display())));
	}
	Ok(certificates.into_iter().map(Certificate).collect())
}

/// Read the first PKCS8 private key from a PEM file
async fn read_private_key(path: &Path) -> Result<PrivateKey, Error> {
	let pem = tokio::fs::read(path).await?;
	rustls_pemfile::pkcs8_private_keys(&mut pem.as_slice())?
		.into_iter()
		.next()
		.map(PrivateKey)
		.ok_or_else(|| {
			Error::Invalid(format!("No PKCS8 private key found in {}", path.display()))
		})
}
