//! Error codes

/// Errors that can occur when using this library
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// The directory server could not be reached.
	#[error("Connecting to the directory server failed")]
	Connection(#[source] ldap3::LdapError),
	/// The server rejected the configured service account credentials.
	#[error("Binding as the search user failed")]
	Bind(#[source] ldap3::LdapError),
	/// A search request was malformed or the server failed to answer it.
	#[error("Search failed")]
	Search(#[source] ldap3::LdapError),
	/// The contents of an attribute or a configuration value did not conform
	/// to the expected syntax.
	#[error("Malformed data: {0}")]
	Invalid(String),
	/// Reading a file referenced by the configuration failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
	/// The configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ::config::ConfigError),
	/// rustls refused the supplied certificate material.
	#[error(transparent)]
	Tls(#[from] rustls::Error),
}
