//! Client for connecting to the directory and running the queries

use std::time::Duration;

use ldap3::{
	adapters::{Adapter, EntriesOnly, PagedResults},
	DerefAliases, LdapConnAsync, LdapResult, Scope, SearchEntry, SearchOptions,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::{
	config::Config,
	error::Error,
	tree::{OrganizationalUnit, OU_FILTER},
	user::{self, User, USER_FILTER},
};

/// Request no attributes at all, only the DNs of matching entries.
const NO_ATTRIBUTES: &str = "1.1";

/// Holds the configuration and provides the queries against the directory.
///
/// Every query opens its own connection, binds, runs its searches one after
/// another and closes the connection again, whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct Ldap {
	/// The configuration of the directory client.
	config: Config,
}

impl Ldap {
	/// Create a new [`Ldap`] with the given configuration.
	#[must_use]
	pub fn new(config: Config) -> Self {
		Ldap { config }
	}

	/// Build the tree of all OUs below the configured base. Returns `None` if
	/// the directory could not be queried; the cause is logged.
	pub async fn get_tree(&self) -> Option<OrganizationalUnit> {
		self.try_get_tree()
			.await
			.map_err(|err| error!("Building the OU tree failed: {err:?}"))
			.ok()
	}

	/// Build the tree of all OUs below the configured base.
	pub async fn try_get_tree(&self) -> Result<OrganizationalUnit, Error> {
		let mut connection = Connection::open(&self.config).await?;
		let result = connection.search("", OU_FILTER, &[NO_ATTRIBUTES]).await;
		connection.close().await;

		let entries = result?;
		debug!("Found {} OU entries", entries.len());
		Ok(OrganizationalUnit::from_dns(
			entries.iter().map(|entry| entry.dn.as_str()),
			&self.config.base_dn,
		))
	}

	/// Find all users below an OU, given relative to the configured base and
	/// without its leading `ou=`, e.g. `level2,OU=level1`. Returns `None` if
	/// the directory could not be queried; the cause is logged.
	pub async fn find_users_by_ou(&self, relative_ou: &str) -> Option<Vec<User>> {
		self.try_find_users_by_ou(relative_ou)
			.await
			.map_err(|err| error!("Listing the users of {relative_ou:?} failed: {err:?}"))
			.ok()
	}

	/// Find all users below an OU. See [`Ldap::find_users_by_ou`].
	pub async fn try_find_users_by_ou(&self, relative_ou: &str) -> Result<Vec<User>, Error> {
		self.users(&user::ou_base(relative_ou), USER_FILTER).await
	}

	/// Find all users whose account name or common name starts with
	/// `pattern`. Returns `None` if the directory could not be queried; the
	/// cause is logged.
	pub async fn find_users_by_name(&self, pattern: &str) -> Option<Vec<User>> {
		self.try_find_users_by_name(pattern)
			.await
			.map_err(|err| error!("Searching users named {pattern:?} failed: {err:?}"))
			.ok()
	}

	/// Find all users whose account name or common name starts with `pattern`.
	pub async fn try_find_users_by_name(&self, pattern: &str) -> Result<Vec<User>, Error> {
		self.users("", &user::name_filter(pattern)).await
	}

	/// Run a user search on a fresh connection
	async fn users(&self, relative_base: &str, filter: &str) -> Result<Vec<User>, Error> {
		let mut connection = Connection::open(&self.config).await?;
		let result = user::project_users(&mut connection, relative_base, filter).await;
		connection.close().await;
		result
	}
}

/// Subtree searches below the configured base DN.
#[allow(async_fn_in_trait)]
pub trait Directory {
	/// Search the subtree rooted at `relative_base` (relative to the base DN,
	/// empty for the base itself) for entries matching `filter`, returning
	/// only the given attributes.
	async fn search(
		&mut self,
		relative_base: &str,
		filter: &str,
		attributes: &[&str],
	) -> Result<Vec<SearchEntry>, Error>;
}

/// A bound connection to the directory server.
#[derive(Debug)]
pub struct Connection {
	/// Handle for issuing operations
	ldap: ldap3::Ldap,
	/// The task driving the connection
	driver: JoinHandle<()>,
	/// Suffix appended to every search base
	base_dn: String,
	/// Timeout applied to every operation
	operation_timeout: Duration,
	/// Page size for paged searches, unpaged if `None`
	page_size: Option<i32>,
}

impl Connection {
	/// Connect to the server at the configured URL and bind as the configured
	/// service account.
	pub async fn open(config: &Config) -> Result<Self, Error> {
		let settings = config.connection.to_settings().await?;
		let (conn, ldap) = LdapConnAsync::from_url_with_settings(settings, &config.url)
			.await
			.map_err(Error::Connection)?;
		let driver = tokio::spawn(async move {
			if let Err(err) = conn.drive().await {
				warn!("Ldap connection error {err}");
			}
		});

		let mut connection = Connection {
			ldap,
			driver,
			base_dn: config.base_dn.clone(),
			operation_timeout: config.connection.operation_timeout(),
			page_size: config.connection.page_size,
		};
		debug!("Binding to {} as {}", config.url, config.bind_dn);
		if let Err(err) = connection.bind(&config.bind_dn, &config.bind_password).await {
			connection.close().await;
			return Err(err);
		}
		Ok(connection)
	}

	/// Perform a simple bind
	async fn bind(&mut self, dn: &str, password: &str) -> Result<(), Error> {
		self.ldap
			.with_timeout(self.operation_timeout)
			.simple_bind(dn, password)
			.await
			.and_then(LdapResult::success)
			.map_err(Error::Bind)?;
		Ok(())
	}

	/// Unbind and wait for the connection to shut down
	pub async fn close(mut self) {
		if let Err(err) = self.ldap.unbind().await {
			debug!("Unbinding failed: {err}");
		}
		if let Err(err) = self.driver.await {
			warn!("Failed to join background task: {err}");
		}
	}
}

impl Directory for Connection {
	async fn search(
		&mut self,
		relative_base: &str,
		filter: &str,
		attributes: &[&str],
	) -> Result<Vec<SearchEntry>, Error> {
		let base = search_base(relative_base, &self.base_dn);
		debug!("Searching {base} for {filter}");

		// Search references are only continuation hints, not entries
		let mut adapters: Vec<Box<dyn Adapter<_, _>>> = vec![Box::new(EntriesOnly::new())];
		if let Some(page_size) = self.page_size {
			adapters.push(Box::new(PagedResults::new(page_size)));
		}
		let attributes: Vec<String> = attributes.iter().map(ToString::to_string).collect();

		let mut search = self
			.ldap
			.with_search_options(SearchOptions::new().deref(DerefAliases::Never))
			.with_timeout(self.operation_timeout)
			.streaming_search_with(adapters, &base, Scope::Subtree, filter, attributes)
			.await
			.map_err(Error::Search)?;

		let mut entries = Vec::new();
		while let Some(entry) = search.next().await.map_err(Error::Search)? {
			entries.push(SearchEntry::construct(entry));
		}
		search.finish().await.success().map_err(Error::Search)?;
		Ok(entries)
	}
}

/// Prepend a relative base to the base DN
fn search_base(relative_base: &str, base_dn: &str) -> String {
	if relative_base.is_empty() {
		base_dn.to_owned()
	} else {
		format!("{relative_base},{base_dn}")
	}
}

#[cfg(test)]
mod tests {
	use super::search_base;

	#[test]
	fn search_base_prepends_relative_part() {
		assert_eq!(search_base("", "dc=example,dc=local"), "dc=example,dc=local");
		assert_eq!(
			search_base("ou=level2,OU=level1", "dc=example,dc=local"),
			"ou=level2,OU=level1,dc=example,dc=local"
		);
	}
}
