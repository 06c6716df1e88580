//! Query an Active Directory server for its organizational units and users.
//!
//! Two kinds of queries are offered. [`Ldap::get_tree`] lists every
//! organizational unit (OU) below the configured base and rebuilds their
//! hierarchy from the flat DNs the server returns. [`Ldap::find_users_by_ou`]
//! and [`Ldap::find_users_by_name`] return user records, each enriched with
//! the common names of its groups and with the password change and expiry
//! times converted to Unix timestamps.
//!
//! Every query runs on a connection of its own which is closed before the
//! query returns. The plain query methods collapse any failure to `None`
//! after logging it; the `try_` variants return the [`Error`] instead.
//!
//! For a general primer on LDAP, the [introduction] in the `ldap3` crate which
//! is used here for interfacing with LDAP is an excellent resource.
//!
//! [introduction]: https://github.com/inejge/ldap3/blob/master/LDAP-primer.md
//!
//! # Getting started
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use url::Url;
//! use ad_directory::{Config, ConnectionConfig, Ldap};
//!
//! // Configuration can also be deserialized with serde or read from the
//! // environment with `Config::from_env`. It's hand-constructed here for
//! // demonstration purposes.
//! let config = Config {
//!     url: Url::parse("ldap://127.0.0.1:389")?,
//!     connection: ConnectionConfig::default(),
//!     bind_dn: "ROUser".to_owned(),
//!     bind_password: "verysecret".to_owned(),
//!     base_dn: "dc=example,dc=local".to_owned(),
//! };
//! let client = Ldap::new(config);
//!
//! if let Some(tree) = client.get_tree().await {
//!     for ou in &tree.children {
//!         println!("{}", ou.name);
//!     }
//! }
//! for user in client.find_users_by_ou("level2,OU=level1").await.unwrap_or_default() {
//!     println!("{} is in {:?}", user.sam_account_name, user.groups);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//! * OUs are linked to their parent by name. Two OUs sharing a name at the
//!   same depth are merged, the first one seen keeps its place in the tree.
//! * Group memberships are looked up with one search per user and only cover
//!   direct memberships.
//! * Searches are unpaged unless [`ConnectionConfig::page_size`] is set.
//!   Active Directory returns at most 1000 entries for an unpaged search, so
//!   set it for larger directories.
//! * [secrecy](https://docs.rs/secrecy) is not used for storing the bind
//!   password, it probably should be

pub mod config;
pub mod entry;
pub mod error;
pub mod ldap;
pub mod tree;
pub mod user;

pub use ldap3::{self, SearchEntry};

pub use crate::{
	config::{Config, ConnectionConfig, TLSConfig},
	entry::SearchEntryExt,
	error::Error,
	ldap::{Connection, Directory, Ldap},
	tree::OrganizationalUnit,
	user::{filetime_to_unix, Group, User},
};
