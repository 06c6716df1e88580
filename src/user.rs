//! User records and their projection from directory entries.
use ldap3::{ldap_escape, SearchEntry};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{entry::SearchEntryExt, error::Error, ldap::Directory};

/// Seconds between 1601-01-01, the origin of Active Directory timestamps, and
/// the Unix epoch.
const EPOCH_OFFSET: i64 = 11_644_473_600;

/// Active Directory timestamps count 100 nanosecond intervals.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Search filter matching every user object below a base.
pub(crate) const USER_FILTER: &str = "(objectClass=user)";

/// Filter locating the builtin container carrying the domain password policy.
const BUILTIN_FILTER: &str = "(cn=Builtin)";

/// Attribute holding the maximum password age of the domain
const MAX_PWD_AGE: &str = "maxPwdAge";

/// Attributes requested for every user.
const USER_ATTRIBUTES: &[&str] = &[
	"sAMAccountName",
	"cn",
	"description",
	"displayName",
	"givenName",
	"homeDrive",
	"initials",
	"name",
	"physicalDeliveryOfficeName",
	"postOfficeBox",
	"profilePath",
	"title",
	"userPrincipalName",
	"mail",
	"company",
	"department",
	"homePhone",
	"l",
	"city",
	"manager",
	"mobile",
	"pwdLastSet",
	"postalCode",
	"st",
	"streetAddress",
	"telephoneNumber",
	"scriptPath",
];

/// Attributes requested for groups when resolving memberships.
const GROUP_ATTRIBUTES: &[&str] = &["cn", "sAMAccountName"];

/// Convert an Active Directory timestamp (100ns intervals since 1601) to Unix
/// seconds. The division truncates toward zero.
#[must_use]
pub fn filetime_to_unix(ticks: i64) -> i64 {
	ticks / TICKS_PER_SECOND - EPOCH_OFFSET
}

/// A user as stored in the directory, with its group memberships resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	/// Distinguished name of the user entry
	pub dn: String,
	/// Common name
	pub cn: String,
	/// Pre-Windows 2000 logon name
	pub sam_account_name: String,
	/// Free-form description
	pub description: String,
	/// Display name
	pub display_name: String,
	/// First name
	pub given_name: String,
	/// Initials
	pub initials: String,
	/// Drive letter the home directory is mapped to
	pub home_drive: String,
	/// Relative name of the entry
	pub name: String,
	/// Office location
	pub physical_delivery_office_name: String,
	/// Post office box
	pub post_office_box: String,
	/// Roaming profile path
	pub profile_path: String,
	/// Job title
	pub title: String,
	/// Logon name in `user@domain` form
	pub user_principal_name: String,
	/// Email address
	pub mail: String,
	/// Company
	pub company: String,
	/// Department
	pub department: String,
	/// Home phone number
	pub home_phone: String,
	/// Locality
	pub l: String,
	/// City
	pub city: String,
	/// DN of the user's manager
	pub manager: String,
	/// Mobile phone number
	pub mobile: String,
	/// Unix timestamp of the last password change
	pub pwd_last_set: String,
	/// Unix timestamp at which the current password expires
	pub pwd_expires: String,
	/// Postal code
	pub postal_code: String,
	/// State or province
	pub st: String,
	/// Street address
	pub street_address: String,
	/// Office phone number
	pub telephone_number: String,
	/// Common names of the groups the user is a direct member of
	pub groups: Vec<String>,
	/// Logon script path
	pub script_path: String,
}

impl User {
	/// Converts a [`SearchEntry`] for a user object to a [`User`]. Missing
	/// attributes become empty strings. `max_pwd_age` is the domain's
	/// `maxPwdAge`, in the same (negative) 100ns units the directory uses.
	/// Groups are left empty.
	#[must_use]
	pub fn from_entry(entry: &SearchEntry, max_pwd_age: i64) -> Self {
		let pwd_last_set = match entry.i64_first("pwdLastSet") {
			Some(Ok(ticks)) => ticks,
			Some(Err(err)) => {
				debug!("Treating pwdLastSet of {} as 0: {err}", entry.dn);
				0
			}
			None => 0,
		};
		let pwd_expires = pwd_last_set.saturating_sub(max_pwd_age);

		Self {
			dn: entry.dn.clone(),
			cn: entry.attr_or_empty("cn"),
			sam_account_name: entry.attr_or_empty("sAMAccountName"),
			description: entry.attr_or_empty("description"),
			display_name: entry.attr_or_empty("displayName"),
			given_name: entry.attr_or_empty("givenName"),
			initials: entry.attr_or_empty("initials"),
			home_drive: entry.attr_or_empty("homeDrive"),
			name: entry.attr_or_empty("name"),
			physical_delivery_office_name: entry.attr_or_empty("physicalDeliveryOfficeName"),
			post_office_box: entry.attr_or_empty("postOfficeBox"),
			profile_path: entry.attr_or_empty("profilePath"),
			title: entry.attr_or_empty("title"),
			user_principal_name: entry.attr_or_empty("userPrincipalName"),
			mail: entry.attr_or_empty("mail"),
			company: entry.attr_or_empty("company"),
			department: entry.attr_or_empty("department"),
			home_phone: entry.attr_or_empty("homePhone"),
			l: entry.attr_or_empty("l"),
			city: entry.attr_or_empty("city"),
			manager: entry.attr_or_empty("manager"),
			mobile: entry.attr_or_empty("mobile"),
			pwd_last_set: filetime_to_unix(pwd_last_set).to_string(),
			pwd_expires: filetime_to_unix(pwd_expires).to_string(),
			postal_code: entry.attr_or_empty("postalCode"),
			st: entry.attr_or_empty("st"),
			street_address: entry.attr_or_empty("streetAddress"),
			telephone_number: entry.attr_or_empty("telephoneNumber"),
			groups: Vec::new(),
			script_path: entry.attr_or_empty("scriptPath"),
		}
	}

	/// The time of the last password change
	#[must_use]
	pub fn password_last_set_at(&self) -> Option<OffsetDateTime> {
		unix_to_datetime(&self.pwd_last_set)
	}

	/// The time at which the current password expires
	#[must_use]
	pub fn password_expires_at(&self) -> Option<OffsetDateTime> {
		unix_to_datetime(&self.pwd_expires)
	}
}

/// Parse a stringified Unix timestamp
fn unix_to_datetime(timestamp: &str) -> Option<OffsetDateTime> {
	OffsetDateTime::from_unix_timestamp(timestamp.parse().ok()?).ok()
}

/// A group a user is a member of
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
	/// Distinguished name of the group entry
	pub dn: String,
	/// Common name
	pub cn: String,
	/// Pre-Windows 2000 group name
	pub sam_account_name: String,
}

impl Group {
	/// Converts a [`SearchEntry`] for a group object to a [`Group`]
	#[must_use]
	pub fn from_entry(entry: &SearchEntry) -> Self {
		Self {
			dn: entry.dn.clone(),
			cn: entry.attr_or_empty("cn"),
			sam_account_name: entry.attr_or_empty("sAMAccountName"),
		}
	}
}

/// Relative search base for the users of an OU given without its leading
/// `ou=`, e.g. `level2,OU=level1`.
pub(crate) fn ou_base(relative_ou: &str) -> String {
	format!("ou={relative_ou}")
}

/// Filter matching users whose account name or common name starts with
/// `pattern`
pub(crate) fn name_filter(pattern: &str) -> String {
	let pattern = ldap_escape(pattern);
	format!("(&(objectClass=user)(objectCategory=user)(|(sAMAccountName={pattern}*)(cn={pattern}*)))")
}

/// Filter matching the groups listing `dn` as a member
fn membership_filter(dn: &str) -> String {
	format!("(&(objectCategory=group)(member={}))", ldap_escape(dn))
}

/// Read the domain's `maxPwdAge`. Anything short of a readable value counts
/// as 0, i.e. passwords expire the moment they are set.
async fn max_password_age<D: Directory>(directory: &mut D) -> i64 {
	let entries = match directory.search("", BUILTIN_FILTER, &[MAX_PWD_AGE]).await {
		Ok(entries) => entries,
		Err(err) => {
			warn!("Looking up {MAX_PWD_AGE} failed, assuming 0: {err:?}");
			return 0;
		}
	};
	match entries.first().and_then(|entry| entry.i64_first(MAX_PWD_AGE)) {
		Some(Ok(age)) => age,
		Some(Err(err)) => {
			warn!("Assuming {MAX_PWD_AGE} of 0: {err}");
			0
		}
		None => {
			debug!("No {MAX_PWD_AGE} found, assuming 0");
			0
		}
	}
}

/// Look up the groups `dn` is a direct member of
async fn groups_of<D: Directory>(directory: &mut D, dn: &str) -> Result<Vec<Group>, Error> {
	let entries = directory.search("", &membership_filter(dn), GROUP_ATTRIBUTES).await?;
	Ok(entries.iter().map(Group::from_entry).collect())
}

/// Search for users below `relative_base` matching `filter` and resolve the
/// groups of every one of them. Only a failure of the user search itself is
/// returned; a user whose groups cannot be looked up ends up without groups.
pub(crate) async fn project_users<D: Directory>(
	directory: &mut D,
	relative_base: &str,
	filter: &str,
) -> Result<Vec<User>, Error> {
	let max_pwd_age = max_password_age(directory).await;
	let entries = directory.search(relative_base, filter, USER_ATTRIBUTES).await?;
	debug!("Found {} users below {relative_base:?}", entries.len());

	let mut users = Vec::with_capacity(entries.len());
	for entry in &entries {
		let mut user = User::from_entry(entry, max_pwd_age);
		match groups_of(directory, &entry.dn).await {
			Ok(groups) => user.groups = groups.into_iter().map(|group| group.cn).collect(),
			Err(err) => warn!("Looking up the groups of {} failed: {err:?}", entry.dn),
		}
		users.push(user);
	}
	Ok(users)
}
