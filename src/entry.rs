//! Helper methods for extracting data from search results.
use ldap3::SearchEntry;

use crate::error::Error;

/// An extension trait for [`SearchEntry`] that provides convenience methods for
/// extracting data.
pub trait SearchEntryExt {
	/// Get the first value of an attribute. Attribute names are compared
	/// case-insensitively, as servers are free to return them in their
	/// canonical casing rather than the one used in the request.
	fn attr_first(&self, attr: &str) -> Option<&str>;

	/// Get the first value of an attribute, or an empty string if the entry
	/// does not carry it.
	fn attr_or_empty(&self, attr: &str) -> String {
		self.attr_first(attr).unwrap_or_default().to_owned()
	}

	/// Get the first value of an attribute, interpreted as a signed integer.
	fn i64_first(&self, attr: &str) -> Option<Result<i64, Error>> {
		self.attr_first(attr).map(|value| {
			value.trim().parse().map_err(|_| Error::Invalid(format!("{attr} is not an integer")))
		})
	}
}

impl SearchEntryExt for SearchEntry {
	fn attr_first(&self, attr: &str) -> Option<&str> {
		let values = match self.attrs.get(attr) {
			Some(values) => values,
			None => {
				self.attrs.iter().find(|(name, _)| name.eq_ignore_ascii_case(attr))?.1
			}
		};
		values.first().map(String::as_str)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use ldap3::SearchEntry;

	use super::SearchEntryExt;
	use crate::error::Error;

	fn entry(attrs: &[(&str, &[&str])]) -> SearchEntry {
		SearchEntry {
			dn: String::from("dontcare"),
			attrs: attrs
				.iter()
				.map(|(name, values)| {
					((*name).to_owned(), values.iter().map(|v| (*v).to_owned()).collect())
				})
				.collect(),
			bin_attrs: HashMap::default(),
		}
	}

	#[test]
	fn attr_first() {
		let entry = entry(&[("name", &["Foo Bar", "Bar McBaz"])]);
		assert_eq!(
			entry.attr_first("attribute_does_not_exist"),
			None,
			"Undefined attributes should return None"
		);
		assert_eq!(entry.attr_first("name"), Some("Foo Bar"), "Should return the first value");
		assert_ne!(entry.attr_first("name"), Some("Bar McBaz"), "Should return the correct value");
	}

	#[test]
	fn attr_first_ignores_case() {
		let entry = entry(&[("sAMAccountName", &["jdoe"]), ("l", &["Montevideo"])]);
		assert_eq!(entry.attr_first("samaccountname"), Some("jdoe"));
		assert_eq!(entry.attr_first("L"), Some("Montevideo"));
	}

	#[test]
	fn attr_or_empty() {
		let entry = entry(&[("mail", &["jdoe@example.local"]), ("mobile", &[])]);
		assert_eq!(entry.attr_or_empty("mail"), "jdoe@example.local");
		assert_eq!(entry.attr_or_empty("mobile"), "", "Attributes without values are empty");
		assert_eq!(entry.attr_or_empty("title"), "", "Missing attributes are empty");
	}

	#[test]
	fn i64_first() {
		let entry = entry(&[("pwdLastSet", &["132223104000000000"]), ("maxPwdAge", &["never"])]);
		assert_eq!(
			entry.i64_first("pwdLastSet").transpose().ok().flatten(),
			Some(132_223_104_000_000_000)
		);
		assert!(matches!(entry.i64_first("maxPwdAge"), Some(Err(Error::Invalid(_)))));
		assert!(entry.i64_first("accountExpires").is_none());
	}
}
