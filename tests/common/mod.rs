use std::error::Error;

use ad_directory::{Config, ConnectionConfig};
use ldap3::LdapConnAsync;
use url::Url;

pub const BASE_DN: &str = "dc=example,dc=org";

/// Configuration for the dockerized OpenLDAP server
pub fn docker_config() -> Config {
	Config {
		url: Url::parse("ldap://localhost:1389").unwrap(),
		connection: ConnectionConfig::default(),
		bind_dn: "cn=admin,dc=example,dc=org".to_owned(),
		bind_password: "adminpassword".to_owned(),
		base_dn: BASE_DN.to_owned(),
	}
}

pub async fn ldap_connect() -> Result<ldap3::Ldap, Box<dyn Error>> {
	let (conn, mut ldap) = LdapConnAsync::new("ldap://localhost:1389").await?;
	let _handle = tokio::spawn(async move {
		if let Err(err) = conn.drive().await {
			panic!("Ldap connection error {err}");
		}
	});
	ldap.simple_bind("cn=admin,dc=example,dc=org", "adminpassword").await?;
	Ok(ldap)
}

/// Add an OU. `ou` is the DN relative to the base, e.g. `ou=b,ou=a`.
pub async fn ldap_add_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.add(&format!("{ou},{BASE_DN}"), vec![("objectClass", ["organizationalUnit"].into())])
		.await?
		.success()?;
	Ok(())
}

pub async fn ldap_delete_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.delete(&format!("{ou},{BASE_DN}")).await?.success()?;
	Ok(())
}
