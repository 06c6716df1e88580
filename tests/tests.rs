#![allow(
	clippy::dbg_macro,
	clippy::expect_used,
	clippy::missing_docs_in_private_items,
	clippy::print_stderr,
	clippy::print_stdout,
	clippy::unwrap_used
)]
use std::error::Error;

use ad_directory::{Config, ConnectionConfig, Ldap, OrganizationalUnit};
use serial_test::serial;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use url::Url;

mod common;

use common::{
	docker_config, ldap_add_organizational_unit, ldap_connect, ldap_delete_organizational_unit,
};

fn init_tracing() {
	let tracing_filter = EnvFilter::default().add_directive(LevelFilter::DEBUG.into());
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_filter).try_init();
}

fn child<'a>(node: &'a OrganizationalUnit, name: &str) -> Option<&'a OrganizationalUnit> {
	node.children.iter().find(|child| child.name == name)
}

/// Nothing listens on port 1, so every query fails while connecting
fn unreachable_client() -> Ldap {
	Ldap::new(Config {
		url: Url::parse("ldap://127.0.0.1:1").unwrap(),
		connection: ConnectionConfig { timeout: 2, ..ConnectionConfig::default() },
		bind_dn: "ROUser".to_owned(),
		bind_password: "asd.1234".to_owned(),
		base_dn: "dc=example,dc=local".to_owned(),
	})
}

#[tokio::test]
async fn unreachable_server_yields_nothing() {
	init_tracing();
	let client = unreachable_client();

	assert!(client.get_tree().await.is_none());
	assert!(client.find_users_by_ou("level2,OU=level1").await.is_none());
	assert!(client.find_users_by_name("nicol").await.is_none());
	assert!(matches!(client.try_get_tree().await, Err(ad_directory::Error::Connection(_))));
}

#[ignore = "docker"]
#[tokio::test]
#[serial]
async fn ldap_tree_test() -> Result<(), Box<dyn Error>> {
	init_tracing();

	let mut ldap = ldap_connect().await?;
	let _ = ldap_delete_organizational_unit(&mut ldap, "ou=level3,ou=level2,ou=level1").await;
	let _ = ldap_delete_organizational_unit(&mut ldap, "ou=level2,ou=level1").await;
	let _ = ldap_delete_organizational_unit(&mut ldap, "ou=level1").await;

	ldap_add_organizational_unit(&mut ldap, "ou=level1").await?;
	ldap_add_organizational_unit(&mut ldap, "ou=level2,ou=level1").await?;
	ldap_add_organizational_unit(&mut ldap, "ou=level3,ou=level2,ou=level1").await?;

	let tree = Ldap::new(docker_config()).get_tree().await.expect("tree should be built");

	assert!(tree.is_root());
	let level1 = child(&tree, "level1").expect("level1 should be a top-level OU");
	assert_eq!(level1.children.len(), 1);
	let level2 = child(level1, "level2").expect("level2 should be below level1");
	let level3 = child(level2, "level3").expect("level3 should be below level2");
	assert!(level3.children.is_empty());

	ldap_delete_organizational_unit(&mut ldap, "ou=level3,ou=level2,ou=level1").await?;
	ldap_delete_organizational_unit(&mut ldap, "ou=level2,ou=level1").await?;
	ldap_delete_organizational_unit(&mut ldap, "ou=level1").await?;
	ldap.unbind().await?;

	Ok(())
}

#[ignore = "docker"]
#[tokio::test]
#[serial]
async fn ldap_missing_ou_test() -> Result<(), Box<dyn Error>> {
	init_tracing();

	let client = Ldap::new(docker_config());
	assert!(client.find_users_by_ou("does-not-exist").await.is_none());

	let mut config = docker_config();
	config.bind_password = "wrong".to_owned();
	assert!(matches!(
		Ldap::new(config).try_find_users_by_name("nicol").await,
		Err(ad_directory::Error::Bind(_))
	));

	Ok(())
}

#[ignore = "docker"]
#[tokio::test]
#[serial]
async fn ldap_paged_tree_test() -> Result<(), Box<dyn Error>> {
	init_tracing();

	let names = ["paged0", "paged1", "paged2", "paged3", "paged4"];
	let mut ldap = ldap_connect().await?;
	for name in names {
		let _ = ldap_delete_organizational_unit(&mut ldap, &format!("ou={name},ou=paging")).await;
	}
	let _ = ldap_delete_organizational_unit(&mut ldap, "ou=paging").await;

	ldap_add_organizational_unit(&mut ldap, "ou=paging").await?;
	for name in names {
		ldap_add_organizational_unit(&mut ldap, &format!("ou={name},ou=paging")).await?;
	}

	// More OUs than fit on one page, rooted at an OU instead of the domain
	let mut config = docker_config();
	config.connection.page_size = Some(2);
	config.base_dn = format!("ou=paging,{}", common::BASE_DN);
	let tree = Ldap::new(config).try_get_tree().await?;

	let mut top_level: Vec<&str> = tree.children.iter().map(|node| node.name.as_str()).collect();
	top_level.sort_unstable();
	assert_eq!(top_level, names);
	assert_eq!(tree.depth(), 1);

	for name in names {
		ldap_delete_organizational_unit(&mut ldap, &format!("ou={name},ou=paging")).await?;
	}
	ldap_delete_organizational_unit(&mut ldap, "ou=paging").await?;
	ldap.unbind().await?;

	Ok(())
}
