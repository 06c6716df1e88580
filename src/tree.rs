//! Reconstruction of the organizational unit hierarchy.
//!
//! The directory only hands out flat DNs such as
//! `OU=level3,OU=level2,OU=level1,DC=example,DC=local`. To get a tree back,
//! every DN is cut down to its OU components and flipped so the shallowest OU
//! comes first. Each component is then recorded in a registry keyed by its
//! depth, together with the name of the component one level above it. The
//! tree is assembled afterwards by attaching, for every node, all records one
//! level deeper that name it as their parent.
//!
//! Parents are linked by name only. Two distinct OUs that share a name at the
//! same depth are therefore merged into the first one seen.
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Search filter matching every organizational unit.
pub(crate) const OU_FILTER: &str = "(ou=*)";

/// The attribute marker preceding every OU component of a DN, lowercased.
const OU_MARKER: &str = "ou=";

/// A node in the organizational unit tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
	/// Name of the OU. Empty for the root node.
	#[serde(rename = "value")]
	pub name: String,
	/// The OUs directly below this one, in the order they were first seen.
	pub children: Vec<OrganizationalUnit>,
}

impl OrganizationalUnit {
	/// Create a node without children
	fn leaf(name: String) -> Self {
		Self { name, children: Vec::new() }
	}

	/// Reconstruct the tree of OUs below `base_dn` from the DNs of all OU
	/// entries. DNs without any OU component, the base entry itself and DNs
	/// outside the base are ignored. The returned node is
	/// the unnamed root, its children are the top-level OUs.
	#[must_use]
	pub fn from_dns<'a>(dns: impl IntoIterator<Item = &'a str>, base_dn: &str) -> Self {
		let mut registry = Registry::default();
		for dn in dns {
			match ou_components(dn, base_dn) {
				Some(components) => registry.register(&components),
				None => debug!("Skipping {dn}, it has no OU component below the base"),
			}
		}
		registry.into_tree()
	}

	/// Number of levels below this node. A node without children has depth 0.
	#[must_use]
	pub fn depth(&self) -> usize {
		self.children.iter().map(|child| child.depth() + 1).max().unwrap_or(0)
	}

	/// Whether this node is the unnamed root of a tree
	#[must_use]
	pub fn is_root(&self) -> bool {
		self.name.is_empty()
	}
}

/// Registry entry for a single OU, linking it to its parent by name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrganizationalUnitRecord {
	/// Name of the OU
	name: String,
	/// Name of the OU one level above, empty at depth 0
	parent: String,
}

/// OU records grouped by depth. Names are unique within a depth.
#[derive(Debug, Default)]
struct Registry {
	/// Index 0 holds the top-level OUs
	levels: Vec<Vec<OrganizationalUnitRecord>>,
}

impl Registry {
	/// Record the components of one DN, ordered from shallowest to deepest.
	/// A name that is already present at a depth keeps its original parent.
	fn register(&mut self, components: &[String]) {
		for (depth, name) in components.iter().enumerate() {
			if self.levels.len() <= depth {
				self.levels.push(Vec::new());
			}
			let level = &mut self.levels[depth];
			if level.iter().any(|record| record.name == *name) {
				continue;
			}
			let parent = depth
				.checked_sub(1)
				.and_then(|parent_depth| components.get(parent_depth))
				.cloned()
				.unwrap_or_default();
			level.push(OrganizationalUnitRecord { name: name.clone(), parent });
		}
	}

	/// Assemble the tree below an unnamed root
	fn into_tree(self) -> OrganizationalUnit {
		let mut root = OrganizationalUnit::leaf(String::new());
		self.attach_children(std::slice::from_mut(&mut root), 0);
		root
	}

	/// Attach the records at `depth` to the nodes naming them as parent, then
	/// descend into the new children.
	fn attach_children(&self, nodes: &mut [OrganizationalUnit], depth: usize) {
		let Some(records) = self.levels.get(depth) else {
			return;
		};
		for node in nodes {
			node.children.extend(
				records
					.iter()
					.filter(|record| record.parent == node.name && !record.name.trim().is_empty())
					.map(|record| OrganizationalUnit::leaf(record.name.clone())),
			);
			self.attach_children(&mut node.children, depth + 1);
		}
	}
}

/// Split a DN into its OU names, shallowest first.
///
/// The DN must end in `,<base_dn>`, otherwise it is not below the base (or is
/// the base entry itself) and `None` is returned. The suffix is dropped, the
/// remainder is split on the `OU=` marker and reversed. The fragment in front
/// of the first marker is kept as the deepest component; for plain OU DNs it
/// is empty.
fn ou_components(dn: &str, base_dn: &str) -> Option<Vec<String>> {
	// ASCII lowercasing keeps byte offsets intact, so indices carry over to `dn`
	let lowered = dn.to_ascii_lowercase();
	let suffix = format!(",{}", base_dn.to_ascii_lowercase());
	let lowered = lowered.strip_suffix(suffix.as_str())?;
	let relative = &dn[..lowered.len()];

	let mut fragments = Vec::new();
	let mut start = 0;
	for (index, _) in lowered.match_indices(OU_MARKER) {
		fragments.push(&relative[start..index]);
		start = index + OU_MARKER.len();
	}
	if fragments.is_empty() {
		return None;
	}
	fragments.push(&relative[start..]);

	Some(
		fragments
			.into_iter()
			.rev()
			.map(|fragment| fragment.strip_suffix(',').unwrap_or(fragment).to_owned())
			.collect(),
	)
}
