use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::flags::deserialize_lenient_bool;

fn default_active() -> bool {
    true
}

/// Navigation menu item as returned by `/api/menu-items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Backend identifier.
    #[serde(alias = "ID")]
    pub id: i64,
    /// Stable menu name.
    #[serde(default, alias = "Name")]
    pub name: String,
    /// Label shown to the user.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Client route the item opens.
    #[serde(default, alias = "Link")]
    pub route_link: Option<String>,
    /// Icon identifier.
    #[serde(default)]
    pub icon_name: Option<String>,
    /// Parent item, `None` for top-level items.
    #[serde(default)]
    pub parent_menu_item_id: Option<i64>,
    /// Sort key among siblings.
    #[serde(default)]
    pub menu_order: i32,
    /// Whether the item is enabled.
    #[serde(default = "default_active", deserialize_with = "deserialize_lenient_bool")]
    pub is_active: bool,
    /// Nested children, when the payload is already hierarchical.
    #[serde(default, alias = "children", skip_serializing_if = "Vec::is_empty")]
    pub child_menu_items: Vec<MenuItem>,
}

impl MenuItem {
    /// Returns the label to render.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(self.name.as_str())
    }
}

/// Create/update body for a menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemDraft {
    /// Stable menu name.
    pub name: String,
    /// Label shown to the user.
    #[serde(default)]
    pub display_name: String,
    /// Client route the item opens.
    #[serde(default)]
    pub route_link: String,
    /// Icon identifier.
    #[serde(default)]
    pub icon_name: String,
    /// Parent item.
    #[serde(default)]
    pub parent_menu_item_id: Option<i64>,
    /// Sort key among siblings.
    #[serde(default)]
    pub menu_order: i32,
    /// Whether the item is enabled.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// One node of the reconstructed navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuNode {
    /// The item itself, without nested children.
    pub item: MenuItem,
    /// Ordered child nodes.
    pub children: Vec<MenuNode>,
}

/// Rebuilds the navigation hierarchy.
///
/// Nested `childMenuItems` win when any item carries them. Otherwise the
/// tree is rebuilt from `parentMenuItemId`; items whose parent is not in the
/// list, or whose parents form a cycle, are promoted to the top level.
#[must_use]
pub fn build_menu_tree(items: &[MenuItem]) -> Vec<MenuNode> {
    if items.iter().any(|item| !item.child_menu_items.is_empty()) {
        let mut visited = HashSet::new();
        return sorted(
            items
                .iter()
                .filter_map(|item| nested_node(item, &mut visited))
                .collect(),
        );
    }

    let known: HashSet<i64> = items.iter().map(|item| item.id).collect();
    let mut by_parent: BTreeMap<Option<i64>, Vec<&MenuItem>> = BTreeMap::new();
    for item in items {
        let parent = item
            .parent_menu_item_id
            .filter(|parent| known.contains(parent) && *parent != item.id);
        by_parent.entry(parent).or_default().push(item);
    }

    let mut visited = HashSet::new();
    let mut roots = linked_children(None, &by_parent, &mut visited);

    // Items on a parent cycle are unreachable from the top level.
    for item in items {
        if visited.insert(item.id) {
            roots.push(MenuNode {
                item: item.clone(),
                children: linked_children(Some(item.id), &by_parent, &mut visited),
            });
        }
    }

    sorted(roots)
}

fn nested_node(item: &MenuItem, visited: &mut HashSet<i64>) -> Option<MenuNode> {
    if !visited.insert(item.id) {
        return None;
    }

    let children = item
        .child_menu_items
        .iter()
        .filter_map(|child| nested_node(child, visited))
        .collect();
    let mut flat = item.clone();
    flat.child_menu_items.clear();

    Some(MenuNode {
        item: flat,
        children: sorted(children),
    })
}

fn linked_children(
    parent: Option<i64>,
    by_parent: &BTreeMap<Option<i64>, Vec<&MenuItem>>,
    visited: &mut HashSet<i64>,
) -> Vec<MenuNode> {
    let Some(items) = by_parent.get(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        if !visited.insert(item.id) {
            continue;
        }
        let children = linked_children(Some(item.id), by_parent, visited);
        nodes.push(MenuNode {
            item: (*item).clone(),
            children,
        });
    }

    sorted(nodes)
}

fn sorted(mut nodes: Vec<MenuNode>) -> Vec<MenuNode> {
    nodes.sort_by(|left, right| {
        left.item
            .menu_order
            .cmp(&right.item.menu_order)
            .then_with(|| left.item.name.cmp(&right.item.name))
    });
    nodes
}

#[cfg(test)]
mod tests {
    use super::{MenuItem, build_menu_tree};

    fn item(id: i64, name: &str, parent: Option<i64>, order: i32) -> MenuItem {
        MenuItem {
            id,
            name: name.to_owned(),
            display_name: None,
            route_link: None,
            icon_name: None,
            parent_menu_item_id: parent,
            menu_order: order,
            is_active: true,
            child_menu_items: Vec::new(),
        }
    }

    #[test]
    fn tree_is_rebuilt_from_parent_ids() {
        let items = vec![
            item(3, "executions", Some(1), 2),
            item(1, "reports", None, 1),
            item(2, "builder", Some(1), 1),
            item(4, "users", None, 0),
        ];

        let tree = build_menu_tree(&items);
        let roots: Vec<&str> = tree.iter().map(|node| node.item.name.as_str()).collect();
        assert_eq!(roots, vec!["users", "reports"]);

        let children: Vec<&str> = tree[1]
            .children
            .iter()
            .map(|node| node.item.name.as_str())
            .collect();
        assert_eq!(children, vec!["builder", "executions"]);
    }

    #[test]
    fn nested_payload_takes_precedence() {
        let mut reports = item(1, "reports", None, 0);
        reports.child_menu_items = vec![item(2, "builder", Some(1), 0)];

        let tree = build_menu_tree(&[reports]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
        assert!(tree[0].item.child_menu_items.is_empty());
    }

    #[test]
    fn orphans_and_self_parents_become_roots() {
        let items = vec![item(5, "orphan", Some(99), 0), item(6, "loop", Some(6), 1)];
        let tree = build_menu_tree(&items);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn parent_cycles_are_promoted_to_roots() {
        let items = vec![
            item(1, "home", None, 0),
            item(7, "alpha", Some(8), 1),
            item(8, "beta", Some(7), 2),
        ];

        let tree = build_menu_tree(&items);

        let roots: Vec<&str> = tree.iter().map(|node| node.item.name.as_str()).collect();
        assert_eq!(roots, vec!["home", "alpha"]);
        assert_eq!(tree[1].children.len(), 1);
        assert_eq!(tree[1].children[0].item.name, "beta");
        assert!(tree[1].children[0].children.is_empty());
    }

    #[test]
    fn hierarchical_payload_uses_alias_fields() {
        let parsed = serde_json::from_str::<Vec<MenuItem>>(
            r#"[{"id":1,"Name":"Reports","children":[{"id":2,"name":"Generator","Link":"reports/generator"}]}]"#,
        )
        .unwrap_or_default();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].label(), "Reports");
        assert_eq!(
            parsed[0].child_menu_items[0].route_link.as_deref(),
            Some("reports/generator")
        );
    }
}
