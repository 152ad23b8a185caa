use askama::Template;

use crate::application::listing::ListingNode;

use super::AdminLayout;

#[derive(Clone)]
pub struct PageLinkView {
    pub number: u32,
    pub href: String,
    pub is_current: bool,
}

#[derive(Clone)]
pub struct ReorderPageView {
    pub heading: String,
    pub item_type: String,
    pub intro: Option<String>,
    pub outro: Option<String>,
    pub hierarchical: bool,
    pub nonce: String,
    pub batch_url: String,
    pub base_offset: i32,
    pub large_list_warning: Option<String>,
    pub tree_html: String,
    pub is_empty: bool,
    pub pages: Vec<PageLinkView>,
}

impl ReorderPageView {
    pub fn has_pagination(&self) -> bool {
        self.pages.len() > 1
    }
}

#[derive(Template)]
#[template(path = "admin/reorder.html")]
pub struct AdminReorderTemplate {
    pub view: AdminLayout<ReorderPageView>,
}

/// One `<li>` of the drag list; children arrive pre-rendered.
#[derive(Template)]
#[template(path = "admin/reorder_node.html")]
pub struct ReorderNodeTemplate<'a> {
    pub id: i64,
    pub ordinal: i32,
    pub parent_id: i64,
    pub item_type: &'a str,
    pub title: &'a str,
    pub children_html: String,
}

impl ReorderNodeTemplate<'_> {
    pub fn has_children(&self) -> bool {
        !self.children_html.is_empty()
    }
}

/// Render `nodes` as a nested list. An empty slice renders nothing.
pub fn render_tree(nodes: &[ListingNode], item_type: &str) -> Result<String, askama::Error> {
    if nodes.is_empty() {
        return Ok(String::new());
    }

    let mut html = String::from("<ul class=\"reorder-list\">");
    for node in nodes {
        html.push_str(&render_node(node, item_type)?);
    }
    html.push_str("</ul>");
    Ok(html)
}

fn render_node(node: &ListingNode, item_type: &str) -> Result<String, askama::Error> {
    let title = if node.item.title.trim().is_empty() {
        "(no title)"
    } else {
        node.item.title.as_str()
    };

    ReorderNodeTemplate {
        id: node.item.id,
        ordinal: node.item.ordinal,
        parent_id: node.item.parent_id,
        item_type,
        title,
        children_html: render_tree(&node.children, item_type)?,
    }
    .render()
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::{entities::ItemRecord, types::ItemStatus};

    fn node(id: i64, parent_id: i64, ordinal: i32, children: Vec<ListingNode>) -> ListingNode {
        ListingNode {
            item: ItemRecord {
                id,
                item_type: "page".to_string(),
                parent_id,
                ordinal,
                title: format!("<Item {id}>"),
                status: ItemStatus::Publish,
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: OffsetDateTime::UNIX_EPOCH,
            },
            children,
        }
    }

    #[test]
    fn nested_nodes_carry_data_attributes() {
        let tree = vec![node(1, 0, 0, vec![node(2, 1, 0, Vec::new())])];
        let html = render_tree(&tree, "page").expect("render");

        assert!(html.starts_with("<ul class=\"reorder-list\">"));
        assert!(html.contains("data-id=\"2\""));
        assert!(html.contains("data-parent=\"1\""));
        assert!(html.contains("data-type=\"page\""));
        assert_eq!(html.matches("<ul").count(), 2);
    }

    #[test]
    fn titles_are_escaped() {
        let html = render_tree(&[node(3, 0, 0, Vec::new())], "page").expect("render");
        assert!(html.contains("&lt;Item 3&gt;"));
        assert!(!html.contains("<Item 3>"));
    }

    #[test]
    fn empty_tree_renders_nothing() {
        assert_eq!(render_tree(&[], "post").expect("render"), "");
    }
}
