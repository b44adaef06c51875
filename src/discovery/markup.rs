//! `<link>` extraction from HTML markup

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Raw attributes of a `<link rel=...>` element, as written in the page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDecl {
    pub rel: String,
    pub href: Option<String>,
    pub sizes: Option<String>,
    pub mime_type: Option<String>,
}

/// Every `<link>` element carrying a `rel` attribute, in document order
pub fn extract_links(html: &str) -> Vec<LinkDecl> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);

    let mut links = Vec::new();
    let mut stack: Vec<Handle> = vec![dom.document.clone()];
    while let Some(handle) = stack.pop() {
        if let NodeData::Element { name, attrs, .. } = &handle.data
            && (*name.local).eq_ignore_ascii_case("link")
        {
            let attrs = attrs.borrow();
            let attr = |key: &str| {
                attrs
                    .iter()
                    .find(|a| (*a.name.local).eq_ignore_ascii_case(key))
                    .map(|a| a.value.to_string())
            };
            if let Some(rel) = attr("rel") {
                links.push(LinkDecl {
                    rel,
                    href: attr("href"),
                    sizes: attr("sizes"),
                    mime_type: attr("type"),
                });
            }
        }

        // Reverse so the first child is popped first
        let children = handle.children.borrow();
        stack.extend(children.iter().rev().cloned());
    }
    links
}
