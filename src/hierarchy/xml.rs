//! Hierarchy snapshots as namespaced XML.
//!
//! The document layout follows the notebook automation schema:
//!
//! ```xml
//! <one:Notebook xmlns:one="..." name="Work" nickname="Work" ID="{...}" path="...">
//!   <one:Section name="Inbox" ID="{...}" color="#8AA8E4"/>
//!   <one:SectionGroup name="Projects" ID="{...}">
//!     <one:Section name="Ideas" ID="{...}"/>
//!   </one:SectionGroup>
//!   <one:SectionGroup name="Recycle Bin" ID="{...}" isRecycleBin="true"/>
//! </one:Notebook>
//! ```
//!
//! Elements outside that vocabulary (pages, metadata) are skipped with their
//! whole subtree.

use super::types::{Node, NodeKind, ObjectKind, Tree};
use super::HierarchyError;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

const NOTEBOOK: &str = "Notebook";
const SECTION_GROUP: &str = "SectionGroup";
const SECTION: &str = "Section";
const PREFIX: &str = "one";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Notebook,
    SectionGroup,
    Section,
}

impl Element {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Notebook" => Some(Element::Notebook),
            b"SectionGroup" => Some(Element::SectionGroup),
            b"Section" => Some(Element::Section),
            _ => None,
        }
    }

    fn local_name(self) -> &'static str {
        match self {
            Element::Notebook => NOTEBOOK,
            Element::SectionGroup => SECTION_GROUP,
            Element::Section => SECTION,
        }
    }
}

/// An element whose end tag has not been read yet
struct OpenElement {
    element: Element,
    node: Node,
    nickname: Option<String>,
    path: Option<String>,
}

/// Parse a hierarchy document into a typed snapshot.
///
/// The root element must declare `namespace`.
pub fn parse_hierarchy(xml: &str, namespace: &str) -> Result<Tree, HierarchyError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<OpenElement> = None;
    let mut skipped_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if skipped_depth > 0 {
                    skipped_depth += 1;
                    continue;
                }
                match open_element(&e, namespace, stack.is_empty() && root.is_none())? {
                    Some(open) => stack.push(open),
                    None => skipped_depth = 1,
                }
            }
            Event::Empty(e) => {
                if skipped_depth > 0 {
                    continue;
                }
                if let Some(open) = open_element(&e, namespace, stack.is_empty() && root.is_none())? {
                    close_element(open, &mut stack, &mut root)?;
                }
            }
            Event::End(_) => {
                if skipped_depth > 0 {
                    skipped_depth -= 1;
                    continue;
                }
                let open = stack
                    .pop()
                    .ok_or_else(|| HierarchyError::Malformed("unbalanced end tag".to_string()))?;
                close_element(open, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(HierarchyError::Malformed("unclosed element".to_string()));
    }

    let root = root.ok_or_else(|| HierarchyError::Malformed("document has no root element".to_string()))?;
    let kind = match root.element {
        Element::Notebook => ObjectKind::Notebook,
        Element::SectionGroup => ObjectKind::Group,
        Element::Section => ObjectKind::Section,
    };

    Ok(Tree {
        id: root.node.id,
        name: root.nickname.unwrap_or(root.node.name),
        kind,
        path: root.path,
        children: root.node.children,
    })
}

fn open_element(
    e: &BytesStart<'_>,
    namespace: &str,
    is_root: bool,
) -> Result<Option<OpenElement>, HierarchyError> {
    let local = e.local_name();
    let element = match Element::from_local_name(local.as_ref()) {
        Some(element) => element,
        None if is_root => {
            return Err(HierarchyError::Malformed(format!(
                "unexpected root element '{}'",
                String::from_utf8_lossy(local.as_ref())
            )))
        }
        None => return Ok(None),
    };

    let mut id = None;
    let mut name = None;
    let mut nickname = None;
    let mut path = None;
    let mut color = None;
    let mut is_recycle_bin = false;
    let mut declared_namespaces = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        let value = attr.unescape_value()?.into_owned();

        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            declared_namespaces.push(value);
            continue;
        }

        match attr.key.local_name().as_ref() {
            b"ID" => id = Some(value),
            b"name" => name = Some(value),
            b"nickname" => nickname = Some(value),
            b"path" => path = Some(value),
            b"color" => color = Some(value),
            b"isRecycleBin" => is_recycle_bin = value == "true",
            _ => {}
        }
    }

    if is_root && !declared_namespaces.iter().any(|ns| ns == namespace) {
        return Err(HierarchyError::NamespaceMismatch {
            expected: namespace.to_string(),
            found: declared_namespaces.into_iter().next(),
        });
    }

    let missing = |attribute: &str| HierarchyError::MissingAttribute {
        element: element.local_name().to_string(),
        attribute: attribute.to_string(),
    };
    let id = id.ok_or_else(|| missing("ID"))?;
    let name = match (name, &nickname) {
        (Some(name), _) => name,
        (None, Some(nickname)) if element == Element::Notebook => nickname.clone(),
        (None, _) => return Err(missing("name")),
    };

    let kind = match element {
        Element::Section => NodeKind::Section,
        Element::Notebook | Element::SectionGroup => NodeKind::Group,
    };

    Ok(Some(OpenElement {
        element,
        node: Node {
            id,
            name,
            kind,
            is_recycle_bin: element == Element::SectionGroup && is_recycle_bin,
            color,
            children: Vec::new(),
        },
        nickname,
        path,
    }))
}

fn close_element(
    open: OpenElement,
    stack: &mut [OpenElement],
    root: &mut Option<OpenElement>,
) -> Result<(), HierarchyError> {
    let Some(parent) = stack.last_mut() else {
        if root.is_some() {
            return Err(HierarchyError::Malformed("multiple root elements".to_string()));
        }
        *root = Some(open);
        return Ok(());
    };

    match (parent.element, open.element) {
        (Element::Section, _) => Err(HierarchyError::Malformed(format!(
            "section '{}' cannot contain '{}'",
            parent.node.name, open.node.name
        ))),
        (_, Element::Notebook) => Err(HierarchyError::Malformed(format!(
            "notebook '{}' nested inside '{}'",
            open.node.name, parent.node.name
        ))),
        _ => {
            parent.node.children.push(open.node);
            Ok(())
        }
    }
}

/// Render a snapshot as an indented hierarchy document declaring `namespace`
pub fn render_hierarchy(tree: &Tree, namespace: &str) -> Result<String, HierarchyError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let root_element = match tree.kind {
        ObjectKind::Notebook => Element::Notebook,
        ObjectKind::Group => Element::SectionGroup,
        ObjectKind::Section => Element::Section,
    };
    let tag = qualified(root_element);

    let mut start = BytesStart::new(tag.as_str());
    start.push_attribute(("xmlns:one", namespace));
    start.push_attribute(("name", tree.name.as_str()));
    if tree.kind == ObjectKind::Notebook {
        start.push_attribute(("nickname", tree.name.as_str()));
    }
    start.push_attribute(("ID", tree.id.as_str()));
    if let Some(path) = &tree.path {
        start.push_attribute(("path", path.as_str()));
    }

    if tree.children.is_empty() {
        write(&mut writer, Event::Empty(start))?;
    } else {
        write(&mut writer, Event::Start(start))?;
        for child in &tree.children {
            write_node(&mut writer, child)?;
        }
        write(&mut writer, Event::End(BytesEnd::new(tag.as_str())))?;
    }

    String::from_utf8(writer.into_inner()).map_err(|e| HierarchyError::Write(e.to_string()))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), HierarchyError> {
    let element = match node.kind {
        NodeKind::Section => Element::Section,
        NodeKind::Group => Element::SectionGroup,
    };
    let tag = qualified(element);

    let mut start = BytesStart::new(tag.as_str());
    start.push_attribute(("name", node.name.as_str()));
    start.push_attribute(("ID", node.id.as_str()));
    if let Some(color) = &node.color {
        start.push_attribute(("color", color.as_str()));
    }
    if node.is_recycle_bin {
        start.push_attribute(("isRecycleBin", "true"));
    }

    if node.children.is_empty() {
        write(writer, Event::Empty(start))
    } else {
        write(writer, Event::Start(start))?;
        for child in &node.children {
            write_node(writer, child)?;
        }
        write(writer, Event::End(BytesEnd::new(tag.as_str())))
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), HierarchyError> {
    writer
        .write_event(event)
        .map_err(|e| HierarchyError::Write(e.to_string()))
}

fn qualified(element: Element) -> String {
    format!("{}:{}", PREFIX, element.local_name())
}
