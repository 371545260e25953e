use super::backing::{DirectoryBacking, MemoryBacking, NotebookBacking};
use super::types::{CreateKind, Notebook, Opened, Page, SectionContent, StoreRef};
use super::{Store, StoreError};
use crate::hierarchy::{HierarchyScope, Node, NodeKind, ObjectKind, Tree};
use crate::utils::{location_name, normalize_location};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Characters a section or group name may not contain
static INVALID_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|#%]"#).expect("invalid name pattern"));

struct OpenNotebook {
    location: String,
    notebook: Notebook,
    dirty: bool,
}

/// The automation application: opens notebooks by location and serves every
/// `Store` operation against them.
///
/// Ids are unique across all notebooks open in one `LocalStore`, so a node id
/// alone identifies its notebook. Writes stay in memory until `synchronize`
/// or `close` hands the notebook to the backing.
pub struct LocalStore<B: NotebookBacking> {
    backing: B,
    open: Mutex<HashMap<String, OpenNotebook>>,
}

impl LocalStore<MemoryBacking> {
    pub fn in_memory() -> Self {
        Self::new(MemoryBacking::new())
    }
}

impl LocalStore<DirectoryBacking> {
    /// Notebooks are directories; hierarchy documents declare `namespace`
    pub fn on_disk(namespace: impl Into<String>) -> Self {
        Self::new(DirectoryBacking::new(namespace))
    }
}

impl<B: NotebookBacking> LocalStore<B> {
    pub fn new(backing: B) -> Self {
        Self {
            backing,
            open: Mutex::new(HashMap::new()),
        }
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    /// Locations of the notebooks currently open
    pub async fn open_locations(&self) -> Vec<String> {
        let open = self.open.lock().await;
        let mut locations: Vec<String> = open.values().map(|e| e.location.clone()).collect();
        locations.sort();
        locations
    }

    /// Append a page to a section
    pub async fn append_page(&self, section_id: &str, page: Page) -> Result<(), StoreError> {
        let mut open = self.open.lock().await;
        let owner = section_owner(&open, section_id)?;
        let entry = entry_mut(&mut open, &owner)?;
        entry
            .notebook
            .sections
            .entry(section_id.to_string())
            .or_default()
            .pages
            .push(page);
        entry.dirty = true;
        Ok(())
    }

    /// Pages of a section
    pub async fn section_content(&self, section_id: &str) -> Result<SectionContent, StoreError> {
        let open = self.open.lock().await;
        let owner = section_owner(&open, section_id)?;
        Ok(open[&owner]
            .notebook
            .sections
            .get(section_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn open_notebook(
        &self,
        open: &mut HashMap<String, OpenNotebook>,
        location: &str,
        kind: CreateKind,
    ) -> Result<Opened, StoreError> {
        let location = normalize_location(location);

        if let Some((id, _)) = open.iter().find(|(_, e)| e.location == location) {
            return Ok(Opened {
                target: StoreRef::new(id.clone(), ObjectKind::Notebook),
                created: false,
            });
        }

        let exists = self.backing.exists(&location).await;
        let (mut notebook, created) = match kind {
            CreateKind::Group | CreateKind::Section => {
                return Err(StoreError::InvalidOperation(format!(
                    "{:?} '{}' needs a parent",
                    kind, location
                )))
            }
            _ if exists => (self.backing.load(&location).await?, false),
            CreateKind::Notebook => {
                let tree = Tree::notebook(new_id(), location_name(&location), Vec::new());
                (Notebook::new(tree), true)
            }
            CreateKind::None => {
                return Err(StoreError::CollaboratorUnavailable(format!(
                    "no notebook at {}",
                    location
                )))
            }
        };

        notebook.tree.path = Some(location.clone());

        // A copy of an open notebook carries the same ids; give it fresh ones
        let taken: HashSet<String> = open.values().flat_map(|e| all_ids(&e.notebook.tree)).collect();
        let rekeyed = all_ids(&notebook.tree).iter().any(|id| taken.contains(id));
        if rekeyed {
            rekey(&mut notebook);
        }

        let id = notebook.tree.id.clone();
        debug!(%location, %id, created, rekeyed, "Opened notebook");

        open.insert(
            id.clone(),
            OpenNotebook {
                location,
                notebook,
                dirty: created || rekeyed,
            },
        );

        Ok(Opened {
            target: StoreRef::new(id, ObjectKind::Notebook),
            created,
        })
    }
}

#[async_trait]
impl<B: NotebookBacking> Store for LocalStore<B> {
    async fn open_or_create(
        &self,
        name: &str,
        parent: Option<&StoreRef>,
        kind: CreateKind,
    ) -> Result<Opened, StoreError> {
        let mut open = self.open.lock().await;

        let Some(parent) = parent else {
            return self.open_notebook(&mut open, name, kind).await;
        };

        let wanted = match kind {
            CreateKind::None => None,
            CreateKind::Group => Some(NodeKind::Group),
            CreateKind::Section => Some(NodeKind::Section),
            CreateKind::Notebook => {
                return Err(StoreError::InvalidOperation(format!(
                    "notebook '{}' cannot have a parent",
                    name
                )))
            }
        };

        let owner = owner_of(&open, &parent.id).ok_or_else(|| StoreError::NotFound(parent.id.clone()))?;
        let entry = entry_mut(&mut open, &owner)?;
        let children = children_mut(&mut entry.notebook.tree, &parent.id)?;

        if let Some(existing) = children
            .iter()
            .find(|n| n.name == name && wanted.map_or(true, |k| n.kind == k))
        {
            return Ok(Opened {
                target: StoreRef::new(existing.id.clone(), object_kind(existing.kind)),
                created: false,
            });
        }

        let Some(node_kind) = wanted else {
            return Err(StoreError::NotFound(format!("'{}' under {}", name, parent.id)));
        };
        validate_name(name)?;

        let node = match node_kind {
            NodeKind::Section => Node::section(new_id(), name),
            NodeKind::Group => Node::group(new_id(), name, Vec::new()),
        };
        let id = node.id.clone();

        // Sections come before groups, and the recycle bin stays last
        let position = match node_kind {
            NodeKind::Section => children.iter().position(Node::is_group),
            NodeKind::Group => children.iter().position(|n| n.is_recycle_bin),
        }
        .unwrap_or(children.len());
        children.insert(position, node);
        entry.dirty = true;

        debug!(%name, %id, kind = %node_kind, parent = %parent.id, "Created object");

        Ok(Opened {
            target: StoreRef::new(id, object_kind(node_kind)),
            created: true,
        })
    }

    async fn fetch_hierarchy(
        &self,
        target: &StoreRef,
        scope: HierarchyScope,
    ) -> Result<Tree, StoreError> {
        let open = self.open.lock().await;
        let owner = owner_of(&open, &target.id).ok_or_else(|| StoreError::NotFound(target.id.clone()))?;
        let tree = &open[&owner].notebook.tree;

        if tree.id == target.id {
            return Ok(tree.clone().scoped(scope));
        }

        let node = tree
            .find(&target.id)
            .ok_or_else(|| StoreError::NotFound(target.id.clone()))?;

        Ok(Tree {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: object_kind(node.kind),
            path: None,
            children: node.children.clone(),
        }
        .scoped(scope))
    }

    async fn publish_section(
        &self,
        section_id: &str,
        destination: &Path,
    ) -> Result<Vec<u8>, StoreError> {
        let content = self.section_content(section_id).await?;
        let bytes = serde_json::to_vec_pretty(&content)?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(destination, &bytes).await?;

        debug!(%section_id, destination = %destination.display(), pages = content.pages.len(), "Published section");
        Ok(bytes)
    }

    async fn merge_content(
        &self,
        source_section_id: &str,
        target_section_id: &str,
    ) -> Result<(), StoreError> {
        let mut open = self.open.lock().await;

        let source_owner = section_owner(&open, source_section_id)?;
        let target_owner = section_owner(&open, target_section_id)?;

        if source_section_id == target_section_id {
            return Ok(());
        }

        let source = open[&source_owner]
            .notebook
            .sections
            .get(source_section_id)
            .cloned()
            .unwrap_or_default();

        let entry = entry_mut(&mut open, &target_owner)?;
        let added = entry
            .notebook
            .sections
            .entry(target_section_id.to_string())
            .or_default()
            .merge_from(&source);
        if added > 0 {
            entry.dirty = true;
        }

        debug!(source = %source_section_id, target = %target_section_id, added, "Merged section content");
        Ok(())
    }

    async fn update_hierarchy(&self, tree: &Tree) -> Result<(), StoreError> {
        let mut open = self.open.lock().await;
        let owner = owner_of(&open, &tree.id).ok_or_else(|| StoreError::NotFound(tree.id.clone()))?;

        let current = {
            let own_tree = &open[&owner].notebook.tree;
            if own_tree.id == tree.id {
                own_tree.children.clone()
            } else {
                let node = own_tree
                    .find(&tree.id)
                    .ok_or_else(|| StoreError::NotFound(tree.id.clone()))?;
                if node.is_section() {
                    return Err(StoreError::InvalidOperation(format!(
                        "section '{}' cannot hold children",
                        node.name
                    )));
                }
                node.children.clone()
            }
        };

        let mut update = UpdateContext {
            target_ids: all_ids(&open[&owner].notebook.tree).into_iter().collect(),
            foreign: open
                .iter()
                .filter(|(id, _)| *id != &owner)
                .flat_map(|(nb_id, e)| {
                    e.notebook
                        .tree
                        .children
                        .iter()
                        .flat_map(Node::subtree_ids)
                        .map(move |id| (id, nb_id.clone()))
                })
                .collect(),
            moves: Vec::new(),
            sections: Vec::new(),
        };

        let children = update.merge_children(&tree.children, current)?;

        // Carry pages along, then detach moved nodes. Anything the update left
        // out of a moved subtree is gone with it, pages included.
        let mut carried = HashMap::new();
        for (notebook_id, section_id) in &update.sections {
            if let Some(content) = open
                .get_mut(notebook_id)
                .and_then(|e| e.notebook.sections.remove(section_id))
            {
                carried.insert(section_id.clone(), content);
            }
        }
        for (notebook_id, node_id) in &update.moves {
            if let Some(entry) = open.get_mut(notebook_id) {
                if let Some(removed) = entry.notebook.tree.remove(node_id) {
                    for id in removed.subtree_ids() {
                        entry.notebook.sections.remove(&id);
                    }
                }
                entry.dirty = true;
            }
        }

        let entry = entry_mut(&mut open, &owner)?;
        *children_mut(&mut entry.notebook.tree, &tree.id)? = children;
        entry.notebook.sections.extend(carried);
        entry.dirty = true;

        debug!(target = %tree.id, moved = update.moves.len(), "Updated hierarchy");
        Ok(())
    }

    async fn synchronize(&self, target: &StoreRef) -> Result<(), StoreError> {
        let mut open = self.open.lock().await;
        let owner = owner_of(&open, &target.id).ok_or_else(|| StoreError::NotFound(target.id.clone()))?;
        let entry = entry_mut(&mut open, &owner)?;

        if entry.dirty {
            self.backing.save(&entry.location, &entry.notebook).await?;
            entry.dirty = false;
            debug!(location = %entry.location, "Synchronized notebook");
        }
        Ok(())
    }

    async fn close(&self, target: &StoreRef) -> Result<(), StoreError> {
        let mut open = self.open.lock().await;
        let owner = owner_of(&open, &target.id).ok_or_else(|| StoreError::NotFound(target.id.clone()))?;
        let entry = open
            .remove(&owner)
            .ok_or_else(|| StoreError::NotFound(owner.clone()))?;

        if entry.dirty {
            self.backing.save(&entry.location, &entry.notebook).await?;
        }
        debug!(location = %entry.location, "Closed notebook");
        Ok(())
    }
}

/// Bookkeeping while applying an edited snapshot
struct UpdateContext {
    /// Every id already in the notebook being updated
    target_ids: HashSet<String>,
    /// Node id -> id of the other open notebook holding it
    foreign: HashMap<String, String>,
    /// (notebook id, node id) to detach once the update is accepted
    moves: Vec<(String, String)>,
    /// (notebook id, section id) whose pages follow the section
    sections: Vec<(String, String)>,
}

impl UpdateContext {
    /// New children for a container: the updated order first, then any
    /// existing child the update left out. Nothing is deleted.
    ///
    /// The result is stably ordered sections first, then groups, then
    /// recycle bins, so an update cannot put a group ahead of a section.
    fn merge_children(&mut self, update: &[Node], mut existing: Vec<Node>) -> Result<Vec<Node>, StoreError> {
        let mut merged = Vec::with_capacity(update.len() + existing.len());

        for node in update {
            match existing.iter().position(|n| !node.id.is_empty() && n.id == node.id) {
                Some(pos) => {
                    let current = existing.remove(pos);
                    let is_group = current.is_group();
                    let children = if is_group {
                        self.merge_children(&node.children, current.children)?
                    } else {
                        Vec::new()
                    };
                    merged.push(Node {
                        name: node.name.clone(),
                        is_recycle_bin: is_group && node.is_recycle_bin,
                        color: node.color.clone(),
                        children,
                        ..current
                    });
                }
                None => merged.push(self.place(node)?),
            }
        }

        merged.extend(existing);
        merged.sort_by_key(placement_rank);
        Ok(merged)
    }

    /// A node new to this notebook: either brand new (empty id) or moved in from another notebook
    fn place(&mut self, node: &Node) -> Result<Node, StoreError> {
        let mut placed = node.shallow();

        if node.id.is_empty() {
            validate_name(&node.name)?;
            placed.id = new_id();
        } else if self.target_ids.contains(&node.id) {
            return Err(StoreError::InvalidOperation(format!(
                "'{}' cannot be moved within its own notebook",
                node.name
            )));
        } else {
            let owner = self
                .foreign
                .get(&node.id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(node.id.clone()))?;
            if node.is_section() {
                self.sections.push((owner.clone(), node.id.clone()));
            }
            self.moves.push((owner, node.id.clone()));
        }

        if node.is_group() {
            placed.children = node
                .children
                .iter()
                .map(|child| self.place(child))
                .collect::<Result<Vec<_>, _>>()?;
            placed.children.sort_by_key(placement_rank);
        } else {
            placed.is_recycle_bin = false;
        }

        Ok(placed)
    }
}

fn placement_rank(node: &Node) -> u8 {
    match (node.kind, node.is_recycle_bin) {
        (NodeKind::Section, _) => 0,
        (NodeKind::Group, false) => 1,
        (NodeKind::Group, true) => 2,
    }
}

fn new_id() -> String {
    format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase())
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidName("name is blank".to_string()));
    }
    if INVALID_NAME_CHARS.is_match(name) {
        return Err(StoreError::InvalidName(format!(
            "'{}' contains one of \\ / : * ? \" < > | # %",
            name
        )));
    }
    Ok(())
}

fn object_kind(kind: NodeKind) -> ObjectKind {
    match kind {
        NodeKind::Section => ObjectKind::Section,
        NodeKind::Group => ObjectKind::Group,
    }
}

fn all_ids(tree: &Tree) -> Vec<String> {
    let mut ids = vec![tree.id.clone()];
    ids.extend(tree.children.iter().flat_map(Node::subtree_ids));
    ids
}

/// Id of the open notebook containing `id`
fn owner_of(open: &HashMap<String, OpenNotebook>, id: &str) -> Option<String> {
    open.iter()
        .find(|(_, e)| e.notebook.tree.contains(id))
        .map(|(notebook_id, _)| notebook_id.clone())
}

fn section_owner(open: &HashMap<String, OpenNotebook>, section_id: &str) -> Result<String, StoreError> {
    let owner = owner_of(open, section_id).ok_or_else(|| StoreError::NotFound(section_id.to_string()))?;
    match open[&owner].notebook.tree.find(section_id) {
        Some(node) if node.is_section() => Ok(owner),
        _ => Err(StoreError::InvalidOperation(format!("{} is not a section", section_id))),
    }
}

fn entry_mut<'a>(
    open: &'a mut HashMap<String, OpenNotebook>,
    notebook_id: &str,
) -> Result<&'a mut OpenNotebook, StoreError> {
    open.get_mut(notebook_id)
        .ok_or_else(|| StoreError::NotFound(notebook_id.to_string()))
}

/// Children list of the notebook root or of a group
fn children_mut<'a>(tree: &'a mut Tree, container_id: &str) -> Result<&'a mut Vec<Node>, StoreError> {
    if tree.id == container_id {
        return Ok(&mut tree.children);
    }
    match tree.find_mut(container_id) {
        Some(node) if node.is_group() => Ok(&mut node.children),
        Some(node) => Err(StoreError::InvalidOperation(format!(
            "section '{}' cannot hold children",
            node.name
        ))),
        None => Err(StoreError::NotFound(container_id.to_string())),
    }
}

/// Give every object in the notebook a fresh id, keeping pages attached
fn rekey(notebook: &mut Notebook) {
    fn rekey_nodes(nodes: &mut [Node], sections: &mut HashMap<String, SectionContent>) {
        for node in nodes {
            let fresh = new_id();
            if let Some(content) = sections.remove(&node.id) {
                sections.insert(fresh.clone(), content);
            }
            node.id = fresh;
            rekey_nodes(&mut node.children, sections);
        }
    }

    notebook.tree.id = new_id();
    rekey_nodes(&mut notebook.tree.children, &mut notebook.sections);
}
