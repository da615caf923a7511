//! Lazily populated mirror of the remote parameter hierarchy.
//!
//! Responsibilities:
//! - Address nodes and node fields by slash-separated paths.
//! - List a node's subtree from the store once, on first need, and cache it.
//!
//! Does NOT handle:
//! - Refreshing. A listed node never fetches again; build a new tree for fresh data.
//! - Writing. Writes go through [`Parameter::write`].
//!
//! Invariants:
//! - `listed == true` implies the children hold every parameter under the node as
//!   of the fetch.
//! - Each node's listing lock is held for its whole fetch, and locks are only taken
//!   parent before child, so concurrent navigation performs one fetch per node.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use ssm_client::{
    NameFilter, ParameterMetadata, ParameterStore, ParameterValue, describe_all, get_all_by_path,
};
use tracing::debug;

use crate::codec::ValueCodec;
use crate::error::{ConfigError, Result};
use crate::parameter::{PARAMETER_FIELDS, Parameter};
use crate::path::ParameterPath;

/// Field names a directory node exposes to path navigation.
pub const DIRECTORY_FIELDS: &[&str] = &["name"];

/// What a tree node stands for.
#[derive(Debug)]
pub enum NodeKind {
    Directory,
    Parameter(Parameter),
}

/// Result of navigating one path.
#[derive(Debug, Clone)]
pub enum Entry {
    Field(Value),
    Node(Arc<TreeNode>),
}

impl Entry {
    pub fn into_node(self) -> Option<Arc<TreeNode>> {
        match self {
            Self::Node(node) => Some(node),
            Self::Field(_) => None,
        }
    }

    pub fn into_field(self) -> Option<Value> {
        match self {
            Self::Field(value) => Some(value),
            Self::Node(_) => None,
        }
    }
}

#[derive(Default)]
struct Listing {
    listed: bool,
    children: BTreeMap<String, Arc<TreeNode>>,
}

/// A position in the parameter namespace.
pub struct TreeNode {
    path: ParameterPath,
    store: Arc<dyn ParameterStore>,
    codec: ValueCodec,
    kind: NodeKind,
    listing: Mutex<Listing>,
}

impl std::fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("listed", &self.is_listed())
            .finish_non_exhaustive()
    }
}

/// Entry point for building trees over one store.
#[derive(Clone)]
pub struct ParameterTree {
    store: Arc<dyn ParameterStore>,
    codec: ValueCodec,
}

impl ParameterTree {
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self {
            store,
            codec: ValueCodec::default(),
        }
    }

    pub fn with_codec(mut self, codec: ValueCodec) -> Self {
        self.codec = codec;
        self
    }

    /// An unlisted node at `/`.
    pub fn root(&self) -> Arc<TreeNode> {
        self.at(ParameterPath::root())
    }

    /// An unlisted directory node at `path`.
    pub fn at(&self, path: impl Into<ParameterPath>) -> Arc<TreeNode> {
        Arc::new(TreeNode::directory(
            path.into(),
            Arc::clone(&self.store),
            self.codec.clone(),
            false,
        ))
    }
}

impl TreeNode {
    fn directory(
        path: ParameterPath,
        store: Arc<dyn ParameterStore>,
        codec: ValueCodec,
        listed: bool,
    ) -> Self {
        Self {
            path,
            store,
            codec,
            kind: NodeKind::Directory,
            listing: Mutex::new(Listing {
                listed,
                children: BTreeMap::new(),
            }),
        }
    }

    fn parameter_node(
        &self,
        parameter: Parameter,
        children: BTreeMap<String, Arc<TreeNode>>,
    ) -> Self {
        Self {
            path: parameter.path().clone(),
            store: Arc::clone(&self.store),
            codec: self.codec.clone(),
            kind: NodeKind::Parameter(parameter),
            listing: Mutex::new(Listing {
                listed: true,
                children,
            }),
        }
    }

    pub fn path(&self) -> &ParameterPath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.as_str()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn store(&self) -> &Arc<dyn ParameterStore> {
        &self.store
    }

    /// The parameter this node holds, if it is a leaf.
    pub fn parameter(&self) -> Option<&Parameter> {
        match &self.kind {
            NodeKind::Parameter(p) => Some(p),
            NodeKind::Directory => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::Parameter(_))
    }

    pub fn is_listed(&self) -> bool {
        self.lock_listing().listed
    }

    /// Names of the fields this node exposes.
    pub fn fields(&self) -> &'static [&'static str] {
        match self.kind {
            NodeKind::Directory => DIRECTORY_FIELDS,
            NodeKind::Parameter(_) => PARAMETER_FIELDS,
        }
    }

    fn field(&self, name: &str) -> Option<Value> {
        match &self.kind {
            NodeKind::Directory => {
                (name == "name").then(|| Value::String(self.name().to_string()))
            }
            NodeKind::Parameter(p) => p.field(name),
        }
    }

    fn lock_listing(&self) -> MutexGuard<'_, Listing> {
        self.listing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Navigate a slash-separated relative path.
    ///
    /// Each segment is first looked up in the node's field table, then among its
    /// children. A field can only be the last segment.
    pub fn navigate(self: &Arc<Self>, path: &str) -> Result<Entry> {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        self.navigate_segments(&segments)
    }

    /// Navigate a sequence of segments.
    pub fn navigate_segments(self: &Arc<Self>, segments: &[&str]) -> Result<Entry> {
        let mut node = Arc::clone(self);
        for (i, segment) in segments.iter().enumerate() {
            if let Some(value) = node.field(segment) {
                if i + 1 == segments.len() {
                    return Ok(Entry::Field(value));
                }
                return Err(ConfigError::NotNavigable {
                    path: node.name().to_string(),
                    field: (*segment).to_string(),
                });
            }
            node = node.child(segment)?;
        }
        Ok(Entry::Node(node))
    }

    /// The child at `segment`, skipping the field table.
    ///
    /// Lists this node first if needed; an unknown segment yields a new unlisted
    /// directory node that is cached for later navigation.
    pub fn child(&self, segment: &str) -> Result<Arc<TreeNode>> {
        let mut listing = self.listed_guard()?;
        if let Some(child) = listing.children.get(segment) {
            return Ok(Arc::clone(child));
        }
        let child = Arc::new(TreeNode::directory(
            self.path.join(segment),
            Arc::clone(&self.store),
            self.codec.clone(),
            false,
        ));
        listing.children.insert(segment.to_string(), Arc::clone(&child));
        Ok(child)
    }

    /// Snapshot of the direct children, ordered by segment.
    pub fn children(&self) -> Result<Vec<Arc<TreeNode>>> {
        let listing = self.listed_guard()?;
        Ok(listing.children.values().cloned().collect())
    }

    /// Every parameter node beneath this one, depth first.
    pub fn walk(&self) -> Result<Vec<Arc<TreeNode>>> {
        let mut out = Vec::new();
        for child in self.children()? {
            if child.is_file() {
                out.push(Arc::clone(&child));
            }
            out.extend(child.walk()?);
        }
        Ok(out)
    }

    /// List this node's subtree from the store if that has not happened yet.
    pub fn ensure_listed(&self) -> Result<()> {
        self.listed_guard().map(drop)
    }

    fn listed_guard(&self) -> Result<MutexGuard<'_, Listing>> {
        let mut listing = self.lock_listing();
        if !listing.listed {
            self.fetch_into(&mut listing)?;
            listing.listed = true;
        }
        Ok(listing)
    }

    fn fetch_into(&self, listing: &mut Listing) -> Result<()> {
        let described = describe_all(
            self.store.as_ref(),
            NameFilter::BeginsWith(self.path.as_str().to_string()),
        )?;
        let values = get_all_by_path(self.store.as_ref(), self.path.as_str())?;
        debug!(
            path = %self.path,
            described = described.len(),
            values = values.len(),
            "listed parameters"
        );

        let mut merged: BTreeMap<String, (Option<ParameterMetadata>, Option<ParameterValue>)> =
            BTreeMap::new();
        for metadata in described {
            let key = metadata.name.clone();
            merged.entry(key).or_default().0 = Some(metadata);
        }
        for value in values {
            let key = value.name.clone();
            merged.entry(key).or_default().1 = Some(value);
        }

        for (name, (metadata, value)) in merged {
            let full = ParameterPath::new(&name);
            let relative = match full.relative_to(&self.path) {
                Some(relative) if !relative.is_empty() => relative,
                _ => continue,
            };
            let parameter = match (metadata, value.as_ref()) {
                (Some(metadata), value) => Parameter::from_metadata(metadata, value),
                (None, Some(value)) => Parameter::from_value(value),
                (None, None) => continue,
            }
            .with_codec(self.codec.clone());
            self.insert(listing, &relative, parameter);
        }
        Ok(())
    }

    /// Insert `parameter` at `relative` below this node without triggering fetches.
    fn insert(&self, listing: &mut Listing, relative: &[String], parameter: Parameter) {
        let (first, rest) = match relative.split_first() {
            Some(split) => split,
            None => return,
        };
        if rest.is_empty() {
            let carried = listing
                .children
                .get(first)
                .map(|existing| existing.lock_listing().children.clone())
                .unwrap_or_default();
            let node = self.parameter_node(parameter, carried);
            listing.children.insert(first.clone(), Arc::new(node));
            return;
        }
        let next = Arc::clone(listing.children.entry(first.clone()).or_insert_with(|| {
            Arc::new(TreeNode::directory(
                self.path.join(first),
                Arc::clone(&self.store),
                self.codec.clone(),
                true,
            ))
        }));
        let mut next_listing = next.lock_listing();
        next.insert(&mut next_listing, rest, parameter);
    }
}
