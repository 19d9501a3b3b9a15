//! Shared surface, its node registry, and the card list container.

use crate::card::Card;
use crate::config::AnchorConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

/// The visual area steps render into. Holds the current size, observable by
/// bindings, and a registry of nodes keyed by stable id.
pub struct Surface {
    size: watch::Sender<SurfaceSize>,
    graph: Mutex<SceneGraph>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("size", &self.size())
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        let (size, _) = watch::channel(SurfaceSize { width, height });
        Self {
            size,
            graph: Mutex::new(SceneGraph::default()),
        }
    }

    pub fn size(&self) -> SurfaceSize {
        *self.size.borrow()
    }

    pub fn resize(&self, width: f64, height: f64) {
        let previous = self.size.send_replace(SurfaceSize { width, height });
        if previous.width != width || previous.height != height {
            tracing::debug!(width, height, "surface resized");
        }
    }

    pub fn watch_size(&self) -> watch::Receiver<SurfaceSize> {
        self.size.subscribe()
    }

    pub fn lookup(&self, key: &str) -> Option<Container> {
        lock(&self.graph).nodes.get(key).cloned()
    }

    /// Returns the list container registered under `key`, creating and
    /// attaching an empty one first if there is none.
    pub fn get_or_insert_list(&self, key: &str) -> Container {
        let mut graph = lock(&self.graph);
        let (container, created) = graph.get_or_insert_with(key, || Container::new(key));
        if created {
            tracing::debug!(key, "created list container");
        }
        container
    }

    pub fn node_count(&self) -> usize {
        lock(&self.graph).nodes.len()
    }
}

#[derive(Default)]
struct SceneGraph {
    nodes: HashMap<String, Container>,
}

impl SceneGraph {
    fn get_or_insert_with(
        &mut self,
        key: &str,
        create: impl FnOnce() -> Container,
    ) -> (Container, bool) {
        if let Some(existing) = self.nodes.get(key) {
            return (existing.clone(), false);
        }
        let container = create();
        self.nodes.insert(key.to_string(), container.clone());
        (container, true)
    }
}

/// Position expressed as fractions of the surface size. Evaluated against
/// the surface's current size on every read, so it follows resizes for as
/// long as the binding is installed.
#[derive(Debug, Clone)]
pub struct PositionBinding {
    x_ratio: f64,
    y_ratio: f64,
    size: watch::Receiver<SurfaceSize>,
}

impl PositionBinding {
    pub fn new(surface: &Surface, x_ratio: f64, y_ratio: f64) -> Self {
        Self {
            x_ratio,
            y_ratio,
            size: surface.watch_size(),
        }
    }

    pub fn from_anchor(surface: &Surface, anchor: &AnchorConfig) -> Self {
        Self::new(surface, anchor.x_ratio(), anchor.y_ratio())
    }

    pub fn evaluate(&self) -> (f64, f64) {
        let size = *self.size.borrow();
        (size.width * self.x_ratio, size.height * self.y_ratio)
    }
}

/// Vertically stacked list of cards. Clones share the same node.
#[derive(Clone)]
pub struct Container {
    node: Arc<ContainerNode>,
}

struct ContainerNode {
    id: String,
    children: Mutex<Vec<Card>>,
    binding: Mutex<Option<PositionBinding>>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.node.id)
            .field("children", &self.len())
            .finish()
    }
}

impl Container {
    fn new(id: &str) -> Self {
        Self {
            node: Arc::new(ContainerNode {
                id: id.to_string(),
                children: Mutex::new(Vec::new()),
                binding: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn same_node(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Appends a card at the bottom of the list with the given bottom margin.
    pub fn append(&self, mut card: Card, margin_bottom: f64) {
        card.margin_bottom = margin_bottom;
        lock(&self.node.children).push(card);
    }

    pub fn len(&self) -> usize {
        lock(&self.node.children).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self) -> Vec<Card> {
        lock(&self.node.children).clone()
    }

    /// Replaces any earlier binding.
    pub fn bind_position(&self, binding: PositionBinding) {
        *lock(&self.node.binding) = Some(binding);
    }

    pub fn is_bound(&self) -> bool {
        lock(&self.node.binding).is_some()
    }

    /// Current layout position, or `None` while unbound.
    pub fn layout_position(&self) -> Option<(f64, f64)> {
        lock(&self.node.binding).as_ref().map(PositionBinding::evaluate)
    }

    /// Vertical offset of each child relative to the container origin.
    pub fn child_offsets(&self) -> Vec<f64> {
        lock(&self.node.children)
            .iter()
            .scan(0.0, |y, card| {
                let top = *y;
                *y += card.outer_height();
                Some(top)
            })
            .collect()
    }
}

/// Locates or creates the card list container and binds its position to the
/// surface size.
#[derive(Debug, Clone)]
pub struct ContainerManager {
    key: String,
    anchor: AnchorConfig,
}

impl ContainerManager {
    pub fn new(key: impl Into<String>, anchor: AnchorConfig) -> Self {
        Self {
            key: key.into(),
            anchor,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get_or_create(&self, surface: &Surface) -> Container {
        let container = surface.get_or_insert_list(&self.key);
        container.bind_position(PositionBinding::from_anchor(surface, &self.anchor));
        container
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
