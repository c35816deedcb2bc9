//! Celestial bodies and the tree that owns them.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::DVec3;
use orrery_orbit::{DEFAULT_TRAIL_SAMPLES, OrbitTrack};
use rustc_hash::FxHashSet;

use crate::error::SceneError;
use crate::frame::Frames;
use crate::lod::ScreenMetrics;
use crate::source::{BodyParams, BodyRecord, BodySource};

/// Largest id that still fits in a 24-bit picking color.
pub const MAX_BODY_ID: u32 = (1 << 24) - 1;

static NEXT_BODY_ID: AtomicU32 = AtomicU32::new(1);

/// Process-wide unique body identity, also the picking color key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u32);

impl BodyId {
    /// Allocate the next id. Ids are never reused.
    pub fn allocate() -> Result<Self, SceneError> {
        NEXT_BODY_ID
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                (id <= MAX_BODY_ID).then_some(id + 1)
            })
            .map(BodyId)
            .map_err(|_| SceneError::IdSpaceExhausted { max: MAX_BODY_ID })
    }

    /// Wrap a raw value, e.g. one decoded from a picking pixel.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Position of a body inside its [`BodyTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyIndex(pub usize);

/// One body: parameters, optional orbit, frames and screen-space metrics.
#[derive(Debug)]
pub struct BodyNode {
    id: BodyId,
    params: BodyParams,
    parent: Option<BodyIndex>,
    children: Vec<BodyIndex>,
    orbit: Option<OrbitTrack>,
    pub(crate) frames: Frames,
    pub(crate) screen: ScreenMetrics,
}

impl BodyNode {
    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    pub fn params(&self) -> &BodyParams {
        &self.params
    }

    pub fn radius(&self) -> f64 {
        self.params.radius
    }

    pub fn bounding_radius(&self) -> f64 {
        self.params.bounding_radius()
    }

    pub fn is_light_source(&self) -> bool {
        self.params.light_source
    }

    pub fn color(&self) -> [f32; 3] {
        self.params.color
    }

    pub fn has_ring(&self) -> bool {
        self.params.ring.is_some()
    }

    /// Non-owning link to the parent body.
    pub fn parent(&self) -> Option<BodyIndex> {
        self.parent
    }

    pub fn children(&self) -> &[BodyIndex] {
        &self.children
    }

    pub fn orbit(&self) -> Option<&OrbitTrack> {
        self.orbit.as_ref()
    }

    pub(crate) fn orbit_mut(&mut self) -> Option<&mut OrbitTrack> {
        self.orbit.as_mut()
    }

    pub fn frames(&self) -> &Frames {
        &self.frames
    }

    /// Origin of the body's own frame.
    pub fn center(&self) -> DVec3 {
        self.frames.reference.translation
    }

    pub fn screen(&self) -> ScreenMetrics {
        self.screen
    }

    pub fn set_screen(&mut self, screen: ScreenMetrics) {
        self.screen = screen;
    }
}

/// Arena of bodies in pre-order: every parent precedes its satellites, and
/// index 0 is the root.
#[derive(Debug, Default)]
pub struct BodyTree {
    nodes: Vec<BodyNode>,
}

impl BodyTree {
    /// Build the tree rooted at `root` by following satellite lists.
    pub fn build(source: &dyn BodySource, root: &str) -> Result<Self, SceneError> {
        Self::build_with_samples(source, root, DEFAULT_TRAIL_SAMPLES)
    }

    pub fn build_with_samples(
        source: &dyn BodySource,
        root: &str,
        trail_samples: usize,
    ) -> Result<Self, SceneError> {
        let record = source
            .record(root)
            .ok_or_else(|| SceneError::UnknownRoot(root.to_owned()))?;

        let mut builder = Builder {
            source,
            trail_samples,
            tree: BodyTree::default(),
            seen: FxHashSet::default(),
            path: Vec::new(),
        };
        builder.add(root, record, None)?;
        log::info!("Built body tree with {} bodies", builder.tree.len());
        Ok(builder.tree)
    }

    pub fn root(&self) -> Option<BodyIndex> {
        (!self.nodes.is_empty()).then_some(BodyIndex(0))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: BodyIndex) -> Option<&BodyNode> {
        self.nodes.get(index.0)
    }

    pub fn get_mut(&mut self, index: BodyIndex) -> Option<&mut BodyNode> {
        self.nodes.get_mut(index.0)
    }

    pub fn find(&self, name: &str) -> Option<BodyIndex> {
        self.nodes.iter().position(|n| n.name() == name).map(BodyIndex)
    }

    pub fn by_id(&self, id: BodyId) -> Option<BodyIndex> {
        self.nodes.iter().position(|n| n.id == id).map(BodyIndex)
    }

    /// Bodies in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyIndex, &BodyNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (BodyIndex(i), n))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(BodyNode::name)
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [BodyNode] {
        &mut self.nodes
    }

    pub(crate) fn nodes(&self) -> &[BodyNode] {
        &self.nodes
    }
}

impl std::ops::Index<BodyIndex> for BodyTree {
    type Output = BodyNode;

    fn index(&self, index: BodyIndex) -> &BodyNode {
        &self.nodes[index.0]
    }
}

struct Builder<'a> {
    source: &'a dyn BodySource,
    trail_samples: usize,
    tree: BodyTree,
    seen: FxHashSet<String>,
    path: Vec<String>,
}

impl Builder<'_> {
    fn add(
        &mut self,
        name: &str,
        record: BodyRecord,
        parent: Option<BodyIndex>,
    ) -> Result<BodyIndex, SceneError> {
        let params = BodyParams::resolve(name, &record);

        let orbit = match parent {
            None => None,
            Some(_) => match OrbitTrack::with_samples(params.elements, self.trail_samples) {
                Ok(track) => Some(track),
                Err(err) => {
                    log::warn!("body '{name}' has invalid orbital elements ({err}), no orbit");
                    None
                }
            },
        };

        let index = BodyIndex(self.tree.nodes.len());
        let satellites = params.satellites.clone();
        self.tree.nodes.push(BodyNode {
            id: BodyId::allocate()?,
            params,
            parent,
            children: Vec::new(),
            orbit,
            frames: Frames::default(),
            screen: ScreenMetrics::default(),
        });
        self.seen.insert(name.to_owned());
        self.path.push(name.to_owned());

        for satellite in satellites {
            if self.path.contains(&satellite) {
                log::warn!("body '{satellite}' is its own ancestor, skipping");
                continue;
            }
            if self.seen.contains(&satellite) {
                log::warn!("body '{satellite}' already placed in the tree, skipping");
                continue;
            }
            let record = self.source.record(&satellite).unwrap_or_else(|| {
                log::warn!("body '{satellite}' missing from catalog, using defaults");
                BodyRecord::default()
            });
            let child = self.add(&satellite, record, Some(index))?;
            self.tree.nodes[index.0].children.push(child);
        }

        self.path.pop();
        Ok(index)
    }
}
