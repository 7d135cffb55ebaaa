use super::engine::SimulationEngine;
use super::protocol::{Command, EdgeSnapshot, EngineEvent, NodeSnapshot};
use super::worker::Worker;
use crate::config::{ForceSettings, LayoutConfig};
use crate::error::{Error, Result};
use crate::strategy::{LayoutStrategy, StrategyKind};
use crossbeam::channel::TryRecvError;
use trellis_graph::{Graph, GraphEvent, Vec3};

fn snapshot_graph(graph: &Graph, settings: &ForceSettings) -> (Vec<NodeSnapshot>, Vec<EdgeSnapshot>) {
    let nodes = graph.nodes().map(NodeSnapshot::from).collect();
    let edges = graph
        .edges()
        .map(|e| EdgeSnapshot::from_edge(e, settings))
        .collect();
    (nodes, edges)
}

/// Force-directed layout running on its own background thread.
///
/// Every call is fire-and-forget: commands go down one channel and [`update`] applies whatever
/// `positionsUpdate`, `stopped` and `error` messages have come back since the last frame. The
/// thread is spawned on the first `init`. Once the thread is lost the instance is dead: the next
/// `update` reports the loss as one `layout:error`, and every call fails with
/// [`Error::EngineUnavailable`]; build a new one instead.
///
/// [`update`]: LayoutStrategy::update
#[derive(Debug, Default)]
pub struct ForceLayout {
    settings: ForceSettings,
    worker: Option<Worker>,
    running: bool,
    lost: bool,
    loss_reported: bool,
    energy: f64,
}

impl ForceLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> &ForceSettings {
        &self.settings
    }

    /// Kinetic energy reported by the most recent update.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    fn send(&mut self, command: Command) -> Result<()> {
        if self.lost {
            return Err(Error::EngineUnavailable);
        }
        let Some(worker) = self.worker.as_ref() else {
            return Err(Error::EngineUnavailable);
        };
        if worker.send(command) {
            Ok(())
        } else {
            self.mark_lost();
            Err(Error::EngineUnavailable)
        }
    }

    /// Sends a command whose failure only matters to the log.
    fn post(&mut self, command: Command) {
        if let Err(err) = self.send(command) {
            tracing::warn!(%err, "force layout command dropped");
        }
    }

    /// Applies every message the worker has sent since the last call.
    fn drain(&mut self, graph: &mut Graph) {
        loop {
            let Some(worker) = self.worker.as_ref() else {
                return;
            };
            match worker.try_recv() {
                Ok(EngineEvent::PositionsUpdate { positions, energy }) => {
                    self.energy = energy;
                    for entry in positions {
                        if let Some(node) = graph.node_mut(&entry.id) {
                            if !node.is_pinned {
                                node.position = entry.position();
                            }
                        }
                    }
                }
                Ok(EngineEvent::Stopped { energy }) => {
                    self.energy = energy;
                    self.running = false;
                    graph.emit(GraphEvent::LayoutStopped {
                        name: StrategyKind::Force.to_string(),
                    });
                }
                Ok(EngineEvent::Error { error }) => {
                    tracing::error!(%error, "simulation engine failed");
                    self.running = false;
                    graph.emit(GraphEvent::LayoutError { error });
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.mark_lost();
                    self.worker = None;
                    return;
                }
            }
        }
    }

    fn mark_lost(&mut self) {
        if !self.lost {
            tracing::error!("simulation thread lost; this force layout must be recreated");
        }
        self.lost = true;
        self.running = false;
    }

    /// Pins, fixes or drags a node. The engine may move it for one more tick before the request
    /// lands.
    pub fn update_node_state(
        &mut self,
        id: &str,
        is_fixed: bool,
        is_pinned: bool,
        position: Option<Vec3>,
    ) -> Result<()> {
        self.send(Command::UpdateNodeState {
            id: id.to_string(),
            is_fixed,
            is_pinned,
            position,
        })
    }

    pub fn update_settings(&mut self, settings: ForceSettings) -> Result<()> {
        self.settings = settings.clone();
        self.send(Command::UpdateSettings(settings))
    }
}

impl LayoutStrategy for ForceLayout {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Force
    }

    fn init(&mut self, graph: &mut Graph, config: &LayoutConfig) -> Result<()> {
        if self.lost {
            return Err(Error::EngineUnavailable);
        }
        if self.worker.is_none() {
            let worker = Worker::spawn().map_err(|err| Error::Engine {
                message: format!("failed to spawn simulation thread: {err}"),
            })?;
            self.worker = Some(worker);
        }
        self.settings = config.force.clone();
        self.running = false;
        let (nodes, edges) = snapshot_graph(graph, &self.settings);
        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "force layout init");
        self.send(Command::Init {
            nodes,
            edges,
            settings: self.settings.clone(),
        })
    }

    fn run(&mut self) {
        if self.send(Command::Start).is_ok() {
            self.running = true;
        }
    }

    fn stop(&mut self) {
        if self.worker.is_some() && !self.lost {
            self.post(Command::Stop);
        }
        self.running = false;
    }

    fn kick(&mut self, intensity: f64) {
        self.post(Command::Kick { intensity });
        if self.send(Command::Start).is_ok() {
            self.running = true;
        }
    }

    fn add_node(&mut self, graph: &Graph, id: &str) {
        match graph.node(id) {
            Some(node) => self.post(Command::AddNode(NodeSnapshot::from(node))),
            None => tracing::warn!(node = %id, "add_node: node not in graph"),
        }
    }

    fn remove_node(&mut self, id: &str) {
        self.post(Command::RemoveNode { id: id.to_string() });
    }

    fn add_edge(&mut self, graph: &Graph, id: &str) {
        let Some(edge) = graph.edge(id) else {
            tracing::warn!(edge = %id, "add_edge: edge not in graph");
            return;
        };
        if !graph.has_node(&edge.source) || !graph.has_node(&edge.target) {
            tracing::warn!(edge = %id, "add_edge: missing endpoint, skipped");
            return;
        }
        let snapshot = EdgeSnapshot::from_edge(edge, &self.settings);
        self.post(Command::AddEdge(snapshot));
    }

    fn remove_edge(&mut self, id: &str) {
        self.post(Command::RemoveEdge { id: id.to_string() });
    }

    fn update(&mut self, graph: &mut Graph) {
        if !self.lost {
            self.drain(graph);
        }
        if self.lost && !self.loss_reported {
            self.loss_reported = true;
            graph.emit(GraphEvent::LayoutError {
                error: Error::EngineUnavailable.to_string(),
            });
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn dispose(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
        self.running = false;
    }
}

impl Drop for ForceLayout {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Force layout that runs the simulation to rest inside `init`.
///
/// Used wherever target positions are needed within one call: adaptive morph targets, nested
/// sub-layouts and the command line.
#[derive(Debug, Default)]
pub struct InlineForceLayout {
    engine: Option<SimulationEngine>,
    dirty: bool,
}

impl InlineForceLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn energy(&self) -> f64 {
        self.engine.as_ref().map_or(0.0, SimulationEngine::energy)
    }

    fn relax(&mut self, graph: &mut Graph) -> Result<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        let max_steps = engine.settings().max_inline_steps;
        self.dirty = false;
        let steps = engine.settle(max_steps)?;
        tracing::trace!(steps, energy = engine.energy(), "inline force relaxed");
        for entry in engine.positions() {
            if let Some(node) = graph.node_mut(&entry.id) {
                if !node.is_pinned {
                    node.position = entry.position();
                }
            }
        }
        Ok(())
    }
}

impl LayoutStrategy for InlineForceLayout {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Force
    }

    fn init(&mut self, graph: &mut Graph, config: &LayoutConfig) -> Result<()> {
        let mut engine = SimulationEngine::new(config.force.clone());
        let (nodes, edges) = snapshot_graph(graph, &config.force);
        engine.load(nodes, edges);
        self.engine = Some(engine);
        self.relax(graph)
    }

    fn kick(&mut self, intensity: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.kick(intensity);
            self.dirty = true;
        }
    }

    fn add_node(&mut self, graph: &Graph, id: &str) {
        if let (Some(engine), Some(node)) = (self.engine.as_mut(), graph.node(id)) {
            engine.add_node(NodeSnapshot::from(node));
            self.dirty = true;
        }
    }

    fn remove_node(&mut self, id: &str) {
        if let Some(engine) = self.engine.as_mut() {
            self.dirty |= engine.remove_node(id);
        }
    }

    fn add_edge(&mut self, graph: &Graph, id: &str) {
        if let (Some(engine), Some(edge)) = (self.engine.as_mut(), graph.edge(id)) {
            let snapshot = EdgeSnapshot::from_edge(edge, engine.settings());
            self.dirty |= engine.add_edge(snapshot);
        }
    }

    fn remove_edge(&mut self, id: &str) {
        if let Some(engine) = self.engine.as_mut() {
            self.dirty |= engine.remove_edge(id);
        }
    }

    /// Relaxes again after mutations or a kick.
    fn update(&mut self, graph: &mut Graph) {
        if !self.dirty {
            return;
        }
        if let Err(err) = self.relax(graph) {
            tracing::error!(%err, "inline force layout failed");
            graph.emit(GraphEvent::LayoutError {
                error: err.to_string(),
            });
        }
    }

    fn dispose(&mut self) {
        self.engine = None;
    }
}
