//! Power graphs.
//!
//! Power-capable tiles (solar panels, batteries, power nodes, drills and
//! turrets) are partitioned into connected graphs by flood fill. Two power
//! tiles are connected when their squared distance is at most the square of
//! the reach, where the reach is the node range if either tile is a power
//! node and 1 otherwise. The relation is symmetric, so the partition does
//! not depend on which tile the fill starts from.
//!
//! Graphs are rebuilt lazily: a rebuild is requested whenever the tile
//! topology changes and performed at the start of the next update. The
//! per-graph balance is recomputed every tick and written into the map
//! state grid as a `0..=100` efficiency byte.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, clamped_ratio, to_percent_byte};
use crate::frame::FrameMut;
use crate::layout::FrameLayout;
use crate::tile::TileType;

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// Power tuning. Production and demand are in abstract power units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerTuning {
    /// Euclidean reach of a power node, in tiles.
    pub node_range: u32,
    pub solar_output: u32,
    pub drill_demand: u32,
    pub turret_demand: u32,
}

impl Default for PowerTuning {
    fn default() -> Self {
        Self {
            node_range: 6,
            solar_output: 10,
            drill_demand: 5,
            turret_demand: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Graphs
// ---------------------------------------------------------------------------

/// Identifies a power graph within one rebuild. Ids are assigned in
/// row-major order of each graph's first tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PowerGraphId(pub u32);

/// One connected component of power tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerGraph {
    pub id: PowerGraphId,
    /// Member tile indices in discovery order.
    pub tiles: Vec<usize>,
    /// Solar panels.
    pub producers: u32,
    /// Drills.
    pub consumers: u32,
    pub turrets: u32,
    pub batteries: u32,
    pub nodes: u32,
    pub produced: u64,
    pub consumed: u64,
    /// `min(1, produced / consumed)`, or 1 with no demand.
    pub efficiency: Fixed64,
}

impl PowerGraph {
    fn new(id: PowerGraphId) -> Self {
        Self {
            id,
            tiles: Vec::new(),
            producers: 0,
            consumers: 0,
            turrets: 0,
            batteries: 0,
            nodes: 0,
            produced: 0,
            consumed: 0,
            efficiency: Fixed64::ONE,
        }
    }

    fn add_tile(&mut self, index: usize, tile: TileType) {
        self.tiles.push(index);
        match tile {
            TileType::SolarPanel => self.producers += 1,
            TileType::DrillMechanical => self.consumers += 1,
            TileType::TurretDuo => self.turrets += 1,
            TileType::Battery => self.batteries += 1,
            TileType::PowerNode => self.nodes += 1,
            _ => {}
        }
    }

    fn balance(&mut self, tuning: &PowerTuning) {
        let rate = |count: u32, per: u32| u64::from(count) * u64::from(per);
        self.produced = rate(self.producers, tuning.solar_output);
        self.consumed = rate(self.consumers, tuning.drill_demand)
            .saturating_add(rate(self.turrets, tuning.turret_demand));
        self.efficiency = clamped_ratio(self.produced, self.consumed);
    }

    /// Efficiency as written to the map state grid.
    pub fn efficiency_byte(&self) -> u8 {
        to_percent_byte(self.efficiency)
    }
}

// ---------------------------------------------------------------------------
// PowerSystem
// ---------------------------------------------------------------------------

/// Owns the graph partition and the tile-to-graph lookup.
#[derive(Debug, Clone)]
pub struct PowerSystem {
    tuning: PowerTuning,
    needs_rebuild: bool,
    graphs: Vec<PowerGraph>,
    tile_graph: Vec<Option<PowerGraphId>>,
    rebuilds: u64,
}

impl PowerSystem {
    /// A fresh system. The first update always rebuilds.
    pub fn new(tuning: PowerTuning, cells: usize) -> Self {
        Self {
            tuning,
            needs_rebuild: true,
            graphs: Vec::new(),
            tile_graph: vec![None; cells],
            rebuilds: 0,
        }
    }

    pub fn tuning(&self) -> &PowerTuning {
        &self.tuning
    }

    /// Mark the partition stale; the next update rebuilds it.
    pub fn request_rebuild(&mut self) {
        self.needs_rebuild = true;
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Number of rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn graphs(&self) -> &[PowerGraph] {
        &self.graphs
    }

    /// The graph containing tile `index`, if any.
    pub fn graph_of(&self, index: usize) -> Option<&PowerGraph> {
        let id = (*self.tile_graph.get(index)?)?;
        self.graphs.get(id.0 as usize)
    }

    pub fn efficiency_at(&self, index: usize) -> Option<Fixed64> {
        self.graph_of(index).map(|g| g.efficiency)
    }

    /// Rebuild if requested, rebalance every graph and write efficiency
    /// bytes for member tiles. Returns whether a rebuild happened.
    pub fn update(&mut self, frame: &mut FrameMut<'_>) -> bool {
        let rebuilt = self.needs_rebuild;
        if rebuilt {
            let layout = *frame.layout();
            self.rebuild(&layout, &*frame.tiles);
            self.needs_rebuild = false;
        }

        for graph in &mut self.graphs {
            graph.balance(&self.tuning);
            let byte = graph.efficiency_byte();
            for &idx in &graph.tiles {
                frame.map_state[idx] = byte;
            }
        }

        rebuilt
    }

    /// Recompute the partition from scratch.
    pub fn rebuild(&mut self, layout: &FrameLayout, tiles: &[u16]) {
        self.graphs.clear();
        self.tile_graph.clear();
        self.tile_graph.resize(layout.cells(), None);

        let tile_at = |idx: usize| TileType::from_code(tiles[idx]).unwrap_or_default();
        let range = i64::from(self.tuning.node_range);
        let (width, height) = (layout.width as i64, layout.height as i64);
        let mut queue = VecDeque::new();

        for start in 0..layout.cells() {
            let start_tile = tile_at(start);
            if !start_tile.is_power() || self.tile_graph[start].is_some() {
                continue;
            }

            let id = PowerGraphId(self.graphs.len() as u32);
            let mut graph = PowerGraph::new(id);
            self.tile_graph[start] = Some(id);
            graph.add_tile(start, start_tile);
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                let (cx, cy) = layout.tile_coords(current);
                let (cx, cy) = (i64::from(cx), i64::from(cy));
                let current_is_node = tile_at(current) == TileType::PowerNode;

                for y in (cy - range).max(0)..=(cy + range).min(height - 1) {
                    for x in (cx - range).max(0)..=(cx + range).min(width - 1) {
                        let n = (y * width + x) as usize;
                        if self.tile_graph[n].is_some() {
                            continue;
                        }
                        let tile = tile_at(n);
                        if !tile.is_power() {
                            continue;
                        }
                        let reach = if current_is_node || tile == TileType::PowerNode {
                            range
                        } else {
                            1
                        };
                        let dist_sq = (x - cx) * (x - cx) + (y - cy) * (y - cy);
                        if dist_sq <= reach * reach {
                            self.tile_graph[n] = Some(id);
                            graph.add_tile(n, tile);
                            queue.push_back(n);
                        }
                    }
                }
            }

            graph.balance(&self.tuning);
            self.graphs.push(graph);
        }

        self.rebuilds += 1;
        tracing::debug!(graphs = self.graphs.len(), rebuilds = self.rebuilds, "power graphs rebuilt");
    }

    /// Drop the partition and request a rebuild (used after a load).
    pub fn reset(&mut self) {
        self.graphs.clear();
        self.tile_graph.fill(None);
        self.needs_rebuild = true;
    }
}
