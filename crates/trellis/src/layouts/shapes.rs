use super::place;
use crate::config::LayoutConfig;
use crate::error::Result;
use crate::strategy::{LayoutStrategy, StrategyKind};
use std::f64::consts::{PI, TAU};
use trellis_graph::{Graph, Vec3};

/// Square-ish grid in the XY plane, centered on the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grid;

impl LayoutStrategy for Grid {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Grid
    }

    fn init(&mut self, graph: &mut Graph, config: &LayoutConfig) -> Result<()> {
        let ids = graph.node_ids();
        let n = ids.len();
        if n == 0 {
            return Ok(());
        }
        let spacing = config.placement.spacing;
        let cols = (n as f64).sqrt().ceil().max(1.0) as usize;
        let rows = n.div_ceil(cols);
        let x0 = -((cols - 1) as f64) * spacing / 2.0;
        let y0 = ((rows - 1) as f64) * spacing / 2.0;
        let positions = ids.into_iter().enumerate().map(|(i, id)| {
            let (row, col) = (i / cols, i % cols);
            let p = Vec3::new(x0 + col as f64 * spacing, y0 - row as f64 * spacing, 0.0);
            (id, p)
        });
        place(graph, positions.collect::<Vec<_>>());
        Ok(())
    }
}

/// Ring in the XY plane. The radius grows so neighbors stay `spacing` apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct Circular;

impl LayoutStrategy for Circular {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Circular
    }

    fn init(&mut self, graph: &mut Graph, config: &LayoutConfig) -> Result<()> {
        let ids = graph.node_ids();
        let n = ids.len();
        if n == 0 {
            return Ok(());
        }
        if n == 1 {
            place(graph, [(ids[0].clone(), Vec3::zeros())]);
            return Ok(());
        }
        let radius = config
            .placement
            .radius
            .max(n as f64 * config.placement.spacing / TAU);
        let positions = ids.into_iter().enumerate().map(|(i, id)| {
            let a = TAU * i as f64 / n as f64;
            (id, Vec3::new(radius * a.cos(), radius * a.sin(), 0.0))
        });
        place(graph, positions.collect::<Vec<_>>());
        Ok(())
    }
}

/// Fibonacci sphere.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sphere;

impl LayoutStrategy for Sphere {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sphere
    }

    fn init(&mut self, graph: &mut Graph, config: &LayoutConfig) -> Result<()> {
        let ids = graph.node_ids();
        let n = ids.len();
        if n == 0 {
            return Ok(());
        }
        // Surface area per node ~ spacing^2.
        let radius = config
            .placement
            .radius
            .max(config.placement.spacing * (n as f64 / (4.0 * PI)).sqrt());
        let golden = PI * (3.0 - 5f64.sqrt());
        let positions = ids.into_iter().enumerate().map(|(i, id)| {
            let y = if n == 1 {
                0.0
            } else {
                1.0 - 2.0 * i as f64 / (n - 1) as f64
            };
            let r = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden * i as f64;
            (id, Vec3::new(r * theta.cos(), y, r * theta.sin()) * radius)
        });
        place(graph, positions.collect::<Vec<_>>());
        Ok(())
    }
}
