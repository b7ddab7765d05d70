//! Sector graph and asteroid fields

use std::collections::VecDeque;

use prospector_core::RandomStream;
use prospector_core::constants::{MAX_ASTEROIDS, MAX_NEIGHBORS, MAX_NODES, N_COMMODITIES};

use crate::tuning::{TRAVEL_FUEL_CAP, TRAVEL_TIME_CAP};

pub const STATION: usize = 0;
const UNREACHABLE_HOPS: u8 = (MAX_NODES - 1) as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Station,
    Cluster,
    Hazard,
}

impl NodeKind {
    /// Position in the node-type one-hot
    pub fn slot(self) -> usize {
        match self {
            NodeKind::Station => 0,
            NodeKind::Cluster => 1,
            NodeKind::Hazard => 2,
        }
    }
}

/// One direction of a lane between two nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lane {
    pub to: usize,
    pub ticks: u32,
    pub fuel_cost: f32,
    pub threat: f32,
    /// What the ship believes `threat` is
    pub threat_estimate: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Asteroid {
    pub composition: [f32; N_COMMODITIES],
    pub richness: f32,
    pub stability: f32,
    pub noise_profile: f32,
    pub composition_estimate: [f32; N_COMMODITIES],
    pub stability_estimate: f32,
    pub confidence: f32,
    pub depletion: f32,
}

impl Asteroid {
    fn generate(rng: &mut RandomStream) -> Self {
        let composition = rng.dirichlet_ones();
        let richness = rng.lognormal(-0.2, 0.65).clamp(0.2, 4.0);
        let stability = rng.beta_3_2();
        let noise_profile = rng.uniform(0.04, 0.22);
        let composition_estimate = rng.dirichlet_ones();
        Self {
            composition,
            richness,
            stability,
            noise_profile,
            composition_estimate,
            stability_estimate: 0.5,
            confidence: 0.1,
            depletion: 0.0,
        }
    }

    pub fn is_minable(&self) -> bool {
        self.depletion < 1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub hazard: f32,
    pub pirate: f32,
    pub hops_to_station: u8,
    /// Indexed by travel action slot
    pub lanes: [Option<Lane>; MAX_NEIGHBORS],
    pub asteroids: Vec<Asteroid>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            hazard: 0.0,
            pirate: 0.0,
            hops_to_station: UNREACHABLE_HOPS,
            lanes: [None; MAX_NEIGHBORS],
            asteroids: Vec::new(),
        }
    }

    fn links_to(&self, other: usize) -> bool {
        self.lanes.iter().flatten().any(|lane| lane.to == other)
    }

    fn free_slot(&self) -> Option<usize> {
        self.lanes.iter().position(Option::is_none)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub nodes: Vec<Node>,
}

impl World {
    /// Build the sector graph and asteroid fields
    pub fn generate(rng: &mut RandomStream) -> Self {
        let node_count = rng.range(8, MAX_NODES as u32 + 1) as usize;

        let mut nodes = Vec::with_capacity(node_count);
        nodes.push(Node::new(NodeKind::Station));
        for _ in 1..node_count {
            let kind = if rng.next_uniform() < 0.25 {
                NodeKind::Hazard
            } else {
                NodeKind::Cluster
            };
            let mut node = Node::new(kind);
            node.hazard = rng.uniform(0.05, 0.35);
            node.pirate = rng.uniform(0.05, 0.30);
            if kind == NodeKind::Hazard {
                node.hazard += 0.25;
                node.pirate += 0.12;
            }
            nodes.push(node);
        }

        let mut world = Self { nodes };

        // random tree; a parent with no free slot leaves the child unlinked
        for node in 1..node_count {
            let parent = rng.range(0, node as u32) as usize;
            world.link(rng, node, parent);
        }
        for _ in 0..node_count {
            let u = rng.range(0, node_count as u32) as usize;
            let v = rng.range(0, node_count as u32) as usize;
            if u != v {
                world.link(rng, u, v);
            }
        }

        world.compute_hops();

        for node in world.nodes.iter_mut().filter(|n| n.kind != NodeKind::Station) {
            let count = rng.range(5, MAX_ASTEROIDS as u32 + 1) as usize;
            node.asteroids = (0..count).map(|_| Asteroid::generate(rng)).collect();
        }

        world
    }

    /// Add a two-way lane unless it exists or either end has no free slot
    fn link(&mut self, rng: &mut RandomStream, u: usize, v: usize) {
        if self.nodes[u].links_to(v) {
            return;
        }
        let (Some(u_slot), Some(v_slot)) = (self.nodes[u].free_slot(), self.nodes[v].free_slot())
        else {
            return;
        };

        let ticks = rng.range(1, TRAVEL_TIME_CAP + 1);
        let fuel_cost = rng.uniform(20.0, TRAVEL_FUEL_CAP * 0.7);
        let threat = (0.5 * (self.nodes[u].hazard + self.nodes[v].hazard)
            + 0.5 * (self.nodes[u].pirate + self.nodes[v].pirate)
            + rng.normal(0.0, 0.05))
        .clamp(0.0, 1.0);

        let lane = |to| Lane {
            to,
            ticks,
            fuel_cost,
            threat,
            threat_estimate: 0.5,
        };
        self.nodes[u].lanes[u_slot] = Some(lane(v));
        self.nodes[v].lanes[v_slot] = Some(lane(u));
    }

    fn compute_hops(&mut self) {
        let mut queue = VecDeque::from([STATION]);
        self.nodes[STATION].hops_to_station = 0;
        let mut visited = vec![false; self.nodes.len()];
        visited[STATION] = true;

        while let Some(current) = queue.pop_front() {
            let hops = self.nodes[current].hops_to_station;
            let lanes = self.nodes[current].lanes;
            for lane in lanes.iter().flatten() {
                if visited[lane.to] {
                    continue;
                }
                visited[lane.to] = true;
                self.nodes[lane.to].hops_to_station = (hops + 1).min(UNREACHABLE_HOPS);
                queue.push_back(lane.to);
            }
        }
    }

    pub fn lane(&self, node: usize, slot: usize) -> Option<&Lane> {
        self.nodes[node].lanes.get(slot)?.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_graph_is_connected() {
        for seed in 0..40 {
            let mut rng = RandomStream::new(seed);
            let world = World::generate(&mut rng);
            assert!((8..=MAX_NODES).contains(&world.nodes.len()));
            assert_eq!(world.nodes[STATION].kind, NodeKind::Station);
            assert!(world.nodes[STATION].asteroids.is_empty());
            for node in &world.nodes[1..] {
                assert!(node.hops_to_station >= 1);
                assert!((5..=MAX_ASTEROIDS).contains(&node.asteroids.len()));
            }
        }
    }

    #[test]
    fn test_lanes_mirror_each_other() {
        let mut rng = RandomStream::new(42);
        let world = World::generate(&mut rng);
        for (index, node) in world.nodes.iter().enumerate() {
            for lane in node.lanes.iter().flatten() {
                let back = world.nodes[lane.to]
                    .lanes
                    .iter()
                    .flatten()
                    .find(|l| l.to == index)
                    .expect("reverse lane");
                assert_eq!(back.ticks, lane.ticks);
                assert_eq!(back.fuel_cost, lane.fuel_cost);
                assert_eq!(back.threat, lane.threat);
                assert!((0.0..=1.0).contains(&lane.threat));
            }
        }
    }

    #[test]
    fn test_first_station_lane_reaches_node_one() {
        let mut rng = RandomStream::new(5);
        let world = World::generate(&mut rng);
        assert_eq!(world.lane(STATION, 0).map(|l| l.to), Some(1));
        assert!(world.lane(STATION, MAX_NEIGHBORS).is_none());
    }
}
