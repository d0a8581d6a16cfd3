mod grid;

use anyhow::{Result, ensure};
use eframe::egui::{Vec2, vec2};

use crate::util::separation_dir;
use grid::SpatialGrid;

const ATTRACTION_SCALE: f32 = 0.001;
const REPULSION_SCALE: f32 = 8.0;
const CENTRAL_SCALE: f32 = 0.000_05;
const REPULSION_SOFTENING: f32 = 100.0;
const VELOCITY_DAMPING: f32 = 0.9;
const MAX_FORCE: f32 = 60.0;
const MAX_SPEED: f32 = 24.0;
const MIN_SLEEP_SPEED: f32 = 0.02;
const MIN_SLEEP_FORCE: f32 = 0.01;
const EDGE_PRUNE_SCALE: f32 = 0.001;
const NEAR_RADIUS_CELLS: f32 = 1.25;
const MIN_BATCH_FRACTION: f32 = 0.05;

#[derive(Clone, Copy, Debug)]
pub struct KernelConfig {
    pub batch_fraction: f32,
    pub dt: f32,
    pub attraction_force: f32,
    pub link_length: f32,
    pub repulsion_force: f32,
    pub central_force: f32,
    pub edge_pruning: f32,
}

/// The layout engine. Owns per-node position/velocity state and the edge
/// topology; one `step` call advances the system by `dt`, pins the grabbed
/// node to the pointer, and answers the hover hit test. No rendering, no UI.
pub struct SimKernel {
    node_count: usize,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    forces: Vec<Vec2>,
    radii: Vec<f32>,
    edges: Vec<(u32, u32)>,
    max_radius: f32,
    grid: SpatialGrid,
    batch_cursor: usize,
    batch_fraction: f32,
    dt: f32,
    attraction_force: f32,
    link_length: f32,
    repulsion_force: f32,
    central_force: f32,
    edge_pruning: f32,
}

impl SimKernel {
    /// Seeds internal state from the given flat position buffer (x,y
    /// interleaved). Malformed topology is fatal here, never at step time.
    pub fn init(
        seed_positions: Vec<f32>,
        radii: Vec<f32>,
        link_sources: &[i32],
        link_targets: &[i32],
        config: KernelConfig,
    ) -> Result<Self> {
        let node_count = radii.len();
        ensure!(
            seed_positions.len() == node_count * 2,
            "seed positions length {} does not match node count {node_count}",
            seed_positions.len()
        );
        ensure!(
            link_sources.len() == link_targets.len(),
            "link source/target lengths differ ({} vs {})",
            link_sources.len(),
            link_targets.len()
        );

        let mut edges = Vec::with_capacity(link_sources.len());
        for (index, (&source, &target)) in link_sources.iter().zip(link_targets).enumerate() {
            ensure!(
                source >= 0 && (source as usize) < node_count,
                "link source {source} at index {index} is outside [0, {node_count})"
            );
            ensure!(
                target >= 0 && (target as usize) < node_count,
                "link target {target} at index {index} is outside [0, {node_count})"
            );
            edges.push((source as u32, target as u32));
        }

        let positions = seed_positions
            .chunks_exact(2)
            .map(|pair| vec2(pair[0], pair[1]))
            .collect::<Vec<_>>();
        let max_radius = radii.iter().copied().fold(0.0_f32, f32::max);
        let cell_size = (config.link_length * 1.2).max(24.0);

        Ok(Self {
            node_count,
            positions,
            velocities: vec![Vec2::ZERO; node_count],
            forces: vec![Vec2::ZERO; node_count],
            radii,
            edges,
            max_radius,
            grid: SpatialGrid::new(cell_size),
            batch_cursor: 0,
            batch_fraction: config.batch_fraction.clamp(MIN_BATCH_FRACTION, 1.0),
            dt: config.dt.max(0.001),
            attraction_force: config.attraction_force.max(0.0),
            link_length: config.link_length.max(0.0),
            repulsion_force: config.repulsion_force.max(0.0),
            central_force: config.central_force.max(0.0),
            edge_pruning: config.edge_pruning.clamp(0.0, 1.0),
        })
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// Writes the current positions as a flat x,y-interleaved buffer, the
    /// layout the render worker consumes.
    pub fn snapshot_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.node_count * 2);
        for position in &self.positions {
            out.push(position.x);
            out.push(position.y);
        }
    }

    pub fn set_batch_fraction(&mut self, value: f32) {
        self.batch_fraction = value.clamp(MIN_BATCH_FRACTION, 1.0);
    }

    pub fn set_attraction_force(&mut self, value: f32) {
        self.attraction_force = value.max(0.0);
    }

    pub fn set_repulsion_force(&mut self, value: f32) {
        self.repulsion_force = value.max(0.0);
    }

    pub fn set_central_force(&mut self, value: f32) {
        self.central_force = value.max(0.0);
    }

    pub fn set_link_length(&mut self, value: f32) {
        self.link_length = value.max(0.0);
    }

    pub fn set_dt(&mut self, value: f32) {
        self.dt = value.max(0.001);
    }

    /// Advances the layout one time step and returns the hovered node under
    /// `pointer_world`, or -1. The grabbed node is pinned to the pointer
    /// instead of being integrated.
    pub fn step(
        &mut self,
        pointer_world: Option<Vec2>,
        grabbed_node: i32,
        camera_scale: f32,
    ) -> i32 {
        if self.node_count == 0 {
            return -1;
        }

        self.grid.rebuild(&self.positions);
        self.forces.fill(Vec2::ZERO);

        self.accumulate_attraction();
        self.accumulate_repulsion();
        self.accumulate_central();
        self.integrate();

        if grabbed_node >= 0 && (grabbed_node as usize) < self.node_count {
            if let Some(pointer) = pointer_world {
                let grabbed = grabbed_node as usize;
                self.positions[grabbed] = pointer;
                self.velocities[grabbed] = Vec2::ZERO;
            }
        }

        self.hit_test(pointer_world, camera_scale)
    }

    fn accumulate_attraction(&mut self) {
        let spring = self.attraction_force * ATTRACTION_SCALE;
        if spring <= 0.0 {
            return;
        }

        let prune_below = self.edge_pruning * EDGE_PRUNE_SCALE;
        for &(source, target) in &self.edges {
            let source = source as usize;
            let target = target as usize;
            if source == target {
                continue;
            }

            let delta = self.positions[target] - self.positions[source];
            let distance = delta.length();
            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                let (x, y) = separation_dir(source, target);
                vec2(x, y)
            };

            let accel = spring * (distance - self.link_length);
            if accel.abs() < prune_below {
                continue;
            }

            self.forces[source] += direction * accel;
            self.forces[target] -= direction * accel;
        }
    }

    /// Repulsion is the expensive term, so only a rotating window of
    /// `batch_fraction * node_count` nodes samples it per step. The gain is
    /// scaled by 1/batch_fraction so the time-averaged impulse, and with it
    /// the visual equilibrium, stays batch-fraction independent.
    fn accumulate_repulsion(&mut self) {
        if self.repulsion_force <= 0.0 {
            return;
        }

        let node_count = self.node_count;
        let batch = ((node_count as f32 * self.batch_fraction).ceil() as usize)
            .clamp(1, node_count);
        // Compensate with the realized fraction, not the requested one;
        // ceil rounding makes them differ on small graphs.
        let gain = self.repulsion_force * REPULSION_SCALE * (node_count as f32 / batch as f32);
        let near_radius = self.grid.cell_size() * NEAR_RADIUS_CELLS;

        let grid = &self.grid;
        let positions = &self.positions;
        let forces = &mut self.forces;

        for offset in 0..batch {
            let index = (self.batch_cursor + offset) % node_count;
            let point = positions[index];
            let mut force = Vec2::ZERO;

            grid.for_each_near(point, near_radius, |other| {
                if other == index {
                    return;
                }
                let delta = point - positions[other];
                let distance_sq = delta.length_sq();
                let direction = if distance_sq > 0.0001 * 0.0001 {
                    delta / distance_sq.sqrt()
                } else {
                    let (x, y) = separation_dir(index, other);
                    vec2(x, y)
                };
                force += direction * (gain / (distance_sq + REPULSION_SOFTENING));
            });

            grid.for_each_far_cell(point, near_radius, |centroid, count| {
                let delta = point - centroid;
                let distance_sq = delta.length_sq();
                let direction = if distance_sq > 0.0001 * 0.0001 {
                    delta / distance_sq.sqrt()
                } else {
                    vec2(1.0, 0.0)
                };
                force += direction * (gain * count / (distance_sq + REPULSION_SOFTENING));
            });

            forces[index] += force;
        }

        self.batch_cursor = (self.batch_cursor + batch) % node_count;
    }

    fn accumulate_central(&mut self) {
        let pull = self.central_force * CENTRAL_SCALE;
        if pull <= 0.0 {
            return;
        }
        for (force, position) in self.forces.iter_mut().zip(&self.positions) {
            *force -= *position * pull;
        }
    }

    fn integrate(&mut self) {
        let dt = self.dt;
        let damping = VELOCITY_DAMPING.powf(dt);

        for index in 0..self.node_count {
            let mut force = self.forces[index];
            let force_sq = force.length_sq();
            if force_sq > MAX_FORCE * MAX_FORCE {
                force *= MAX_FORCE / force_sq.sqrt();
            }

            let mut velocity = (self.velocities[index] + force * dt) * damping;
            let speed_sq = velocity.length_sq();
            if speed_sq > MAX_SPEED * MAX_SPEED {
                velocity *= MAX_SPEED / speed_sq.sqrt();
            }

            if velocity.length_sq() < MIN_SLEEP_SPEED * MIN_SLEEP_SPEED
                && force_sq < MIN_SLEEP_FORCE * MIN_SLEEP_FORCE
            {
                velocity = Vec2::ZERO;
            }

            self.velocities[index] = velocity;
            self.positions[index] += velocity * dt;
        }
    }

    /// Closest node whose screen-space radius contains the pointer. Screen
    /// radii grow with the square root of the camera scale, matching how the
    /// render worker sizes nodes.
    fn hit_test(&self, pointer_world: Option<Vec2>, camera_scale: f32) -> i32 {
        let Some(pointer) = pointer_world else {
            return -1;
        };
        if self.max_radius <= 0.0 {
            return -1;
        }

        let scale_root = camera_scale.max(0.0001).sqrt();
        let max_hit_radius = self.max_radius / scale_root;

        let mut best: Option<(usize, f32)> = None;
        self.grid.for_each_near(pointer, max_hit_radius, |index| {
            let distance = (self.positions[index] - pointer).length();
            if distance <= self.radii[index] / scale_root
                && best.is_none_or(|(_, best_distance)| distance < best_distance)
            {
                best = Some((index, distance));
            }
        });

        best.map(|(index, _)| index as i32).unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> KernelConfig {
        KernelConfig {
            batch_fraction: 1.0,
            dt: 1.0,
            attraction_force: 10.0,
            link_length: 100.0,
            repulsion_force: 50.0,
            central_force: 1.0,
            edge_pruning: 0.0,
        }
    }

    fn chain_kernel(batch_fraction: f32) -> SimKernel {
        let mut chain = config();
        chain.batch_fraction = batch_fraction;
        SimKernel::init(
            vec![-50.0, 0.0, 0.0, 0.0, 50.0, 10.0],
            vec![5.0, 5.0, 5.0],
            &[0, 1],
            &[1, 2],
            chain,
        )
        .expect("chain kernel init")
    }

    fn distance(kernel: &SimKernel, a: usize, b: usize) -> f32 {
        (kernel.positions()[a] - kernel.positions()[b]).length()
    }

    #[test]
    fn init_rejects_out_of_range_edges() {
        let result = SimKernel::init(
            vec![0.0; 6],
            vec![5.0; 3],
            &[0, 1],
            &[1, 3],
            config(),
        );
        assert!(result.is_err());

        let result = SimKernel::init(
            vec![0.0; 6],
            vec![5.0; 3],
            &[-1, 1],
            &[1, 2],
            config(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn init_rejects_mismatched_position_buffer() {
        let result = SimKernel::init(vec![0.0; 5], vec![5.0; 3], &[], &[], config());
        assert!(result.is_err());
    }

    #[test]
    fn empty_kernel_step_is_a_no_op() {
        let mut kernel =
            SimKernel::init(Vec::new(), Vec::new(), &[], &[], config()).expect("empty init");
        assert_eq!(kernel.step(Some(vec2(0.0, 0.0)), -1, 1.0), -1);
    }

    #[test]
    fn chain_settles_near_link_length() {
        let mut kernel = chain_kernel(1.0);
        for _ in 0..200 {
            kernel.step(None, -1, 1.0);
        }

        let first = distance(&kernel, 0, 1);
        let second = distance(&kernel, 1, 2);
        assert!(
            (first - 100.0).abs() <= 15.0,
            "distance(0,1) = {first} is not within 15% of 100"
        );
        assert!(
            (second - 100.0).abs() <= 15.0,
            "distance(1,2) = {second} is not within 15% of 100"
        );

        // The degree-2 node sits roughly between the chain ends.
        let ends = distance(&kernel, 0, 2);
        assert!(
            ends > first.max(second) * 1.5,
            "node 1 is not between nodes 0 and 2 (end distance {ends})"
        );
    }

    #[test]
    fn equilibrium_is_batch_fraction_independent() {
        let mut reference = chain_kernel(1.0);
        for _ in 0..600 {
            reference.step(None, -1, 1.0);
        }
        let reference_first = distance(&reference, 0, 1);
        let reference_second = distance(&reference, 1, 2);

        for fraction in [0.5_f32, 0.3] {
            let mut kernel = chain_kernel(fraction);
            for _ in 0..600 {
                kernel.step(None, -1, 1.0);
            }
            let first = distance(&kernel, 0, 1);
            let second = distance(&kernel, 1, 2);
            assert!(
                (first - reference_first).abs() <= 15.0,
                "batch {fraction}: distance(0,1) {first} vs reference {reference_first}"
            );
            assert!(
                (second - reference_second).abs() <= 15.0,
                "batch {fraction}: distance(1,2) {second} vs reference {reference_second}"
            );
        }
    }

    #[test]
    fn extreme_forces_stay_bounded() {
        let mut extreme = config();
        extreme.attraction_force = 1_000_000.0;
        extreme.repulsion_force = 1_000_000.0;
        extreme.central_force = 1_000_000.0;

        let mut kernel = SimKernel::init(
            vec![-50.0, 0.0, 0.0, 0.0, 50.0, 10.0],
            vec![5.0, 5.0, 5.0],
            &[0, 1],
            &[1, 2],
            extreme,
        )
        .expect("extreme init");

        for _ in 0..500 {
            kernel.step(None, -1, 1.0);
        }
        for position in kernel.positions() {
            assert!(position.x.is_finite() && position.y.is_finite());
            assert!(position.length() < 100_000.0);
        }
    }

    #[test]
    fn grabbed_node_follows_the_pointer() {
        let mut kernel = chain_kernel(1.0);
        let pointer = vec2(250.0, -80.0);
        kernel.step(Some(pointer), 1, 1.0);

        let pinned = kernel.positions()[1];
        assert!((pinned - pointer).length() < 0.001);
    }

    #[test]
    fn hit_test_returns_closest_containing_node() {
        let mut kernel = SimKernel::init(
            vec![0.0, 0.0, 6.0, 0.0, 300.0, 300.0],
            vec![5.0, 5.0, 5.0],
            &[],
            &[],
            config(),
        )
        .expect("hit test init");

        // Pointer overlaps both of the first two nodes; the closer one wins.
        let hovered = kernel.step(Some(vec2(4.0, 0.0)), -1, 1.0);
        assert_eq!(hovered, 1);

        let hovered = kernel.step(Some(vec2(150.0, 150.0)), -1, 1.0);
        assert_eq!(hovered, -1);
    }

    #[test]
    fn hit_radius_shrinks_as_the_camera_zooms_in() {
        let mut kernel = SimKernel::init(
            vec![0.0, 0.0],
            vec![5.0],
            &[],
            &[],
            config(),
        )
        .expect("single node init");

        // 4 world units away: inside at scale 1, outside once zoomed to 4x
        // (hit radius becomes 5 / sqrt(4) = 2.5).
        assert_eq!(kernel.step(Some(vec2(4.0, 0.0)), -1, 1.0), 0);
        assert_eq!(kernel.step(Some(vec2(4.0, 0.0)), -1, 4.0), -1);
    }

    #[test]
    fn setters_take_effect_without_reinit() {
        let mut kernel = chain_kernel(1.0);
        for _ in 0..300 {
            kernel.step(None, -1, 1.0);
        }

        kernel.set_link_length(50.0);
        for _ in 0..300 {
            kernel.step(None, -1, 1.0);
        }

        let first = distance(&kernel, 0, 1);
        assert!(
            (first - 50.0).abs() <= 15.0,
            "distance(0,1) = {first} did not re-settle near the new link length"
        );
    }
}
