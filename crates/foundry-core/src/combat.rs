//! Turrets and the projectiles they fire.
//!
//! A turret counts its reload down every tick. Once it reaches zero it looks
//! for the nearest enemy unit strictly inside its range (the first one found
//! in slot order wins a tie) and fires a projectile straight at the target's
//! current position. Projectiles fly in a straight line for a fixed
//! lifetime and destroy the first enemy unit they come within the hit
//! radius of, disappearing with it.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::frame::FrameMut;
use crate::tile::TileType;

/// Turret and projectile tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurretTuning {
    /// Targeting range in tiles (strict).
    pub range: f32,
    pub reload_ticks: u32,
    /// Tiles travelled per tick.
    pub projectile_speed: f32,
    pub projectile_lifetime: u32,
    /// Collision radius in tiles (strict).
    pub hit_radius: f32,
}

impl Default for TurretTuning {
    fn default() -> Self {
        Self {
            range: 8.0,
            reload_ticks: 30,
            projectile_speed: 0.2,
            projectile_lifetime: 60,
            hit_radius: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Projectiles
// ---------------------------------------------------------------------------

/// Velocity and remaining lifetime per entity slot.
#[derive(Debug, Clone)]
pub struct ProjectileSystem {
    hit_radius: f32,
    velocities: Vec<(f32, f32)>,
    lifetimes: Vec<u32>,
}

impl ProjectileSystem {
    pub fn new(tuning: &TurretTuning, capacity: usize) -> Self {
        Self {
            hit_radius: tuning.hit_radius,
            velocities: vec![(0.0, 0.0); capacity],
            lifetimes: vec![0; capacity],
        }
    }

    /// Attach flight state to a freshly spawned projectile.
    pub fn launch(&mut self, slot: usize, velocity: (f32, f32), lifetime: u32) {
        self.velocities[slot] = velocity;
        self.lifetimes[slot] = lifetime;
    }

    pub fn velocity(&self, slot: usize) -> (f32, f32) {
        self.velocities[slot]
    }

    pub fn lifetime(&self, slot: usize) -> u32 {
        self.lifetimes[slot]
    }

    /// Forget all flight state. Projectiles left in the frame expire on
    /// their next update.
    pub fn reset(&mut self) {
        self.velocities.fill((0.0, 0.0));
        self.lifetimes.fill(0);
    }

    /// Age, move and collide every live projectile. Returns the number of
    /// enemy units destroyed.
    pub fn update(&mut self, frame: &mut FrameMut<'_>) -> usize {
        let capacity = frame.layout().capacity;
        let radius_sq = self.hit_radius * self.hit_radius;
        let mut kills = 0;

        for slot in 0..capacity {
            if frame.kind(slot) != Some(EntityKind::ProjectileStandard) {
                continue;
            }
            if self.lifetimes[slot] == 0 {
                frame.despawn(slot);
                continue;
            }
            self.lifetimes[slot] -= 1;

            let (x, y) = frame.position(slot);
            let (vx, vy) = self.velocities[slot];
            let (px, py) = (x + vx, y + vy);
            frame.set_position(slot, px, py);

            let hit = (0..capacity).find(|&other| {
                other != slot
                    && frame.kind(other).is_some_and(EntityKind::is_enemy)
                    && {
                        let (ux, uy) = frame.position(other);
                        (px - ux) * (px - ux) + (py - uy) * (py - uy) < radius_sq
                    }
            });
            if let Some(target) = hit {
                frame.despawn(target);
                frame.despawn(slot);
                kills += 1;
            }
        }

        kills
    }
}

// ---------------------------------------------------------------------------
// Turrets
// ---------------------------------------------------------------------------

/// Per-tile reload counters plus targeting.
#[derive(Debug, Clone)]
pub struct TurretSystem {
    tuning: TurretTuning,
    cooldowns: Vec<u32>,
}

impl TurretSystem {
    pub fn new(tuning: TurretTuning, cells: usize) -> Self {
        Self {
            tuning,
            cooldowns: vec![0; cells],
        }
    }

    pub fn tuning(&self) -> &TurretTuning {
        &self.tuning
    }

    pub fn cooldown(&self, tile: usize) -> u32 {
        self.cooldowns.get(tile).copied().unwrap_or(0)
    }

    pub fn reset_tile(&mut self, tile: usize) {
        if let Some(c) = self.cooldowns.get_mut(tile) {
            *c = 0;
        }
    }

    pub fn reset(&mut self) {
        self.cooldowns.fill(0);
    }

    /// Tick every turret, firing into `projectile_slots`. Returns the number
    /// of projectiles fired.
    pub fn update(
        &mut self,
        frame: &mut FrameMut<'_>,
        projectiles: &mut ProjectileSystem,
        projectile_slots: Range<usize>,
    ) -> usize {
        let t = &self.tuning;
        let mut fired = 0;

        for idx in 0..frame.layout().cells() {
            if frame.tile(idx) != TileType::TurretDuo {
                continue;
            }
            let cooldown = &mut self.cooldowns[idx];
            *cooldown = cooldown.saturating_sub(1);
            if *cooldown > 0 {
                continue;
            }

            let (x, y) = frame.layout().tile_coords(idx);
            let (ox, oy) = (x as f32 + 0.5, y as f32 + 0.5);
            let Some((tx, ty)) = nearest_enemy(frame, ox, oy, t.range) else {
                continue;
            };

            let Some(slot) =
                frame.spawn(projectile_slots.clone(), EntityKind::ProjectileStandard, ox, oy)
            else {
                continue;
            };
            let (dx, dy) = (tx - ox, ty - oy);
            let len = (dx * dx + dy * dy).sqrt();
            let velocity = if len > 0.0 {
                (dx / len * t.projectile_speed, dy / len * t.projectile_speed)
            } else {
                (0.0, 0.0)
            };
            projectiles.launch(slot, velocity, t.projectile_lifetime);
            *cooldown = t.reload_ticks;
            fired += 1;
        }

        fired
    }
}

/// Position of the nearest enemy strictly within `range` of `(ox, oy)`.
fn nearest_enemy(frame: &FrameMut<'_>, ox: f32, oy: f32, range: f32) -> Option<(f32, f32)> {
    let mut best = range * range;
    let mut target = None;
    for slot in 0..frame.layout().capacity {
        if !frame.kind(slot).is_some_and(EntityKind::is_enemy) {
            continue;
        }
        let (ex, ey) = frame.position(slot);
        let dist_sq = (ex - ox) * (ex - ox) + (ey - oy) * (ey - oy);
        if dist_sq < best {
            best = dist_sq;
            target = Some((ex, ey));
        }
    }
    target
}
