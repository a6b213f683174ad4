//! Integration tests for the Foundry simulation engine.
//!
//! These tests drive the full pipeline through the public API: commands in,
//! published frames and the shared header out.

use foundry_core::command_queue::Command;
use foundry_core::engine::Engine;
use foundry_core::entity::EntityKind;
use foundry_core::fixed::Fixed64;
use foundry_core::serialize::SaveData;
use foundry_core::test_utils::*;
use foundry_core::tile::TileType;

// ===========================================================================
// Test 1: drill -> conveyor -> core
// ===========================================================================
//
// A drill at (5,5) feeds a right-facing conveyor at (6,5) that ends at a
// core at (7,5). The first item appears after one drill cycle and is
// consumed at the core shortly after.

#[test]
fn drill_feeds_core_through_conveyor() {
    let mut engine = default_engine();
    engine.push_command(build(5, 5, TileType::DrillMechanical));
    engine.push_command(build(6, 5, TileType::ConveyorRight));
    engine.push_command(build(7, 5, TileType::CoreShard));

    engine.run(59);
    assert_eq!(engine.resources(), 0);
    assert!(slots(&engine.frame(), EntityKind::ItemCopper).is_empty());

    engine.step();
    let items = slots(&engine.frame(), EntityKind::ItemCopper);
    assert_eq!(items.len(), 1, "drill emits on tick 60");
    assert_eq!(engine.frame().position(items[0]), (6.5, 5.5));

    let ticks = step_until(&mut engine, 40, |e| e.resources() == 1);
    assert!(ticks.is_some(), "item should reach the core by tick 100");
    assert!(engine.tick() <= 100);
    assert!(slots(&engine.frame(), EntityKind::ItemCopper).is_empty());
    assert_eq!(engine.header().resources(), 1);
}

// ===========================================================================
// Test 2: turret engages an enemy
// ===========================================================================

#[test]
fn turret_fires_and_projectile_closes_in() {
    let mut engine = default_engine();
    engine.push_command(build(2, 2, TileType::TurretDuo));
    engine.push_command(spawn_enemy(6, 2));

    let fired = step_until(&mut engine, 30, |e| {
        !slots(&e.frame(), EntityKind::ProjectileStandard).is_empty()
    });
    assert!(fired.is_some(), "turret should fire within 30 ticks");

    let frame = engine.frame();
    let shot = slots(&frame, EntityKind::ProjectileStandard)[0];
    let enemy = slots(&frame, EntityKind::UnitFlare)[0];
    let mut last = distance(&frame, shot, enemy);

    loop {
        engine.step();
        let frame = engine.frame();
        if !frame.is_live(shot) {
            break;
        }
        let now = distance(&frame, shot, enemy);
        assert!(now < last, "distance must shrink: {last} -> {now}");
        last = now;
    }

    // The enemy stood well inside the projectile's reach, so it died.
    assert!(!engine.frame().is_live(enemy));
}

#[test]
fn loaded_projectile_expires_without_flight_state() {
    let mut engine = default_engine();
    engine.push_command(build(2, 2, TileType::TurretDuo));
    engine.push_command(spawn_enemy(8, 2));
    engine.step();
    let shot = slots(&engine.frame(), EntityKind::ProjectileStandard)[0];
    let enemy = slots(&engine.frame(), EntityKind::UnitFlare)[0];

    // Replace the world with the projectile but without the enemy.
    let mut data = engine.export();
    data.entities.retain(|e| e.id as usize != enemy);
    engine.push_command(Command::Load { data });
    engine.step();

    // Imported projectiles carry no flight state and expire immediately.
    assert!(!engine.frame().is_live(shot));
}

#[test]
fn enemy_out_of_range_is_not_targeted() {
    let mut engine = default_engine();
    engine.push_command(build(2, 2, TileType::TurretDuo));
    engine.push_command(spawn_enemy(20, 20));
    engine.run(40);
    assert!(slots(&engine.frame(), EntityKind::ProjectileStandard).is_empty());
}

// ===========================================================================
// Test 3: power efficiency
// ===========================================================================

#[test]
fn power_surplus_gives_full_efficiency() {
    let mut engine = default_engine();
    engine.push_commands([
        build(10, 10, TileType::PowerNode),
        build(8, 10, TileType::SolarPanel),
        build(12, 10, TileType::SolarPanel),
        build(10, 13, TileType::DrillMechanical),
    ]);
    engine.step();

    let idx = engine.layout().tile_index(10, 13).unwrap();
    let graph = engine.power().graph_of(idx).unwrap();
    assert_eq!(graph.tiles.len(), 4);
    assert_eq!(graph.efficiency, Fixed64::ONE);
    assert_eq!(engine.frame().map_state_at(10, 13), Some(100));
}

#[test]
fn power_deficit_gives_exact_ratio() {
    let mut engine = default_engine();
    engine.push_commands([
        build(10, 10, TileType::PowerNode),
        build(8, 10, TileType::SolarPanel),
        build(12, 10, TileType::DrillMechanical),
        build(10, 12, TileType::DrillMechanical),
        build(10, 8, TileType::DrillMechanical),
    ]);
    engine.step();

    let idx = engine.layout().tile_index(8, 10).unwrap();
    let efficiency = engine.power().efficiency_at(idx).unwrap();
    assert_eq!(efficiency, fixed(10.0) / fixed(15.0));
    assert!(efficiency >= Fixed64::ZERO && efficiency < Fixed64::ONE);
    assert_eq!(engine.frame().map_state_at(10, 8), Some(66));
}

#[test]
fn demolishing_the_node_splits_the_graph() {
    let mut engine = default_engine();
    engine.push_commands([
        build(10, 10, TileType::PowerNode),
        build(6, 10, TileType::SolarPanel),
        build(14, 10, TileType::DrillMechanical),
    ]);
    engine.step();
    assert_eq!(engine.power().graphs().len(), 1);

    engine.push_command(demolish(10, 10));
    let result = engine.step();
    assert!(result.power_rebuilt);
    assert_eq!(engine.power().graphs().len(), 2);
}

// ===========================================================================
// Test 4: conveyor blockage
// ===========================================================================

#[test]
fn blocked_item_waits_then_resumes() {
    let mut engine = small_engine();
    engine.push_commands([
        build(2, 2, TileType::ConveyorRight),
        build(3, 2, TileType::WallCopper),
        spawn_item(2, 2),
    ]);
    engine.run(30);

    let item = slots(&engine.frame(), EntityKind::ItemCopper)[0];
    let (held, _) = engine.frame().position(item);
    assert!(held - 2.0 <= 0.9 + 1e-6);
    engine.run(5);
    assert_eq!(engine.frame().position(item).0, held);

    engine.push_command(build(3, 2, TileType::ConveyorRight));
    engine.step();
    assert!(engine.frame().position(item).0 > held);
}

// ===========================================================================
// Test 5: save / load
// ===========================================================================

#[test]
fn save_then_load_reproduces_world() {
    let mut source = default_engine();
    source.push_commands([
        build(5, 5, TileType::DrillMechanical),
        build(6, 5, TileType::ConveyorRight),
        build(7, 5, TileType::ConveyorRight),
        build(8, 5, TileType::CoreShard),
        build(20, 20, TileType::PowerNode),
        spawn_enemy(30, 30),
        spawn_item(6, 5),
    ]);
    source.run(75);
    source.push_command(Command::Save);
    let saved = source.step().saves.pop().unwrap();

    // Through the portable JSON form.
    let json = saved.to_json().unwrap();
    let restored = SaveData::from_json(&json).unwrap();

    let mut target = default_engine();
    target.push_command(spawn_item(1, 1));
    target.step();
    target.push_command(Command::Load { data: restored });
    target.push_command(Command::Save);
    let reloaded = target.step().saves.pop().unwrap();

    assert_eq!(reloaded.normalized(), saved.normalized());
}

#[test]
fn load_then_run_matches_original() {
    let mut a = small_engine();
    a.push_commands([
        build(1, 1, TileType::DrillMechanical),
        build(2, 1, TileType::ConveyorRight),
        build(3, 1, TileType::ConveyorDown),
        build(3, 2, TileType::CoreShard),
        spawn_enemy(12, 12),
    ]);
    a.run(10);
    // The save is taken before the systems run, so `a` and `b` both run
    // this tick's systems on the same world.
    a.push_command(Command::Save);
    let saved = a.step().saves.pop().unwrap();

    let mut b = small_engine();
    b.push_command(Command::Load { data: saved });
    b.step();

    let ea: Vec<_> = a.frame().records().collect();
    let eb: Vec<_> = b.frame().records().collect();
    assert_eq!(ea, eb);
    assert_eq!(a.frame().tiles, b.frame().tiles);
}

// ===========================================================================
// Test 6: bounds
// ===========================================================================

#[test]
fn out_of_bounds_commands_change_nothing() {
    let mut engine = small_engine();
    engine.push_commands([
        build(16, 0, TileType::CoreShard),
        build(0, -1, TileType::CoreShard),
        spawn_item(-5, 3),
        spawn_enemy(3, 16),
    ]);
    let result = engine.step();
    assert_eq!(result.commands_applied, 0);
    assert_eq!(result.commands_ignored, 4);
    assert_eq!(engine.export(), SaveData::default());
}

#[test]
fn spawns_fail_silently_when_slots_run_out() {
    let mut engine = small_engine();
    // Units occupy [1,16): fifteen slots.
    engine.push_commands((0..20).map(|i| spawn_enemy(i % 16, 0)));
    let result = engine.step();
    assert_eq!(result.commands_applied, 15);
    assert_eq!(result.commands_ignored, 5);
    assert_eq!(engine.frame().count_of(EntityKind::UnitFlare), 15);
}

// ===========================================================================
// Test 7: units and the core cache
// ===========================================================================

#[test]
fn enemies_follow_a_rebuilt_core() {
    let mut engine = small_engine();
    engine.push_commands([build(2, 8, TileType::CoreShard), spawn_enemy(8, 8)]);
    engine.run(10);
    let enemy = slots(&engine.frame(), EntityKind::UnitFlare)[0];
    let (x1, _) = engine.frame().position(enemy);
    assert!(x1 < 8.5);

    engine.push_commands([demolish(2, 8), build(14, 8, TileType::CoreShard)]);
    engine.run(10);
    let (x2, _) = engine.frame().position(enemy);
    assert!(x2 > x1, "enemy should turn towards the new core");
    assert_eq!(engine.frame().rotations[enemy], 0);
}

// ===========================================================================
// Test 8: determinism
// ===========================================================================

#[test]
fn same_commands_same_hash() {
    let scenario = |engine: &mut Engine| {
        engine.push_commands([
            build(5, 5, TileType::DrillMechanical),
            build(6, 5, TileType::ConveyorRight),
            build(7, 5, TileType::CoreShard),
            build(10, 5, TileType::TurretDuo),
            build(10, 7, TileType::PowerNode),
            build(12, 7, TileType::SolarPanel),
            spawn_enemy(14, 14),
        ]);
        engine.run(300);
        engine.state_hash()
    };
    let a = scenario(&mut default_engine());
    let b = scenario(&mut default_engine());
    assert_eq!(a, b);
}
