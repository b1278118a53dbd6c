//! Builders for inbound wire frames, without line terminators.

use std::fmt::Write;

use marioai_core::scene::LevelScene;
use marioai_core::types::Fitness;
use marioai_gym::codec::{pack_terrain, FITNESS_TAG, OBSERVATION_TAG, SNAPSHOT_TAG};

/// `O <can_jump> <on_ground> <484 cells> <x> <y> [<enemies>...]`
pub fn observation_line(
    can_jump: bool,
    on_ground: bool,
    scene: &LevelScene,
    mario_position: (f64, f64),
    enemies: &[f64],
) -> Vec<u8> {
    let mut line = format!("{OBSERVATION_TAG} {can_jump} {on_ground}");
    for cell in scene.iter() {
        write!(line, " {cell}").unwrap();
    }
    write!(line, " {} {}", mario_position.0, mario_position.1).unwrap();
    for enemy in enemies {
        write!(line, " {enemy}").unwrap();
    }
    line.into_bytes()
}

/// `FIT <status> <distance> <time_left> <mario_mode> <coins>`
pub fn fitness_line(fitness: &Fitness) -> Vec<u8> {
    format!(
        "{FITNESS_TAG} {} {} {} {} {}",
        fitness.status, fitness.distance, fitness.time_left, fitness.mario_mode, fitness.coins
    )
    .into_bytes()
}

/// Bit-packed snapshot of the scene's occupancy with a valid checksum.
///
/// # Panics
///
/// Panics if a packed unit falls in the UTF-16 surrogate range and so has no
/// character form.
pub fn snapshot_frame(can_jump: bool, on_ground: bool, scene: &LevelScene) -> Vec<u8> {
    let (units, checksum) = pack_terrain(scene);
    snapshot_from_units(can_jump, on_ground, &units, checksum)
}

/// Bit-packed snapshot with explicit payload units and checksum.
///
/// # Panics
///
/// Panics if a unit is not a valid character.
pub fn snapshot_from_units(can_jump: bool, on_ground: bool, units: &[u32], checksum: u64) -> Vec<u8> {
    let mut line = String::new();
    line.push(SNAPSHOT_TAG);
    line.push(if can_jump { '1' } else { '0' });
    line.push(if on_ground { '1' } else { '0' });
    for unit in units {
        line.push(char::from_u32(*unit).expect("payload unit has no character form"));
    }
    write!(line, "{checksum}").unwrap();
    line.into_bytes()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
