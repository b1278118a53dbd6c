//! Frame codec for the simulator's line protocol.
//!
//! Pure functions, no I/O. Three inbound frame shapes are recognised:
//!
//! ```text
//! E<j><g><31 payload units><checksum>       bit-packed terrain snapshot
//! O <true|false> <true|false> <484 ints> <x> <y> [<enemy floats>...]
//! FIT <status> <distance> <time_left> <mario_mode> <coins>
//! ```
//!
//! Each payload unit of the snapshot is one character whose code point
//! carries 16 scene cells, lowest bit first, filled row-major. The checksum
//! is the decimal sum of all non-zero unit values.
//!
//! Outbound commands (actions, reset, handshake) are single CRLF-terminated
//! lines.

use marioai_core::config::{CodecConfig, ResetConfig};
use marioai_core::scene::{LevelScene, SCENE_CELLS, SCENE_SIZE};
use marioai_core::types::{ActionVector, Fitness, Frame, ACTION_FLAGS};
use tracing::warn;

use crate::error::ProtocolError;

/// Leading character of a bit-packed snapshot.
pub const SNAPSHOT_TAG: char = 'E';

/// Leading token of a full observation.
pub const OBSERVATION_TAG: &str = "O";

/// Leading token of an end-of-episode fitness record.
pub const FITNESS_TAG: &str = "FIT";

/// Message the simulator sends before closing the session.
pub const END_OF_STREAM: &str = "ciao";

/// Payload units in a snapshot.
pub const PAYLOAD_UNITS: usize = 31;

/// Scene cells carried by one payload unit.
pub const BITS_PER_UNIT: usize = 16;

/// Tag plus the two flag characters.
pub const SNAPSHOT_HEADER: usize = 3;

/// Shortest well-formed snapshot: header, payload, one checksum digit.
pub const MIN_SNAPSHOT_CHARS: usize = SNAPSHOT_HEADER + PAYLOAD_UNITS + 1;

const LINE_END: &str = "\r\n";

// ---------------------------------------------------------------------------
// DecodeOptions
// ---------------------------------------------------------------------------

/// Decoder switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail on snapshot checksum mismatch instead of logging it.
    pub strict_checksum: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_checksum: true,
        }
    }
}

impl From<&CodecConfig> for DecodeOptions {
    fn from(config: &CodecConfig) -> Self {
        Self {
            strict_checksum: config.strict_checksum,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one inbound frame with strict checksum checking.
///
/// # Errors
///
/// See [`decode_with`].
pub fn decode(raw: &[u8]) -> Result<Frame, ProtocolError> {
    decode_with(raw, DecodeOptions::default())
}

/// Decode one inbound frame.
///
/// # Errors
///
/// - [`ProtocolError::UnexpectedFrameLength`] for a truncated snapshot
/// - [`ProtocolError::ChecksumMismatch`] when strict and the checksum differs
/// - [`ProtocolError::MalformedFrame`] for an unknown tag, a wrong field
///   count, or a field that does not parse
pub fn decode_with(raw: &[u8], options: DecodeOptions) -> Result<Frame, ProtocolError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ProtocolError::malformed(format!("frame is not UTF-8: {e}")))?;
    let text = text.trim_end_matches(['\r', '\n']);

    if text.starts_with(SNAPSHOT_TAG) {
        return decode_snapshot(text, options);
    }

    let mut tokens = text.split_whitespace();
    match tokens.next() {
        Some(OBSERVATION_TAG) => decode_observation(&tokens.collect::<Vec<_>>()),
        Some(FITNESS_TAG) => decode_fitness(&tokens.collect::<Vec<_>>()),
        Some(other) => Err(ProtocolError::malformed(format!(
            "unknown frame tag {other:?}"
        ))),
        None => Err(ProtocolError::malformed("empty frame")),
    }
}

/// Whether `raw` is the simulator's end-of-stream message.
#[must_use]
pub fn is_end_of_stream(raw: &[u8]) -> bool {
    std::str::from_utf8(raw).is_ok_and(|s| s.trim() == END_OF_STREAM)
}

fn decode_snapshot(text: &str, options: DecodeOptions) -> Result<Frame, ProtocolError> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < SNAPSHOT_HEADER + PAYLOAD_UNITS {
        return Err(ProtocolError::UnexpectedFrameLength {
            expected: PAYLOAD_UNITS,
            got: chars.len().saturating_sub(SNAPSHOT_HEADER),
        });
    }

    let can_jump = chars[1] == '1';
    let on_ground = chars[2] == '1';
    let payload: Vec<u32> = chars[SNAPSHOT_HEADER..SNAPSHOT_HEADER + PAYLOAD_UNITS]
        .iter()
        .map(|c| u32::from(*c))
        .collect();

    let checksum_text: String = chars[SNAPSHOT_HEADER + PAYLOAD_UNITS..].iter().collect();
    let checksum_text = checksum_text.trim();
    if checksum_text.is_empty() {
        return Err(ProtocolError::malformed("snapshot has no checksum"));
    }
    let expected: u64 = checksum_text.parse().map_err(|_| {
        ProtocolError::malformed(format!("snapshot checksum {checksum_text:?} is not a number"))
    })?;

    let (scene, computed) = unpack_terrain(&payload)?;
    if computed != expected {
        if options.strict_checksum {
            return Err(ProtocolError::ChecksumMismatch { expected, computed });
        }
        warn!(expected, computed, "snapshot checksum mismatch, keeping frame");
    }

    Ok(Frame::TerrainSnapshot {
        can_jump,
        on_ground,
        scene,
    })
}

/// Unpack the 31-unit snapshot payload into a scene and its checksum.
///
/// Bit `j` of unit `i` becomes cell `16 * i + j` in row-major order; only the
/// first 484 bits are used. Cells are 1 for a set bit and 0 otherwise.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedFrameLength`] unless `units` holds
/// exactly [`PAYLOAD_UNITS`] values.
pub fn unpack_terrain(units: &[u32]) -> Result<(LevelScene, u64), ProtocolError> {
    if units.len() != PAYLOAD_UNITS {
        return Err(ProtocolError::UnexpectedFrameLength {
            expected: PAYLOAD_UNITS,
            got: units.len(),
        });
    }

    let mut scene = LevelScene::unknown();
    let mut checksum = 0u64;
    let mut decoded = 0usize;

    'units: for &unit in units {
        checksum += u64::from(unit);
        for bit in 0..BITS_PER_UNIT {
            if decoded == SCENE_CELLS {
                break 'units;
            }
            let cell = i32::from(unit & (1 << bit) != 0);
            scene.set(decoded / SCENE_SIZE, decoded % SCENE_SIZE, cell);
            decoded += 1;
        }
    }

    Ok((scene, checksum))
}

/// Pack a scene's occupancy (non-zero cells) into payload units, returning
/// the units and their checksum. Inverse of [`unpack_terrain`].
#[must_use]
pub fn pack_terrain(scene: &LevelScene) -> (Vec<u32>, u64) {
    let mut units = vec![0u32; PAYLOAD_UNITS];
    for (i, cell) in scene.iter().enumerate() {
        if cell != 0 {
            units[i / BITS_PER_UNIT] |= 1 << (i % BITS_PER_UNIT);
        }
    }
    let checksum = units.iter().map(|u| u64::from(*u)).sum();
    (units, checksum)
}

fn decode_observation(fields: &[&str]) -> Result<Frame, ProtocolError> {
    const FIXED: usize = 2 + SCENE_CELLS + 2;
    if fields.len() < FIXED {
        return Err(ProtocolError::malformed(format!(
            "observation has {} fields, expected at least {FIXED}",
            fields.len()
        )));
    }

    let can_jump = parse_bool(fields[0], "can_jump")?;
    let on_ground = parse_bool(fields[1], "on_ground")?;

    let cells = fields[2..2 + SCENE_CELLS]
        .iter()
        .enumerate()
        .map(|(i, f)| parse_field::<i32>(f, &format!("cell {i}")))
        .collect::<Result<Vec<_>, _>>()?;
    let scene = LevelScene::from_row_major(&cells)
        .map_err(|e| ProtocolError::malformed(e.to_string()))?;

    let x = parse_field::<f64>(fields[2 + SCENE_CELLS], "mario x")?;
    let y = parse_field::<f64>(fields[3 + SCENE_CELLS], "mario y")?;

    let enemy_positions = fields[FIXED..]
        .iter()
        .enumerate()
        .map(|(i, f)| parse_field::<f64>(f, &format!("enemy value {i}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Frame::FullObservation {
        can_jump,
        on_ground,
        mario_position: (x, y),
        enemy_positions,
        scene,
    })
}

fn decode_fitness(fields: &[&str]) -> Result<Frame, ProtocolError> {
    if fields.len() != Fitness::FIELDS {
        return Err(ProtocolError::malformed(format!(
            "fitness has {} fields, expected {}",
            fields.len(),
            Fitness::FIELDS
        )));
    }
    Ok(Frame::EpisodeResult(Fitness {
        status: parse_field(fields[0], "status")?,
        distance: parse_field(fields[1], "distance")?,
        time_left: parse_field(fields[2], "time_left")?,
        mario_mode: parse_field(fields[3], "mario_mode")?,
        coins: parse_field(fields[4], "coins")?,
    }))
}

fn parse_bool(field: &str, name: &str) -> Result<bool, ProtocolError> {
    match field {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ProtocolError::malformed(format!(
            "{name}: expected true/false, got {other:?}"
        ))),
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, name: &str) -> Result<T, ProtocolError> {
    field
        .parse()
        .map_err(|_| ProtocolError::malformed(format!("{name}: cannot parse {field:?}")))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode an action as `"bbbbb\r\n"`.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidActionEncoding`] if any flag is not 0/1.
pub fn encode_action(action: &ActionVector) -> Result<Vec<u8>, ProtocolError> {
    action.validate()?;
    Ok(format!("{action}{LINE_END}").into_bytes())
}

/// Parse an action line produced by [`encode_action`].
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] unless the line is exactly five
/// `0`/`1` characters (line terminator optional).
pub fn decode_action(raw: &[u8]) -> Result<ActionVector, ProtocolError> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| ProtocolError::malformed(format!("action is not UTF-8: {e}")))?
        .trim_end_matches(['\r', '\n']);
    if line.len() != ACTION_FLAGS {
        return Err(ProtocolError::malformed(format!(
            "action {line:?} must have {ACTION_FLAGS} flags"
        )));
    }
    let mut flags = [0u8; ACTION_FLAGS];
    for (flag, byte) in flags.iter_mut().zip(line.bytes()) {
        *flag = match byte {
            b'0' => 0,
            b'1' => 1,
            _ => {
                return Err(ProtocolError::malformed(format!(
                    "action {line:?} has a non-binary flag"
                )))
            }
        };
    }
    Ok(ActionVector::new(flags))
}

/// Encode the reset command carrying every level setting.
#[must_use]
pub fn encode_reset(config: &ResetConfig) -> Vec<u8> {
    let mut command = format!(
        "reset -maxFPS on -ld {} -lt {} -mm {} -ls {} -tl {} -pw {} -vis {} ",
        config.level_difficulty,
        config.level_type,
        config.mario_mode,
        config.level_seed,
        config.time_limit,
        // "-pw on" means a peaceful world, i.e. no creatures.
        on_off(!config.creatures_enabled),
        on_off(config.visualization),
    );
    if config.fast_tcp {
        command.push_str("-fastTCP on");
        if !config.custom_args.is_empty() {
            command.push(' ');
        }
    }
    command.push_str(&config.custom_args);
    command.push_str(LINE_END);
    command.into_bytes()
}

/// Encode the client's identification message.
#[must_use]
pub fn encode_handshake(name: &str) -> Vec<u8> {
    format!("Client: Dear Server, hello! I am {name}{LINE_END}").into_bytes()
}

const fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
