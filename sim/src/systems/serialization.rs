//! Snapshot persistence and the byte encoding used for state hashes.

use std::io::{Read, Write};

use crate::config::MAX_ORDER;
use crate::error::SimError;
use crate::world::Snapshot;

/// Stream a snapshot as compact JSON.
pub fn write_snapshot<W: Write>(writer: W, snapshot: &Snapshot) -> Result<(), serde_json::Error> {
    serde_json::to_writer(writer, snapshot)
}

/// Read a snapshot written by [`write_snapshot`] or [`Snapshot::to_json`].
pub fn read_snapshot<R: Read>(reader: R) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_reader(reader)
}

pub fn parse_snapshot(json: &str) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_str(json)
}

/// Check that a decoded snapshot describes a whole grid.
///
/// Every field must hold `4^order` cells and every plate id must be below
/// `num_plates`.
pub fn check_snapshot(snapshot: &Snapshot) -> Result<(), SimError> {
    if snapshot.order == 0 || snapshot.order > MAX_ORDER {
        return Err(SimError::InvalidArgument(format!(
            "snapshot order {} outside 1..={MAX_ORDER}",
            snapshot.order
        )));
    }
    let area = 1usize << (2 * snapshot.order);
    for (name, len) in [
        ("earth", snapshot.earth.len()),
        ("water", snapshot.water.len()),
        ("plates", snapshot.plates.len()),
    ] {
        if len != area {
            return Err(SimError::InvalidArgument(format!(
                "snapshot {name} holds {len} cells, grid has {area}"
            )));
        }
    }
    if let Some(p) = snapshot.plates.iter().find(|&&p| p as usize >= snapshot.num_plates) {
        return Err(SimError::InvalidArgument(format!(
            "snapshot plate {p} not below {}",
            snapshot.num_plates
        )));
    }
    Ok(())
}

/// `earth`, `water` and `plates` concatenated, integers little-endian.
///
/// Two runs agree on every cell exactly when these bytes agree, which makes
/// them a convenient input for a content hash.
pub fn state_bytes(earth: &[i64], water: &[i64], plates: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity((earth.len() + water.len()) * 8 + plates.len());
    for v in earth.iter().chain(water) {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(plates);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats64;
    use crate::world::FlowCounters;

    fn small() -> Snapshot {
        Snapshot {
            generation: 42,
            order: 1,
            num_plates: 2,
            earth: vec![1, -2, 3, -4],
            water: vec![0, 0, 16, 0],
            plates: vec![0, 1, 1, 0],
            earth_stats: Stats64::from_slice(&[1, -2, 3, -4]),
            water_stats: Stats64::default(),
            water_coverage: 1,
            flows: FlowCounters {
                evaporation: -3,
                ..Default::default()
            },
            earth_control: 12,
            water_control: 0,
        }
    }

    #[test]
    fn test_stream_through_buffer() {
        let snapshot = small();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snapshot).unwrap();
        let restored = read_snapshot(buf.as_slice()).unwrap();
        assert_eq!(restored, snapshot);
        assert!(check_snapshot(&restored).is_ok());

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(parse_snapshot(&text).unwrap().generation, 42);
    }

    #[test]
    fn test_check_rejects_partial_grids() {
        let mut short = small();
        short.water.pop();
        let err = check_snapshot(&short).unwrap_err();
        assert!(err.to_string().contains("water holds 3 cells"));

        let mut stray = small();
        stray.plates[3] = 2;
        assert!(check_snapshot(&stray).is_err());

        let mut flat = small();
        flat.order = 0;
        assert!(check_snapshot(&flat).is_err());
    }

    #[test]
    fn test_state_bytes_layout() {
        let bytes = state_bytes(&[1], &[-1], &[7, 8]);
        assert_eq!(bytes.len(), 18);
        assert_eq!(&bytes[..8], &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &[0xff; 8]);
        assert_eq!(&bytes[16..], &[7, 8]);
    }
}
