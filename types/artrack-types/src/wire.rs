//! Target database wire format: a schema-versioned, serde-derived
//! representation of a [`crate::target::Target`] set plus the vocabulary
//! they were indexed into. Serialized with `serde_json` for the
//! human-inspectable path and `bincode` for the compact path — see the
//! crate-level docs.

use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub schema_version: u16,
    pub descriptor_length: u32,
    pub num_targets: u32,
    pub vocab_size: u32,
    pub branching_factor: u32,
    pub levels: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireWord {
    pub centroid: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireKeypoint {
    pub x: f32,
    pub y: f32,
    pub response: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBowEntry {
    pub word_id: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTarget {
    pub id: String,
    pub ref_width: u32,
    pub ref_height: u32,
    pub keypoints: Vec<WireKeypoint>,
    /// Flattened `num_keypoints * descriptor_length` byte buffer.
    pub descriptors: Vec<u8>,
    pub bow: Vec<WireBowEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub header: Header,
    pub vocabulary: Vec<WireWord>,
    pub idf: Vec<f32>,
    pub targets: Vec<WireTarget>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Database {
        Database {
            header: Header {
                schema_version: SCHEMA_VERSION,
                descriptor_length: 2,
                num_targets: 1,
                vocab_size: 1,
                branching_factor: 2,
                levels: 1,
            },
            vocabulary: vec![WireWord {
                centroid: vec![0, 1],
            }],
            idf: vec![0.5],
            targets: vec![WireTarget {
                id: "t0".into(),
                ref_width: 100,
                ref_height: 80,
                keypoints: vec![WireKeypoint {
                    x: 1.0,
                    y: 2.0,
                    response: 3.0,
                }],
                descriptors: vec![9, 9],
                bow: vec![WireBowEntry {
                    word_id: 0,
                    count: 1,
                }],
            }],
        }
    }

    #[test]
    fn json_round_trip() {
        let db = sample();
        let json = serde_json::to_string(&db).unwrap();
        let back: Database = serde_json::from_str(&json).unwrap();
        assert_eq!(db, back);
    }

    #[test]
    fn bincode_round_trip() {
        let db = sample();
        let bytes = bincode::serialize(&db).unwrap();
        let back: Database = bincode::deserialize(&bytes).unwrap();
        assert_eq!(db, back);
    }
}
