use std::collections::HashMap;
use std::sync::Arc;

use artrack_types::wire::{Database, SCHEMA_VERSION};
use artrack_types::{Descriptor, Keypoint, SparseBow, Target, TargetStatus};
use artrack_vocab::{Vocabulary, Word};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::runtime::RuntimeState;

/// Owns the immutable target set and vocabulary loaded at startup, plus the
/// mutable per-target runtime state (status, last-seen, last-score) that
/// changes every frame. Targets are `Arc`-shared so the detector can hand
/// out references without cloning descriptor data.
pub struct Registry {
    vocabulary: Vocabulary,
    targets: HashMap<String, Arc<Target>>,
    runtime: HashMap<String, RuntimeState>,
    order: Vec<String>,
}

impl Registry {
    /// Validates and loads a wire-format database. Any structural
    /// inconsistency (schema mismatch, truncated descriptor buffers,
    /// dangling BoW word references, duplicate ids) is fatal here — once
    /// loaded, the rest of the engine assumes the registry is sound.
    pub fn load(db: &Database) -> Result<Self> {
        if db.header.schema_version != SCHEMA_VERSION {
            return Err(Error::SchemaVersionMismatch {
                found: db.header.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        if db.targets.is_empty() {
            return Err(Error::EmptyDatabase);
        }
        if db.header.num_targets as usize != db.targets.len() {
            return Err(Error::TargetCountMismatch {
                declared: db.header.num_targets,
                actual: db.targets.len(),
            });
        }
        if db.idf.len() != db.vocabulary.len() {
            return Err(Error::IdfTableSizeMismatch {
                vocab_words: db.vocabulary.len(),
                idf_entries: db.idf.len(),
            });
        }

        let words: Vec<Word> = db
            .vocabulary
            .iter()
            .zip(db.idf.iter())
            .map(|(w, &idf)| Word {
                centroid: Descriptor::new(w.centroid.clone()),
                idf,
            })
            .collect();
        let vocab_size = words.len();
        let vocabulary = Vocabulary::from_words(
            words,
            db.header.branching_factor,
            db.header.levels,
            db.header.descriptor_length as usize,
        );

        let mut targets = HashMap::with_capacity(db.targets.len());
        let mut runtime = HashMap::with_capacity(db.targets.len());
        let mut order = Vec::with_capacity(db.targets.len());

        for wire_target in &db.targets {
            if targets.contains_key(&wire_target.id) {
                return Err(Error::DuplicateTargetId {
                    target_id: wire_target.id.clone(),
                });
            }

            let descriptor_length = db.header.descriptor_length;
            if descriptor_length == 0
                || wire_target.descriptors.len() % descriptor_length as usize != 0
                || wire_target.descriptors.len() / descriptor_length as usize != wire_target.keypoints.len()
            {
                return Err(Error::TruncatedDescriptors {
                    target_id: wire_target.id.clone(),
                    keypoints: wire_target.keypoints.len(),
                    descriptor_bytes: wire_target.descriptors.len(),
                    descriptor_length,
                });
            }

            let descriptors: Vec<Descriptor> = wire_target
                .descriptors
                .chunks_exact(descriptor_length as usize)
                .map(|chunk| Descriptor::new(chunk.to_vec()))
                .collect();
            let keypoints: Vec<Keypoint> = wire_target
                .keypoints
                .iter()
                .map(|k| Keypoint::new(k.x, k.y, k.response))
                .collect();

            for entry in &wire_target.bow {
                if entry.word_id as usize >= vocab_size {
                    return Err(Error::DanglingBowWordReference {
                        target_id: wire_target.id.clone(),
                        word_id: entry.word_id,
                        vocab_size,
                    });
                }
            }
            let bow = SparseBow::from_pairs(wire_target.bow.iter().map(|e| (e.word_id, e.count)));

            let target = Target::new(
                wire_target.id.clone(),
                wire_target.ref_width,
                wire_target.ref_height,
                keypoints,
                descriptors,
                bow,
            );
            debug!(target_id = %target.id, num_descriptors = target.num_descriptors(), "loaded target");

            order.push(wire_target.id.clone());
            runtime.insert(wire_target.id.clone(), RuntimeState::default());
            targets.insert(wire_target.id.clone(), Arc::new(target));
        }

        info!(num_targets = targets.len(), vocab_size, "registry loaded");

        Ok(Self {
            vocabulary,
            targets,
            runtime,
            order,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn get(&self, target_id: &str) -> Option<&Arc<Target>> {
        self.targets.get(target_id)
    }

    /// All targets, in the order they appeared in the source database.
    pub fn targets(&self) -> impl Iterator<Item = &Arc<Target>> {
        self.order.iter().filter_map(move |id| self.targets.get(id))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn runtime_state(&self, target_id: &str) -> Option<&RuntimeState> {
        self.runtime.get(target_id)
    }

    pub fn set_runtime_state(&mut self, target_id: &str, state: RuntimeState) {
        if let Some(slot) = self.runtime.get_mut(target_id) {
            *slot = state;
        }
    }

    /// Reset every target's runtime state to idle, e.g. on an orientation
    /// change where all current tracking state is invalidated.
    pub fn reset_runtime_state(&mut self) {
        for state in self.runtime.values_mut() {
            *state = RuntimeState::default();
        }
    }

    pub fn status(&self, target_id: &str) -> Option<TargetStatus> {
        self.runtime.get(target_id).map(|s| s.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artrack_types::wire::{Header, WireBowEntry, WireKeypoint, WireTarget, WireWord};

    fn sample_db() -> Database {
        Database {
            header: Header {
                schema_version: SCHEMA_VERSION,
                descriptor_length: 2,
                num_targets: 1,
                vocab_size: 1,
                branching_factor: 2,
                levels: 1,
            },
            vocabulary: vec![WireWord { centroid: vec![0, 1] }],
            idf: vec![0.5],
            targets: vec![WireTarget {
                id: "t0".into(),
                ref_width: 100,
                ref_height: 80,
                keypoints: vec![WireKeypoint { x: 1.0, y: 2.0, response: 3.0 }],
                descriptors: vec![9, 9],
                bow: vec![WireBowEntry { word_id: 0, count: 1 }],
            }],
        }
    }

    #[test]
    fn loads_a_valid_database() {
        let registry = Registry::load(&sample_db()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("t0").is_some());
        assert_eq!(registry.status("t0"), Some(TargetStatus::Idle));
    }

    #[test]
    fn rejects_dangling_bow_reference() {
        let mut db = sample_db();
        db.targets[0].bow[0].word_id = 7;
        let err = Registry::load(&db).unwrap_err();
        assert!(matches!(err, Error::DanglingBowWordReference { .. }));
    }

    #[test]
    fn rejects_truncated_descriptors() {
        let mut db = sample_db();
        db.targets[0].descriptors = vec![9];
        let err = Registry::load(&db).unwrap_err();
        assert!(matches!(err, Error::TruncatedDescriptors { .. }));
    }

    #[test]
    fn rejects_schema_mismatch() {
        let mut db = sample_db();
        db.header.schema_version = 99;
        let err = Registry::load(&db).unwrap_err();
        assert!(matches!(err, Error::SchemaVersionMismatch { .. }));
    }

    #[test]
    fn rejects_empty_database() {
        let mut db = sample_db();
        db.targets.clear();
        db.header.num_targets = 0;
        let err = Registry::load(&db).unwrap_err();
        assert_eq!(err, Error::EmptyDatabase);
    }

    #[test]
    fn reset_runtime_state_returns_to_idle() {
        let mut registry = Registry::load(&sample_db()).unwrap();
        registry.set_runtime_state(
            "t0",
            RuntimeState {
                status: TargetStatus::Tracked,
                last_seen_at: Some(42),
                last_score: 0.9,
            },
        );
        assert_eq!(registry.status("t0"), Some(TargetStatus::Tracked));
        registry.reset_runtime_state();
        assert_eq!(registry.status("t0"), Some(TargetStatus::Idle));
    }
}
