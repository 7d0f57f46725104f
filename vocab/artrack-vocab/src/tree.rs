use artrack_types::{Descriptor, SparseBow};

/// One leaf of the hierarchical k-means tree: a centroid descriptor and its
/// inverse document frequency, computed once at build time over the target
/// corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub centroid: Descriptor,
    pub idf: f32,
}

/// A vocabulary tree collapsed to its leaves: quantization only ever needs
/// the nearest-leaf assignment, so the tree's internal branching is a
/// build-time clustering detail, not part of the queryable artifact (the
/// wire format only carries leaves too, see `artrack_types::wire::Database`).
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    words: Vec<Word>,
    branching_factor: u32,
    levels: u32,
    descriptor_length: usize,
}

impl Vocabulary {
    pub(crate) fn new(words: Vec<Word>, branching_factor: u32, levels: u32, descriptor_length: usize) -> Self {
        Self {
            words,
            branching_factor,
            levels,
            descriptor_length,
        }
    }

    /// Reconstruct a vocabulary from its persisted leaves, e.g. after
    /// loading `artrack_types::wire::Database`. No reclustering happens;
    /// the words and their IDF are taken as given.
    pub fn from_words(words: Vec<Word>, branching_factor: u32, levels: u32, descriptor_length: usize) -> Self {
        Self::new(words, branching_factor, levels, descriptor_length)
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn branching_factor(&self) -> u32 {
        self.branching_factor
    }

    pub fn levels(&self) -> u32 {
        self.levels
    }

    pub fn descriptor_length(&self) -> usize {
        self.descriptor_length
    }

    /// Overwrite each word's IDF via `f(word_id)`. Used once at build time
    /// after the leaf centroids are fixed and every target's BoW is known.
    pub(crate) fn set_idf(&mut self, f: impl Fn(usize) -> f32) {
        for (word_id, word) in self.words.iter_mut().enumerate() {
            word.idf = f(word_id);
        }
    }

    /// Assign each descriptor to its nearest word (brute-force over leaves,
    /// which is what the flattened tree reduces to) and accumulate a
    /// [`SparseBow`].
    pub fn quantize(&self, descriptors: &[Descriptor]) -> SparseBow {
        let mut bow = SparseBow::new();
        for d in descriptors {
            if let Some(word_id) = self.nearest_word(d) {
                bow.increment(word_id as u32);
            }
        }
        bow
    }

    fn nearest_word(&self, descriptor: &Descriptor) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.centroid.hamming_distance(descriptor))
            .map(|(idx, _)| idx)
    }
}
