//! Vocabulary and embedding matrix construction.
//!
//! Several pretrained vector tables (already aligned to the vocabulary ids)
//! are averaged into one matrix. Tokens whose averaged vector is all zeros
//! have no pretrained vector and are reported as unknown; those rows can be
//! filled with noise so each frequent unknown token gets a distinct vector,
//! while rare unknown tokens share the `UNK_ID` row.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::qiqc::error::BuildError;

/// Row reserved for padding; always zero.
pub const PAD_ID: usize = 0;
/// Row shared by out-of-vocabulary and rare unknown tokens.
pub const UNK_ID: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    token2id: HashMap<String, usize>,
    id2token: Vec<String>,
    counts: Vec<usize>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            token2id: HashMap::from([("<pad>".to_string(), PAD_ID), ("<unk>".to_string(), UNK_ID)]),
            id2token: vec!["<pad>".to_string(), "<unk>".to_string()],
            counts: vec![0, 0],
        }
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count whitespace tokens across `sentences`; ids follow first appearance.
    pub fn build<S: AsRef<str>>(sentences: &[S]) -> Self {
        let mut vocab = Self::new();
        for sentence in sentences {
            for token in sentence.as_ref().split_whitespace() {
                vocab.add(token);
            }
        }
        vocab
    }

    pub fn add(&mut self, token: &str) -> usize {
        let id = match self.token2id.get(token) {
            Some(&id) => id,
            None => {
                let id = self.id2token.len();
                self.token2id.insert(token.to_string(), id);
                self.id2token.push(token.to_string());
                self.counts.push(0);
                id
            }
        };
        self.counts[id] += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= UNK_ID + 1
    }

    pub fn token2id(&self) -> &HashMap<String, usize> {
        &self.token2id
    }

    pub fn id(&self, token: &str) -> usize {
        self.token2id.get(token).copied().unwrap_or(UNK_ID)
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.id2token.get(id).map(String::as_str)
    }

    pub fn count(&self, id: usize) -> usize {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Token ids of `sentence`; unseen tokens map to `UNK_ID`.
    pub fn encode(&self, sentence: &str) -> Vec<i64> {
        sentence
            .split_whitespace()
            .map(|token| self.id(token) as i64)
            .collect()
    }
}

/// Embedding matrix builder over a vocabulary and averaged pretrained tables.
#[derive(Debug, Clone)]
pub struct WordFeature {
    vectors: Vec<Vec<f32>>,
    unk: Vec<usize>,
    rare: Vec<usize>,
    known_std: f32,
}

impl WordFeature {
    /// # Arguments
    /// * `vocab` - vocabulary the tables are aligned to
    /// * `pretrained` - one or more `[vocab.len(), dim]` tables
    /// * `min_count` - unknown tokens seen fewer times than this share `UNK_ID`
    pub fn new(
        vocab: &Vocabulary,
        pretrained: &[Vec<Vec<f32>>],
        min_count: usize,
    ) -> Result<Self, BuildError> {
        let first = pretrained.first().ok_or_else(|| {
            BuildError::ShapeMismatch("at least one pretrained table is required".to_string())
        })?;
        let dim = first.first().map(Vec::len).unwrap_or(0);
        if dim == 0 {
            return Err(BuildError::ShapeMismatch(
                "pretrained vectors must have a positive dimension".to_string(),
            ));
        }

        for (t, table) in pretrained.iter().enumerate() {
            if table.len() != vocab.len() {
                return Err(BuildError::ShapeMismatch(format!(
                    "table {} has {} rows, vocabulary has {}",
                    t,
                    table.len(),
                    vocab.len()
                )));
            }
            if let Some((row, bad)) = table.iter().enumerate().find(|(_, v)| v.len() != dim) {
                return Err(BuildError::ShapeMismatch(format!(
                    "table {} row {} has dimension {}, expected {}",
                    t,
                    row,
                    bad.len(),
                    dim
                )));
            }
        }

        let n_tables = pretrained.len() as f32;
        let mut vectors = vec![vec![0.0f32; dim]; vocab.len()];
        for table in pretrained {
            for (row, source) in vectors.iter_mut().zip(table.iter()) {
                for (value, x) in row.iter_mut().zip(source.iter()) {
                    *value += x / n_tables;
                }
            }
        }
        vectors[PAD_ID].iter_mut().for_each(|v| *v = 0.0);

        let mut unk = Vec::new();
        let mut rare = Vec::new();
        for (id, row) in vectors.iter().enumerate().skip(UNK_ID) {
            if row.iter().all(|&v| v == 0.0) {
                unk.push(id);
                if id != UNK_ID && vocab.count(id) < min_count {
                    rare.push(id);
                }
            }
        }

        let known: Vec<f64> = vectors
            .iter()
            .enumerate()
            .filter(|(id, _)| *id != PAD_ID && unk.binary_search(id).is_err())
            .flat_map(|(_, row)| row.iter().map(|&v| v as f64))
            .collect();
        let known_std = if known.is_empty() {
            1.0
        } else {
            let mean = known.iter().sum::<f64>() / known.len() as f64;
            let var = known.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / known.len() as f64;
            var.sqrt() as f32
        };

        log::debug!(
            "word features: {} tokens, dim {}, {} unknown ({} rare)",
            vocab.len(),
            dim,
            unk.len(),
            rare.len()
        );

        Ok(Self {
            vectors,
            unk,
            rare,
            known_std,
        })
    }

    pub fn embedding_dim(&self) -> usize {
        self.vectors.first().map(Vec::len).unwrap_or(0)
    }

    /// Ids without a pretrained vector, `UNK_ID` included.
    pub fn unk(&self) -> &[usize] {
        &self.unk
    }

    /// Standard deviation of all values in rows with a pretrained vector.
    pub fn known_std(&self) -> f32 {
        self.known_std
    }

    /// Materialize the embedding matrix.
    ///
    /// With `add_noise > 0`, unknown rows are drawn from
    /// `N(0, add_noise * known_std)`; rare unknown rows then copy the `UNK_ID`
    /// row. Known rows and the padding row are never changed.
    pub fn build_feature(&self, add_noise: f64, rng: &mut StdRng) -> Vec<Vec<f32>> {
        let mut vectors = self.vectors.clone();

        let std = add_noise as f32 * self.known_std;
        if let Ok(normal) = Normal::new(0.0f32, std) {
            if std > 0.0 {
                for &id in &self.unk {
                    vectors[id].iter_mut().for_each(|v| *v = normal.sample(rng));
                }
            }
        }

        let shared = vectors[UNK_ID].clone();
        for &id in &self.rare {
            vectors[id].clone_from(&shared);
        }
        vectors
    }
}
