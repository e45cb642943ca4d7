// BM25 inverted index over field documents, one per keyword kind
use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::FieldId;

#[derive(Debug, Clone)]
pub struct BM25Index {
    // term -> (field -> term_frequency)
    inverted_index: AHashMap<String, AHashMap<FieldId, u32>>,
    // field -> document length
    doc_lengths: AHashMap<FieldId, u32>,
    // term -> document frequency
    term_dfs: AHashMap<String, u32>,
    total_docs: u64,
    k1: f32, // term frequency saturation parameter
    b: f32,  // length normalization parameter
}

impl BM25Index {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inverted_index: AHashMap::new(),
            doc_lengths: AHashMap::new(),
            term_dfs: AHashMap::new(),
            total_docs: 0,
            k1: 1.5,
            b: 0.75,
        }
    }

    /// Tokenize text for indexing.
    /// Splits on anything that is not alphanumeric so `order_date` yields `order` and `date`.
    #[inline]
    pub fn tokenize(text: &str) -> Vec<String> {
        crate::signature::tokenize(text)
    }

    pub fn insert_doc(&mut self, doc_id: FieldId, text: &str) {
        self.delete_doc(doc_id);

        let tokens = Self::tokenize(text);
        let doc_len = tokens.len() as u32;

        let mut term_freqs: AHashMap<String, u32> = AHashMap::new();
        for token in tokens {
            *term_freqs.entry(token).or_insert(0) += 1;
        }

        for (term, tf) in &term_freqs {
            self.inverted_index
                .entry(term.clone())
                .or_default()
                .insert(doc_id, *tf);
            *self.term_dfs.entry(term.clone()).or_insert(0) += 1;
        }

        self.doc_lengths.insert(doc_id, doc_len);
        self.total_docs += 1;
    }

    pub fn delete_doc(&mut self, doc_id: FieldId) {
        if self.doc_lengths.remove(&doc_id).is_some() {
            let mut terms_to_update = Vec::new();
            for (term, docs) in &mut self.inverted_index {
                if docs.remove(&doc_id).is_some() {
                    terms_to_update.push(term.clone());
                }
            }

            for term in terms_to_update {
                if let Some(df) = self.term_dfs.get_mut(&term) {
                    *df = df.saturating_sub(1);
                }
            }

            self.total_docs = self.total_docs.saturating_sub(1);
        }
    }

    /// Score documents against the query, best first.
    /// Equal scores are ordered by ascending field id so results are reproducible.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(FieldId, f32)> {
        if self.total_docs == 0 {
            return Vec::new();
        }

        let query_terms = Self::tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let avgdl = self.doc_lengths.values().sum::<u32>() as f32 / self.total_docs as f32;

        let mut doc_scores: AHashMap<FieldId, f32> = AHashMap::new();

        for term in &query_terms {
            if let Some(docs) = self.inverted_index.get(term) {
                let df = self.term_dfs.get(term).copied().unwrap_or(0) as f32;
                // +1 inside the log keeps idf positive for terms present in most documents
                let idf = if df > 0.0 {
                    (1.0 + (self.total_docs as f32 - df + 0.5) / (df + 0.5)).ln()
                } else {
                    0.0
                };

                for (doc_id, &tf) in docs {
                    if let Some(&doc_len) = self.doc_lengths.get(doc_id) {
                        let score = self.calculate_bm25_score(tf, doc_len, avgdl, idf);
                        *doc_scores.entry(*doc_id).or_insert(0.0) += score;
                    }
                }
            }
        }

        let mut results: Vec<(FieldId, f32)> = doc_scores.into_iter().collect();
        results.sort_by_key(|(id, score)| (std::cmp::Reverse(OrderedFloat(*score)), *id));
        results.truncate(limit);
        results
    }

    fn calculate_bm25_score(&self, tf: u32, doc_len: u32, avgdl: f32, idf: f32) -> f32 {
        let tf_f32 = tf as f32;
        let doc_len_f32 = doc_len as f32;
        let avgdl = if avgdl > 0.0 { avgdl } else { 1.0 };

        // BM25 formula: idf * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * (doc_len / avgdl)))
        let numerator = tf_f32 * (self.k1 + 1.0);
        let denominator = tf_f32 + self.k1 * (1.0 - self.b + self.b * (doc_len_f32 / avgdl));

        idf * (numerator / denominator)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }
}

impl Default for BM25Index {
    fn default() -> Self {
        Self::new()
    }
}
