use std::collections::HashMap;

use autograd::{Graph, Node};

use crate::{EmbeddingStore, Result};

/// Turns words into graph nodes wrapping their embeddings.
pub struct Encoder<'a> {
    store: &'a EmbeddingStore,
    graph: &'a mut Graph,
    zero_embedding: Option<Node>,
}

impl<'a> Encoder<'a> {
    /// Creates a new `Encoder` bound to `graph`.
    ///
    /// The zero embedding is wrapped right away when the store is configured to use it.
    pub fn new(store: &'a EmbeddingStore, graph: &'a mut Graph) -> Self {
        let zero_embedding = store
            .config()
            .use_zero_embedding
            .then(|| graph.new_wrap(store.zero_embedding()));

        Self {
            store,
            graph,
            zero_embedding,
        }
    }

    /// Encodes every word into a node of the bound graph.
    ///
    /// Each distinct word is looked up and wrapped only once per call, repeated words get the
    /// same node.
    ///
    /// # Arguments
    /// * `words` - The words to encode.
    ///
    /// # Returns
    /// One entry per word, the zero embedding node (or `None` when it's disabled) for the
    /// words without an embedding.
    pub fn encode<S>(&mut self, words: &[S]) -> Result<Vec<Option<Node>>>
    where
        S: AsRef<str>,
    {
        let mut seen: HashMap<&str, Option<Node>> = HashMap::new();
        let mut encoding = Vec::with_capacity(words.len());

        for word in words {
            let word = word.as_ref();

            let node = match seen.get(word) {
                Some(&node) => node,
                None => {
                    let node = match self.store.get_embedding(word)? {
                        Some(embedding) => Some(self.graph.new_wrap(embedding)),
                        None => self.zero_embedding,
                    };

                    seen.insert(word, node);
                    node
                }
            };

            encoding.push(node);
        }

        Ok(encoding)
    }
}
