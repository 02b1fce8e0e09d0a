use crate::tagset::TagPair;

/// Active attributes at one position together with its gold tag pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub features: Vec<u32>,
    pub label: TagPair,
}

impl Context {
    pub fn reset(&mut self) {
        self.features.clear();
        self.label = TagPair::default();
    }
}

/// Contexts of one sentence: one per token, plus the transition into the
/// end sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contexts {
    pub items: Vec<Context>,
    pub exit: Context,
}

impl Contexts {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.exit.reset();
    }

    /// Positions `0..=len`, the last one being the exit.
    pub fn positions(&self) -> impl Iterator<Item = &Context> {
        self.items.iter().chain(std::iter::once(&self.exit))
    }
}

/// The training corpus in context form.
#[derive(Debug, Clone, Default)]
pub struct Instances {
    pub sentences: Vec<Contexts>,
    /// Number of real tags.
    pub num_tags: usize,
    /// Lattice slots `(prev, curr)` of every attribute, by attribute index.
    pub pairs: Vec<(usize, usize)>,
}

impl Instances {
    pub fn new(num_tags: usize, pairs: Vec<(usize, usize)>) -> Self {
        Self { sentences: Vec::new(), num_tags, pairs }
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn num_attributes(&self) -> usize {
        self.pairs.len()
    }

    pub fn max_len(&self) -> usize {
        self.sentences.iter().map(Contexts::len).max().unwrap_or_default()
    }
}
