/// One sentence of aligned per-token fields.
///
/// `gold` is empty when the corpus carries no reference labels; `labels` is
/// filled by tagging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub words: Vec<String>,
    pub pos: Vec<String>,
    pub gold: Vec<String>,
    pub labels: Vec<String>,
}

impl Sentence {
    pub fn push(&mut self, word: &str, pos: &str, gold: Option<&str>) {
        self.words.push(word.to_string());
        self.pos.push(pos.to_string());
        if let Some(g) = gold {
            self.gold.push(g.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn has_gold(&self) -> bool {
        !self.is_empty() && self.gold.len() == self.words.len()
    }

    /// Clears every field, keeping the allocations for the next sentence.
    pub fn reset(&mut self) {
        self.words.clear();
        self.pos.clear();
        self.gold.clear();
        self.labels.clear();
    }
}
