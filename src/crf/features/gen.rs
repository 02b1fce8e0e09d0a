use super::{Attributes, Context, Obs, Resolved, Type};
use crate::{
    crf::lattice::PairScores,
    lexicon::Word,
    tagset::TagPair,
};

/// Where the observations of one position go.
pub enum Sink<'a> {
    /// Register every observation under the gold tag pair.
    Extract { attributes: &'a mut Attributes, pair: TagPair },
    /// Collect the indices of every known attribute for the observation.
    Context { attributes: &'a Attributes, context: &'a mut Context },
    /// Add the weight of every known attribute into its tag pair cell.
    Scores { attributes: &'a Attributes, weights: &'a [f64], scores: &'a mut PairScores },
}

impl Sink<'_> {
    pub fn accept(&mut self, obs: Obs) {
        match self {
            Sink::Extract { attributes, pair } => {
                attributes.add(obs, *pair, 1);
            }
            Sink::Context { attributes, context } => {
                context.features.extend_from_slice(attributes.find_all(&obs));
            }
            Sink::Scores { attributes, weights, scores } => {
                let num_tags = scores.num_tags();
                for &a in attributes.find_all(&obs) {
                    let (Some(key), Some(&w)) = (attributes.get(a), weights.get(a as usize)) else { continue };
                    if let (Some(prev), Some(curr)) = (key.pair.prev.slot(num_tags), key.pair.curr.slot(num_tags)) {
                        scores.add(prev, curr, w);
                    }
                }
            }
        }
    }
}

pub trait FeatureGen {
    fn ty(&self) -> &'static Type;

    /// The handles this template reads at position `i`, or `None` when the
    /// observation should be skipped.
    fn observe(&self, sent: &Resolved, i: usize) -> Option<[u32; 2]>;

    fn generate(&self, sent: &Resolved, i: usize, sink: &mut Sink<'_>) {
        if let Some(values) = self.observe(sent, i) {
            sink.accept(Obs::new(self.ty(), values));
        }
    }
}

#[inline]
fn known(w: Word) -> Option<u32> {
    (w != Word::NONE).then_some(w.id())
}

/// Fires at every position; its weights are pure tag transitions.
pub struct TransGen;

impl FeatureGen for TransGen {
    fn ty(&self) -> &'static Type {
        &Type::TRANS
    }

    fn observe(&self, _sent: &Resolved, _i: usize) -> Option<[u32; 2]> {
        Some([0, 0])
    }
}

pub struct WordGen {
    ty: &'static Type,
}

impl WordGen {
    pub fn new(ty: &'static Type) -> Self {
        debug_assert_eq!(ty.arity(), 1);
        Self { ty }
    }
}

impl FeatureGen for WordGen {
    fn ty(&self) -> &'static Type {
        self.ty
    }

    fn observe(&self, sent: &Resolved, i: usize) -> Option<[u32; 2]> {
        Some([known(sent.word(i, self.ty.offsets[0]))?, 0])
    }
}

pub struct PosGen {
    ty: &'static Type,
}

impl PosGen {
    pub fn new(ty: &'static Type) -> Self {
        debug_assert_eq!(ty.arity(), 1);
        Self { ty }
    }
}

impl FeatureGen for PosGen {
    fn ty(&self) -> &'static Type {
        self.ty
    }

    fn observe(&self, sent: &Resolved, i: usize) -> Option<[u32; 2]> {
        Some([known(sent.pos(i, self.ty.offsets[0]))?, 0])
    }
}

/// Two adjacent part of speech tags.
pub struct BigramPosGen {
    ty: &'static Type,
}

impl BigramPosGen {
    pub fn new(ty: &'static Type) -> Self {
        debug_assert_eq!(ty.arity(), 2);
        Self { ty }
    }
}

impl FeatureGen for BigramPosGen {
    fn ty(&self) -> &'static Type {
        self.ty
    }

    fn observe(&self, sent: &Resolved, i: usize) -> Option<[u32; 2]> {
        let first = known(sent.pos(i, self.ty.offsets[0]))?;
        let second = known(sent.pos(i, self.ty.offsets[1]))?;
        Some([first, second])
    }
}
