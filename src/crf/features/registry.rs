use super::{Attributes, BigramPosGen, Context, Contexts, FeatureGen, PosGen, Resolved, Sink, Source, TransGen, Type, WordGen};
use crate::{
    config::{Config, Op, OpGroup},
    crf::lattice::PairScores,
    error::{Error, Result},
    tagset::{Tag, TagPair},
};

/// Toggleable template groups as `(option, description, templates)`, in
/// registration order.
pub const GROUPS: &[(&str, &str, &[&Type])] = &[
    ("trans", "use tag transition features", &[&Type::TRANS]),
    ("words", "use word features", &[&Type::W]),
    ("prev-words", "use previous word features", &[&Type::PW, &Type::PPW]),
    ("next-words", "use next word features", &[&Type::NW, &Type::NNW]),
    ("pos", "use part of speech features", &[&Type::P]),
    ("prev-pos", "use previous part of speech features", &[&Type::PP, &Type::PPP]),
    ("next-pos", "use next part of speech features", &[&Type::NP, &Type::NNP]),
    ("pos-bigrams", "use part of speech bigram features", &[&Type::PPP_PP, &Type::PP_P, &Type::P_NP, &Type::NP_NNP]),
];

struct Entry {
    enabled: bool,
    gen: Box<dyn FeatureGen>,
}

/// The ordered set of feature generators.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("types", &self.types()).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `types` option group, one switch per template group.
    pub fn options() -> OpGroup {
        GROUPS
            .iter()
            .fold(OpGroup::new("types", "Feature types config"), |g, (name, desc, _)| g.op(Op::value(name, desc, "true")))
    }

    pub fn reg(mut self, enabled: bool, gen: Box<dyn FeatureGen>) -> Self {
        self.entries.push(Entry { enabled, gen });
        self
    }

    fn generator(ty: &'static Type) -> Box<dyn FeatureGen> {
        match (ty.source, ty.arity()) {
            (Source::None, _) => Box::new(TransGen),
            (Source::Word, _) => Box::new(WordGen::new(ty)),
            (Source::Pos, 1) => Box::new(PosGen::new(ty)),
            (Source::Pos, _) => Box::new(BigramPosGen::new(ty)),
        }
    }

    fn build(mut enabled: impl FnMut(&str, &Type) -> Result<bool>) -> Result<Self> {
        let mut registry = Self::new();
        for (name, _, types) in GROUPS {
            for &ty in types.iter() {
                registry = registry.reg(enabled(*name, ty)?, Self::generator(ty));
            }
        }
        Ok(registry)
    }

    /// Enables template groups from the `types-*` switches of `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::build(|name, _| cfg.flag(&format!("types-{name}")))
    }

    /// Enables exactly the templates whose ids are listed.
    pub fn with_types<S: AsRef<str>>(ids: &[S]) -> Result<Self> {
        if let Some(bad) = ids.iter().find(|id| Type::from_id(id.as_ref()).is_none()) {
            return Err(Error::config("Unknown feature type", bad.as_ref()));
        }
        Self::build(|_, ty| Ok(ids.iter().any(|id| id.as_ref() == ty.id)))
    }

    /// Ids of the enabled templates in registration order.
    pub fn types(&self) -> Vec<&'static str> {
        self.entries.iter().filter(|e| e.enabled).map(|e| e.gen.ty().id).collect()
    }

    fn emit(&self, sent: &Resolved, i: usize, sink: &mut Sink<'_>) {
        for e in self.entries.iter().filter(|e| e.enabled) {
            e.gen.generate(sent, i, sink);
        }
    }

    /// Gold tag pair at position `i`, the sentinel standing in outside the
    /// sentence.
    fn pair(gold: &[Tag], i: usize, len: usize) -> TagPair {
        let tag = |j: usize| gold.get(j).copied().unwrap_or(Tag::NONE);
        let prev = if i == 0 { Tag::SENTINEL } else { tag(i - 1) };
        let curr = if i == len { Tag::SENTINEL } else { tag(i) };
        TagPair::new(prev, curr)
    }

    /// Runs every enabled template over positions `0..=len`.
    ///
    /// With `extract` the observations grow `attributes` under the gold tag
    /// pairs and `contexts` is left empty; otherwise each position's context
    /// collects the indices of known attributes and nothing new is added.
    pub fn generate(&self, attributes: &mut Attributes, sent: &Resolved, gold: &[Tag], contexts: &mut Contexts, extract: bool) {
        contexts.clear();
        let len = sent.len();
        if len == 0 {
            return;
        }
        for i in 0..=len {
            let pair = Self::pair(gold, i, len);
            if extract {
                self.emit(sent, i, &mut Sink::Extract { attributes: &mut *attributes, pair });
                continue;
            }
            let mut context = Context { features: Vec::new(), label: pair };
            self.emit(sent, i, &mut Sink::Context { attributes: &*attributes, context: &mut context });
            if i == len {
                contexts.exit = context;
            } else {
                contexts.items.push(context);
            }
        }
    }

    /// Adds the weights of every attribute observed at position `i` into
    /// `scores`. Position `len` scores the transition into the end sentinel.
    pub fn add_features(&self, attributes: &Attributes, weights: &[f64], sent: &Resolved, scores: &mut PairScores, i: usize) {
        self.emit(sent, i, &mut Sink::Scores { attributes, weights, scores });
    }
}
