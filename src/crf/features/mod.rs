//! Feature templates and the machinery that turns sentences into attribute
//! activations.

mod attributes;
mod context;
mod gen;
mod registry;

pub use attributes::{AttrKey, Attributes};
pub use context::{Context, Contexts, Instances};
pub use gen::{BigramPosGen, FeatureGen, PosGen, Sink, TransGen, WordGen};
pub use registry::{Registry, GROUPS};

use crate::{
    lexicon::{Lexicon, Word},
    sentence::Sentence,
};

/// Which sentence field a template reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    None,
    Word,
    Pos,
}

/// A feature template.
#[derive(Debug, PartialEq, Eq)]
pub struct Type {
    pub desc: &'static str,
    /// Short id used in the attribute file.
    pub id: &'static str,
    /// Position in [`Type::ALL`], stored in observations.
    pub index: u16,
    pub source: Source,
    /// Relative positions read, one per observed value.
    pub offsets: &'static [isize],
}

impl Type {
    pub const TRANS: Type = Type { desc: "transition bias", id: "t", index: 0, source: Source::None, offsets: &[] };
    pub const W: Type = Type { desc: "word", id: "w", index: 1, source: Source::Word, offsets: &[0] };
    pub const PW: Type = Type { desc: "previous word", id: "pw", index: 2, source: Source::Word, offsets: &[-1] };
    pub const PPW: Type = Type { desc: "previous previous word", id: "ppw", index: 3, source: Source::Word, offsets: &[-2] };
    pub const NW: Type = Type { desc: "next word", id: "nw", index: 4, source: Source::Word, offsets: &[1] };
    pub const NNW: Type = Type { desc: "next next word", id: "nnw", index: 5, source: Source::Word, offsets: &[2] };
    pub const P: Type = Type { desc: "part of speech", id: "p", index: 6, source: Source::Pos, offsets: &[0] };
    pub const PP: Type = Type { desc: "previous part of speech", id: "pp", index: 7, source: Source::Pos, offsets: &[-1] };
    pub const PPP: Type =
        Type { desc: "previous previous part of speech", id: "ppp", index: 8, source: Source::Pos, offsets: &[-2] };
    pub const NP: Type = Type { desc: "next part of speech", id: "np", index: 9, source: Source::Pos, offsets: &[1] };
    pub const NNP: Type =
        Type { desc: "next next part of speech", id: "nnp", index: 10, source: Source::Pos, offsets: &[2] };
    pub const PPP_PP: Type =
        Type { desc: "part of speech bigram at -2", id: "ppp_pp", index: 11, source: Source::Pos, offsets: &[-2, -1] };
    pub const PP_P: Type =
        Type { desc: "part of speech bigram at -1", id: "pp_p", index: 12, source: Source::Pos, offsets: &[-1, 0] };
    pub const P_NP: Type =
        Type { desc: "part of speech bigram at 0", id: "p_np", index: 13, source: Source::Pos, offsets: &[0, 1] };
    pub const NP_NNP: Type =
        Type { desc: "part of speech bigram at +1", id: "np_nnp", index: 14, source: Source::Pos, offsets: &[1, 2] };

    pub const ALL: [&'static Type; 15] = [
        &Type::TRANS,
        &Type::W,
        &Type::PW,
        &Type::PPW,
        &Type::NW,
        &Type::NNW,
        &Type::P,
        &Type::PP,
        &Type::PPP,
        &Type::NP,
        &Type::NNP,
        &Type::PPP_PP,
        &Type::PP_P,
        &Type::P_NP,
        &Type::NP_NNP,
    ];

    pub fn from_id(id: &str) -> Option<&'static Type> {
        Type::ALL.iter().copied().find(|t| t.id == id)
    }

    pub fn from_index(index: u16) -> Option<&'static Type> {
        Type::ALL.get(index as usize).copied()
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.offsets.len()
    }
}

/// One raw observation: a template plus the handles it read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Obs {
    pub ty: u16,
    pub values: [u32; 2],
}

impl Obs {
    pub fn new(ty: &Type, values: [u32; 2]) -> Self {
        Self { ty: ty.index, values }
    }
}

/// A sentence with its fields canonized. Positions outside the sentence read
/// the sentinel.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub words: Vec<Word>,
    pub pos: Vec<Word>,
}

impl Resolved {
    pub fn resolve(&mut self, lexicon: &Lexicon, pos: &Lexicon, sent: &Sentence) {
        lexicon.canonize_all(&sent.words, &mut self.words);
        pos.canonize_all(&sent.pos, &mut self.pos);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[inline]
    fn at(field: &[Word], i: usize, offset: isize) -> Word {
        i.checked_add_signed(offset)
            .and_then(|j| field.get(j))
            .copied()
            .unwrap_or(Word::SENTINEL)
    }

    #[inline]
    pub fn word(&self, i: usize, offset: isize) -> Word {
        Self::at(&self.words, i, offset)
    }

    #[inline]
    pub fn pos(&self, i: usize, offset: isize) -> Word {
        Self::at(&self.pos, i, offset)
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.pos.clear();
    }
}
