use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    error::Result,
    lexicon::{Lexicon, Word, RESERVED},
};

/// Canonical handle for a label string, drawn from a [`TagSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(u32);

impl Tag {
    pub const NONE: Tag = Tag(0);
    pub const SENTINEL: Tag = Tag(1);

    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn from_id(id: u32) -> Self {
        Self(id)
    }

    /// Lattice slot of this tag in a set of `num_tags` labels: real tags map
    /// to `0..num_tags`, the sentinel to `num_tags`.
    #[inline]
    pub fn slot(self, num_tags: usize) -> Option<usize> {
        match self {
            Tag::NONE => None,
            Tag::SENTINEL => Some(num_tags),
            Tag(id) => Some((id - RESERVED) as usize).filter(|&s| s < num_tags),
        }
    }

    #[inline]
    pub fn from_slot(slot: usize, num_tags: usize) -> Self {
        if slot == num_tags {
            Tag::SENTINEL
        } else {
            Tag(slot as u32 + RESERVED)
        }
    }
}

impl From<Word> for Tag {
    fn from(w: Word) -> Self {
        Tag(w.id())
    }
}

/// The label unit attached to one sentence position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagPair {
    pub prev: Tag,
    pub curr: Tag,
}

impl TagPair {
    pub fn new(prev: Tag, curr: Tag) -> Self {
        Self { prev, curr }
    }
}

/// A dictionary of labels with the same storage and persistence as
/// [`Lexicon`].
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    lexicon: Lexicon,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(filename: impl Into<PathBuf>) -> Self {
        Self { lexicon: Lexicon::with_path(filename) }
    }

    pub fn from_file(filename: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self { lexicon: Lexicon::from_file(filename)? })
    }

    pub fn add(&mut self, raw: &str, freq: u64) {
        self.lexicon.add(raw, freq);
    }

    pub fn insert(&mut self, raw: &str, freq: u64) {
        self.lexicon.insert(raw, freq);
    }

    pub fn canonize(&self, raw: &str) -> Option<Tag> {
        self.lexicon.canonize(raw).map(Tag::from)
    }

    pub fn canonize_all<S: AsRef<str>>(&self, raws: &[S], tags: &mut Vec<Tag>) {
        tags.clear();
        tags.extend(raws.iter().map(|r| self.canonize(r.as_ref()).unwrap_or(Tag::NONE)));
    }

    pub fn str(&self, tag: Tag) -> Option<Rc<str>> {
        self.lexicon.str(Word::from(tag))
    }

    pub fn freq(&self, raw: &str) -> u64 {
        self.lexicon.freq(raw)
    }

    /// Number of real labels, which is also the sentinel's lattice slot.
    pub fn len(&self) -> usize {
        self.lexicon.size()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    pub fn slot(&self, tag: Tag) -> Option<usize> {
        tag.slot(self.len())
    }

    pub fn tag(&self, slot: usize) -> Tag {
        Tag::from_slot(slot, self.len())
    }

    /// Real tags in handle order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> {
        let n = self.len();
        (0..n).map(move |s| Tag::from_slot(s, n))
    }

    pub fn sort_by_freq(&mut self) {
        self.lexicon.sort_by_freq();
    }

    pub fn clear(&mut self) {
        self.lexicon.clear();
    }

    pub fn load(&mut self) -> Result<()> {
        self.lexicon.load()
    }

    pub fn load_from<R: BufRead>(&mut self, filename: &Path, input: R) -> Result<()> {
        self.lexicon.load_from(filename, input)
    }

    pub fn save(&self, preface: &str) -> Result<()> {
        self.lexicon.save(preface)
    }

    pub fn save_to(&self, filename: &Path, preface: &str) -> Result<()> {
        self.lexicon.save_to(filename, preface)
    }

    pub fn write<W: Write>(&self, out: &mut W, preface: &str) -> std::io::Result<()> {
        self.lexicon.write(out, preface)
    }
}

impl From<Tag> for Word {
    fn from(t: Tag) -> Self {
        match t {
            Tag::NONE => Word::NONE,
            Tag::SENTINEL => Word::SENTINEL,
            Tag(id) => Word::from_id(id),
        }
    }
}
