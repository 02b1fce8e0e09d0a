use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use super::{Obs, Source, Type};
use crate::{
    error::{Error, Result},
    lexicon::{read_preface, token, Lexicon, Word},
    tagset::{Tag, TagPair, TagSet},
};

/// An observation paired with the tags it was seen with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AttrKey {
    pub obs: Obs,
    pub pair: TagPair,
}

/// The attribute dictionary: dense indices for every distinct
/// `(observation, tag pair)` seen during extraction.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    keys: Vec<AttrKey>,
    freqs: Vec<u64>,
    index: HashMap<AttrKey, u32>,
    /// All attribute indices sharing an observation, in index order.
    by_obs: HashMap<Obs, Vec<u32>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, key: AttrKey) -> u32 {
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.keys.len() as u32;
        self.keys.push(key);
        self.freqs.push(0);
        self.index.insert(key, i);
        self.by_obs.entry(key.obs).or_default().push(i);
        i
    }

    /// Counts one more sighting of `obs` with `pair`, assigning the next index
    /// on first sight.
    pub fn add(&mut self, obs: Obs, pair: TagPair, freq: u64) -> u32 {
        let i = self.entry(AttrKey { obs, pair });
        self.freqs[i as usize] += freq;
        i
    }

    pub fn find(&self, obs: Obs, pair: TagPair) -> Option<u32> {
        self.index.get(&AttrKey { obs, pair }).copied()
    }

    /// Indices of `obs` under every tag pair it was seen with.
    pub fn find_all(&self, obs: &Obs) -> &[u32] {
        self.by_obs.get(obs).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, i: u32) -> Option<&AttrKey> {
        self.keys.get(i as usize)
    }

    pub fn freq(&self, i: u32) -> u64 {
        self.freqs.get(i as usize).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(key, freq)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttrKey, u64)> {
        self.keys.iter().zip(self.freqs.iter().copied())
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.freqs.clear();
        self.index.clear();
        self.by_obs.clear();
    }

    /// Drops attributes seen fewer than `cutoff` times and renumbers the rest
    /// in insertion order. Returns the number removed.
    pub fn prune(&mut self, cutoff: u64) -> usize {
        if cutoff <= 1 {
            return 0;
        }
        let before = self.len();
        let kept: Vec<(AttrKey, u64)> = self.iter().filter(|&(_, f)| f >= cutoff).map(|(k, f)| (*k, f)).collect();
        self.clear();
        for (key, freq) in kept {
            let i = self.entry(key);
            self.freqs[i as usize] = freq;
        }
        before - self.len()
    }

    pub fn load(&mut self, filename: &Path, lexicon: &Lexicon, pos: &Lexicon, tags: &TagSet) -> Result<()> {
        let f = File::open(filename).map_err(|e| Error::io("unable to open attributes file", filename, e))?;
        self.load_from(filename, BufReader::new(f), lexicon, pos, tags)
    }

    /// Reads attributes in file order; `filename` is only used in error
    /// messages.
    pub fn load_from<R: BufRead>(
        &mut self,
        filename: &Path,
        mut input: R,
        lexicon: &Lexicon,
        pos: &Lexicon,
        tags: &TagSet,
    ) -> Result<()> {
        let mut preface = String::new();
        let mut nlines = read_preface(filename, &mut input, &mut preface)?;

        let mut line = String::new();
        loop {
            line.clear();
            let n = input
                .read_line(&mut line)
                .map_err(|e| Error::io("unable to read attributes file", filename, e))?;
            if n == 0 {
                break;
            }
            nlines += 1;
            if line.trim().is_empty() {
                continue;
            }
            let (key, freq) = parse_attribute(&line, lexicon, pos, tags).map_err(|msg| Error::format(msg, filename, nlines))?;
            let i = self.entry(key);
            self.freqs[i as usize] = freq;
        }
        log::debug!("loaded {} attributes from {}", self.len(), filename.display());
        Ok(())
    }

    pub fn save_to(&self, filename: &Path, preface: &str, lexicon: &Lexicon, pos: &Lexicon, tags: &TagSet) -> Result<()> {
        let f = File::create(filename).map_err(|e| Error::io("unable to open file for writing", filename, e))?;
        let mut out = BufWriter::new(f);
        self.write(&mut out, preface, lexicon, pos, tags)
            .and_then(|_| out.flush())
            .map_err(|e| Error::io("unable to write attributes file", filename, e))
    }

    /// Writes the preface and one `type values... prev curr freq` line per
    /// attribute in index order.
    pub fn write<W: Write>(&self, out: &mut W, preface: &str, lexicon: &Lexicon, pos: &Lexicon, tags: &TagSet) -> io::Result<()> {
        writeln!(out, "{preface}")?;
        for (key, freq) in self.iter() {
            let ty = Type::from_index(key.obs.ty)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "attribute with unknown feature type"))?;
            write!(out, "{}", ty.id)?;
            let dict = match ty.source {
                Source::Word => Some(lexicon),
                Source::Pos => Some(pos),
                Source::None => None,
            };
            for &v in &key.obs.values[..ty.arity()] {
                let s = dict
                    .and_then(|d| d.str(Word::from_id(v)))
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "attribute value missing from dictionary"))?;
                write!(out, " {}", token(&s)?)?;
            }
            let tag = |t: Tag| tags.str(t).map(|s| s.to_string()).unwrap_or_default();
            let (prev, curr) = (tag(key.pair.prev), tag(key.pair.curr));
            writeln!(out, " {} {} {freq}", token(&prev)?, token(&curr)?)?;
        }
        Ok(())
    }
}

fn parse_attribute(
    line: &str,
    lexicon: &Lexicon,
    pos: &Lexicon,
    tags: &TagSet,
) -> std::result::Result<(AttrKey, u64), &'static str> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let ty = fields
        .first()
        .and_then(|id| Type::from_id(id))
        .ok_or("unknown feature type in attributes file")?;
    if fields.len() != ty.arity() + 4 {
        return Err("could not parse attribute line");
    }
    if !line.ends_with('\n') {
        return Err("expected newline after frequency in attributes file");
    }

    let mut values = [0u32; 2];
    for (v, raw) in values.iter_mut().zip(&fields[1..=ty.arity()]) {
        let w = match ty.source {
            Source::Word => lexicon.canonize(raw),
            Source::Pos => pos.canonize(raw),
            Source::None => None,
        };
        *v = w.ok_or("attribute value not in dictionary")?.id();
    }
    let tag = |raw: &str| tags.canonize(raw).filter(|&t| t != Tag::NONE).ok_or("attribute tag not in tag set");
    let n = fields.len();
    let pair = TagPair::new(tag(fields[n - 3])?, tag(fields[n - 2])?);
    let freq = fields[n - 1].parse::<u64>().map_err(|_| "could not parse attribute frequency")?;
    Ok((AttrKey { obs: Obs::new(ty, values), pair }, freq))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dicts() -> (Lexicon, Lexicon, TagSet) {
        let mut lexicon = Lexicon::new();
        let mut pos = Lexicon::new();
        let mut tags = TagSet::new();
        lexicon.add("Rockwell", 1);
        pos.add("NNP", 1);
        pos.add("VBD", 1);
        tags.add("B-NP", 1);
        tags.add("B-VP", 1);
        (lexicon, pos, tags)
    }

    #[test]
    fn indices_are_dense_and_grouped_by_observation() {
        let (lexicon, _, tags) = dicts();
        let w = lexicon.canonize("Rockwell").unwrap().id();
        let np = tags.canonize("B-NP").unwrap();
        let vp = tags.canonize("B-VP").unwrap();
        let obs = Obs::new(&Type::W, [w, 0]);

        let mut attrs = Attributes::new();
        assert_eq!(attrs.add(obs, TagPair::new(Tag::SENTINEL, np), 1), 0);
        assert_eq!(attrs.add(Obs::new(&Type::TRANS, [0, 0]), TagPair::new(Tag::SENTINEL, np), 1), 1);
        assert_eq!(attrs.add(obs, TagPair::new(np, vp), 1), 2);
        assert_eq!(attrs.add(obs, TagPair::new(Tag::SENTINEL, np), 2), 0);
        assert_eq!(attrs.freq(0), 3);
        assert_eq!(attrs.find_all(&obs), [0, 2]);
        assert_eq!(attrs.find(obs, TagPair::new(np, np)), None);
        assert!(attrs.find_all(&Obs::new(&Type::P, [w, 0])).is_empty());
    }

    #[test]
    fn prune_keeps_order() {
        let mut attrs = Attributes::new();
        let pair = TagPair::default();
        for (v, f) in [(2, 5), (3, 1), (4, 2), (5, 1)] {
            attrs.add(Obs::new(&Type::W, [v, 0]), pair, f);
        }
        assert_eq!(attrs.prune(2), 2);
        let kept: Vec<_> = attrs.iter().map(|(k, f)| (k.obs.values[0], f)).collect();
        assert_eq!(kept, [(2, 5), (4, 2)]);
        assert_eq!(attrs.find(Obs::new(&Type::W, [4, 0]), pair), Some(1));
        assert_eq!(attrs.prune(1), 0);
    }

    #[test]
    fn text_format_round_trip() {
        let (lexicon, pos, tags) = dicts();
        let np = tags.canonize("B-NP").unwrap();
        let vp = tags.canonize("B-VP").unwrap();
        let nnp = pos.canonize("NNP").unwrap().id();
        let vbd = pos.canonize("VBD").unwrap().id();

        let mut attrs = Attributes::new();
        attrs.add(Obs::new(&Type::TRANS, [0, 0]), TagPair::new(np, vp), 4);
        attrs.add(Obs::new(&Type::PP_P, [nnp, vbd]), TagPair::new(np, vp), 2);
        attrs.add(Obs::new(&Type::NW, [Word::SENTINEL.id(), 0]), TagPair::new(vp, Tag::SENTINEL), 1);

        let mut out = Vec::new();
        attrs.write(&mut out, "# attributes", &lexicon, &pos, &tags).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "# attributes\nt B-NP B-VP 4\npp_p NNP VBD B-NP B-VP 2\nnw __sentinel__ B-VP __sentinel__ 1\n"
        );

        let mut loaded = Attributes::new();
        loaded.load_from(Path::new("attributes"), text.as_bytes(), &lexicon, &pos, &tags).unwrap();
        let a: Vec<_> = attrs.iter().map(|(k, f)| (*k, f)).collect();
        let b: Vec<_> = loaded.iter().map(|(k, f)| (*k, f)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn write_rejects_unreadable_values() {
        let (mut lexicon, pos, tags) = dicts();
        lexicon.add("New York", 1);
        let w = lexicon.canonize("New York").unwrap().id();
        let np = tags.canonize("B-NP").unwrap();

        let mut attrs = Attributes::new();
        attrs.add(Obs::new(&Type::W, [w, 0]), TagPair::new(Tag::SENTINEL, np), 1);
        let err = attrs.write(&mut Vec::new(), "# attributes", &lexicon, &pos, &tags).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn load_reports_bad_lines() {
        let (lexicon, pos, tags) = dicts();
        let mut attrs = Attributes::new();
        let err = attrs
            .load_from(Path::new("attributes"), "# p\nt B-NP B-VP 1\nw Unknown B-NP B-VP 1\n".as_bytes(), &lexicon, &pos, &tags)
            .unwrap_err();
        match err {
            Error::Format { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected: {other:?}"),
        }
        let err = Attributes::new()
            .load_from(Path::new("attributes"), "# p\nshape x B-NP B-VP 1\n".as_bytes(), &lexicon, &pos, &tags)
            .unwrap_err();
        assert!(err.to_string().contains("unknown feature type"));
    }
}
