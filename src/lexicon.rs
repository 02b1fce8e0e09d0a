//! Interned string dictionary.
//!
//! Every distinct surface string is stored once in a pool owned by the
//! lexicon; callers hold [`Word`] handles instead of strings. Handles are
//! indices into the pool offset by the two reserved handles, so they survive
//! reordering and are compared as plain integers.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::error::{Error, Result};

pub const NONE_STR: &str = "__none__";
pub const SENTINEL_STR: &str = "__sentinel__";

/// Number of handles reserved below the pool range.
pub(crate) const RESERVED: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Word(u32);

impl Word {
    pub const NONE: Word = Word(0);
    pub const SENTINEL: Word = Word(1);

    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn from_id(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn is_reserved(self) -> bool {
        self.0 < RESERVED
    }

    #[inline]
    fn from_entry(idx: usize) -> Self {
        Self(idx as u32 + RESERVED)
    }

    #[inline]
    fn entry(self) -> Option<usize> {
        self.0.checked_sub(RESERVED).map(|i| i as usize)
    }
}

#[derive(Debug)]
struct Entry {
    raw: Rc<str>,
    freq: u64,
}

#[derive(Debug, Default)]
struct Pool {
    filename: PathBuf,
    preface: String,
    entries: Vec<Entry>,
    index: HashMap<Rc<str>, u32>,
    /// Traversal order, as indices into `entries`.
    order: Vec<u32>,
}

impl Pool {
    fn find(&self, raw: &str) -> Option<usize> {
        self.index.get(raw).map(|&i| i as usize)
    }

    fn find_or_create(&mut self, raw: &str) -> usize {
        if let Some(i) = self.find(raw) {
            return i;
        }
        let idx = self.entries.len();
        let raw: Rc<str> = Rc::from(raw);
        self.index.insert(Rc::clone(&raw), idx as u32);
        self.entries.push(Entry { raw, freq: 0 });
        self.order.push(idx as u32);
        idx
    }

    fn sort_by_freq(&mut self) {
        let entries = &self.entries;
        self.order.sort_by(|&a, &b| entries[b as usize].freq.cmp(&entries[a as usize].freq));
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.order.clear();
    }
}

/// Maps raw strings to canonical [`Word`] handles.
///
/// Cloning a lexicon does not copy the pool: all clones share one storage,
/// which is released when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pool: Rc<RefCell<Pool>>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty lexicon bound to `filename` for later [`load`](Self::load) and
    /// [`save`](Self::save) calls.
    pub fn with_path(filename: impl Into<PathBuf>) -> Self {
        let this = Self::default();
        this.pool.borrow_mut().filename = filename.into();
        this
    }

    pub fn from_file(filename: impl Into<PathBuf>) -> Result<Self> {
        let mut this = Self::with_path(filename);
        this.load()?;
        Ok(this)
    }

    pub fn filename(&self) -> PathBuf {
        self.pool.borrow().filename.clone()
    }

    /// The preface line read by the last load.
    pub fn preface(&self) -> String {
        self.pool.borrow().preface.clone()
    }

    /// Accumulates `freq` onto the entry for `raw`, creating it if needed.
    pub fn add(&mut self, raw: &str, freq: u64) {
        let mut pool = self.pool.borrow_mut();
        let i = pool.find_or_create(raw);
        pool.entries[i].freq += freq;
    }

    /// Sets the frequency of the entry for `raw`, creating it if needed.
    pub fn insert(&mut self, raw: &str, freq: u64) {
        let mut pool = self.pool.borrow_mut();
        let i = pool.find_or_create(raw);
        pool.entries[i].freq = freq;
    }

    /// Looks up the handle for `raw` without inserting.
    pub fn canonize(&self, raw: &str) -> Option<Word> {
        if raw.starts_with("__") {
            if raw == NONE_STR {
                return Some(Word::NONE);
            } else if raw == SENTINEL_STR {
                return Some(Word::SENTINEL);
            }
        }
        self.pool.borrow().find(raw).map(Word::from_entry)
    }

    /// Batch form of [`canonize`](Self::canonize); unknown strings become
    /// [`Word::NONE`].
    pub fn canonize_all<S: AsRef<str>>(&self, raws: &[S], words: &mut Vec<Word>) {
        words.clear();
        words.reserve(raws.len());
        words.extend(raws.iter().map(|r| self.canonize(r.as_ref()).unwrap_or(Word::NONE)));
    }

    pub fn str(&self, word: Word) -> Option<Rc<str>> {
        match word {
            Word::NONE => Some(Rc::from(NONE_STR)),
            Word::SENTINEL => Some(Rc::from(SENTINEL_STR)),
            _ => {
                let pool = self.pool.borrow();
                word.entry().and_then(|i| pool.entries.get(i)).map(|e| Rc::clone(&e.raw))
            }
        }
    }

    pub fn str_all(&self, words: &[Word], raws: &mut Vec<String>) {
        raws.clear();
        raws.reserve(words.len());
        raws.extend(words.iter().map(|&w| self.str(w).map(|s| s.to_string()).unwrap_or_default()));
    }

    pub fn freq(&self, raw: &str) -> u64 {
        let pool = self.pool.borrow();
        pool.find(raw).map(|i| pool.entries[i].freq).unwrap_or(0)
    }

    /// Reorders traversal to descending frequency. Handles stay valid.
    pub fn sort_by_freq(&mut self) {
        self.pool.borrow_mut().sort_by_freq();
    }

    /// Entries as `(string, frequency)` in traversal order.
    pub fn entries(&self) -> Vec<(Rc<str>, u64)> {
        let pool = self.pool.borrow();
        pool.order
            .iter()
            .map(|&i| {
                let e = &pool.entries[i as usize];
                (Rc::clone(&e.raw), e.freq)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rc<str>, u64)> {
        self.entries().into_iter()
    }

    pub fn size(&self) -> usize {
        self.pool.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Drops every entry; previously issued pool handles become invalid.
    pub fn clear(&mut self) {
        self.pool.borrow_mut().clear();
    }

    pub fn load(&mut self) -> Result<()> {
        let filename = self.filename();
        let f = File::open(&filename).map_err(|e| Error::io("unable to open lexicon file", &filename, e))?;
        self.load_from(&filename, BufReader::new(f))
    }

    /// Reads entries from `input`; `filename` is only used in error messages.
    pub fn load_from<R: BufRead>(&mut self, filename: &Path, mut input: R) -> Result<()> {
        let mut pool = self.pool.borrow_mut();
        let mut nlines = read_preface(filename, &mut input, &mut pool.preface)?;

        let mut line = String::new();
        loop {
            line.clear();
            let n = input
                .read_line(&mut line)
                .map_err(|e| Error::io("unable to read lexicon file", filename, e))?;
            if n == 0 {
                break;
            }
            nlines += 1;
            if line.trim().is_empty() {
                continue;
            }
            let (word, freq) = parse_entry(&line).map_err(|msg| Error::format(msg, filename, nlines))?;
            let i = pool.find_or_create(word);
            pool.entries[i].freq = freq;
        }
        log::debug!("loaded {} entries from {}", pool.entries.len(), filename.display());
        Ok(())
    }

    pub fn save(&self, preface: &str) -> Result<()> {
        let filename = self.filename();
        self.save_to(&filename, preface)
    }

    pub fn save_to(&self, filename: &Path, preface: &str) -> Result<()> {
        let f = File::create(filename).map_err(|e| Error::io("unable to open file for writing", filename, e))?;
        let mut out = BufWriter::new(f);
        self.write(&mut out, preface)
            .and_then(|_| out.flush())
            .map_err(|e| Error::io("unable to write lexicon file", filename, e))
    }

    /// Writes the preface and the entries sorted by descending frequency.
    pub fn write<W: Write>(&self, out: &mut W, preface: &str) -> std::io::Result<()> {
        let mut pool = self.pool.borrow_mut();
        pool.sort_by_freq();
        writeln!(out, "{preface}")?;
        for &i in &pool.order {
            let e = &pool.entries[i as usize];
            writeln!(out, "{} {}", token(&e.raw)?, e.freq)?;
        }
        Ok(())
    }
}

/// Rejects strings the whitespace-separated file formats cannot read back.
pub(crate) fn token(raw: &str) -> std::io::Result<&str> {
    if raw.is_empty() || raw.contains(char::is_whitespace) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("entry {raw:?} is empty or contains whitespace"),
        ));
    }
    Ok(raw)
}

/// Reads the preface line, returning the number of lines consumed.
pub(crate) fn read_preface<R: BufRead>(filename: &Path, input: &mut R, preface: &mut String) -> Result<u64> {
    preface.clear();
    let n = input
        .read_line(preface)
        .map_err(|e| Error::io("unable to read preface", filename, e))?;
    let len = preface.trim_end_matches(['\n', '\r']).len();
    preface.truncate(len);
    Ok(if n == 0 { 0 } else { 1 })
}

fn parse_entry(line: &str) -> std::result::Result<(&str, u64), &'static str> {
    const PARSE: &str = "could not parse word or frequency information for lexicon";
    const NEWLINE: &str = "expected newline after frequency in lexicon file";

    let mut fields = line.split_whitespace();
    let word = fields.next().ok_or(PARSE)?;
    let freq = fields.next().and_then(|s| s.parse::<u64>().ok()).ok_or(PARSE)?;
    if fields.next().is_some() || !line.ends_with('\n') {
        return Err(NEWLINE);
    }
    Ok((word, freq))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_str(s: &str) -> Result<Lexicon> {
        let mut lex = Lexicon::new();
        lex.load_from(Path::new("lexicon"), s.as_bytes())?;
        Ok(lex)
    }

    #[test]
    fn add_accumulates_insert_overwrites() {
        let mut lex = Lexicon::new();
        lex.add("the", 3);
        lex.add("the", 4);
        assert_eq!(lex.freq("the"), 7);
        lex.insert("the", 2);
        assert_eq!(lex.freq("the"), 2);
        assert_eq!(lex.freq("missing"), 0);
        assert_eq!(lex.size(), 1);
    }

    #[test]
    fn canonize_is_stable_and_invertible() {
        let mut lex = Lexicon::new();
        for s in ["zero", "one", "two", "one", "zero"] {
            lex.add(s, 1);
        }
        assert_eq!(lex.size(), 3);
        for s in ["zero", "one", "two"] {
            let w = lex.canonize(s).unwrap();
            assert_eq!(lex.canonize(s), Some(w));
            assert_eq!(&*lex.str(w).unwrap(), s);
            assert!(!w.is_reserved());
        }
        assert_eq!(lex.canonize("three"), None);
        assert_eq!(lex.size(), 3);
    }

    #[test]
    fn reserved_handles() {
        let lex = Lexicon::new();
        assert_eq!(lex.canonize(NONE_STR), Some(Word::NONE));
        assert_eq!(lex.canonize(SENTINEL_STR), Some(Word::SENTINEL));
        assert_eq!(&*lex.str(Word::NONE).unwrap(), NONE_STR);
        assert_eq!(&*lex.str(Word::SENTINEL).unwrap(), SENTINEL_STR);
        assert_eq!(lex.canonize("__other__"), None);
        assert!(lex.is_empty());
    }

    #[test]
    fn sort_keeps_handles() {
        let mut lex = Lexicon::new();
        lex.add("rare", 1);
        lex.add("common", 10);
        lex.add("mid", 5);
        let handles: Vec<_> = ["rare", "common", "mid"].iter().map(|s| lex.canonize(s).unwrap()).collect();
        lex.sort_by_freq();
        let order: Vec<_> = lex.entries().into_iter().map(|(s, _)| s.to_string()).collect();
        assert_eq!(order, ["common", "mid", "rare"]);
        for (s, w) in ["rare", "common", "mid"].iter().zip(handles) {
            assert_eq!(&*lex.str(w).unwrap(), *s);
        }
    }

    #[test]
    fn clones_share_storage() {
        let mut a = Lexicon::new();
        let b = a.clone();
        a.add("shared", 2);
        assert_eq!(b.freq("shared"), 2);
        assert_eq!(b.canonize("shared"), a.canonize("shared"));
        drop(a);
        assert_eq!(b.size(), 1);
    }

    #[test]
    fn load_echoes_preface_and_inserts() {
        let lex = load_str("# preface\nthe 10\nof 4\nthe 3\n").unwrap();
        assert_eq!(lex.preface(), "# preface");
        assert_eq!(lex.freq("the"), 3);
        assert_eq!(lex.freq("of"), 4);
    }

    #[test]
    fn load_rejects_missing_newline() {
        match load_str("# preface\nthe 10\nof 4") {
            Err(Error::Format { line, msg, .. }) => {
                assert_eq!(line, 3);
                assert!(msg.contains("newline"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn load_rejects_bad_frequency() {
        match load_str("# preface\nthe 10\n\nof many\n") {
            Err(Error::Format { line, msg, path }) => {
                assert_eq!(line, 4);
                assert!(msg.contains("could not parse"));
                assert_eq!(path, PathBuf::from("lexicon"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn write_is_sorted() {
        let mut lex = Lexicon::new();
        lex.add("b", 2);
        lex.add("a", 9);
        lex.add("c", 2);
        let mut out = Vec::new();
        lex.write(&mut out, "# p").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "# p\na 9\nb 2\nc 2\n");
    }
}
