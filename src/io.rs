//! Corpus readers and writers.
//!
//! Tagging pulls sentences once through a [`Reader`]; training needs a
//! [`Corpus`] it can rewind between passes. [`ConllReader`] and
//! [`ConllWriter`] implement them for whitespace-separated column files.

use std::{
    fs::File,
    io::{BufRead, BufReader, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use bitflags::bitflags;

use crate::{
    error::{Error, Result},
    lexicon::NONE_STR,
    sentence::Sentence,
};

pub trait Reader {
    /// Reads the next sentence into `sent`; `false` once the input is exhausted.
    fn next(&mut self, sent: &mut Sentence) -> Result<bool>;
}

/// A reader over seekable input.
pub trait Corpus: Reader {
    /// Restarts the corpus from the first sentence.
    fn rewind(&mut self) -> Result<()>;
}

pub trait Writer {
    fn next(&mut self, sent: &Sentence) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

bitflags! {
    /// Columns present in a corpus file, in file order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Fields: u8 {
        const WORDS = 0x01;
        const POS = 0x02;
        const GOLD = 0x04;
    }
}

impl Default for Fields {
    fn default() -> Self {
        Fields::WORDS | Fields::POS | Fields::GOLD
    }
}

pub struct ConllReader<R> {
    path: PathBuf,
    input: R,
    fields: Fields,
    nlines: u64,
    line: String,
}

impl ConllReader<BufReader<File>> {
    pub fn open(path: impl Into<PathBuf>, fields: Fields) -> Result<Self> {
        let path = path.into();
        let f = File::open(&path).map_err(|e| Error::io("unable to open corpus file", &path, e))?;
        Ok(Self::new(path, BufReader::new(f), fields))
    }
}

impl<R: BufRead> ConllReader<R> {
    pub fn new(path: impl Into<PathBuf>, input: R, fields: Fields) -> Self {
        Self { path: path.into(), input, fields: fields | Fields::WORDS, nlines: 0, line: String::new() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&mut self, sent: &mut Sentence) -> Result<bool> {
        sent.reset();
        let ncols = self.fields.bits().count_ones() as usize;
        loop {
            self.line.clear();
            let n = self
                .input
                .read_line(&mut self.line)
                .map_err(|e| Error::io("unable to read corpus file", &self.path, e))?;
            if n == 0 {
                return Ok(!sent.is_empty());
            }
            self.nlines += 1;

            let cols: Vec<&str> = self.line.split_whitespace().collect();
            if cols.is_empty() {
                if sent.is_empty() {
                    continue;
                }
                return Ok(true);
            }
            if cols.len() != ncols {
                return Err(Error::format(
                    format!("expected {ncols} columns in corpus line, found {}", cols.len()),
                    &self.path,
                    self.nlines,
                ));
            }
            let mut cols = cols.into_iter();
            let word = cols.next().unwrap_or_default();
            let pos = if self.fields.contains(Fields::POS) { cols.next().unwrap_or(NONE_STR) } else { NONE_STR };
            let gold = if self.fields.contains(Fields::GOLD) { cols.next() } else { None };
            sent.push(word, pos, gold);
        }
    }
}

impl<R: BufRead> Reader for ConllReader<R> {
    fn next(&mut self, sent: &mut Sentence) -> Result<bool> {
        self.read(sent)
    }
}

impl<R: BufRead + Seek> Corpus for ConllReader<R> {
    fn rewind(&mut self) -> Result<()> {
        self.input
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::io("unable to rewind corpus file", &self.path, e))?;
        self.nlines = 0;
        Ok(())
    }
}

/// Writes `word [pos] [gold] label` lines with a blank line after each
/// sentence.
pub struct ConllWriter<W: Write> {
    path: PathBuf,
    out: W,
    fields: Fields,
}

impl<W: Write> ConllWriter<W> {
    pub fn new(path: impl Into<PathBuf>, out: W, fields: Fields) -> Self {
        Self { path: path.into(), out, fields: fields | Fields::WORDS }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, sent: &Sentence) -> std::io::Result<()> {
        for i in 0..sent.len() {
            write!(self.out, "{}", sent.words[i])?;
            if self.fields.contains(Fields::POS) {
                write!(self.out, " {}", sent.pos[i])?;
            }
            if self.fields.contains(Fields::GOLD) {
                write!(self.out, " {}", sent.gold.get(i).map(String::as_str).unwrap_or(NONE_STR))?;
            }
            writeln!(self.out, " {}", sent.labels.get(i).map(String::as_str).unwrap_or(NONE_STR))?;
        }
        writeln!(self.out)
    }
}

impl<W: Write> Writer for ConllWriter<W> {
    fn next(&mut self, sent: &Sentence) -> Result<()> {
        self.write(sent).map_err(|e| Error::io("unable to write tagged output", &self.path, e))
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().map_err(|e| Error::io("unable to flush tagged output", &self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const CORPUS: &str = "He PRP B-NP\nreckons VBZ B-VP\n\n\nThe DT B-NP\ndeficit NN I-NP\n. . O";

    #[test]
    fn reads_sentences_and_rewinds() {
        let mut reader = ConllReader::new("corpus", Cursor::new(CORPUS), Fields::default());
        let mut sent = Sentence::default();
        assert!(reader.next(&mut sent).unwrap());
        assert_eq!(sent.words, ["He", "reckons"]);
        assert_eq!(sent.gold, ["B-NP", "B-VP"]);
        assert!(reader.next(&mut sent).unwrap());
        assert_eq!(sent.len(), 3);
        assert_eq!(sent.pos, ["DT", "NN", "."]);
        assert!(!reader.next(&mut sent).unwrap());
        assert!(sent.is_empty());

        reader.rewind().unwrap();
        assert!(reader.next(&mut sent).unwrap());
        assert_eq!(sent.words[0], "He");
    }

    #[test]
    fn rejects_ragged_lines() {
        let mut reader = ConllReader::new("corpus", Cursor::new("He PRP B-NP\nreckons VBZ\n"), Fields::default());
        let mut sent = Sentence::default();
        match reader.next(&mut sent) {
            Err(Error::Format { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn reads_unseekable_input() {
        let input: &[u8] = b"He PRP\nreckons VBZ\n\nThe DT\n";
        let mut reader = ConllReader::new("<stdin>", input, Fields::WORDS | Fields::POS);
        let mut sent = Sentence::default();
        assert!(reader.next(&mut sent).unwrap());
        assert_eq!(sent.pos, ["PRP", "VBZ"]);
        assert!(!sent.has_gold());
        assert!(reader.next(&mut sent).unwrap());
        assert_eq!(sent.words, ["The"]);
        assert!(!reader.next(&mut sent).unwrap());
    }

    #[test]
    fn writes_labels() {
        let mut sent = Sentence::default();
        sent.push("He", "PRP", None);
        sent.labels.push("B-NP".to_string());
        let mut writer = ConllWriter::new("out", Vec::new(), Fields::WORDS | Fields::POS);
        writer.next(&sent).unwrap();
        writer.finish().unwrap();
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "He PRP B-NP\n\n");
    }
}
