use std::io::Write;

use crate::{
    error::{Error, Result},
    tagset::TagSet,
};

/// Scores of every `(previous, current)` tag pair at one position.
///
/// This is a [L+1][L+1] matrix indexed by lattice slots; slot L is the
/// sentinel. Transition and emission weights are already summed.
#[derive(Debug, Clone, Default)]
pub struct PairScores {
    num_tags: usize,
    scores: Vec<f64>,
}

impl PairScores {
    pub fn new(num_tags: usize) -> Self {
        let width = num_tags + 1;
        Self { num_tags, scores: vec![0.0; width * width] }
    }

    #[inline]
    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    #[inline]
    pub fn add(&mut self, prev: usize, curr: usize, score: f64) {
        self.scores[(self.num_tags + 1) * prev + curr] += score;
    }

    #[inline]
    pub fn get(&self, prev: usize, curr: usize) -> f64 {
        self.scores[(self.num_tags + 1) * prev + curr]
    }

    pub fn reset(&mut self) {
        self.scores.iter_mut().for_each(|s| *s = 0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Empty,
    Populated,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct Lattice {
    /// The total number of distinct tags (L).
    num_tags: usize,
    /// The number of columns (T) added so far.
    num_items: usize,
    /// The number of columns the buffers can hold.
    cap_items: usize,
    /**
     * Cumulative scores.
     *  This is a [T][L] matrix whose element [t][j] is the best score of a
     *  path from the start sentinel arriving at (t, j).
     */
    score: Vec<f64>,
    /**
     * Backward edges.
     *  This is a [T][L] matrix whose element [t][j] is the tag slot #i at t-1
     *  that yields the maximum score at (t, j).
     */
    back: Vec<usize>,
    /// Score of leaving the last column from each tag into the end sentinel.
    exit: Vec<f64>,
    level: Level,
}

impl Lattice {
    pub fn new(num_tags: usize, max_items: usize) -> Self {
        let mut this = Self {
            num_tags,
            num_items: 0,
            cap_items: 0,
            score: Vec::new(),
            back: Vec::new(),
            exit: vec![0.0; num_tags],
            level: Level::Empty,
        };
        this.reserve(max_items);
        this
    }

    fn reserve(&mut self, items: usize) {
        if self.cap_items < items {
            let l = self.num_tags;
            self.score.resize(items * l, 0.0);
            self.back.resize(items * l, 0);
            self.cap_items = items;
        }
    }

    pub fn len(&self) -> usize {
        self.num_items
    }

    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn reset(&mut self) {
        self.num_items = 0;
        self.exit.iter_mut().for_each(|e| *e = 0.0);
        self.level = Level::Empty;
    }

    fn check(&self, tags: &TagSet, scores: &PairScores) -> Result<()> {
        if tags.len() != self.num_tags || scores.num_tags() != self.num_tags {
            return Err(Error::Lattice(format!(
                "tag set size mismatch (lattice: {}, tags: {}, scores: {})",
                self.num_tags,
                tags.len(),
                scores.num_tags()
            )));
        }
        if self.level == Level::Resolved {
            return Err(Error::Lattice("lattice must be reset before adding columns".to_string()));
        }
        Ok(())
    }

    /// Adds the column for the next position.
    pub fn viterbi(&mut self, tags: &TagSet, scores: &PairScores) -> Result<()> {
        self.check(tags, scores)?;
        let l = self.num_tags;
        let t = self.num_items;
        self.reserve(t + 1);

        if t == 0 {
            /* The first column is entered from the start sentinel. */
            for j in 0..l {
                self.score[j] = scores.get(l, j);
                self.back[j] = l;
            }
        } else {
            for j in 0..l {
                /* Lowest slot wins ties: only a strictly better score replaces it. */
                let mut argmax = 0;
                let mut max_score = self.score[l * (t - 1)] + scores.get(0, j);
                for i in 1..l {
                    let score = self.score[l * (t - 1) + i] + scores.get(i, j);
                    if max_score < score {
                        max_score = score;
                        argmax = i;
                    }
                }
                self.score[l * t + j] = max_score;
                self.back[l * t + j] = argmax;
            }
        }
        self.num_items += 1;
        self.level = Level::Populated;
        Ok(())
    }

    /// Folds the transition into the end sentinel into the last column.
    pub fn terminate(&mut self, tags: &TagSet, scores: &PairScores) -> Result<()> {
        self.check(tags, scores)?;
        let l = self.num_tags;
        for i in 0..l {
            self.exit[i] = scores.get(i, l);
        }
        Ok(())
    }

    /// Traces the best path into `path` (tag slots) and returns its score.
    pub fn best_path(&mut self, path: &mut Vec<usize>) -> Result<f64> {
        let t_len = self.num_items;
        let l = self.num_tags;
        if self.level != Level::Populated || t_len == 0 || l == 0 {
            return Err(Error::Lattice("no populated lattice to decode".to_string()));
        }

        /* Find the node (#T-1, #i) that reaches the end sentinel with the maximum score. */
        let last = l * (t_len - 1);
        let mut argmax = 0;
        let mut max_score = self.score[last] + self.exit[0];
        for i in 1..l {
            let score = self.score[last + i] + self.exit[i];
            if max_score < score {
                max_score = score;
                argmax = i;
            }
        }

        /* Tag labels by tracing the backward links. */
        path.clear();
        path.resize(t_len, 0);
        path[t_len - 1] = argmax;
        for t in (0..t_len - 1).rev() {
            path[t] = self.back[l * (t + 1) + path[t + 1]];
        }
        self.level = Level::Resolved;
        Ok(max_score)
    }

    /// Writes the best tag sequence for a sentence of `len` tokens into
    /// `labels` and returns its score.
    pub fn best(&mut self, tags: &TagSet, labels: &mut Vec<String>, len: usize) -> Result<f64> {
        if len != self.num_items {
            return Err(Error::Lattice(format!("lattice has {} columns, sentence has {len} tokens", self.num_items)));
        }
        let mut path = Vec::with_capacity(len);
        let score = self.best_path(&mut path)?;
        labels.clear();
        for slot in path {
            let tag = tags.tag(slot);
            labels.push(tags.str(tag).map(|s| s.to_string()).unwrap_or_default());
        }
        Ok(score)
    }

    /// Prints the cumulative score and back-pointer of every node.
    pub fn print(&self, out: &mut dyn Write, tags: &TagSet, len: usize) -> std::io::Result<()> {
        let l = self.num_tags;
        let name = |slot: usize| tags.str(tags.tag(slot)).map(|s| s.to_string()).unwrap_or_default();
        write!(out, "pos")?;
        for j in 0..l {
            write!(out, "\t{}", name(j))?;
        }
        writeln!(out)?;
        for t in 0..len.min(self.num_items) {
            write!(out, "{t}")?;
            for j in 0..l {
                write!(out, "\t{:.4}<{}", self.score[l * t + j], name(self.back[l * t + j]))?;
            }
            writeln!(out)?;
        }
        if self.exit.iter().any(|&e| e != 0.0) {
            write!(out, "exit")?;
            for e in &self.exit {
                write!(out, "\t{e:.4}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagset(n: usize) -> TagSet {
        let mut tags = TagSet::new();
        for i in 0..n {
            tags.add(&format!("T{i}"), 1);
        }
        tags
    }

    fn path_score(start: &[f64], trans: &[[f64; 2]; 2], emit: &[[f64; 2]], path: &[usize]) -> f64 {
        let mut s = start[path[0]] + emit[0][path[0]];
        for t in 1..path.len() {
            s += trans[path[t - 1]][path[t]] + emit[t][path[t]];
        }
        s
    }

    #[test]
    fn two_by_two_matches_brute_force() {
        let tags = tagset(2);
        let start = [0.5, 0.1];
        let trans = [[0.2, 1.3], [0.9, -0.4]];
        let emit = [[1.0, 0.7], [0.1, 0.6]];

        let mut lattice = Lattice::new(2, 1);
        let mut scores = PairScores::new(2);
        for j in 0..2 {
            scores.add(2, j, start[j] + emit[0][j]);
        }
        lattice.viterbi(&tags, &scores).unwrap();
        scores.reset();
        for i in 0..2 {
            for j in 0..2 {
                scores.add(i, j, trans[i][j] + emit[1][j]);
            }
        }
        lattice.viterbi(&tags, &scores).unwrap();

        let mut path = Vec::new();
        let best = lattice.best_path(&mut path).unwrap();

        let mut brute = (f64::NEG_INFINITY, vec![]);
        for a in 0..2 {
            for b in 0..2 {
                let s = path_score(&start, &trans, &emit, &[a, b]);
                if s > brute.0 {
                    brute = (s, vec![a, b]);
                }
            }
        }
        assert_eq!(path, brute.1);
        assert!((best - brute.0).abs() < 1e-12);
        assert_eq!(lattice.level(), Level::Resolved);
    }

    #[test]
    fn ties_pick_lowest_tag() {
        let tags = tagset(3);
        let mut lattice = Lattice::new(3, 4);
        let scores = PairScores::new(3);
        for _ in 0..3 {
            lattice.viterbi(&tags, &scores).unwrap();
        }
        let mut labels = Vec::new();
        let score = lattice.best(&tags, &mut labels, 3).unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(labels, ["T0", "T0", "T0"]);
    }

    #[test]
    fn exit_scores_change_the_winner() {
        let tags = tagset(2);
        let mut lattice = Lattice::new(2, 1);
        let mut scores = PairScores::new(2);
        scores.add(2, 0, 1.0);
        scores.add(2, 1, 0.5);
        lattice.viterbi(&tags, &scores).unwrap();
        scores.reset();
        scores.add(1, 2, 2.0);
        lattice.terminate(&tags, &scores).unwrap();
        let mut labels = Vec::new();
        let score = lattice.best(&tags, &mut labels, 1).unwrap();
        assert_eq!(labels, ["T1"]);
        assert!((score - 2.5).abs() < 1e-12);
    }

    #[test]
    fn state_machine() {
        let tags = tagset(2);
        let mut lattice = Lattice::new(2, 2);
        let scores = PairScores::new(2);
        let mut labels = Vec::new();
        assert!(matches!(lattice.best(&tags, &mut labels, 0), Err(Error::Lattice(_))));
        lattice.viterbi(&tags, &scores).unwrap();
        assert!(matches!(lattice.best(&tags, &mut labels, 2), Err(Error::Lattice(_))));
        lattice.best(&tags, &mut labels, 1).unwrap();
        assert!(matches!(lattice.viterbi(&tags, &scores), Err(Error::Lattice(_))));
        lattice.reset();
        assert!(lattice.is_empty());
        lattice.viterbi(&tags, &scores).unwrap();
        assert_eq!(lattice.len(), 1);
        assert!(matches!(lattice.viterbi(&tagset(3), &scores), Err(Error::Lattice(_))));
    }

    #[test]
    fn print_table() {
        let tags = tagset(2);
        let mut lattice = Lattice::new(2, 2);
        let mut scores = PairScores::new(2);
        scores.add(2, 1, 1.5);
        lattice.viterbi(&tags, &scores).unwrap();
        let mut out = Vec::new();
        lattice.print(&mut out, &tags, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "pos\tT0\tT1\n0\t0.0000<__sentinel__\t1.5000<__sentinel__\n");
    }
}
