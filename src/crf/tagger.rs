use std::path::{Path, PathBuf};

use super::{
    features::{Attributes, Contexts, Instances, Registry, Resolved},
    lattice::{Lattice, PairScores},
    lbfgs::{LbfgsParams, Optimizer},
    model::{ModelInfo, ModelPaths},
};
use crate::{
    config::{Config, Op, OpGroup},
    error::{Error, Result},
    evaluation::Evaluation,
    io::{Corpus, Reader, Writer},
    lexicon::Lexicon,
    sentence::Sentence,
    tagset::{Tag, TagSet},
};

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-sentence decoding buffers, reused across sentences.
#[derive(Debug, Clone)]
pub struct State {
    pub resolved: Resolved,
    pub scores: PairScores,
    pub lattice: Lattice,
}

impl State {
    pub fn new(num_tags: usize, max_size: usize) -> Self {
        Self { resolved: Resolved::default(), scores: PairScores::new(num_tags), lattice: Lattice::new(num_tags, max_size) }
    }

    pub fn reset(&mut self) {
        self.resolved.clear();
        self.scores.reset();
        self.lattice.reset();
    }
}

/// A chunk tagger: the dictionaries, attributes and weights of one model
/// plus the training passes that produce them.
#[derive(Debug)]
pub struct Tagger {
    paths: ModelPaths,
    preface: String,
    cutoff: u64,
    lexicon: Lexicon,
    pos: Lexicon,
    tags: TagSet,
    attributes: Attributes,
    registry: Registry,
    weights: Vec<f64>,
    max_size: usize,
}

impl Tagger {
    /// The full option tree understood by [`Tagger::new`].
    pub fn config() -> Config {
        let preface = format!("# {NAME} {VERSION}");
        let train = OpGroup::new("train", "Training config")
            .op(Op::value("cutoff", "minimum frequency of a kept attribute", "1"));
        Config::new(NAME, "linear-chain CRF chunk tagger", VERSION)
            .op(Op::required("model", "model directory"))
            .op(Op::value("preface", "first line of every persisted model file", &preface))
            .group(Registry::options())
            .group(LbfgsParams::options(train))
    }

    /// An untrained tagger configured from a processed option tree.
    pub fn new(cfg: &Config) -> Result<Self> {
        let dir = cfg.get("model").ok_or_else(|| Error::config("Missing required option", "--model"))?;
        let paths = ModelPaths::new(dir);
        Ok(Self {
            preface: cfg.get("preface").unwrap_or_default().to_string(),
            cutoff: cfg.parse("train-cutoff")?,
            lexicon: Lexicon::with_path(paths.lexicon()),
            pos: Lexicon::with_path(paths.pos()),
            tags: TagSet::with_path(paths.tags()),
            attributes: Attributes::new(),
            registry: Registry::from_config(cfg)?,
            weights: Vec::new(),
            max_size: 0,
            paths,
        })
    }

    /// Loads a trained model directory.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let paths = ModelPaths::new(dir);
        let info = ModelInfo::load(&paths.info())?;
        let lexicon = Lexicon::from_file(paths.lexicon())?;
        let pos = Lexicon::from_file(paths.pos())?;
        let tags = TagSet::from_file(paths.tags())?;
        if tags.len() != info.num_tags {
            return Err(Error::Model(format!(
                "{} expects {} tags, {} has {}",
                paths.info().display(),
                info.num_tags,
                paths.tags().display(),
                tags.len()
            )));
        }
        let mut attributes = Attributes::new();
        attributes.load(&paths.attributes(), &lexicon, &pos, &tags)?;
        if attributes.len() != info.num_attributes {
            return Err(Error::Model(format!(
                "{} expects {} attributes, {} has {}",
                paths.info().display(),
                info.num_attributes,
                paths.attributes().display(),
                attributes.len()
            )));
        }
        let registry = Registry::with_types(&info.types)?;
        log::info!(
            "loaded model {} ({} words, {} tags, {} attributes, types {:?})",
            paths.dir.display(),
            lexicon.size(),
            tags.len(),
            attributes.len(),
            registry.types()
        );
        Ok(Self {
            preface: lexicon.preface(),
            cutoff: 1,
            lexicon,
            pos,
            tags,
            attributes,
            registry,
            weights: info.weights,
            max_size: info.max_size,
            paths,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.paths.dir
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn pos(&self) -> &Lexicon {
        &self.pos
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Sentences without gold labels take no part in training. Pass 1 warns
    /// about them; the later passes skip the same sentences quietly.
    fn skipped(sent: &Sentence, pass: u8) -> bool {
        if sent.has_gold() {
            return false;
        }
        let level = if pass == 1 { log::Level::Warn } else { log::Level::Debug };
        log::log!(level, "pass {pass}: skipping sentence without gold labels: {}", sent.words.join(" "));
        true
    }

    fn gold(&self, sent: &Sentence, pass: u8, gold: &mut Vec<Tag>) -> bool {
        if Self::skipped(sent, pass) {
            return false;
        }
        self.tags.canonize_all(&sent.gold, gold);
        true
    }

    /// Pass 1: builds the word, part of speech and tag dictionaries.
    pub fn pass1(&mut self, reader: &mut dyn Corpus) -> Result<()> {
        reader.rewind()?;
        self.paths.create()?;
        self.lexicon.clear();
        self.pos.clear();
        self.tags.clear();

        let mut sent = Sentence::default();
        let mut max_size = 0;
        let mut nsents = 0;
        while reader.next(&mut sent)? {
            if Self::skipped(&sent, 1) {
                continue;
            }
            for i in 0..sent.len() {
                self.lexicon.add(&sent.words[i], 1);
                self.pos.add(&sent.pos[i], 1);
                self.tags.add(&sent.gold[i], 1);
            }
            max_size = max_size.max(sent.len());
            nsents += 1;
        }

        self.lexicon.save(&self.preface)?;
        self.pos.save(&self.preface)?;
        self.tags.save(&self.preface)?;
        self.max_size = max_size;
        log::info!(
            "pass 1: {nsents} sentences, {} words, {} pos, {} tags, max size {max_size}",
            self.lexicon.size(),
            self.pos.size(),
            self.tags.len()
        );
        Ok(())
    }

    /// Pass 2: extracts the attribute dictionary against the gold labels.
    pub fn pass2(&mut self, reader: &mut dyn Corpus) -> Result<()> {
        reader.rewind()?;
        self.attributes.clear();

        let mut sent = Sentence::default();
        let mut resolved = Resolved::default();
        let mut gold = Vec::new();
        let mut contexts = Contexts::default();
        while reader.next(&mut sent)? {
            if !self.gold(&sent, 2, &mut gold) {
                continue;
            }
            resolved.resolve(&self.lexicon, &self.pos, &sent);
            self.registry.generate(&mut self.attributes, &resolved, &gold, &mut contexts, true);
        }

        let extracted = self.attributes.len();
        let pruned = self.attributes.prune(self.cutoff);
        self.attributes
            .save_to(&self.paths.attributes(), &self.preface, &self.lexicon, &self.pos, &self.tags)?;
        log::info!("pass 2: {extracted} attributes, {pruned} below cutoff {}", self.cutoff);
        Ok(())
    }

    /// Pass 3: builds one context sequence per sentence.
    pub fn pass3(&mut self, reader: &mut dyn Corpus) -> Result<Instances> {
        reader.rewind()?;
        let num_tags = self.tags.len();
        /* Pairs never scored by the lattice map to (sentinel, sentinel). */
        let pairs = self
            .attributes
            .iter()
            .map(|(key, _)| (key.pair.prev.slot(num_tags), key.pair.curr.slot(num_tags)))
            .map(|slots| match slots {
                (Some(i), Some(j)) => (i, j),
                _ => (num_tags, num_tags),
            })
            .collect();
        let mut instances = Instances::new(num_tags, pairs);

        let mut sent = Sentence::default();
        let mut resolved = Resolved::default();
        let mut gold = Vec::new();
        while reader.next(&mut sent)? {
            if !self.gold(&sent, 3, &mut gold) {
                continue;
            }
            resolved.resolve(&self.lexicon, &self.pos, &sent);
            let mut contexts = Contexts::default();
            self.registry.generate(&mut self.attributes, &resolved, &gold, &mut contexts, false);
            instances.sentences.push(contexts);
        }
        log::info!("pass 3: {} instances", instances.len());
        Ok(instances)
    }

    /// Runs the three offline passes.
    pub fn extract(&mut self, reader: &mut dyn Corpus) -> Result<Instances> {
        self.pass1(reader)?;
        self.pass2(reader)?;
        self.pass3(reader)
    }

    /// Extracts instances, fits the weights and saves the model.
    pub fn train(&mut self, reader: &mut dyn Corpus, optimizer: &mut dyn Optimizer) -> Result<()> {
        let instances = self.extract(reader)?;
        self.weights = optimizer.optimize(&instances, self.attributes.len())?;
        self.save_info()
    }

    fn save_info(&self) -> Result<()> {
        let info = ModelInfo {
            max_size: self.max_size,
            num_tags: self.tags.len(),
            num_attributes: self.attributes.len(),
            types: self.registry.types().into_iter().map(String::from).collect(),
            weights: self.weights.clone(),
        };
        info.save(&self.paths.info())?;
        log::info!("saved model to {}", self.paths.dir.display());
        Ok(())
    }

    pub fn state(&self) -> State {
        State::new(self.tags.len(), self.max_size)
    }

    /// Labels `sent` with its best tag sequence and returns the path score.
    pub fn tag(&self, state: &mut State, sent: &mut Sentence) -> Result<f64> {
        if self.weights.len() != self.attributes.len() {
            return Err(Error::Model(format!(
                "{} weights for {} attributes; train or load the model before tagging",
                self.weights.len(),
                self.attributes.len()
            )));
        }
        sent.labels.clear();
        state.reset();
        let len = sent.len();
        if len == 0 {
            return Ok(0.0);
        }
        state.resolved.resolve(&self.lexicon, &self.pos, sent);

        for i in 0..len {
            state.scores.reset();
            self.registry
                .add_features(&self.attributes, &self.weights, &state.resolved, &mut state.scores, i);
            state.lattice.viterbi(&self.tags, &state.scores)?;
        }
        state.scores.reset();
        self.registry
            .add_features(&self.attributes, &self.weights, &state.resolved, &mut state.scores, len);
        state.lattice.terminate(&self.tags, &state.scores)?;

        if log::log_enabled!(log::Level::Trace) {
            let mut table = Vec::new();
            if state.lattice.print(&mut table, &self.tags, len).is_ok() {
                log::trace!("lattice:\n{}", String::from_utf8_lossy(&table));
            }
        }
        state.lattice.best(&self.tags, &mut sent.labels, len)
    }

    /// Tags every sentence of `reader` into `writer`, returning the number of
    /// sentences.
    pub fn run_tag(&self, reader: &mut dyn Reader, writer: &mut dyn Writer) -> Result<usize> {
        let mut state = self.state();
        let mut sent = Sentence::default();
        let mut nsents = 0;
        while reader.next(&mut sent)? {
            self.tag(&mut state, &mut sent)?;
            writer.next(&sent)?;
            nsents += 1;
        }
        writer.finish()?;
        log::info!("tagged {nsents} sentences");
        Ok(nsents)
    }

    /// Tags a gold-labelled corpus and scores the predictions.
    pub fn evaluate(&self, reader: &mut dyn Reader) -> Result<Evaluation> {
        let mut state = self.state();
        let mut sent = Sentence::default();
        let mut eval = Evaluation::new();
        while reader.next(&mut sent)? {
            if !sent.has_gold() {
                log::warn!("skipping sentence without gold labels: {}", sent.words.join(" "));
                continue;
            }
            self.tag(&mut state, &mut sent)?;
            eval.accumulate(&sent.gold, &sent.labels);
        }
        eval.evaluate();
        Ok(eval)
    }
}
