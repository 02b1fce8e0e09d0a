//! A linear-chain CRF sequence tagger for chunking and named entities.
//!
//! Training runs three passes over a rewindable corpus: dictionaries,
//! attributes, then per-sentence contexts handed to the L-BFGS optimizer.
//! Tagging decodes each sentence with Viterbi over tag-pair scores.

pub mod config;
pub mod crf;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod lexicon;
pub mod sentence;
pub mod tagset;

pub use crate::{
    config::{Config, Op, OpGroup},
    crf::{
        features::{Attributes, Context, Contexts, Instances, Registry},
        lattice::{Lattice, PairScores},
        lbfgs::{Lbfgs, LbfgsParams, Optimizer},
        model::{ModelInfo, ModelPaths},
        tagger::{State, Tagger},
    },
    error::{Error, Result},
    evaluation::Evaluation,
    io::{ConllReader, ConllWriter, Corpus, Fields, Reader, Writer},
    lexicon::{Lexicon, Word},
    sentence::Sentence,
    tagset::{Tag, TagPair, TagSet},
};
