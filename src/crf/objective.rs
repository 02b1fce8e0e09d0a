use crate::{
    crf::{
        features::{Context, Contexts, Instances},
        lattice::PairScores,
    },
    tagset::TagPair,
};

/**
 * Interface for a graphical model.
 */
pub trait Encoder {
    /// initializes the encoder with a training data set
    fn set_data(&mut self, instances: &Instances);
    fn num_features(&self) -> usize;
    /// compute the objective value and gradients for the whole data set.
    fn objective_and_gradients_batch(&mut self, instances: &Instances, w: &[f64], g: &mut [f64]) -> f64;
}

#[inline]
fn logsumexp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// Negative log-likelihood of the gold tag-pair paths under a linear-chain
/// CRF whose factors are the per-position tag-pair scores.
#[derive(Debug, Default)]
pub struct Crf1dEncoder {
    /// The total number of distinct tags (L).
    num_tags: usize,
    /// Lattice slots of every feature.
    pairs: Vec<(usize, usize)>,
    /// Tag-pair scores of positions 0..=T.
    psi: Vec<PairScores>,
    /**
     * Forward scores in log domain.
     *  This is a [T][L] matrix whose element [t][j] is the log-sum of all
     *  paths from the start sentinel arriving at (t, j).
     */
    alpha: Vec<f64>,
    /**
     * Backward scores in log domain.
     *  This is a [T][L] matrix whose element [t][i] is the log-sum of all
     *  paths leaving (t, i) into the end sentinel.
     */
    beta: Vec<f64>,
}

impl Crf1dEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn reserve(&mut self, num_items: usize) {
        let l = self.num_tags;
        if self.psi.len() < num_items + 1 {
            self.psi.resize_with(num_items + 1, || PairScores::new(l));
        }
        if self.alpha.len() < num_items * l {
            self.alpha.resize(num_items * l, 0.0);
            self.beta.resize(num_items * l, 0.0);
        }
    }

    fn state_score(&mut self, seq: &Contexts, w: &[f64]) {
        /* Loop over the positions, the exit included. */
        for (t, ctx) in seq.positions().enumerate() {
            let psi = &mut self.psi[t];
            psi.reset();
            for &a in &ctx.features {
                let (i, j) = self.pairs[a as usize];
                psi.add(i, j, w[a as usize]);
            }
        }
    }

    fn alpha_score(&mut self, len: usize) -> f64 {
        let l = self.num_tags;

        /* Compute the alpha scores on nodes (0, *), entered from the start sentinel. */
        for j in 0..l {
            self.alpha[j] = self.psi[0].get(l, j);
        }

        /* Compute the alpha scores on nodes (t, *). */
        for t in 1..len {
            for j in 0..l {
                let mut sum = f64::NEG_INFINITY;
                for i in 0..l {
                    sum = logsumexp(sum, self.alpha[l * (t - 1) + i] + self.psi[t].get(i, j));
                }
                self.alpha[l * t + j] = sum;
            }
        }

        /* The normalization factor sums the transitions into the end sentinel. */
        let mut lognorm = f64::NEG_INFINITY;
        for i in 0..l {
            lognorm = logsumexp(lognorm, self.alpha[l * (len - 1) + i] + self.psi[len].get(i, l));
        }
        lognorm
    }

    fn beta_score(&mut self, len: usize) {
        let l = self.num_tags;

        /* Compute the beta scores at (T-1, *). */
        for i in 0..l {
            self.beta[l * (len - 1) + i] = self.psi[len].get(i, l);
        }

        /* Compute the beta scores at (t, *). */
        for t in (0..len - 1).rev() {
            for i in 0..l {
                let mut sum = f64::NEG_INFINITY;
                for j in 0..l {
                    sum = logsumexp(sum, self.psi[t + 1].get(i, j) + self.beta[l * (t + 1) + j]);
                }
                self.beta[l * t + i] = sum;
            }
        }
    }

    /// Probability of passing through slots `(i, j)` at position `t`.
    fn marginal(&self, t: usize, len: usize, (i, j): (usize, usize), lognorm: f64) -> f64 {
        let l = self.num_tags;
        let logp = if t == 0 {
            if i != l || j == l {
                return 0.0;
            }
            self.psi[0].get(l, j) + self.beta[j]
        } else if t == len {
            if i == l || j != l {
                return 0.0;
            }
            self.alpha[l * (len - 1) + i] + self.psi[len].get(i, l)
        } else {
            if i == l || j == l {
                return 0.0;
            }
            self.alpha[l * (t - 1) + i] + self.psi[t].get(i, j) + self.beta[l * t + j]
        };
        (logp - lognorm).exp()
    }

    fn gold_slots(&self, label: TagPair) -> Option<(usize, usize)> {
        Some((label.prev.slot(self.num_tags)?, label.curr.slot(self.num_tags)?))
    }

    /// Score of the gold path.
    fn score(&self, seq: &Contexts) -> f64 {
        seq.positions()
            .enumerate()
            .filter_map(|(t, ctx)| self.gold_slots(ctx.label).map(|(i, j)| self.psi[t].get(i, j)))
            .sum()
    }

    fn model_expectation(&self, seq: &Contexts, g: &mut [f64], lognorm: f64) {
        let len = seq.len();
        for (t, ctx) in seq.positions().enumerate() {
            let gold = self.gold_slots(ctx.label);
            add_expectation(ctx, &self.pairs, g, |pair| {
                let observed = if Some(pair) == gold { 1.0 } else { 0.0 };
                self.marginal(t, len, pair, lognorm) - observed
            });
        }
    }
}

fn add_expectation(ctx: &Context, pairs: &[(usize, usize)], g: &mut [f64], expectation: impl Fn((usize, usize)) -> f64) {
    for &a in &ctx.features {
        g[a as usize] += expectation(pairs[a as usize]);
    }
}

impl Encoder for Crf1dEncoder {
    fn set_data(&mut self, instances: &Instances) {
        let l = instances.num_tags;
        let a = instances.num_attributes();
        let n = instances.len();
        let t = instances.max_len();
        log::info!("set data (L: {l}, A: {a}, N: {n}, T: {t})");
        self.num_tags = l;
        self.pairs = instances.pairs.clone();
        self.psi.clear();
        self.alpha.clear();
        self.beta.clear();
        self.reserve(t);
    }

    fn num_features(&self) -> usize {
        self.pairs.len()
    }

    fn objective_and_gradients_batch(&mut self, instances: &Instances, w: &[f64], g: &mut [f64]) -> f64 {
        g.iter_mut().for_each(|x| *x = 0.0);

        let mut logl = 0.0;
        for seq in instances.sentences.iter().filter(|s| !s.is_empty()) {
            let len = seq.len();
            self.reserve(len);

            /* Compute forward/backward scores. */
            self.state_score(seq, w);
            let lognorm = self.alpha_score(len);
            self.beta_score(len);

            /* Compute the probability of the input sequence on the model. */
            logl += self.score(seq) - lognorm;

            /* Update the model expectations of features. */
            self.model_expectation(seq, g, lognorm);
        }
        -logl
    }
}
