use std::{ffi::CStr, mem::MaybeUninit, slice, time::Instant};

use libc::{c_int, c_void};
use liblbfgs_sys::{lbfgs, lbfgs_free, lbfgs_malloc, lbfgs_parameter_init, lbfgs_parameter_t, lbfgs_strerror};

use super::{
    features::Instances,
    objective::{Crf1dEncoder, Encoder},
};
use crate::{
    config::{Config, Op, OpGroup},
    error::{Error, Result},
};

/// Fits attribute weights to a set of training instances.
pub trait Optimizer {
    fn optimize(&mut self, instances: &Instances, num_attributes: usize) -> Result<Vec<f64>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LbfgsParams {
    /// L1 coefficient; a positive value switches to OWL-QN.
    pub c1: f64,
    /// L2 coefficient.
    pub c2: f64,
    pub memory: i32,
    pub epsilon: f64,
    /// Distance for the delta-based stopping test.
    pub past: i32,
    pub delta: f64,
    pub max_iterations: i32,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        Self { c1: 0.0, c2: 1.0, memory: 6, epsilon: 1e-5, past: 10, delta: 1e-5, max_iterations: i32::MAX }
    }
}

impl LbfgsParams {
    /// Optimizer options of the `train` group.
    pub fn options(group: OpGroup) -> OpGroup {
        group
            .op(Op::value("c1", "L1 regularisation coefficient", "0"))
            .op(Op::value("c2", "L2 regularisation coefficient", "1"))
            .op(Op::value("memory", "number of corrections kept by L-BFGS", "6"))
            .op(Op::value("epsilon", "gradient norm convergence threshold", "1e-5"))
            .op(Op::value("past", "iterations between delta tests", "10"))
            .op(Op::value("delta", "relative improvement convergence threshold", "1e-5"))
            .op(Op::value("max-iterations", "maximum number of iterations", "2147483647"))
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            c1: cfg.parse("train-c1")?,
            c2: cfg.parse("train-c2")?,
            memory: cfg.parse("train-memory")?,
            epsilon: cfg.parse("train-epsilon")?,
            past: cfg.parse("train-past")?,
            delta: cfg.parse("train-delta")?,
            max_iterations: cfg.parse("train-max-iterations")?,
        })
    }
}

#[derive(Debug, Default)]
pub struct Lbfgs {
    params: LbfgsParams,
    encoder: Crf1dEncoder,
}

impl Lbfgs {
    pub fn new(params: LbfgsParams) -> Self {
        Self { params, encoder: Crf1dEncoder::new() }
    }

    pub fn params(&self) -> &LbfgsParams {
        &self.params
    }
}

/// State shared with the callbacks for one `lbfgs` run.
struct Instance<'a> {
    encoder: &'a mut Crf1dEncoder,
    instances: &'a Instances,
    /// Number of real attributes; the tail beyond it is padding.
    num_features: usize,
    c2: f64,
    evaluations: usize,
    begin: Instant,
}

unsafe extern "C" fn proc_evaluate(instance: *mut c_void, x: *const f64, g: *mut f64, n: c_int, _step: f64) -> f64 {
    let this = &mut *(instance as *mut Instance);
    let x = slice::from_raw_parts(x, n as usize);
    let g = slice::from_raw_parts_mut(g, n as usize);
    let k = this.num_features;

    /* Compute the objective value and gradients. */
    g[k..].iter_mut().for_each(|v| *v = 0.0);
    let mut f = this.encoder.objective_and_gradients_batch(this.instances, &x[..k], &mut g[..k]);

    /* L2 regularization. */
    if this.c2 > 0.0 {
        let c22 = this.c2 * 2.0;
        let mut norm = 0.0;
        for i in 0..k {
            g[i] += c22 * x[i];
            norm += x[i] * x[i];
        }
        f += this.c2 * norm;
    }
    this.evaluations += 1;
    f
}

unsafe extern "C" fn proc_progress(
    instance: *mut c_void,
    x: *const f64,
    _g: *const f64,
    fx: f64,
    xnorm: f64,
    gnorm: f64,
    step: f64,
    n: c_int,
    k: c_int,
    ls: c_int,
) -> c_int {
    let this = &*(instance as *const Instance);
    let x = slice::from_raw_parts(x, n as usize);
    let active = x.iter().filter(|v| **v != 0.0).count();
    log::debug!(
        "iteration {k}: loss {fx:.6}, feature norm {xnorm:.6}, error norm {gnorm:.6}, active {active}, line search {ls}, step {step}, elapsed {:?}",
        this.begin.elapsed()
    );
    0
}

/// liblbfgs built with SSE requires the dimension to be a multiple of 8.
fn padded(k: usize) -> usize {
    (k + 7) / 8 * 8
}

impl Optimizer for Lbfgs {
    fn optimize(&mut self, instances: &Instances, num_attributes: usize) -> Result<Vec<f64>> {
        if num_attributes == 0 {
            return Err(Error::Optimizer("no attributes to train".to_string()));
        }
        if instances.num_attributes() != num_attributes {
            return Err(Error::Optimizer(format!(
                "instances cover {} attributes, expected {num_attributes}",
                instances.num_attributes()
            )));
        }
        self.encoder.set_data(instances);
        let k = self.encoder.num_features();
        let n = padded(k);
        log::info!("L-BFGS (K: {k}, c1: {}, c2: {}, memory: {})", self.params.c1, self.params.c2, self.params.memory);

        let mut params = MaybeUninit::<lbfgs_parameter_t>::uninit();
        let mut params = unsafe {
            lbfgs_parameter_init(params.as_mut_ptr());
            params.assume_init()
        };
        params.m = self.params.memory;
        params.epsilon = self.params.epsilon;
        params.past = self.params.past;
        params.delta = self.params.delta;
        params.max_iterations = self.params.max_iterations;
        if self.params.c1 > 0.0 {
            /* OWL-QN only supports the backtracking line search. */
            params.orthantwise_c = self.params.c1;
            params.orthantwise_start = 0;
            params.orthantwise_end = k as c_int;
            params.linesearch = 2;
        }

        let w = unsafe { lbfgs_malloc(n as c_int) };
        if w.is_null() {
            return Err(Error::Optimizer("lbfgs_malloc failed".to_string()));
        }
        unsafe { slice::from_raw_parts_mut(w, n) }.iter_mut().for_each(|v| *v = 0.0);

        let mut instance = Instance {
            encoder: &mut self.encoder,
            instances,
            num_features: k,
            c2: self.params.c2,
            evaluations: 0,
            begin: Instant::now(),
        };
        let mut fx = 0.0;
        let r = unsafe {
            lbfgs(
                n as c_int,
                w,
                &mut fx,
                Some(proc_evaluate),
                Some(proc_progress),
                &mut instance as *mut Instance as *mut c_void,
                &mut params,
            )
        };
        let evaluations = instance.evaluations;
        let elapsed = instance.begin.elapsed();
        let weights = unsafe { slice::from_raw_parts(w, k) }.to_vec();
        unsafe { lbfgs_free(w) };

        if r < 0 {
            let msg = unsafe { CStr::from_ptr(lbfgs_strerror(r)) }.to_string_lossy().into_owned();
            if evaluations == 0 {
                return Err(Error::Optimizer(msg));
            }
            log::warn!("L-BFGS stopped early ({r}): {msg}");
        }
        log::info!("L-BFGS finished: loss {fx:.6}, {evaluations} evaluations in {elapsed:?}");
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crf::features::{Context, Contexts},
        tagset::{Tag, TagPair},
    };

    #[test]
    fn padding() {
        assert_eq!(padded(1), 8);
        assert_eq!(padded(8), 8);
        assert_eq!(padded(9), 16);
    }

    #[test]
    fn params_from_config() {
        let mut cfg = Config::new("test", "test", "0").group(LbfgsParams::options(OpGroup::new("train", "training")));
        cfg.set("train-c2", "0.5").unwrap();
        cfg.set("train.max-iterations", "25").unwrap();
        let params = LbfgsParams::from_config(&cfg).unwrap();
        assert_eq!(params, LbfgsParams { c2: 0.5, max_iterations: 25, ..Default::default() });
    }

    #[test]
    fn fits_a_separable_corpus() {
        /* Attribute 2k + t fires word k under start transition into tag t. */
        let l = 2;
        let tag = |s: usize| Tag::from_slot(s, l);
        let pairs = vec![(2, 0), (2, 1), (2, 0), (2, 1)];
        let mut instances = Instances::new(l, pairs);
        for gold in [0usize, 1, 0] {
            instances.sentences.push(Contexts {
                items: vec![Context {
                    features: vec![(2 * gold) as u32, (2 * gold + 1) as u32],
                    label: TagPair::new(Tag::SENTINEL, tag(gold)),
                }],
                exit: Context { features: vec![], label: TagPair::new(tag(gold), Tag::SENTINEL) },
            });
        }
        let mut lbfgs = Lbfgs::new(LbfgsParams { c2: 0.01, max_iterations: 50, ..Default::default() });
        let w = lbfgs.optimize(&instances, 4).unwrap();
        assert_eq!(w.len(), 4);
        assert!(w[0] > w[1]);
        assert!(w[3] > w[2]);

        assert!(matches!(lbfgs.optimize(&instances, 5), Err(Error::Optimizer(_))));
    }
}
