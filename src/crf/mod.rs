pub mod features;
pub mod lattice;
pub mod lbfgs;
pub mod model;
pub mod objective;
pub mod tagger;
