//! ordmix fits finite mixtures of latent multivariate normal distributions to
//! ordinal data by maximising a pairwise composite likelihood with EM.
//!
//! The observed data enter only through bivariate contingency tables, one per
//! pair of variables, flattened into an [IndexTable](structs::index::IndexTable).
//! Each cell of a table is the probability mass of a bivariate normal rectangle
//! bounded by the thresholds of the two variables, so the cost of a likelihood
//! evaluation grows with the number of pairs and categories, not with the
//! number of variables jointly.
//!
//! The main entrypoint is [entrypoints::run_em].

pub mod algorithms;
pub mod entrypoints;
pub mod errors;
pub mod routines;
pub mod structs;

pub mod prelude {
    pub use crate::algorithms::{em::EM, Status};
    pub use crate::entrypoints::{fit, run_em, run_em_default};
    pub use crate::errors::{ParameterError, ShapeError};
    pub use crate::routines::codec::{decode, encode};
    pub use crate::routines::evaluation::estep::expectation;
    pub use crate::routines::evaluation::likelihood::{
        composite_likelihood, observed_likelihood,
    };
    pub use crate::routines::evaluation::rectangle::rectangle_probability;
    pub use crate::routines::logger;
    pub use crate::routines::optimization::mstep::{maximization, MStep};
    pub use crate::routines::output::{CycleLog, EmCycle, EmResult};
    pub use crate::routines::settings::{
        read_settings, EmConfig, LogConfig, OptimizerConfig, Settings,
    };
    pub use crate::routines::simulation::{simulate, SimulatedData};
    pub use crate::structs::{
        index::{IndexRecord, IndexTable},
        layout::Layout,
        responsibilities::Responsibilities,
        theta::Theta,
        weights::Weights,
    };
}
