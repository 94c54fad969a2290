//! Exports the data sets, the miner, and the contracts of the cascade.
//!
pub use crate::dataset::{
    // Sample stores
    DataSet,
    Polarity,
    ShapeMask,
    Record,


    // Loaders
    DataSetReader,
    read_list,
    read_nested_list,
};


pub use crate::mining::{
    NegGenerator,
    MiningState,
    MiningOutcome,
    MiningStats,
};


pub use crate::cascade::{
    Cart,
    Cascade,
    Verdict,
    StagedCascade,
};


pub use crate::feature::{
    Feature,
    PixelDifference,
};


pub use crate::{
    Config,
    MiningConfig,
    PerturbationConfig,
    Patch,
    Scale,
    Transform,
    Shape,
    JdaError,
};
