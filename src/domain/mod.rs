// Domain layer: record models and the ports the pipeline and formatter depend on.

pub mod model;
pub mod ports;
