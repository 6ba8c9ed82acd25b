// Domain layer: chart models and the ports to external collaborators.

pub mod model;
pub mod ports;
