// Domain layer: quote and settings models plus the ports the core talks through.

pub mod model;
pub mod ports;
pub mod settings;
