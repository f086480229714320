// Adapters layer: concrete implementations of the domain ports.

pub mod collivery;
pub mod storage;
