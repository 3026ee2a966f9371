// Domain layer: schedule and slot models plus the ports the pipeline talks through.

pub mod model;
pub mod ports;
