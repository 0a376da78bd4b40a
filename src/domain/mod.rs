// Domain layer: contact models, ports and pure services. No file system access here.

pub mod model;
pub mod ports;

pub mod services;
