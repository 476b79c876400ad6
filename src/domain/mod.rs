// Domain layer: request/response shapes and the port to the external scripts.

pub mod model;
pub mod ports;
