// Domain layer: the placeholder records and the ports the telemetry side plugs into.

pub mod model;
pub mod ports;
