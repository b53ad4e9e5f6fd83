pub mod generator;
pub mod scheduler;

pub use crate::domain::model::{Batch, DataPacket};
pub use generator::{generate_and_discard, CycleReport, GeneratorStats, StatsSnapshot};
pub use scheduler::{spawn_generator, spawn_generator_with, GeneratorHandle};
