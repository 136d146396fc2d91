pub mod engine;
pub mod health;
pub mod pipeline;

pub use crate::domain::model::{
    CommandOutput, DeployReport, HealthReport, Hook, ImageRef, ServiceState, ServiceStatus, Stage,
    StageReport, TransferStrategy,
};
pub use crate::domain::ports::{CommandRunner, DeploySettings, Pipeline};
pub use crate::utils::error::Result;
