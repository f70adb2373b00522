mod connector;
mod error;
mod program;
mod protocol;
mod resolver;
mod setpoints;
mod types;

pub use connector::{Connector, HttpConnector};
pub use error::{Error, Result};
pub use program::SwitchProgramStore;
pub use resolver::ScheduleResolver;
pub use types::*;
