pub use crate::features::probe::engine::{ProbeClient, ProbeTransport};
pub use crate::features::probe::executor::execute_probe;
