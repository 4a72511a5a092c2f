//! Configuration sources and the remote data seam.

mod config_source;
mod env;
mod file;
mod remote;

pub use config_source::ConfigSource;
pub use env::EnvSource;
pub use file::FileSource;
pub use remote::{DataConnector, DisconnectedConnector, Row, TabularDataClient};
