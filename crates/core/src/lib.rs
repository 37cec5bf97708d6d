pub mod category;
pub mod config;
pub mod error;
pub mod event;

pub use category::CategoryKind;
pub use config::Config;
pub use error::*;
pub use event::*;
