pub mod config;
pub mod error;
pub mod work_item;

pub use config::Config;
pub use error::*;
pub use work_item::WorkItem;
