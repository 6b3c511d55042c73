mod catalog;
mod config;
mod error;
pub mod placeholder;
mod plural;
pub mod ts;
mod xmlify;

pub use catalog::{Catalog, Stats, UnfinishedPolicy};
pub use config::Config;
pub use error::{NotFoundError, ParseError, WriteError};
pub use plural::PluralRule;
pub use ts::Ts;
pub use xmlify::AsElement;
