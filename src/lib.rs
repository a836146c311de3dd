mod ai;
mod common;
mod config;
pub mod domain;
pub mod events;
mod game;
mod grid;
mod ledger;
#[cfg(feature = "std")]
mod logging;
mod placement;
mod player;
pub mod prelude;
mod ship;
mod stats;
pub mod store;

pub use ai::*;
pub use common::*;
pub use config::*;
pub use domain::*;
pub use game::*;
pub use grid::*;
pub use ledger::*;
#[cfg(feature = "std")]
pub use logging::init_logging;
pub use placement::*;
pub use player::*;
pub use ship::*;
pub use stats::*;
pub use store::Tally;
