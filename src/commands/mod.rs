// Console command handlers

pub mod dm;

pub use dm::*;
