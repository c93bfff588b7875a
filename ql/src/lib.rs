pub mod format;
pub mod learn;
pub mod log;
pub mod prelude;
pub mod state;
pub mod value_store;
