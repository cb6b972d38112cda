pub mod detokenize;
pub mod display;
pub mod error;
pub mod export;
pub mod export_session;
pub mod overrides;
pub mod range;
pub mod state;
pub mod table;
pub mod token;
pub mod value;
