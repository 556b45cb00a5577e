//! `pricecheck-recon`: two-feed order price reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns classified results.
//! No CLI or IO dependencies.

pub mod aggregate;
pub mod classify;
pub mod columns;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod ident;
pub mod matcher;
pub mod model;
pub mod project;
pub mod table;
pub mod value;

pub use config::ReconConfig;
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use model::{ReconBucket, ReconResult, ReconRow, Side};
pub use table::{RawCell, RawTable};
