//! Application Services
//!
//! - `CacheFacade`: the read path used by every HTTP handler

mod cache;

pub use cache::CacheFacade;
