pub mod engine;
pub mod extract;
pub mod matcher;
pub mod percentile;
pub mod pipeline;
pub mod rankings;
pub mod report;
pub mod search;
pub mod session;
pub mod strategy;
pub mod table;

pub use crate::domain::ports::{BrowserSession, CandidateSelector, Pipeline, Storage};
pub use crate::utils::error::Result;
