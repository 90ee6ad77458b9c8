//! Sales analytics over ERP exports.
//!
//! A [`data::loader::DataSource`] (flat file, in-memory table or SQL query)
//! is loaded once per request, narrowed with [`data::filter::filter`],
//! summarised with [`data::aggregate::aggregate`], turned into a
//! [`chart::ChartSpec`] and optionally exported through [`export`].

pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod query;
pub mod render;

pub use error::{DashboardError, Result};
