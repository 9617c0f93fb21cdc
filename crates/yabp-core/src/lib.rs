pub mod agent;
pub mod assembler;
pub mod compiler;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frontmatter;
pub mod interpolate;
pub mod io;
pub mod paths;
pub mod project;
pub mod resolver;
pub mod rules;
pub mod selection;
pub mod simulate;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod testutil;

pub use error::{Result, YabpError};
