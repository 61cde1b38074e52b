//! Output generation for pipeline results.
//!
//! # Submodules
//!
//! - [`markdown`]: renders a [`PipelineResult`](crate::models::PipelineResult)
//!   for reading in a terminal
//! - [`json`]: writes results to dated JSON files for other tools
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── technology.json
//!     └── ai-climate-change.json
//! ```

pub mod json;
pub mod markdown;
