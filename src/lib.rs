//! mrf-index-filter - Streaming filter for healthcare price-transparency indexes
//!
//! This library extracts machine-readable file locations from a
//! Transparency-in-Coverage index document: a gzip-compressed JSON object
//! whose `reporting_structure` array can run to many gigabytes uncompressed.
//! It is designed to process such an index in bounded memory, decoding one
//! reporting record at a time and flushing matches incrementally.
//!
//! # Key Features
//!
//! - **True streaming**: The record array is traversed element by element;
//!   memory stays at one record regardless of document size
//! - **Plan and path filtering**: Case-insensitive plan-name rules, a
//!   case-sensitive location path marker
//! - **Run-wide dedupe**: Each location string is written at most once,
//!   keyed on the raw string
//! - **Order preservation**: Output is in first-encounter order from the
//!   traversal
//! - **Incremental flushing**: The output buffer drains early once it nears
//!   capacity, and fully at the end of the run
//!
//! # Examples
//!
//! Filter a downloaded index file:
//!
//! ```no_run
//! use flate2::read::GzDecoder;
//! use mrf_index_filter::{filter_index_streaming, LocationRule, PlanGating, PlanRule};
//! use std::fs::File;
//!
//! let input = GzDecoder::new(File::open("index.json.gz").unwrap());
//! let mut output = File::create("locations.txt").unwrap();
//! let summary = filter_index_streaming(
//!     input,
//!     &mut output,
//!     &PlanRule::default(),
//!     &LocationRule::default(),
//!     PlanGating::Advisory,
//!     None,
//! )
//! .unwrap();
//! eprintln!("{} unique locations", summary.locations_written);
//! ```
//!
//! Custom filter rules:
//!
//! ```no_run
//! # use flate2::read::GzDecoder;
//! # use mrf_index_filter::{filter_index_streaming, LocationRule, PlanGating, PlanRule};
//! # use std::fs::File;
//! let input = GzDecoder::new(File::open("index.json.gz").unwrap());
//! let mut output = File::create("locations.txt").unwrap();
//! filter_index_streaming(
//!     input,
//!     &mut output,
//!     &PlanRule::new("CA", "California", "HMO"),
//!     &LocationRule::new("anthem/CA"),
//!     PlanGating::Enforced,
//!     None,
//! )
//! .unwrap();
//! ```

pub mod decode;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod sink;

pub use decode::{stream_records, InNetworkFile, ReportingPlan, ReportingRecord};
pub use error::{IndexError, Result};
pub use fetch::{fetch_index, ByteStreamReader, DEFAULT_INDEX_URL};
pub use filter::{filter_index_streaming, FilterSummary, LocationRule, PlanGating, PlanRule};
pub use sink::{DigestAlgorithm, DigestWriter, LineSink};
