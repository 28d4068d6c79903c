//! # statjoin - PxWeb and SDMX statistics joined to geography
//!
//! statjoin decodes two statistical wire formats, PxWeb JSON-stat cubes and
//! SDMX-JSON observations, into flat typed rows, then joins each row to a
//! geometry through a memoizing exact-match lookup and writes the result to a
//! feature sink.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌──────────┐
//! │ PxWeb/SDMX │──▶│  Decode  │──▶│ Transform │──▶│  Geometry │──▶│   Sink   │
//! │  CSV file  │   │ (Table)  │   │ join key  │   │   cache   │   │ (GeoJSON)│
//! └────────────┘   └──────────┘   └───────────┘   └───────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use statjoin::{run_pxweb, GeoJsonProvider, JobOptions, JoinContext, Output, PxWebJob, RuleSet};
//!
//! let provider = GeoJsonProvider::open("kommuner.geojson")?;
//! let ctx = JoinContext::new(&provider, "KOD", RuleSet::default(), JobOptions::from_env());
//! let job = PxWebJob { join_dimension: "region".into(), join_on_code: true };
//! let report = run_pxweb(&payload, &job, &Output::new("out"), &ctx)?;
//! println!("{} rows joined", report.summary.rows);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cube structure, field descriptors and typed rows
//! - [`decode`] - JSON-stat and SDMX-JSON decoders
//! - [`parser`] - CSV source with auto-detection
//! - [`transform`] - Join-key rules and job pipeline
//! - [`cache`] - Geometry join cache
//! - [`geography`] - Geography provider contract and GeoJSON provider
//! - [`sink`] - Row assembly and feature sinks
//! - [`source`] - HTTP client for PxWeb and SDMX
//! - [`logs`] - Job log and progress
//! - [`workspace`] - Job directory, intermediate CSV, output naming
//! - [`config`] - Job options

// Core modules
pub mod error;
pub mod models;

// Decoding
pub mod decode;
pub mod parser;

// Join
pub mod cache;
pub mod geography;
pub mod sink;
pub mod transform;

// Ambient
pub mod config;
pub mod logs;
pub mod source;
pub mod workspace;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, DecodeError, GeographyError, JobError, SinkError, SourceError, TransformRuleError,
    WorkspaceError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Category, Cube, Dimension, DimensionRole, FieldDescriptor, FieldType, FieldValue, FlatRow,
    Table, Unit,
};

// =============================================================================
// Re-exports - Decoding
// =============================================================================

pub use decode::{
    decode_cube, decode_jsonstat, decode_sdmx, decode_sdmx_payload, normalize_period, parse_cube,
    parse_sdmx, DecodedCube, SdmxResponse,
};

pub use parser::{detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv_file_auto, ParseResult};

// =============================================================================
// Re-exports - Join
// =============================================================================

pub use cache::{CacheStats, GeometryCache, Resolution};
pub use geography::{GeoJsonProvider, GeoMatch, GeographyProvider, Geometry, ShapeType, SpatialReference};
pub use sink::{assemble, FeatureSink, GeoJsonSink, MemorySink, SinkRecord};
pub use transform::{
    inspect_pxweb, inspect_sdmx, rules_description, run_batch, run_csv, run_pxweb, run_sdmx,
    BatchReport, FileOutcome, JobReport, JoinContext, JoinJob, JoinSummary, Output, PxWebJob,
    RuleSet, SdmxJob, TransformRule,
};

// =============================================================================
// Re-exports - Ambient
// =============================================================================

pub use config::JobOptions;
pub use logs::{JobLog, LogEntry, LogLevel, LogProgress, NoProgress, ProgressSink};
pub use source::{load_json_file, SourceClient};
