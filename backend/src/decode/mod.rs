//! Decoders for the two supported statistical wire formats.
//!
//! - `jsonstat`: PxWeb JSON-stat cubes, addressed by category index per dimension
//! - `sdmx`: SDMX-JSON observations, addressed by colon-delimited composite keys
//! - `period`: TIME_PERIOD normalization to `YYYY-MM`
//! - `schema`: output field names and aliases shared by both
//!
//! Both decoders produce a [`crate::models::Table`]: ordered field
//! descriptors plus rows keyed by descriptor position.
//!
//! ```text
//! PxWeb JSON-stat ──▶ jsonstat::decode_jsonstat ──┐
//!                                                 ├──▶ Table ──▶ join pipeline
//! SDMX-JSON ───────▶ sdmx::decode_sdmx_payload ───┘
//! ```

pub mod jsonstat;
pub mod period;
pub mod schema;
pub mod sdmx;

pub use jsonstat::{decode_cube, decode_jsonstat, parse_cube, DecodedCube};
pub use period::normalize_period;
pub use schema::{sanitize_field_name, strip_aliases, SchemaBuilder};
pub use sdmx::{decode_sdmx, decode_sdmx_payload, parse_sdmx, SdmxResponse};
