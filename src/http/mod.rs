//! HTTP protocol layer module
//!
//! Protocol-level helpers shared by the request handler: content-type
//! detection, ETag validation, and response builders. Decoupled from the
//! asset cache itself.

pub mod etag;
pub mod mime;
pub mod response;

pub use response::{
    build_304_response, build_400_response, build_404_response, build_405_response,
    build_asset_response, build_options_response,
};
