//! Parallel batch conversion
//!
//! Every conversion in this crate is pure with respect to its inputs
//! and owns only locally allocated structures, so independent documents
//! can be converted on worker threads. Uses Rayon; results preserve
//! input order.

use crate::builder::{xml_to_json, BuildOptions};
use crate::error::Error;
use rayon::prelude::*;
use serde_json::Value;

/// Convert many documents to object models in parallel.
///
/// Each document succeeds or fails independently; the result vector is
/// in input order.
pub fn xml_to_json_parallel(
    documents: &[&str],
    options: &BuildOptions,
) -> Vec<Result<Value, Error>> {
    documents
        .par_iter()
        .map(|xml| xml_to_json(xml, options))
        .collect()
}
