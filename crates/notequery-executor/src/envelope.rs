//! Response envelope unwrapping.
//!
//! Depending on version and entry point the backend answers with a bare
//! array, a `[status, data]` pair, an `[aliasMatches, contentMatches]`
//! pair, or a single object. All of them flatten to a list here. Anything
//! else is treated as an empty result.

use serde_json::Value;
use tracing::warn;

use notequery_types::Block;

/// Flatten a response envelope into a list of raw items.
pub fn unwrap_envelope(response: Value) -> Vec<Value> {
    match response {
        Value::Array(items) => unwrap_array(items),
        Value::Object(_) => vec![response],
        Value::Null => Vec::new(),
        other => {
            warn!(response = %other, "Unrecognized response envelope, treating as empty");
            Vec::new()
        }
    }
}

fn unwrap_array(mut items: Vec<Value>) -> Vec<Value> {
    if items.len() != 2 {
        return items;
    }

    let status_pair = items[0].is_number() && !items[1].is_number();
    let match_pair = items[0].is_array() && items[1].is_array();

    if status_pair {
        // [status, data]
        let data = items.pop().unwrap_or(Value::Null);
        unwrap_envelope(data)
    } else if match_pair {
        // [aliasMatches, contentMatches]
        items
            .into_iter()
            .flat_map(|part| match part {
                Value::Array(inner) => inner,
                _ => Vec::new(),
            })
            .collect()
    } else {
        items
    }
}

/// Unwrap a response and decode its blocks, dropping items that are not
/// blocks.
pub fn parse_blocks(response: Value) -> Vec<Block> {
    unwrap_envelope(response)
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Block>(item) {
            Ok(block) => Some(block),
            Err(e) => {
                warn!(error = %e, "Dropping malformed block from response");
                None
            }
        })
        .collect()
}
