//! Kernel "List Format" codec, as described in cpuset(7).
//!
//! CPU and NUMA membership lists are exposed as comma-separated singles and
//! inclusive ranges, e.g. `0-3,7`. Decoding expands the ranges; encoding
//! always writes the fully expanded, ascending form (`0,1,2,3,7`).

use std::collections::BTreeSet;

/// Errors raised while decoding a list-format value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListFormatError {
    /// A token is neither an integer nor an `start-end` range of integers.
    #[error("invalid token '{0}'")]
    InvalidToken(String),

    /// A range whose start is greater than its end, e.g. `5-2`.
    #[error("range start {start} is greater than end {end}")]
    ReversedRange { start: u32, end: u32 },
}

/// Decodes a list-format string into a set of integers.
///
/// Empty or whitespace-only input yields the empty set. Surrounding
/// whitespace (including the trailing newline sysfs adds) is ignored.
pub fn decode(value: &str) -> Result<BTreeSet<u32>, ListFormatError> {
    let mut ids = BTreeSet::new();

    let value = value.trim();
    if value.is_empty() {
        return Ok(ids);
    }

    for token in value.split(',') {
        match token.split_once('-') {
            None => {
                ids.insert(parse_bound(token)?);
            }
            Some((start, end)) => {
                let start = parse_bound(start).map_err(|_| invalid(token))?;
                let end = parse_bound(end).map_err(|_| invalid(token))?;
                if start > end {
                    return Err(ListFormatError::ReversedRange { start, end });
                }
                ids.extend(start..=end);
            }
        }
    }

    Ok(ids)
}

/// Decodes an optional list-format value; absence is the empty set.
pub fn decode_opt(value: Option<&str>) -> Result<BTreeSet<u32>, ListFormatError> {
    value.map_or_else(|| Ok(BTreeSet::new()), decode)
}

/// Encodes integers as a sorted, comma-separated list without ranges.
///
/// Duplicates are collapsed, so `decode(&encode(s)) == s` for any set.
pub fn encode<I>(ids: I) -> String
where
    I: IntoIterator<Item = u32>,
{
    let sorted: BTreeSet<u32> = ids.into_iter().collect();
    sorted
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_bound(s: &str) -> Result<u32, ListFormatError> {
    s.trim().parse::<u32>().map_err(|_| invalid(s))
}

fn invalid(token: &str) -> ListFormatError {
    ListFormatError::InvalidToken(token.trim().to_string())
}
