//! Status merging across a cascade.

use http::StatusCode;

/// Merge `next` into an accumulated status.
///
/// The numerically larger code wins; on a tie the status already held is
/// kept. Merging never lowers the accumulator, so the result of folding a
/// sequence is its maximum whatever the order.
pub fn merge_status(current: Option<StatusCode>, next: StatusCode) -> StatusCode {
    match current {
        Some(held) if held.as_u16() >= next.as_u16() => held,
        _ => next,
    }
}
