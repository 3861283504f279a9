// SPDX-License-Identifier: MPL-2.0

//! Time-related definitions.

/// A point on the platform's monotonic clock, in nanoseconds.
///
/// The value `0` is reserved to mean "not observed": a binding whose
/// timestamp is zero has not seen an arrival since the timestamp was last
/// cleared. The platform passes the arrival time into each interrupt handler
/// it invokes, so this crate never reads a clock itself.
pub type Timestamp = u64;
