// SPDX-License-Identifier: MPL-2.0

/// The error type which is returned from the APIs of this crate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    /// Invalid arguments, such as an out-of-range slot or vector or a
    /// malformed option word.
    InvalidArgs,
    /// The slot or the vector already appears in the binding table.
    AlreadyBound,
    /// No binding matches the given slot.
    NotFound,
    /// The operation is invalid for the object's current state, e.g. a
    /// timestamp was queried before any arrival was observed.
    BadState,
    /// The operation is not supported by this kind of dispatcher.
    NotSupported,
    /// Memory allocation failed.
    NoMemory,
    /// The platform controller or device reported a failure.
    IoError,
    /// The wait was interrupted by cancellation or object teardown.
    Canceled,
}
