//! Package transfer
//!
//! Turns the raw command packets of the transfer protocol into a file on
//! storage. The [`ChunkReassembler`] owns the only [`TransferSession`] and
//! the two chunk buffers; the [`PackageStore`] owns the open file.

pub mod buffers;
pub mod reassembler;
pub mod session;
pub mod store;

pub use buffers::ChunkBuffers;
pub use reassembler::{ChunkReassembler, ChunkSink, Progress, ProtocolError, TransferError};
pub use session::{TransferProgress, TransferSession};
pub use store::{package_file_name, CompletedPackage, PackageKind, PackageStore, StoreError, StoreSink};
