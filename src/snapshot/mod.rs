// Bit-exact reader for the `.snap` container: header validation, the
// per-record zero-copy view, and the forward-only replay kernel built on
// top of them.

pub mod codec;
pub mod header;
pub mod kernel;

pub use codec::RecordView;
pub use header::{CodecError, Header, ASK_NULL_PRICE_Q, BID_NULL_PRICE_Q, HEADER_SIZE};
pub use kernel::ReplayKernel;
