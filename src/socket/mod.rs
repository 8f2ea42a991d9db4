//! Target socket bridging blocking and non-blocking transport.
//!
//! A module registers the handlers it implements; the socket serves the
//! other transport style by adaptation.
//!
//! # Module Structure
//!
//! - `interface` - transport traits seen by peers and implemented by targets
//! - `handlers` - registration table and `ForwardMode`
//! - `registry` - blocking calls waiting for completion
//! - `ownership` - temporary memory manager for blocking calls
//! - `forward` - forward adapter and the spawned blocking exchange
//! - `dispatch` - dispatch task serving blocking calls on a non-blocking target
//! - `backward` - backward adapter and `BackwardPath`
//! - `state` - `SocketCore`, the state shared by the adapters
//! - `target_socket` - `TargetSocket` and its aliases
//!
//! # Adaptation
//!
//! | Registered   | `nb_transport_fw`          | `b_transport`                |
//! |--------------|----------------------------|------------------------------|
//! | non-blocking | passed through             | queued for the dispatch task |
//! | blocking     | spawned blocking exchange  | passed through               |
//! | both         | passed through             | passed through               |
//! | none         | fatal `UnhandledRequest`   | fatal `UnhandledRequest`     |

mod backward;
mod dispatch;
mod forward;
mod handlers;
mod interface;
mod ownership;
mod registry;
mod state;
mod target_socket;

pub use crate::error::HandlerKind;
pub use backward::BackwardPath;
pub use handlers::ForwardMode;
pub use interface::{
    BackwardTransport, BlockingTarget, DebugTarget, DirectMemoryTarget, ForwardTransport,
    NonBlockingTarget, SocketTag,
};
pub use target_socket::{SimpleTargetSocket, TaggedTargetSocket, TargetSocket};
