//! Wire protocol: chunk reassembly, `CMD:`/`RSP:`/`ACK:`/`ERR:` framing, and
//! the command dispatcher sitting on top of the knowledge store.

mod chunk;
mod dispatcher;
mod handlers;
mod wire;

pub use chunk::{ChunkAssembler, chunk_response};
pub use dispatcher::{Dispatcher, RuntimeContext};
pub(crate) use wire::parse_command;
