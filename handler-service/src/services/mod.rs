pub mod render;
pub mod source;
pub mod subscriber;

pub use render::{render_event, RenderedEvent};
pub use source::{RedisStreamSource, StreamEntry, StreamSource};
pub use subscriber::{decode_entry, StreamSubscriber};
