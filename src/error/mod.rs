pub mod pubsub;
pub mod serialize;

pub use pubsub::{PublishError, RecvError, SubscribeError, UnsubscribeError};
pub use serialize::{DecodeError, EncodeError};
