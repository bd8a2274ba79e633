/// Configuration loading.
pub mod config;
/// Common error types: encoding/decoding, subscribe/publish/cancel.
pub mod error;
/// Flexible logging built on tracing.
pub mod logging;
/// Pub/Sub: manager, subscription handles, broker client capability.
pub mod pubsub;
/// Serialization layer: Serializer contract, JSON and native codecs, registry.
pub mod serialize;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::Settings;
/// Operation errors and result types.
pub use error::{
    DecodeError, EncodeError, PublishError, RecvError, SubscribeError, UnsubscribeError,
};
/// Logging entry points.
pub use logging::{init_logging, LoggingConfig};
/// Pub/Sub API.
pub use pubsub::{
    BrokerClient, BrokerSubscription, MemoryBroker, Message, MessageStream, MultiSubscription,
    PatternSubscription, PubSubManager, SubscriberControl, Subscription,
};
/// Serialization API.
pub use serialize::{BinarySerializer, JsonSerializer, Payload, Serializer, SerializerRegistry};
