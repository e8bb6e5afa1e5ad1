pub mod message;
pub mod transport;

pub use message::{
    AddedState, ClientMessage, Envelope, PlayerSnapshot, PlayerSummary, ServerMessage,
};
pub use transport::{Subscription, Transport};
