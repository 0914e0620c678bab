//! Business logic services.

pub mod authorization;
pub mod fanout;
pub mod linking;
pub mod notification;
pub mod store;

pub use authorization::{Actor, AuthAction, AuthError, AuthorizationGate};
pub use fanout::{EventBus, FamilySubscription, FanoutChannel, FanoutMessage};
pub use linking::{LinkError, LinkService};
pub use notification::{MockPushNotifier, PushKind, PushMessage, PushNotifier, PushResult};
pub use store::{LinkStore, MemoryLinkStore, StoreError};
