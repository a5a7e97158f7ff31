pub mod discovery;
pub mod feed;
pub mod interaction;
pub mod stream;
pub mod view;

pub use discovery::DiscoveryService;
pub use feed::SocialFeedPaginator;
pub use interaction::{InteractionController, PostInteraction, ToggleOutcome};
pub use stream::{CommitOutcome, FetchTicket, ResultStream, StreamIdentity, StreamMode};
pub use view::PostView;
