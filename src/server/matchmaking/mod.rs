/// Matchmaking module: forming matches, commit, and the hub's command dispatch.

pub mod dispatch;
pub mod matches;
pub mod messages;
pub mod server;

pub use dispatch::HubHandler;
pub use server::Hub;
