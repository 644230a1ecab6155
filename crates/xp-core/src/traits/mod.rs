//! Ports - what the engine needs from the outside world

mod collaborators;
mod repositories;

pub use collaborators::{AuditSink, GuildDirectory, MembershipGateway, RoleOpError, RoleOpResult};
pub use repositories::{ActivityStore, RepoResult};
