//! Member - the slice of a platform guild member the engine looks at

use std::collections::HashSet;

use crate::value_objects::Snowflake;

/// Guild member as seen by the leveling engine
///
/// Only identity, the bot flag and current roles matter here; everything else
/// about the platform member object stays with the platform adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub bot: bool,
    pub role_ids: Vec<Snowflake>,
}

impl Member {
    /// Create a human member with no roles
    pub fn new(guild_id: Snowflake, user_id: Snowflake) -> Self {
        Self {
            guild_id,
            user_id,
            bot: false,
            role_ids: Vec::new(),
        }
    }

    /// Create a bot member
    pub fn bot(guild_id: Snowflake, user_id: Snowflake) -> Self {
        Self {
            bot: true,
            ..Self::new(guild_id, user_id)
        }
    }

    /// Replace the member's roles
    pub fn with_roles(mut self, role_ids: impl IntoIterator<Item = Snowflake>) -> Self {
        self.role_ids = role_ids.into_iter().collect();
        self
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Check if member holds any role from `roles`
    pub fn has_any_role(&self, roles: &HashSet<Snowflake>) -> bool {
        self.role_ids.iter().any(|r| roles.contains(r))
    }

    /// Add a role to the member
    pub fn add_role(&mut self, role_id: Snowflake) {
        if !self.has_role(role_id) {
            self.role_ids.push(role_id);
        }
    }

    /// Remove a role from the member
    pub fn remove_role(&mut self, role_id: Snowflake) {
        self.role_ids.retain(|&id| id != role_id);
    }
}
