//! The authenticated principal acting on a request.

use serde::{Deserialize, Serialize};

use crate::types::id::UserId;

/// The authenticated user on whose behalf a core operation runs.
///
/// Supplied by an upstream auth layer; the core trusts `id` and never
/// re-authenticates. Threaded through every service call as an explicit
/// parameter so no operation depends on ambient "current user" state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// The authenticated user's ID.
    pub id: UserId,
    /// Role strings from the upstream RBAC layer. The core does not
    /// interpret these; endpoint gating happens before a call reaches us.
    pub roles: Vec<String>,
}

impl Principal {
    /// Create a principal with no roles.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            roles: Vec::new(),
        }
    }

    /// Create a principal with roles.
    pub fn with_roles(id: UserId, roles: Vec<String>) -> Self {
        Self { id, roles }
    }
}
