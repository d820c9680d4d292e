//! Pure permission evaluation over a node and its grant rows.

use drivehub_core::types::id::UserId;
use drivehub_entity::node::model::Node;
use drivehub_entity::permission::action::{FileAction, GrantKind};
use drivehub_entity::permission::model::AccessGrant;

/// Decide whether a principal may perform an action on a node.
///
/// Fail-closed: a missing node or absent grant is a denial, never an
/// error. The owner fast path requires both the node's `owner_id` field
/// and an explicit `owner` grant row, so ownership can be revoked by
/// removing the grant even while the column lags.
pub fn evaluate(
    node: Option<&Node>,
    principal: UserId,
    action: FileAction,
    grants: &[AccessGrant],
) -> bool {
    let Some(node) = node else {
        return false;
    };
    let user_id = principal.into_uuid();

    let has_owner_grant = grants.iter().any(|g| {
        g.file_id == node.id && g.user_id == user_id && g.permission == GrantKind::Owner
    });
    if node.owner_id == user_id && has_owner_grant {
        return true;
    }

    // Look up the grant kind this action maps to, then accept only if its
    // value falls in the action's accepted set.
    let accepted = action.accepted_grants();
    grants.iter().any(|g| {
        g.file_id == node.id
            && g.user_id == user_id
            && g.permission == action.lookup_grant()
            && accepted.contains(&g.permission)
    })
}
