//! Start-up seeding of the first administrator.

use gatehouse_auth::{AdminError, EntityRef, GrantAdmin, NewAbility, NewAssignment, NewPermission, NewRole};

use crate::authz::MANAGE_GRANTS;

pub const ADMIN_ROLE: &str = "admin";

/// Seed a global `manage_grants` ability, an `admin` role granting it, and
/// assign that role to `subject`.
///
/// Expects an empty store; a second run fails with `DuplicateName` before
/// writing anything.
pub async fn seed_admin<A: GrantAdmin + ?Sized>(admin: &A, subject: &EntityRef) -> Result<(), AdminError> {
    // Role names are unique, so this is the step that rejects a re-run.
    let mut role = NewRole::named(ADMIN_ROLE);
    role.title = "Administrator".to_string();
    let role = admin.create_role(role).await?;

    let mut ability = NewAbility::named(MANAGE_GRANTS);
    ability.title = "Manage roles, abilities and grants".to_string();
    let ability = admin.create_ability(ability).await?;

    admin.grant(NewPermission::grant(ability.id, &role.as_subject())).await?;
    admin.assign(NewAssignment::new(role.id, subject)).await?;

    tracing::info!(subject = %subject, "bootstrap administrator seeded");
    Ok(())
}
