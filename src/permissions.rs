//! Capability-based access policy.
//!
//! Roles map to capability sets; a decision is computed from the actor's capabilities, the
//! requested action and, for reviews and comments, who authored the target. Handlers call
//! [`authorize`] before touching the repository.

use uuid::Uuid;

use crate::{auth::AuthUser, errors::AppError, models::Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Post reviews and comments.
    CreateContent,
    /// Edit or delete one's own reviews and comments.
    EditOwnContent,
    /// Edit or delete anyone's reviews and comments.
    ModerateContent,
    /// Create, edit and delete categories, genres and titles.
    ManageCatalog,
    /// Administer user accounts.
    ManageUsers,
    /// Read and edit one's own profile through `/users/me`.
    EditOwnProfile,
}

const USER_CAPABILITIES: &[Capability] = &[
    Capability::CreateContent,
    Capability::EditOwnContent,
    Capability::EditOwnProfile,
];

const MODERATOR_CAPABILITIES: &[Capability] = &[
    Capability::CreateContent,
    Capability::EditOwnContent,
    Capability::EditOwnProfile,
    Capability::ModerateContent,
];

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::CreateContent,
    Capability::EditOwnContent,
    Capability::EditOwnProfile,
    Capability::ModerateContent,
    Capability::ManageCatalog,
    Capability::ManageUsers,
];

impl Role {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::User => USER_CAPABILITIES,
            Role::Moderator => MODERATOR_CAPABILITIES,
            Role::Admin => ADMIN_CAPABILITIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

/// Resource
///
/// The target of an action. Reviews and comments carry their author when one exists
/// (`None` for a create, where there is no target yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Category,
    Genre,
    Title,
    Review { author_id: Option<Uuid> },
    Comment { author_id: Option<Uuid> },
    Users,
    OwnProfile,
}

/// Outcome of a policy check before it is turned into an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No credentials were presented.
    Unauthenticated,
    Deny,
}

impl AuthUser {
    /// Staff accounts act as admins whatever their stored role.
    pub fn effective_role(&self) -> Role {
        if self.is_staff { Role::Admin } else { self.role }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.effective_role().capabilities().contains(&capability)
    }
}

/// evaluate
///
/// Pure policy decision for `(actor, action, resource)`.
pub fn evaluate(actor: Option<&AuthUser>, action: Action, resource: Resource) -> Decision {
    let require = |capability: Capability| match actor {
        None => Decision::Unauthenticated,
        Some(user) if user.can(capability) => Decision::Allow,
        Some(_) => Decision::Deny,
    };

    match (resource, action) {
        (Resource::Category | Resource::Genre | Resource::Title, Action::Read) => Decision::Allow,
        (Resource::Category | Resource::Genre | Resource::Title, _) => {
            require(Capability::ManageCatalog)
        }

        (Resource::Review { .. } | Resource::Comment { .. }, Action::Read) => Decision::Allow,
        (Resource::Review { .. } | Resource::Comment { .. }, Action::Create) => {
            require(Capability::CreateContent)
        }
        (
            Resource::Review { author_id } | Resource::Comment { author_id },
            Action::Update | Action::Delete,
        ) => match actor {
            None => Decision::Unauthenticated,
            Some(user)
                if author_id == Some(user.id) && user.can(Capability::EditOwnContent) =>
            {
                Decision::Allow
            }
            Some(_) => require(Capability::ModerateContent),
        },

        (Resource::Users, _) => require(Capability::ManageUsers),

        (Resource::OwnProfile, Action::Read | Action::Update) => {
            require(Capability::EditOwnProfile)
        }
        (Resource::OwnProfile, Action::Create | Action::Delete) => match actor {
            None => Decision::Unauthenticated,
            Some(_) => Decision::Deny,
        },
    }
}

/// authorize
///
/// [`evaluate`] mapped onto the error type: 401 for anonymous callers, 403 otherwise.
pub fn authorize(
    actor: Option<&AuthUser>,
    action: Action,
    resource: Resource,
) -> Result<(), AppError> {
    match evaluate(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Unauthenticated => Err(AppError::Unauthorized),
        Decision::Deny => {
            tracing::debug!(
                user = ?actor.map(|u| &u.username),
                ?action,
                ?resource,
                "Permission denied"
            );
            Err(AppError::Forbidden)
        }
    }
}
