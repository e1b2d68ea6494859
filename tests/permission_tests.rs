use uuid::Uuid;
use yamdb_api::{
    AppError,
    auth::AuthUser,
    models::Role,
    permissions::{Action, Capability, Decision, Resource, authorize, evaluate},
};

fn actor(role: Role) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        username: format!("{role}-user"),
        role,
        is_staff: false,
    }
}

#[test]
fn test_reads_are_open() {
    for resource in [
        Resource::Category,
        Resource::Genre,
        Resource::Title,
        Resource::Review { author_id: None },
        Resource::Comment { author_id: None },
    ] {
        assert_eq!(evaluate(None, Action::Read, resource), Decision::Allow);
    }
}

#[test]
fn test_catalog_writes_need_admin() {
    let user = actor(Role::User);
    let moderator = actor(Role::Moderator);
    let admin = actor(Role::Admin);

    for action in [Action::Create, Action::Update, Action::Delete] {
        assert_eq!(
            evaluate(None, action, Resource::Category),
            Decision::Unauthenticated
        );
        assert_eq!(evaluate(Some(&user), action, Resource::Title), Decision::Deny);
        assert_eq!(
            evaluate(Some(&moderator), action, Resource::Genre),
            Decision::Deny
        );
        assert_eq!(evaluate(Some(&admin), action, Resource::Title), Decision::Allow);
    }
}

#[test]
fn test_content_ownership() {
    let author = actor(Role::User);
    let stranger = actor(Role::User);
    let moderator = actor(Role::Moderator);
    let own = Resource::Review {
        author_id: Some(author.id),
    };

    assert_eq!(
        evaluate(Some(&stranger), Action::Create, Resource::Comment { author_id: None }),
        Decision::Allow
    );
    assert_eq!(evaluate(Some(&author), Action::Update, own), Decision::Allow);
    assert_eq!(evaluate(Some(&stranger), Action::Update, own), Decision::Deny);
    assert_eq!(evaluate(Some(&stranger), Action::Delete, own), Decision::Deny);
    assert_eq!(evaluate(Some(&moderator), Action::Delete, own), Decision::Allow);
    assert_eq!(evaluate(None, Action::Update, own), Decision::Unauthenticated);
}

#[test]
fn test_user_administration_and_profile() {
    let user = actor(Role::User);
    let admin = actor(Role::Admin);

    assert_eq!(evaluate(Some(&user), Action::Read, Resource::Users), Decision::Deny);
    assert_eq!(evaluate(Some(&admin), Action::Delete, Resource::Users), Decision::Allow);
    assert_eq!(
        evaluate(Some(&user), Action::Update, Resource::OwnProfile),
        Decision::Allow
    );
    assert_eq!(
        evaluate(Some(&admin), Action::Delete, Resource::OwnProfile),
        Decision::Deny
    );
    assert_eq!(
        evaluate(None, Action::Read, Resource::OwnProfile),
        Decision::Unauthenticated
    );
}

#[test]
fn test_staff_flag_implies_admin() {
    let staff = AuthUser {
        is_staff: true,
        ..actor(Role::User)
    };
    assert_eq!(staff.effective_role(), Role::Admin);
    assert!(staff.can(Capability::ManageCatalog));
    assert_eq!(
        evaluate(Some(&staff), Action::Delete, Resource::Category),
        Decision::Allow
    );
}

#[test]
fn test_capability_sets_are_nested() {
    for capability in Role::User.capabilities() {
        assert!(Role::Moderator.capabilities().contains(capability));
    }
    for capability in Role::Moderator.capabilities() {
        assert!(Role::Admin.capabilities().contains(capability));
    }
    assert!(!Role::Moderator.capabilities().contains(&Capability::ManageUsers));
}

#[test]
fn test_authorize_maps_decisions_to_errors() {
    let user = actor(Role::User);
    assert!(authorize(Some(&user), Action::Read, Resource::Title).is_ok());
    assert!(matches!(
        authorize(None, Action::Create, Resource::Title),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        authorize(Some(&user), Action::Create, Resource::Title),
        Err(AppError::Forbidden)
    ));
}
