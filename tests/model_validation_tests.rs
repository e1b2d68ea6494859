use chrono::{Datelike, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;
use yamdb_api::{
    errors::FieldErrors,
    models::{
        CreateReviewRequest, Page, PageRequest, Review, Role, SignupRequest, UpdateTitleRequest,
        UpdateUserRequest, User, check_year, validate_slug, validate_username,
    },
};

// --- Field rules ---

#[test]
fn test_username_rules() {
    for ok in ["alice", "john.doe", "a+b@c-d_e", "Ünïcödé"] {
        assert!(validate_username(ok).is_ok(), "{ok} should be accepted");
    }
    for reserved in ["me", "Me", "ME"] {
        let err = validate_username(reserved).unwrap_err();
        assert_eq!(err.code, "reserved_username");
    }
    assert!(validate_username("has space").is_err());
    assert!(validate_username("semi;colon").is_err());
}

#[test]
fn test_slug_rules() {
    assert!(validate_slug("sci-fi_2").is_ok());
    assert!(validate_slug("with space").is_err());
    assert!(validate_slug("ñ").is_err());
}

#[test]
fn test_year_bound() {
    let current = Utc::now().year();

    let mut errors = FieldErrors::new();
    check_year(current, &mut errors);
    check_year(1895, &mut errors);
    assert!(errors.is_empty());

    check_year(current + 1, &mut errors);
    assert_eq!(errors.get("year").map(Vec::len), Some(1));
}

// --- Payload validation ---

#[test]
fn test_signup_request_validation() {
    let valid = SignupRequest {
        username: "newcomer".into(),
        email: "newcomer@example.com".into(),
    };
    assert!(valid.validate().is_ok());

    let too_long = SignupRequest {
        username: "u".repeat(151),
        email: "x@example.com".into(),
    };
    assert!(too_long.validate().is_err());

    let errors: FieldErrors = SignupRequest {
        username: "me".into(),
        email: "nope".into(),
    }
    .validate()
    .unwrap_err()
    .into();
    assert_eq!(
        errors.get("username").unwrap()[0],
        "The username \"me\" is reserved."
    );
    assert!(errors.get("email").is_some());
}

#[test]
fn test_review_score_range() {
    let review = |score| CreateReviewRequest {
        text: "text".into(),
        score,
    };
    assert!(review(1).validate().is_ok());
    assert!(review(10).validate().is_ok());
    assert!(review(0).validate().is_err());
    assert!(review(11).validate().is_err());
}

#[test]
fn test_partial_update_only_validates_present_fields() {
    assert!(UpdateUserRequest::default().validate().is_ok());
    let bad = UpdateUserRequest {
        email: Some("broken".into()),
        ..Default::default()
    };
    assert!(bad.validate().is_err());
}

// --- Serialization ---

#[test]
fn test_partial_update_tells_null_from_missing() {
    let absent: UpdateTitleRequest = serde_json::from_value(json!({"name": "N"})).unwrap();
    assert_eq!(absent.category, None);
    assert_eq!(absent.description, None);

    let cleared: UpdateTitleRequest =
        serde_json::from_value(json!({"category": null, "description": null})).unwrap();
    assert_eq!(cleared.category, Some(None));
    assert_eq!(cleared.description, Some(None));

    let set: UpdateUserRequest = serde_json::from_value(json!({"bio": "hi"})).unwrap();
    assert_eq!(set.bio, Some(Some("hi".to_string())));
}

#[test]
fn test_role_wire_format() {
    assert_eq!(serde_json::to_value(Role::Moderator).unwrap(), json!("moderator"));
    assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    assert!("superuser".parse::<Role>().is_err());
    assert_eq!(Role::default(), Role::User);
}

#[test]
fn test_user_hides_internal_fields() {
    let user = User {
        id: Uuid::new_v4(),
        username: "alice".into(),
        email: "alice@example.com".into(),
        is_staff: true,
        confirmation_digest: Some("secret".into()),
        ..Default::default()
    };
    let value = serde_json::to_value(&user).unwrap();
    assert_eq!(value["username"], "alice");
    assert_eq!(value["role"], "user");
    assert!(value.get("id").is_none());
    assert!(value.get("is_staff").is_none());
    assert!(value.get("confirmation_digest").is_none());
}

#[test]
fn test_review_shape() {
    let review = Review {
        id: 3,
        title_id: 1,
        author_id: Uuid::new_v4(),
        author: "critic".into(),
        text: "Good".into(),
        score: 8,
        pub_date: Utc::now(),
    };
    let value = serde_json::to_value(&review).unwrap();
    let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, ["author", "id", "pub_date", "score", "text"]);
}

// --- Pagination ---

#[test]
fn test_page_request_offsets() {
    assert_eq!(
        PageRequest::new(None, 10),
        PageRequest {
            page: 1,
            limit: 10,
            offset: 0
        }
    );
    assert_eq!(PageRequest::new(Some(3), 10).offset, 20);
    // Page 0 is treated as page 1.
    assert_eq!(PageRequest::new(Some(0), 10).page, 1);
}

#[test]
fn test_page_envelope_links() {
    let req = PageRequest::new(Some(2), 10);
    let page = Page::new(vec![0u8; 10], 35, req);
    assert_eq!(page.next, Some(3));
    assert_eq!(page.previous, Some(1));

    let last = Page::new(vec![0u8; 5], 35, PageRequest::new(Some(4), 10));
    assert_eq!(last.next, None);

    let empty: Page<u8> = Page::new(vec![], 0, PageRequest::new(None, 10));
    assert_eq!(empty.next, None);
    assert_eq!(empty.previous, None);
}
