//! Identity integration tests: onboarding, trust progression, and access
//! decisions driven by registry snapshots and API keys.

use peerfx_identity::{
    AccessPolicy, Actor, ApiKeyRegistry, Operation, StaffPolicy, UserRegistry,
};
use peerfx_types::*;

fn register(registry: &UserRegistry, email: &str, phone: Option<&str>) -> User {
    registry
        .register(NewUser {
            email: email.into(),
            first_name: "Chidi".into(),
            last_name: "Okeke".into(),
            phone: phone.map(str::to_string),
            active: true,
            ..NewUser::default()
        })
        .unwrap()
        .0
}

#[test]
fn trust_climbs_stage_by_stage() {
    let registry = UserRegistry::default();
    let user = register(&registry, "chidi@example.com", Some("+234 801 234 5678"));
    assert_eq!(user.trust_level(), TrustLevel::Level0);
    assert_eq!(user.phone.as_deref(), Some("+2348012345678"));

    // Address before stage one does not count.
    let user = registry.confirm(user.id, Confirmation::Address).unwrap();
    assert_eq!(user.trust_level(), TrustLevel::Level0);

    registry.confirm(user.id, Confirmation::Email).unwrap();
    let user = registry.confirm(user.id, Confirmation::Phone).unwrap();
    assert_eq!(user.trust_level(), TrustLevel::Level1);
    assert_eq!(user.confirmations.stage_progress().level_one, 100);

    let user = registry.confirm(user.id, Confirmation::Id).unwrap();
    assert_eq!(user.trust_level(), TrustLevel::Level3);
    assert_eq!(registry.snapshot(&user.id).unwrap().trust_level, TrustLevel::Level3);

    // Changing the phone drops the phone confirmation and with it every level.
    let user = registry
        .update(
            user.id,
            UserUpdate {
                phone: Some(Some("+447700900123".into())),
                ..UserUpdate::default()
            },
        )
        .unwrap();
    assert!(!user.confirmations.phone);
    assert_eq!(user.trust_level(), TrustLevel::Level0);
}

#[test]
fn duplicate_contact_details_rejected() {
    let registry = UserRegistry::default();
    register(&registry, "chidi@example.com", Some("+2348012345678"));

    let email_clash = registry.register(NewUser {
        email: "chidi@EXAMPLE.com".into(),
        first_name: "Other".into(),
        last_name: "Person".into(),
        ..NewUser::default()
    });
    assert!(matches!(email_clash, Err(PeerfxError::EmailTaken(_))));

    let phone_clash = registry.register(NewUser {
        email: "other@example.com".into(),
        first_name: "Other".into(),
        last_name: "Person".into(),
        phone: Some("+234 801 234 5678".into()),
        ..NewUser::default()
    });
    assert!(matches!(phone_clash, Err(PeerfxError::PhoneTaken(_))));
    assert_eq!(registry.len(), 1);
}

#[test]
fn policy_uses_live_snapshots() {
    let registry = UserRegistry::default();
    let policy = StaffPolicy;
    let user = register(&registry, "chidi@example.com", None);

    let actor = Actor::User(registry.snapshot(&user.id).unwrap());
    assert!(policy.authorize(&actor, Operation::CreateDeal, Some(user.id)).is_ok());

    registry
        .update(
            user.id,
            UserUpdate {
                active: Some(false),
                ..UserUpdate::default()
            },
        )
        .unwrap();
    let actor = Actor::User(registry.snapshot(&user.id).unwrap());
    assert!(matches!(
        policy.authorize(&actor, Operation::CreateDeal, Some(user.id)),
        Err(PeerfxError::Unauthorized { .. })
    ));
}

#[test]
fn api_key_actor_flow() {
    let keys = ApiKeyRegistry::new();
    keys.create_project("backoffice", true, false).unwrap();
    keys.create_project("partner", false, false).unwrap();
    let staff_key = keys.issue("backoffice").unwrap();
    let partner_key = keys.issue("partner").unwrap();

    let policy = StaffPolicy;
    let staff = Actor::Project(keys.verify(&staff_key).unwrap());
    let partner = Actor::Project(keys.verify(&partner_key).unwrap());
    assert!(policy.is_authorized(&staff, Operation::DeleteTransaction, Some(UserId::new())));
    assert!(!policy.is_authorized(&partner, Operation::ReadCurrency, None));
}
