use chrono::{Duration, Utc};
use crm_backend::domain::activity::{ActivityType, NewActivity};
use crm_backend::domain::contact::NewContact;
use crm_backend::domain::deal::{DealStage, NewDeal};
use crm_backend::domain::types::{EmailAddress, Money, PersonName, Tag, Title, UserId};
use crm_backend::domain::user::{NewUser, User, UserRole};
use crm_backend::repository::{
    ActivityListQuery, ActivityReader, ActivityWriter, ContactListQuery, ContactReader,
    ContactWriter, DealListQuery, DealReader, DealWriter, DieselRepository, StatsReader,
    TokenStore, UserListQuery, UserReader, UserWriter,
};

mod common;

fn create_user(repo: &DieselRepository, email: &str, role: UserRole) -> User {
    repo.create_user(&NewUser::new(
        EmailAddress::new(email).unwrap(),
        "$argon2id$placeholder".into(),
        PersonName::new("Test").unwrap(),
        PersonName::new("User").unwrap(),
        role,
    ))
    .unwrap()
}

fn new_contact(owner: UserId, first: &str, email: &str) -> NewContact {
    NewContact::new(
        owner,
        PersonName::new(first).unwrap(),
        PersonName::new("Smith").unwrap(),
        EmailAddress::new(email).unwrap(),
    )
}

#[test]
fn test_user_repository_crud() {
    let test_db = common::TestDb::new("test_user_repository_crud.db");
    let repo = DieselRepository::new(test_db.pool());

    let admin = create_user(&repo, "admin@example.com", UserRole::Admin);
    let sales = create_user(&repo, "sales@example.com", UserRole::Sales);

    let credentials = repo
        .get_credentials_by_email(&EmailAddress::new("SALES@example.com").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(credentials.user.id, sales.id);
    assert_eq!(credentials.password_hash, "$argon2id$placeholder");

    let (total, users) = repo
        .list_users(UserListQuery::new().role(UserRole::Admin))
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(users[0].id, admin.id);

    let deactivated = repo.set_user_active(sales.id, false).unwrap();
    assert!(!deactivated.is_active);
    let (active_total, _) = repo
        .list_users(UserListQuery::new().is_active(true))
        .unwrap();
    assert_eq!(active_total, 1);

    repo.set_user_password(sales.id, "new-hash").unwrap();
    let credentials = repo.get_credentials_by_id(sales.id).unwrap().unwrap();
    assert_eq!(credentials.password_hash, "new-hash");

    let now = Utc::now().naive_utc();
    repo.touch_last_login(admin.id, now).unwrap();
    let admin = repo.get_user_by_id(admin.id).unwrap().unwrap();
    assert!(admin.last_login.is_some());
}

#[test]
fn test_duplicate_user_email_is_rejected() {
    let test_db = common::TestDb::new("test_duplicate_user_email.db");
    let repo = DieselRepository::new(test_db.pool());
    create_user(&repo, "dup@example.com", UserRole::Sales);
    let result = repo.create_user(&NewUser::new(
        EmailAddress::new("dup@example.com").unwrap(),
        "hash".into(),
        PersonName::new("Other").unwrap(),
        PersonName::new("User").unwrap(),
        UserRole::Sales,
    ));
    assert!(result.is_err());
}

#[test]
fn test_token_store_revocation() {
    let test_db = common::TestDb::new("test_token_store.db");
    let repo = DieselRepository::new(test_db.pool());
    let user = create_user(&repo, "tokens@example.com", UserRole::Sales);

    assert!(!repo.is_token_revoked("abc").unwrap());
    repo.revoke_token("abc", user.id).unwrap();
    repo.revoke_token("abc", user.id).unwrap();
    assert!(repo.is_token_revoked("abc").unwrap());
}

#[test]
fn test_contact_repository_crud() {
    let test_db = common::TestDb::new("test_contact_repository_crud.db");
    let repo = DieselRepository::new(test_db.pool());
    let owner = create_user(&repo, "owner@example.com", UserRole::Sales);
    let other = create_user(&repo, "other@example.com", UserRole::Sales);

    let alice = repo
        .create_contact(&new_contact(owner.id, "Alice", "alice@example.com"))
        .unwrap();
    repo.create_contact(&new_contact(other.id, "Bob", "bob@example.com"))
        .unwrap();

    let (total, items) = repo
        .list_contacts(ContactListQuery::new().owner(owner.id))
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].id, alice.id);

    let (search_total, search_items) = repo
        .list_contacts(ContactListQuery::new().search("bob"))
        .unwrap();
    assert_eq!(search_total, 1);
    assert_eq!(search_items[0].first_name.as_str(), "Bob");

    let vip = Tag::new("vip").unwrap();
    let tagged = repo.set_contact_tags(alice.id, &[vip.clone()]).unwrap();
    assert_eq!(tagged.tags, vec![vip.clone()]);
    let (tag_total, _) = repo.list_contacts(ContactListQuery::new().tag(vip)).unwrap();
    assert_eq!(tag_total, 1);

    let found = repo
        .get_contact_by_email(&EmailAddress::new("alice@example.com").unwrap())
        .unwrap();
    assert_eq!(found.map(|c| c.id), Some(alice.id));

    let now = Utc::now().naive_utc();
    repo.soft_delete_contact(alice.id, now).unwrap();
    assert!(repo.get_contact_by_id(alice.id, false).unwrap().is_none());
    assert!(repo.get_contact_by_id(alice.id, true).unwrap().unwrap().is_deleted);
    let (visible, _) = repo.list_contacts(ContactListQuery::new()).unwrap();
    assert_eq!(visible, 1);
    let (all, _) = repo
        .list_contacts(ContactListQuery::new().include_deleted())
        .unwrap();
    assert_eq!(all, 2);

    let restored = repo.restore_contact(alice.id, now).unwrap();
    assert!(!restored.is_deleted);
}

#[test]
fn test_deal_repository_stage_history_and_pipeline() {
    let test_db = common::TestDb::new("test_deal_repository.db");
    let repo = DieselRepository::new(test_db.pool());
    let owner = create_user(&repo, "deals@example.com", UserRole::Sales);
    let contact = repo
        .create_contact(&new_contact(owner.id, "Carol", "carol@example.com"))
        .unwrap();

    let new_deal = NewDeal::new(
        owner.id,
        contact.id,
        Title::new("Licenses").unwrap(),
        Money::from_cents(150_000).unwrap(),
        DealStage::Prospect,
    );
    let mut deal = repo.create_deal(&new_deal).unwrap();
    repo.create_deal(&NewDeal::new(
        owner.id,
        contact.id,
        Title::new("Support").unwrap(),
        Money::from_cents(50_000).unwrap(),
        DealStage::Prospect,
    ))
    .unwrap();

    let now = Utc::now().naive_utc();
    let change = deal
        .change_stage(DealStage::Qualified, Some(owner.id), now)
        .unwrap();
    let updated = repo.record_stage_change(&deal, &change).unwrap();
    assert_eq!(updated.stage, DealStage::Qualified);

    let history = repo.list_stage_history(deal.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_stage, DealStage::Prospect);
    assert_eq!(history[0].new_stage, DealStage::Qualified);

    let pipeline = repo.pipeline_summary(Some(owner.id)).unwrap();
    let prospect = pipeline
        .iter()
        .find(|s| s.stage == DealStage::Prospect)
        .unwrap();
    assert_eq!(prospect.count, 1);
    assert_eq!(prospect.total_value, Money::from_cents(50_000).unwrap());

    let summary = repo.contact_deal_summary(contact.id).unwrap();
    assert_eq!(summary.deals_count, 2);
    assert_eq!(summary.total_value, Money::from_cents(200_000).unwrap());

    let (open_total, _) = repo
        .list_deals(DealListQuery::new().stage(DealStage::Qualified))
        .unwrap();
    assert_eq!(open_total, 1);

    let mut archived = updated;
    archived.archive(now);
    repo.update_deal(&archived).unwrap();
    let (remaining, _) = repo.list_deals(DealListQuery::new()).unwrap();
    assert_eq!(remaining, 1);
    let (with_archived, _) = repo
        .list_deals(DealListQuery::new().include_archived())
        .unwrap();
    assert_eq!(with_archived, 2);
}

#[test]
fn test_activity_repository_reminders_and_counts() {
    let test_db = common::TestDb::new("test_activity_repository.db");
    let repo = DieselRepository::new(test_db.pool());
    let owner = create_user(&repo, "acts@example.com", UserRole::Support);
    let contact = repo
        .create_contact(&new_contact(owner.id, "Dan", "dan@example.com"))
        .unwrap();
    let now = Utc::now().naive_utc();

    let overdue = repo
        .create_activity(
            &NewActivity::new(
                owner.id,
                ActivityType::Call,
                Title::new("Missed call").unwrap(),
                now - Duration::hours(2),
            )
            .for_contact(contact.id),
        )
        .unwrap();
    let soon = repo
        .create_activity(
            &NewActivity::new(
                owner.id,
                ActivityType::Meeting,
                Title::new("Kickoff").unwrap(),
                now + Duration::minutes(10),
            )
            .for_contact(contact.id)
            .with_reminder(Some(15)),
        )
        .unwrap();

    let (overdue_total, overdue_items) = repo
        .list_activities(ActivityListQuery::new().overdue(now))
        .unwrap();
    assert_eq!(overdue_total, 1);
    assert_eq!(overdue_items[0].id, overdue.id);

    let (upcoming_total, _) = repo
        .list_activities(ActivityListQuery::new().upcoming(now))
        .unwrap();
    assert_eq!(upcoming_total, 1);

    let pending = repo.list_pending_reminders(now).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, soon.id);
    repo.mark_reminder_sent(soon.id, now).unwrap();
    assert!(repo.list_pending_reminders(now).unwrap().is_empty());

    let counts = repo.crm_counts(now).unwrap();
    assert_eq!(counts.users, 1);
    assert_eq!(counts.contacts, 1);
    assert_eq!(counts.open_deals, 0);
    assert_eq!(counts.overdue_activities, 1);

    repo.delete_activity(overdue.id).unwrap();
    assert!(repo.get_activity_by_id(overdue.id).unwrap().is_none());
}
