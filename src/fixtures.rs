//! Sample aggregates for unit tests.

use chrono::{Duration, NaiveDateTime, Utc};

use crate::domain::activity::{Activity, ActivityType, Priority};
use crate::domain::contact::Contact;
use crate::domain::deal::{Currency, Deal, DealStage};
use crate::domain::types::{
    ActivityId, ContactId, DealId, EmailAddress, Money, PersonName, PublicId, Title, UserId,
};
use crate::domain::user::{User, UserRole};

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn user(id: i32, role: UserRole) -> User {
    User {
        id: UserId::new(id).unwrap(),
        public_id: PublicId::new(),
        email: EmailAddress::new(format!("user{id}@example.com")).unwrap(),
        first_name: PersonName::new("Test").unwrap(),
        last_name: PersonName::new(format!("User{id}")).unwrap(),
        role,
        phone: None,
        department: None,
        is_active: true,
        email_verified: false,
        date_joined: now() - Duration::days(30),
        last_login: None,
    }
}

pub fn contact(id: i32, owner: i32) -> Contact {
    let now = now();
    Contact {
        id: ContactId::new(id).unwrap(),
        public_id: PublicId::new(),
        owner_id: UserId::new(owner).unwrap(),
        first_name: PersonName::new("Ada").unwrap(),
        last_name: PersonName::new("Lovelace").unwrap(),
        email: EmailAddress::new(format!("contact{id}@example.com")).unwrap(),
        phone: None,
        company: Some("Analytical Engines".into()),
        title: None,
        website: None,
        address: None,
        city: Some("London".into()),
        state: None,
        country: None,
        postal_code: None,
        linkedin_url: None,
        twitter_url: None,
        tags: vec![],
        lead_source: None,
        is_active: true,
        is_deleted: false,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

pub fn deal(id: i32, owner: i32, stage: DealStage) -> Deal {
    let now = now();
    Deal {
        id: DealId::new(id).unwrap(),
        public_id: PublicId::new(),
        owner_id: UserId::new(owner).unwrap(),
        contact_id: ContactId::new(1).unwrap(),
        title: Title::new("Annual licence").unwrap(),
        description: None,
        value: Money::parse("5000").unwrap(),
        currency: Currency::Usd,
        probability: stage.default_probability(),
        stage,
        expected_close_date: None,
        loss_reason: None,
        closed_value: None,
        is_archived: false,
        created_at: now - Duration::days(10),
        updated_at: now,
        closed_date: None,
    }
}

pub fn activity(id: i32, owner: i32, scheduled_at: NaiveDateTime) -> Activity {
    let now = now();
    Activity {
        id: ActivityId::new(id).unwrap(),
        public_id: PublicId::new(),
        owner_id: UserId::new(owner).unwrap(),
        contact_id: Some(ContactId::new(1).unwrap()),
        deal_id: None,
        activity_type: ActivityType::Call,
        title: Title::new("Follow-up call").unwrap(),
        description: None,
        scheduled_at,
        duration_minutes: Some(30),
        priority: Priority::Medium,
        is_completed: false,
        is_cancelled: false,
        completed_at: None,
        completion_notes: None,
        reminder_minutes: Some(15),
        reminder_sent: false,
        reminder_at: Some(scheduled_at - Duration::minutes(15)),
        location: None,
        video_conference_url: None,
        created_at: now,
        updated_at: now,
    }
}
