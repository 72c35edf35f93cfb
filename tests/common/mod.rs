//! Models shared by the integration tests

#![allow(dead_code)]

use chrono::TimeZone;
use softhaus::prelude::*;

#[model]
#[table(name = "parents")]
pub struct Parent {
    #[primary_key]
    pub id: Uuid,

    #[field(create, update)]
    #[unique]
    pub name: String,

    #[lifecycle]
    pub lifecycle: Lifecycle,
}

#[model]
#[table(name = "children")]
pub struct Child {
    #[primary_key]
    pub id: Uuid,

    #[field(create, update)]
    pub name: String,

    #[field(create)]
    #[foreign_key(references = "parents", on_delete = "cascade")]
    pub parent_id: Uuid,

    #[lifecycle]
    pub lifecycle: Lifecycle,
}

#[model]
#[table(name = "grand_children")]
pub struct GrandChild {
    #[primary_key]
    pub id: Uuid,

    #[field(create)]
    #[foreign_key(references = "children", on_delete = "cascade")]
    pub child_id: Uuid,

    #[lifecycle]
    pub lifecycle: Lifecycle,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .expect("valid start time")
}

pub fn parent(name: &str) -> Parent {
    Parent::new(Uuid::new_v4(), name.to_string())
}

pub fn child(name: &str, parent: &Parent) -> Child {
    Child::new(Uuid::new_v4(), name.to_string(), parent.id)
}

pub fn grand_child(child: &Child) -> GrandChild {
    GrandChild::new(Uuid::new_v4(), child.id)
}
