//! Soft delete against PostgreSQL, configured from `softhaus.toml`
//!
//! Run with: SOFTHAUS_CONFIG=softhaus.toml cargo run --example postgres_demo
//!
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! database = "softhaus"
//! username = "postgres"
//! password = "password"
//! min_connections = 1
//! max_connections = 5
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [soft_delete]
//! cascade_scope = "alive"
//! recreate_tables = true
//! ```

use softhaus::prelude::*;

#[model]
#[table(name = "projects")]
pub struct Project {
    #[primary_key]
    pub id: Uuid,

    #[field(create, update)]
    pub name: String,

    #[lifecycle]
    pub lifecycle: Lifecycle,
}

#[model]
#[table(name = "tasks")]
pub struct Task {
    #[primary_key]
    pub id: Uuid,

    #[field(create, update)]
    pub title: String,

    #[field(create, update)]
    pub done: bool,

    #[field(create)]
    #[index]
    #[foreign_key(references = "projects", on_delete = "cascade")]
    pub project_id: Uuid,

    #[lifecycle]
    pub lifecycle: Lifecycle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    let softhaus = SoftHaus::connect(&config)
        .await?
        .model::<Project>()
        .model::<Task>()
        .build()
        .await?;
    softhaus.health_check().await?;

    let projects = softhaus.store::<Project>()?;
    let tasks = softhaus.store::<Task>()?;

    let mut project = projects
        .create(Project::new(Uuid::new_v4(), "Launch".into()))
        .await?;
    let mut first = tasks
        .create(Task::new(Uuid::new_v4(), "Write docs".into(), false, project.id))
        .await?;
    tasks
        .create(Task::new(Uuid::new_v4(), "Ship".into(), false, project.id))
        .await?;

    // Under cascade_scope = "alive" this stamp survives the project delete below
    tasks.soft_delete(&mut first).await?;
    projects.soft_delete(&mut project).await?;

    for task in tasks.dead().order_by("title", SortOrder::Asc).fetch().await? {
        println!("{} deleted at {:?}", task.title, task.deleted_at());
    }

    let mut tx = softhaus.begin_transaction().await?;
    projects.dead().mark_undeleted_in(tx.as_mut()).await?;
    tasks.dead().mark_undeleted_in(tx.as_mut()).await?;
    tx.commit().await?;

    println!("Alive tasks after restore: {}", tasks.alive().count().await?);
    Ok(())
}
