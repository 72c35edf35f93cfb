//! Soft delete with cascade on the in-memory engine
//!
//! Run with: cargo run --example cascade_demo

use softhaus::prelude::*;

#[model]
#[table(name = "authors")]
pub struct Author {
    #[primary_key]
    pub id: Uuid,

    #[field(create, update)]
    #[unique]
    pub name: String,

    #[lifecycle]
    pub lifecycle: Lifecycle,
}

#[model]
#[table(name = "posts")]
pub struct Post {
    #[primary_key]
    pub id: Uuid,

    #[field(create, update)]
    pub title: String,

    #[field(create)]
    #[foreign_key(references = "authors", on_delete = "cascade")]
    pub author_id: Uuid,

    #[lifecycle]
    pub lifecycle: Lifecycle,
}

#[model]
#[table(name = "comments")]
pub struct Comment {
    #[primary_key]
    pub id: Uuid,

    #[field(create, update)]
    pub body: String,

    #[field(create)]
    #[foreign_key(references = "posts", on_delete = "cascade")]
    pub post_id: Uuid,

    #[lifecycle]
    pub lifecycle: Lifecycle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let softhaus = SoftHaus::builder(MemoryStorage::new())
        .model::<Author>()
        .model::<Post>()
        .model::<Comment>()
        .build()
        .await?;

    let authors = softhaus.store::<Author>()?;
    let posts = softhaus.store::<Post>()?;
    let comments = softhaus.store::<Comment>()?;

    let mut ada = authors.create(Author::new(Uuid::new_v4(), "Ada".into())).await?;
    let grace = authors.create(Author::new(Uuid::new_v4(), "Grace".into())).await?;

    let post = posts
        .create(Post::new(Uuid::new_v4(), "Notes on the engine".into(), ada.id))
        .await?;
    posts
        .create(Post::new(Uuid::new_v4(), "Compilers".into(), grace.id))
        .await?;
    comments
        .create(Comment::new(Uuid::new_v4(), "Great read".into(), post.id))
        .await?;

    println!("Soft deleting author {}", ada.name);
    authors.soft_delete(&mut ada).await?;

    println!(
        "Authors alive/all: {}/{}",
        authors.alive().count().await?,
        authors.all().count().await?
    );
    println!(
        "Posts alive/all:   {}/{}",
        posts.alive().count().await?,
        posts.all().count().await?
    );
    // Cascade stops one level down
    println!(
        "Comments alive:    {}",
        comments.alive().count().await?
    );

    let restored = posts
        .dead()
        .filter(QueryFilter::eq("author_id", serde_json::json!(ada.id)))
        .mark_undeleted()
        .await?;
    println!("Restored {} posts", restored);

    let removed = authors.hard_delete(&ada).await?;
    println!(
        "Hard deleted Ada: {}, posts remaining: {}",
        removed,
        posts.all().count().await?
    );

    Ok(())
}
