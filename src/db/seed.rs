//! Sample catalogue for a fresh database.
//!
//! Only runs against an empty books table, so restarting with seeding enabled
//! never duplicates or overwrites data.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{CreateBook, Database};

/// Result of running the seed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub authors_created: usize,
    pub books_created: usize,
}

struct SampleBook {
    title: &'static str,
    published: i32,
    author: &'static str,
    genres: &'static [&'static str],
}

const SAMPLE_AUTHORS: &[(&str, Option<i32>)] = &[
    ("Robert Martin", Some(1952)),
    ("Martin Fowler", Some(1963)),
    ("Fyodor Dostoevsky", Some(1821)),
    ("Joshua Kerievsky", None),
    ("Sandi Metz", None),
];

const SAMPLE_BOOKS: &[SampleBook] = &[
    SampleBook {
        title: "Clean Code",
        published: 2008,
        author: "Robert Martin",
        genres: &["refactoring"],
    },
    SampleBook {
        title: "Agile software development",
        published: 2002,
        author: "Robert Martin",
        genres: &["agile", "patterns", "design"],
    },
    SampleBook {
        title: "Refactoring, edition 2",
        published: 2018,
        author: "Martin Fowler",
        genres: &["refactoring"],
    },
    SampleBook {
        title: "Refactoring to patterns",
        published: 2008,
        author: "Joshua Kerievsky",
        genres: &["refactoring", "patterns"],
    },
    SampleBook {
        title: "Practical Object-Oriented Design, An Agile Primer Using Ruby",
        published: 2012,
        author: "Sandi Metz",
        genres: &["refactoring", "design"],
    },
    SampleBook {
        title: "Crime and punishment",
        published: 1866,
        author: "Fyodor Dostoevsky",
        genres: &["classic", "crime"],
    },
    SampleBook {
        title: "Demons",
        published: 1872,
        author: "Fyodor Dostoevsky",
        genres: &["classic", "revolution"],
    },
];

/// Insert the sample authors and books if the catalogue is empty.
pub async fn seed_sample_data(db: &Database) -> Result<SeedResult> {
    let mut result = SeedResult::default();

    if db.books().count().await? > 0 {
        debug!("Catalogue not empty, skipping sample data");
        return Ok(result);
    }

    let authors = db.authors();
    for (name, born) in SAMPLE_AUTHORS {
        if authors.get_by_name(name).await?.is_none() {
            authors
                .create(name, *born)
                .await
                .with_context(|| format!("Failed to seed author {}", name))?;
            result.authors_created += 1;
        }
    }

    let books = db.books();
    for sample in SAMPLE_BOOKS {
        let (author, _) = authors.get_or_create(sample.author).await?;
        books
            .create(CreateBook {
                title: sample.title.to_string(),
                published: sample.published,
                author_id: author.id,
                genres: sample.genres.iter().map(|g| g.to_string()).collect(),
            })
            .await
            .with_context(|| format!("Failed to seed book {}", sample.title))?;
        result.books_created += 1;
    }

    info!(
        authors = result.authors_created,
        books = result.books_created,
        "Seeded sample catalogue"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_populates_empty_catalogue() {
        let db = Database::in_memory().await.unwrap();

        let result = seed_sample_data(&db).await.unwrap();
        assert_eq!(
            result,
            SeedResult {
                authors_created: 5,
                books_created: 7
            }
        );
        assert_eq!(db.authors().count().await.unwrap(), 5);
        assert_eq!(db.books().count().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        seed_sample_data(&db).await.unwrap();

        let second = seed_sample_data(&db).await.unwrap();
        assert_eq!(second, SeedResult::default());
        assert_eq!(db.books().count().await.unwrap(), 7);
    }
}
