use super::prelude::*;

#[derive(Default)]
pub struct BookMutations;

#[Object]
impl BookMutations {
    /// Add a book, creating its author when needed. Subscribers to
    /// `bookAdded` are notified once the book is stored.
    async fn add_book(
        &self,
        ctx: &Context<'_>,
        title: String,
        author: String,
        published: i32,
        genres: Vec<String>,
    ) -> Result<Book> {
        let user = ctx.current_user()?;
        let db = ctx.data::<Database>()?;
        let events = ctx.data::<LibraryEvents>()?;

        let input = NewBook {
            title,
            author,
            published,
            genres,
        };
        let record = add_book(db, events, input).await.extend()?;
        info!(book_id = %record.id, user = %user.username, "Book added");

        Ok(Book::from(record))
    }
}

/// Validate, persist, then publish. Nothing is published unless the insert
/// committed.
pub(crate) async fn add_book(
    db: &Database,
    events: &LibraryEvents,
    input: NewBook,
) -> ApiResult<BookRecord> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::bad_input("Title must not be empty", input.title));
    }
    let author = input.author.trim().to_string();
    if author.is_empty() {
        return Err(ApiError::bad_input(
            "Author name must not be empty",
            input.author,
        ));
    }

    let books = db.books();
    if books.get_by_title(&title).await?.is_some() {
        return Err(ApiError::bad_input("Title must be unique", title));
    }

    let (record, author, created) = books
        .create_with_author(NewBook {
            title: title.clone(),
            published: input.published,
            author,
            genres: input.genres,
        })
        .await
        .map_err(|e| {
            // lost a race with a concurrent insert of the same title
            if is_unique_violation(&e) {
                ApiError::bad_input("Title must be unique", &title)
            } else {
                ApiError::Internal(e)
            }
        })?;
    if created {
        info!(author_id = %author.id, name = %author.name, "Author created");
    }

    events.publish(BOOK_ADDED, record.clone());
    Ok(record)
}
