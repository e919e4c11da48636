use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, Executor};
use time::Date;
use tracing::debug;

use crate::{
    ChosenDB, contains_pattern,
    error::{Error, Result},
    price::{Price, price_in_range},
};

const MOVIE_COLUMNS: &str = "id, title, release_date, genre, price, rating";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub release_date: Date,
    pub genre: String,
    pub price: Price,
    pub rating: Option<String>,
}

/// Writable fields of a movie, used both for insert and update.
///
/// All fields are optional, so a partially filled form can be validated as a whole
/// and every violation reported at once.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct CreateMovie {
    #[garde(required, length(chars, min = 3, max = 60))]
    pub title: Option<String>,
    #[garde(required)]
    pub release_date: Option<Date>,
    #[garde(required, length(chars, max = 30), pattern(r"^[A-Z]+[a-zA-Z\s]*$"))]
    pub genre: Option<String>,
    #[garde(required, inner(custom(price_in_range)))]
    pub price: Option<Price>,
    #[garde(length(chars, max = 5), pattern(r#"^[A-Z]+[a-zA-Z0-9"'\s-]*$"#))]
    pub rating: Option<String>,
}

pub type UpdateMovie = CreateMovie;

impl From<Movie> for CreateMovie {
    fn from(movie: Movie) -> Self {
        CreateMovie {
            title: Some(movie.title),
            release_date: Some(movie.release_date),
            genre: Some(movie.genre),
            price: Some(movie.price),
            rating: movie.rating,
        }
    }
}

/// Listing filter, empty values are ignored.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub genre: Option<String>,
    pub search: Option<String>,
}

impl MovieFilter {
    pub fn new(genre: Option<String>, search: Option<String>) -> Self {
        MovieFilter { genre, search }
    }

    fn genre(&self) -> Option<&str> {
        self.genre.as_deref().filter(|g| !g.is_empty())
    }

    fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

async fn get<'c, E>(id: i64, executor: E) -> Result<Movie>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let sql = format!("SELECT {MOVIE_COLUMNS} FROM movie WHERE id = ?");
    sqlx::query_as::<_, Movie>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Movie {id}")))
}

pub type MovieRepository = MovieRepositoryImpl<crate::Pool>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = ChosenDB> + sqlx::Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn list(&self, filter: &MovieFilter) -> Result<Vec<Movie>> {
        let mut query =
            sqlx::QueryBuilder::<ChosenDB>::new(format!("SELECT {MOVIE_COLUMNS} FROM movie WHERE 1 = 1"));
        if let Some(search) = filter.search() {
            query
                .push(" AND title LIKE ")
                .push_bind(contains_pattern(search))
                .push(" ESCAPE '\\'");
        }
        if let Some(genre) = filter.genre() {
            query.push(" AND genre = ").push_bind(genre.to_string());
        }
        query.push(" ORDER BY id");

        let movies = query
            .build_query_as::<Movie>()
            .fetch_all(&self.executor)
            .await?;
        debug!("Listed {} movies for {:?}", movies.len(), filter);
        Ok(movies)
    }

    /// Distinct genres of all movies, ascending.
    pub async fn genres(&self) -> Result<Vec<String>> {
        let genres = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT genre FROM movie ORDER BY genre",
        )
        .fetch_all(&self.executor)
        .await?;
        Ok(genres)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM movie")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        get(id, &self.executor).await
    }

    pub async fn find(&self, id: i64) -> Result<Option<Movie>> {
        match self.get(id).await {
            Ok(movie) => Ok(Some(movie)),
            Err(Error::RecordNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, payload: CreateMovie) -> Result<Movie> {
        let result = sqlx::query(
            "INSERT INTO movie (title, release_date, genre, price, rating) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&payload.title)
        .bind(payload.release_date)
        .bind(&payload.genre)
        .bind(payload.price)
        .bind(&payload.rating)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Created movie {id}");
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: UpdateMovie) -> Result<Movie> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result = sqlx::query(
            "UPDATE movie SET title = ?, release_date = ?, genre = ?, price = ?, rating = ? WHERE id = ?",
        )
        .bind(&payload.title)
        .bind(payload.release_date)
        .bind(&payload.genre)
        .bind(payload.price)
        .bind(&payload.rating)
        .bind(id)
        .execute(&mut *transaction)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Movie {id} disappeared before update");
            Err(Error::ConcurrencyConflict { id })
        } else {
            let record = get(id, &mut *transaction).await?;
            transaction.commit().await?;
            Ok(record)
        }
    }

    /// Removes movie if it exists, returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM movie WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_movie() -> CreateMovie {
        CreateMovie {
            title: Some("Ghostbusters".to_string()),
            release_date: Some(time::macros::date!(1984 - 03 - 13)),
            genre: Some("Comedy".to_string()),
            price: Some(Price::from_cents(899)),
            rating: Some("PG".to_string()),
        }
    }

    #[test]
    fn test_valid_movie() {
        assert!(valid_movie().validate().is_ok());
        let no_rating = CreateMovie {
            rating: None,
            ..valid_movie()
        };
        assert!(no_rating.validate().is_ok());
    }

    #[test]
    fn test_invalid_genre() {
        for genre in ["lowercase", "Crime, Drama", "Sci-Fi", "A1", ""] {
            let movie = CreateMovie {
                genre: Some(genre.to_string()),
                ..valid_movie()
            };
            assert!(movie.validate().is_err(), "genre {genre:?} should fail");
        }
        let too_long = CreateMovie {
            genre: Some(format!("D{}", "a".repeat(30))),
            ..valid_movie()
        };
        assert!(too_long.validate().is_err());
        let missing = CreateMovie {
            genre: None,
            ..valid_movie()
        };
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_rating_rules() {
        for rating in ["R", "PG-13", "NC 17", "G'"] {
            let movie = CreateMovie {
                rating: Some(rating.to_string()),
                ..valid_movie()
            };
            assert!(movie.validate().is_ok(), "rating {rating:?} should pass");
        }
        for rating in ["pg", "PG-13A", "R!"] {
            let movie = CreateMovie {
                rating: Some(rating.to_string()),
                ..valid_movie()
            };
            assert!(movie.validate().is_err(), "rating {rating:?} should fail");
        }
    }

    #[test]
    fn test_title_and_price_rules() {
        let short = CreateMovie {
            title: Some("It".to_string()),
            ..valid_movie()
        };
        assert!(short.validate().is_err());
        let cheap = CreateMovie {
            price: Some(Price::from_cents(50)),
            ..valid_movie()
        };
        assert!(cheap.validate().is_err());
        let missing_date = CreateMovie {
            release_date: None,
            ..valid_movie()
        };
        assert!(missing_date.validate().is_err());
    }

    #[test]
    fn test_report_lists_all_fields() {
        let report = CreateMovie::default().validate().unwrap_err();
        let fields: Vec<String> = report.iter().map(|(path, _)| path.to_string()).collect();
        for field in ["title", "release_date", "genre", "price"] {
            assert!(fields.iter().any(|f| f == field), "missing {field}");
        }
        assert!(!fields.iter().any(|f| f == "rating"));
    }
}
