pub mod memory;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use futures::TryStreamExt as _;
use greenlight_types::{validator::unique, Validator};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, Row as _};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    Batch, ChosenRow, Filters, Pool, Runtime, DEFAULT_QUERY_TIMEOUT,
};

pub use memory::MemoryMovieRepository;

/// Sort values accepted by movie listings
pub const MOVIE_SORT_SAFE_LIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];
const VALID_ORDER_FIELDS: &[&str] = &["id", "title", "year", "runtime"];

pub const MAX_TITLE_LENGTH: usize = 500;
pub const MAX_GENRES: usize = 4;
const FIRST_FILM_YEAR: i32 = 1888;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    #[serde(skip)]
    pub created_at: time::PrimitiveDateTime,
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
    pub version: i64,
}

impl sqlx::FromRow<'_, ChosenRow> for Movie {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let genres: Json<Vec<String>> = row.try_get("genres")?;
        Ok(Movie {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            runtime: row.try_get("runtime")?,
            genres: genres.0,
            version: row.try_get("version")?,
        })
    }
}

impl Movie {
    /// Overwrites fields present in `update`, id and version stay untouched
    pub fn apply(&mut self, update: UpdateMovie) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(year) = update.year {
            self.year = year;
        }
        if let Some(runtime) = update.runtime {
            self.runtime = runtime;
        }
        if let Some(genres) = update.genres {
            self.genres = genres;
        }
    }
}

/// Missing fields take zero values, so they are reported by [`validate_movie`]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct CreateMovie {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
}

impl From<&Movie> for CreateMovie {
    fn from(movie: &Movie) -> Self {
        CreateMovie {
            title: movie.title.clone(),
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateMovie {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
    /// Version the client has seen, if omitted the currently stored one is used
    pub version: Option<i64>,
}

pub fn validate_movie(v: &mut Validator, movie: &CreateMovie) {
    let current_year = time::OffsetDateTime::now_utc().year();

    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.chars().count() < MAX_TITLE_LENGTH,
        "title",
        "must not be more than 500 characters long",
    );

    v.check(movie.year > FIRST_FILM_YEAR, "year", "must be greater than 1888");
    v.check(movie.year <= current_year, "year", "must not be in the future");
    v.check(movie.year != 0, "year", "must be provided");

    v.check(movie.runtime.minutes() != 0, "runtime", "must be provided");
    v.check(
        movie.runtime.minutes() > 0,
        "runtime",
        "must be a positive integer",
    );

    v.check(
        !movie.genres.is_empty(),
        "genres",
        "must contain at least 1 genre",
    );
    v.check(
        movie.genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 4 genres",
    );
    v.check(
        unique(&movie.genres),
        "genres",
        "must not contain duplicate values",
    );
}

#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn get(&self, id: i64) -> Result<Movie>;

    /// Stores new movie, id, creation time and version are assigned by the store
    async fn insert(&self, movie: CreateMovie) -> Result<Movie>;

    /// Writes all mutable fields of `movie` if its version is still current.
    ///
    /// Fails with [`Error::EditConflict`] if the record was changed since
    /// `movie.version` was read and with [`Error::RecordNotFound`] if it no
    /// longer exists.
    async fn update(&self, movie: &Movie) -> Result<Movie>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Movies with `title` as case insensitive substring and having all `genres`,
    /// empty values do not filter
    async fn list(&self, title: &str, genres: &[String], filters: &Filters)
    -> Result<Batch<Movie>>;
}

fn not_found(id: i64) -> Error {
    Error::RecordNotFound(format!("Movie {id}"))
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

const MOVIE_COLUMNS: &str = "id, created_at, title, year, runtime, genres, version";

// SQLite LOWER only folds ASCII, so titles are matched on `title_lower`
const LIST_CONDITION: &str = r#"(? = '' OR title_lower LIKE '%' || ? || '%' ESCAPE '\')
    AND NOT EXISTS (
        SELECT 1 FROM json_each(?) AS wanted
        WHERE wanted.value NOT IN (SELECT value FROM json_each(movies.genres))
    )"#;

#[derive(Clone)]
pub struct SqlMovieRepository {
    pool: Pool,
    timeout: Duration,
}

impl SqlMovieRepository {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }
}

#[async_trait]
impl MovieRepository for SqlMovieRepository {
    async fn get(&self, id: i64) -> Result<Movie> {
        if id < 1 {
            return Err(not_found(id));
        }
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?");
        self.bounded(async {
            sqlx::query_as::<_, Movie>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| not_found(id))
        })
        .await
    }

    async fn insert(&self, movie: CreateMovie) -> Result<Movie> {
        let (id, created_at, version) = self
            .bounded(async {
                sqlx::query_as::<_, (i64, time::PrimitiveDateTime, i64)>(
                    "INSERT INTO movies (title, title_lower, year, runtime, genres) \
                     VALUES (?, ?, ?, ?, ?) RETURNING id, created_at, version",
                )
                .bind(&movie.title)
                .bind(movie.title.to_lowercase())
                .bind(movie.year)
                .bind(movie.runtime)
                .bind(Json(&movie.genres))
                .fetch_all(&self.pool)
                .await?
                .pop()
                .ok_or(Error::DatabaseError(sqlx::Error::RowNotFound))
            })
            .await?;
        debug!(id, "Created movie");

        Ok(Movie {
            id,
            created_at,
            title: movie.title,
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres,
            version,
        })
    }

    async fn update(&self, movie: &Movie) -> Result<Movie> {
        let new_version: Option<i64> = self
            .bounded(async {
                // RETURNING rows are read to the end so the statement completes
                let new_version: Option<i64> = sqlx::query_scalar(
                    "UPDATE movies SET title = ?, title_lower = ?, year = ?, runtime = ?, \
                     genres = ?, version = version + 1 \
                     WHERE id = ? AND version = ? RETURNING version",
                )
                .bind(&movie.title)
                .bind(movie.title.to_lowercase())
                .bind(movie.year)
                .bind(movie.runtime)
                .bind(Json(&movie.genres))
                .bind(movie.id)
                .bind(movie.version)
                .fetch_all(&self.pool)
                .await?
                .pop();

                if new_version.is_none() {
                    let exists: bool =
                        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM movies WHERE id = ?)")
                            .bind(movie.id)
                            .fetch_one(&self.pool)
                            .await?;
                    if !exists {
                        return Err(not_found(movie.id));
                    }
                }
                Ok::<_, Error>(new_version)
            })
            .await?;

        match new_version {
            Some(version) => {
                debug!(id = movie.id, version, "Updated movie");
                Ok(Movie {
                    version,
                    ..movie.clone()
                })
            }
            None => {
                warn!(id = movie.id, version = movie.version, "Edit conflict");
                Err(Error::EditConflict {
                    id: movie.id,
                    version: movie.version,
                })
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Ok(());
        }
        let res = self
            .bounded(async {
                sqlx::query("DELETE FROM movies WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(Error::from)
            })
            .await?;

        if res.rows_affected() == 0 {
            Err(not_found(id))
        } else {
            debug!(id, "Deleted movie");
            Ok(())
        }
    }

    async fn list(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<Batch<Movie>> {
        let order = filters.order();
        if !VALID_ORDER_FIELDS.contains(&order.as_ref()) {
            return Err(Error::InvalidOrderByField(order.as_ref().to_string()));
        }
        let title_pattern = escape_like(&title.to_lowercase());
        let select_sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE {LIST_CONDITION} \
             ORDER BY {order}, id ASC LIMIT ? OFFSET ?"
        );
        let count_sql = format!("SELECT count(*) FROM movies WHERE {LIST_CONDITION}");

        self.bounded(async {
            let rows = sqlx::query_as::<_, Movie>(&select_sql)
                .bind(title)
                .bind(&title_pattern)
                .bind(Json(genres))
                .bind(filters.limit())
                .bind(filters.offset())
                .fetch(&self.pool)
                .try_collect::<Vec<_>>()
                .await?;

            let total: i64 = sqlx::query_scalar(&count_sql)
                .bind(title)
                .bind(&title_pattern)
                .bind(Json(genres))
                .fetch_one(&self.pool)
                .await?;

            Ok::<_, Error>(Batch {
                offset: filters.offset(),
                limit: filters.limit(),
                total: total as u64,
                rows,
            })
        })
        .await
    }
}
