use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::{not_found, CreateMovie, Movie, MovieRepository};
use crate::{
    error::{Error, Result},
    Batch, Filters,
};

#[derive(Debug, Default)]
struct Store {
    last_id: i64,
    movies: BTreeMap<i64, Movie>,
}

/// Movie repository kept in process memory, used as a test double.
///
/// Follows the same rules as the database backed repository, including
/// version checks on update.
#[derive(Debug, Default)]
pub struct MemoryMovieRepository {
    store: Mutex<Store>,
    unavailable: AtomicBool,
}

impl MemoryMovieRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation fails as if the store timed out
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn store(&self) -> Result<std::sync::MutexGuard<'_, Store>> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(Error::Timeout(Duration::ZERO));
        }
        // a poisoned lock only means another test thread panicked
        Ok(self.store.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

fn compare_by(column: &str, a: &Movie, b: &Movie) -> Ordering {
    match column {
        "title" => a.title.cmp(&b.title),
        "year" => a.year.cmp(&b.year),
        "runtime" => a.runtime.cmp(&b.runtime),
        _ => a.id.cmp(&b.id),
    }
}

fn matches(movie: &Movie, title: &str, genres: &[String]) -> bool {
    let title_ok = title.is_empty()
        || movie
            .title
            .to_lowercase()
            .contains(&title.to_lowercase());
    title_ok && genres.iter().all(|g| movie.genres.contains(g))
}

#[async_trait]
impl MovieRepository for MemoryMovieRepository {
    async fn get(&self, id: i64) -> Result<Movie> {
        if id < 1 {
            return Err(not_found(id));
        }
        self.store()?
            .movies
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn insert(&self, movie: CreateMovie) -> Result<Movie> {
        let mut store = self.store()?;
        store.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let record = Movie {
            id: store.last_id,
            created_at: PrimitiveDateTime::new(now.date(), now.time()),
            title: movie.title,
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres,
            version: 1,
        };
        store.movies.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, movie: &Movie) -> Result<Movie> {
        let mut store = self.store()?;
        let stored = store
            .movies
            .get_mut(&movie.id)
            .ok_or_else(|| not_found(movie.id))?;
        if stored.version != movie.version {
            return Err(Error::EditConflict {
                id: movie.id,
                version: movie.version,
            });
        }
        *stored = Movie {
            created_at: stored.created_at,
            version: stored.version + 1,
            ..movie.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Ok(());
        }
        self.store()?
            .movies
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    async fn list(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<Batch<Movie>> {
        let store = self.store()?;
        let column = filters.sort_column();
        let descending = filters.sort_direction() == "DESC";
        let mut found: Vec<Movie> = store
            .movies
            .values()
            .filter(|m| matches(m, title, genres))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            let primary = compare_by(column, a, b);
            let primary = if descending { primary.reverse() } else { primary };
            primary.then(a.id.cmp(&b.id))
        });
        let total = found.len() as u64;
        let rows = found
            .into_iter()
            .skip(filters.offset().max(0) as usize)
            .take(filters.limit().max(0) as usize)
            .collect();
        Ok(Batch {
            offset: filters.offset(),
            limit: filters.limit(),
            total,
            rows,
        })
    }
}
