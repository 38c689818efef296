use std::{ops::Deref, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use axum_valid::{Garde, GardeRejection, ValidationRejection};
use greenlight_dal::movie::{
    validate_movie, CreateMovie, Movie, MovieRepository, UpdateMovie, MOVIE_SORT_SAFE_LIST,
};
use greenlight_types::Validator;
use http::{header, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::paging::{ListQuery, Metadata};
use crate::{
    error::{ApiError, ApiResult},
    repository_from_request,
    state::AppState,
};

pub struct MovieRepo(Arc<dyn MovieRepository>);

impl MovieRepo {
    pub fn new(repository: Arc<dyn MovieRepository>) -> Self {
        MovieRepo(repository)
    }
}

impl Deref for MovieRepo {
    type Target = dyn MovieRepository;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

repository_from_request!(MovieRepo);

#[derive(Debug, Serialize)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub metadata: Metadata,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{id}",
            get(show).patch(update).put(update).delete(delete),
        )
}

fn read_id(id: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("invalid id parameter".to_string()))
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

fn bad_query(rejection: GardeRejection<QueryRejection>) -> ApiError {
    match rejection {
        ValidationRejection::Valid(report) => report.into(),
        ValidationRejection::Inner(e) => ApiError::BadRequest(e.body_text()),
    }
}

pub async fn create(
    repository: MovieRepo,
    payload: Result<Json<CreateMovie>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(bad_body)?;
    let mut v = Validator::new();
    validate_movie(&mut v, &payload);
    v.finish()?;

    let movie = repository.insert(payload).await?;
    debug!(id = movie.id, "Created movie");
    let location = format!("/v1/movies/{}", movie.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "movie": movie })),
    ))
}

pub async fn show(
    id: Result<Path<i64>, PathRejection>,
    repository: MovieRepo,
) -> ApiResult<impl IntoResponse> {
    let id = read_id(id)?;
    let movie = repository.get(id).await?;
    Ok(Json(json!({ "movie": movie })))
}

pub async fn list(
    repository: MovieRepo,
    query: Result<Garde<Query<ListQuery>>, GardeRejection<QueryRejection>>,
) -> ApiResult<impl IntoResponse> {
    let Garde(Query(query)) = query.map_err(bad_query)?;
    let mut v = Validator::new();
    let listing = query.into_listing(MOVIE_SORT_SAFE_LIST, &mut v);
    listing.filters.validate(&mut v);
    v.finish()?;

    let batch = repository
        .list(&listing.title, &listing.genres, &listing.filters)
        .await?;
    let metadata = Metadata::from_batch(&batch);
    Ok(Json(MoviePage {
        movies: batch.rows,
        metadata,
    }))
}

/// Partial update, the record is read, merged and written back only if
/// nobody changed it in between
pub async fn update(
    id: Result<Path<i64>, PathRejection>,
    repository: MovieRepo,
    payload: Result<Json<UpdateMovie>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = read_id(id)?;
    let Json(changes) = payload.map_err(bad_body)?;

    let mut movie = repository
        .get(id)
        .await
        .map_err(ApiError::missing_as_bad_request)?;
    if let Some(version) = changes.version {
        movie.version = version;
    }
    movie.apply(changes);

    let mut v = Validator::new();
    validate_movie(&mut v, &CreateMovie::from(&movie));
    v.finish()?;

    let movie = repository
        .update(&movie)
        .await
        .map_err(ApiError::missing_as_bad_request)?;
    debug!(id = movie.id, version = movie.version, "Updated movie");
    Ok(Json(json!({ "movie": movie })))
}

pub async fn delete(
    id: Result<Path<i64>, PathRejection>,
    repository: MovieRepo,
) -> ApiResult<impl IntoResponse> {
    let id = read_id(id)?;
    repository.delete(id).await?;
    Ok(Json(json!({ "message": "movie successfully deleted" })))
}
