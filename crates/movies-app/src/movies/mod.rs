//! Movies controller.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form,
};
use movies_dal::movie::{Movie, MovieFilter, MovieRepository};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use tracing::{debug, info};

use crate::{
    antiforgery::AntiForgeryLayer,
    error::{ApiError, ApiResult},
    repository_from_request,
    state::AppState,
    view::View,
};

mod form;
pub use form::MovieForm;

repository_from_request!(MovieRepository);

const INDEX_PATH: &str = "/Movies";

#[derive(Debug, Deserialize, Default)]
pub struct IndexQuery {
    #[serde(rename = "movieGenre")]
    pub movie_genre: Option<String>,
    #[serde(rename = "searchString")]
    pub search_string: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MovieGenreViewModel {
    pub genres: Vec<String>,
    pub movies: Vec<Movie>,
    pub movie_genre: Option<String>,
    pub search_string: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiagnosticForm {
    #[serde(rename = "searchString", default)]
    pub search_string: String,
}

fn parse_id(id: &str) -> ApiResult<i64> {
    id.trim().parse().map_err(|_| {
        debug!("Invalid movie id {id:?}");
        ApiError::NotFound(format!("Movie {id}"))
    })
}

fn redirect_to_index() -> Response {
    Redirect::to(INDEX_PATH).into_response()
}

pub async fn index(
    repository: MovieRepository,
    Query(query): Query<IndexQuery>,
) -> ApiResult<impl IntoResponse> {
    let genres = repository.genres().await?;
    let filter = MovieFilter::new(query.movie_genre.clone(), query.search_string.clone());
    let movies = repository.list(&filter).await?;

    Ok(View::new(
        "Movies/Index",
        MovieGenreViewModel {
            genres,
            movies,
            movie_genre: query.movie_genre,
            search_string: query.search_string,
        },
    ))
}

/// Plain text echo of a POSTed search, does not touch the store.
pub async fn index_diagnostic(Form(form): Form<DiagnosticForm>) -> String {
    format!("From [HttpPost]Index: filter on {}", form.search_string)
}

pub async fn details(
    Path(id): Path<String>,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.get(parse_id(&id)?).await?;
    Ok(View::new("Movies/Details", movie))
}

pub async fn create_form(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    let token = state.antiforgery().issue(&cookies);
    View::new("Movies/Create", MovieForm::default()).with_token(token)
}

pub async fn create(
    repository: MovieRepository,
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<MovieForm>,
) -> ApiResult<Response> {
    match form.bind() {
        Ok(payload) => {
            let movie = repository.create(payload).await?;
            info!("Created movie {} ({})", movie.id, movie.title);
            Ok(redirect_to_index())
        }
        Err(errors) => {
            debug!("Invalid movie submitted: {errors:?}");
            let token = state.antiforgery().issue(&cookies);
            Ok(View::new("Movies/Create", form)
                .with_token(token)
                .with_errors(errors)
                .into_response())
        }
    }
}

pub async fn edit_form(
    Path(id): Path<String>,
    repository: MovieRepository,
    State(state): State<AppState>,
    cookies: Cookies,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.get(parse_id(&id)?).await?;
    let token = state.antiforgery().issue(&cookies);
    Ok(View::new("Movies/Edit", MovieForm::from(movie)).with_token(token))
}

pub async fn edit(
    Path(id): Path<String>,
    repository: MovieRepository,
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<MovieForm>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    if form.id() != Some(id) {
        debug!("Submitted movie id {:?} does not match {id}", form.id);
        return Err(ApiError::NotFound(format!("Movie {id}")));
    }

    match form.bind() {
        Ok(payload) => {
            let movie = repository.update(id, payload).await?;
            info!("Updated movie {} ({})", movie.id, movie.title);
            Ok(redirect_to_index())
        }
        Err(errors) => {
            debug!("Invalid movie {id} submitted: {errors:?}");
            let token = state.antiforgery().issue(&cookies);
            Ok(View::new("Movies/Edit", form)
                .with_token(token)
                .with_errors(errors)
                .into_response())
        }
    }
}

pub async fn delete_form(
    Path(id): Path<String>,
    repository: MovieRepository,
    State(state): State<AppState>,
    cookies: Cookies,
) -> ApiResult<impl IntoResponse> {
    let movie = repository.get(parse_id(&id)?).await?;
    let token = state.antiforgery().issue(&cookies);
    Ok(View::new("Movies/Delete", movie).with_token(token))
}

/// Confirmed deletion, missing movie is not an error.
pub async fn delete_confirmed(
    Path(id): Path<String>,
    repository: MovieRepository,
) -> ApiResult<Response> {
    match id.trim().parse::<i64>() {
        Ok(id) => {
            if repository.delete(id).await? {
                info!("Deleted movie {id}");
            } else {
                debug!("Movie {id} was already deleted");
            }
        }
        Err(_) => debug!("Nothing to delete for id {id:?}"),
    }
    Ok(redirect_to_index())
}

async fn missing_id() -> ApiError {
    ApiError::NotFound("Movie without id".to_string())
}

pub fn router(state: &AppState) -> axum::Router<AppState> {
    let antiforgery = AntiForgeryLayer::new(
        state.antiforgery().clone(),
        state.config().form_size_limit,
    );
    axum::Router::new()
        .route("/Movies/Create", post(create))
        .route("/Movies/Edit/{id}", post(edit))
        .route("/Movies/Delete/{id}", post(delete_confirmed))
        .route_layer(antiforgery)
        .route("/Movies", get(index).post(index_diagnostic))
        .route("/Movies/Index", get(index))
        .route("/Movies/Details", get(missing_id))
        .route("/Movies/Details/{id}", get(details))
        .route("/Movies/Create", get(create_form))
        .route("/Movies/Edit", get(missing_id))
        .route("/Movies/Edit/{id}", get(edit_form))
        .route("/Movies/Delete", get(missing_id))
        .route("/Movies/Delete/{id}", get(delete_form))
}
