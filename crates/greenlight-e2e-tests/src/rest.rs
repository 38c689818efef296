use anyhow::{Result, anyhow};
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};

pub fn movies_url(base_url: &Url) -> Url {
    base_url.join("v1/movies").unwrap()
}

pub fn movie_url(base_url: &Url, id: i64) -> Url {
    base_url.join(&format!("v1/movies/{id}")).unwrap()
}

/// Creates movie and returns its JSON representation
pub async fn create_movie(
    client: &reqwest::Client,
    base_url: &Url,
    title: &str,
    year: i32,
    runtime: i32,
    genres: &[&str],
) -> Result<Value> {
    let payload = json!({
        "title": title,
        "year": year,
        "runtime": format!("{runtime} mins"),
        "genres": genres,
    });
    let response = client
        .post(movies_url(base_url))
        .json(&payload)
        .send()
        .await?;
    if response.status() != StatusCode::CREATED {
        return Err(anyhow!(
            "Create failed with {}: {}",
            response.status(),
            response.text().await?
        ));
    }
    let mut body: Value = response.json().await?;
    Ok(body["movie"].take())
}
