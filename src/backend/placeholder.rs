use image::DynamicImage;
use reqwest::StatusCode;
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

const BASE_URL: &str = "https://jsonplaceholder.typicode.com/albums";

const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// One photo record as returned by `GET /albums/{id}/photos`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoRecord {
    #[serde(rename = "albumId")]
    pub album_id: u32,
    pub id: u32,
    pub title: String,
    pub url: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
}

#[derive(Debug, Error)]
pub enum CatalogFetchError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog request returned {0}")]
    Status(StatusCode),
}

#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("image request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("album-tui/0.1.0")
        .build()
        .expect("Failed to build HTTP client")
}

/// Fetches the photo list for one album. One request, no retries; any
/// transport failure, non-2xx status, or malformed payload surfaces as a
/// single error.
pub async fn fetch_album_photos(album_id: u32) -> Result<Vec<PhotoRecord>, CatalogFetchError> {
    let url = format!("{}/{}/photos", BASE_URL, album_id);

    let client = build_client();
    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatalogFetchError::Status(status));
    }

    let records: Vec<PhotoRecord> = response.json().await?;
    Ok(records)
}

/// Fetches and decodes one entry's image. Callers own single-flight
/// enforcement; this just does the request.
pub async fn fetch_photo_image(url: &str) -> Result<DynamicImage, ImageFetchError> {
    let client = build_client();
    let response = client
        .get(url)
        .timeout(IMAGE_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    let bytes = response.bytes().await?;

    let image = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::from)?
        .decode()?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "albumId": 1,
            "id": 1,
            "title": "accusamus beatae ad facilis cum similique qui sunt",
            "url": "https://via.placeholder.com/600/92c952",
            "thumbnailUrl": "https://via.placeholder.com/150/92c952"
        },
        {
            "albumId": 1,
            "id": 2,
            "title": "reprehenderit est deserunt velit ipsam",
            "url": "https://via.placeholder.com/600/771796",
            "thumbnailUrl": "https://via.placeholder.com/150/771796"
        },
        {
            "albumId": 1,
            "id": 3,
            "title": "officia porro iure quia iusto qui ipsa ut modi",
            "url": "https://via.placeholder.com/600/24f355",
            "thumbnailUrl": "https://via.placeholder.com/150/24f355"
        }
    ]"#;

    #[test]
    fn parses_photo_records_in_order() {
        let records: Vec<PhotoRecord> = serde_json::from_str(SAMPLE).unwrap();

        assert_eq!(records.len(), 3);
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let first = &records[0];
        assert_eq!(first.album_id, 1);
        assert_eq!(
            first.title,
            "accusamus beatae ad facilis cum similique qui sunt"
        );
        assert_eq!(first.url, "https://via.placeholder.com/600/92c952");
        assert_eq!(
            first.thumbnail_url,
            "https://via.placeholder.com/150/92c952"
        );
    }

    #[test]
    fn rejects_malformed_payload() {
        let result: Result<Vec<PhotoRecord>, _> =
            serde_json::from_str(r#"{"albums": "not an array"}"#);
        assert!(result.is_err());
    }
}
