//! Spotify Web API client (client-credentials flow).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{CatalogError, MusicSource};
use crate::config::{CatalogConfig, MAX_FEATURE_BATCH};
use crate::types::{AudioFeatures, TrackListing};

/// Refresh the token this long before the service says it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct FeaturedPlaylists {
    playlists: Page<Option<PlaylistRef>>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PlaylistRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    /// Null for local files
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    audio_features: Vec<Option<AudioFeatures>>,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// [`MusicSource`] backed by the Spotify Web API
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    api_base_url: String,
    playlist_link_base: String,
    playlist_track_limit: u32,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("api_base_url", &self.api_base_url)
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl SpotifyClient {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret)
        else {
            return Err(CatalogError::MissingCredentials);
        };

        let client = Client::builder()
            .user_agent(concat!("mood-jukebox/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            auth_url: config.auth_url.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            playlist_link_base: config.playlist_link_base.clone(),
            playlist_track_limit: config.playlist_track_limit,
            token: Mutex::new(None),
        })
    }

    /// Current access token, fetching a new one when missing or expiring
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting access token");
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let token: TokenResponse = decode("token", response).await?;

        info!(expires_in = token.expires_in, "Obtained access token");
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}{}", self.api_base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        decode(endpoint, response).await
    }

    fn playlist_url(&self, playlist_id: &str) -> String {
        format!("{}{}", self.playlist_link_base, playlist_id)
    }
}

/// Check the status, then parse the body
async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, CatalogError> {
    let status = response.status();
    debug!(endpoint, status = status.as_u16(), "API response");

    if !status.is_success() {
        warn!(endpoint, status = status.as_u16(), "API request failed");
        return Err(CatalogError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| CatalogError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl MusicSource for SpotifyClient {
    async fn featured_playlist_ids(&self) -> Result<Vec<String>, CatalogError> {
        let featured: FeaturedPlaylists = self
            .get_json("featured-playlists", "/browse/featured-playlists", &[])
            .await?;

        Ok(featured
            .playlists
            .items
            .into_iter()
            .flatten()
            .map(|p| p.id)
            .collect())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackListing>, CatalogError> {
        let page: Page<PlaylistItem> = self
            .get_json(
                "playlist-tracks",
                &format!("/playlists/{playlist_id}/tracks"),
                &[("limit", self.playlist_track_limit.to_string())],
            )
            .await?;

        let playlist_url = self.playlist_url(playlist_id);
        let listings = page
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(|track| {
                let id = track.id?;
                let track_url = track
                    .external_urls
                    .spotify
                    .unwrap_or_else(|| format!("https://open.spotify.com/track/{id}"));
                let artist = track
                    .artists
                    .into_iter()
                    .next()
                    .map(|a| a.name)
                    .unwrap_or_else(|| "Unknown Artist".to_string());
                Some(TrackListing {
                    id,
                    name: track.name,
                    artist,
                    playlist_id: playlist_id.to_string(),
                    track_url,
                    playlist_url: playlist_url.clone(),
                })
            })
            .collect();

        Ok(listings)
    }

    async fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_FEATURE_BATCH {
            return Err(CatalogError::Decode {
                endpoint: "audio-features".to_string(),
                reason: format!("{} ids requested, limit is {MAX_FEATURE_BATCH}", ids.len()),
            });
        }

        let response: AudioFeaturesResponse = self
            .get_json("audio-features", "/audio-features", &[("ids", ids.join(","))])
            .await?;

        Ok(response.audio_features)
    }

    fn name(&self) -> &str {
        "spotify"
    }
}
