//! End-to-end recommendation flow against an on-disk SQLite catalog.

use std::sync::Arc;

use mood_jukebox::inference::{InferenceError, MoodClassifier, SequenceClassifier};
use mood_jukebox::recommend::{MoodSource, RecommendationResult, Recommender};
use mood_jukebox::storage::{SqliteCatalog, TrackCatalog};
use mood_jukebox::types::{AudioFeatures, Track, TrackListing};
use mood_jukebox::MoodLabel;

/// Always favors one label index
struct ForcedIndex(usize);

impl SequenceClassifier for ForcedIndex {
    fn logits(&self, _text: &str) -> Result<Vec<f32>, InferenceError> {
        let mut logits = vec![-1.0; 6];
        logits[self.0] = 2.5;
        Ok(logits)
    }
}

fn track(id: &str, valence: f64, energy: f64) -> Track {
    Track::from_listing(
        TrackListing {
            id: id.to_string(),
            name: format!("Song {id}"),
            artist: format!("Artist {id}"),
            playlist_id: "37i9dQZF1DXcBWIGoYBM5M".to_string(),
            track_url: format!("https://open.spotify.com/track/{id}"),
            playlist_url: "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M".to_string(),
        },
        AudioFeatures {
            valence,
            energy,
            danceability: 0.6,
        },
    )
}

async fn sqlite_catalog(dir: &tempfile::TempDir) -> Arc<SqliteCatalog> {
    let url = format!("sqlite://{}", dir.path().join("tracks.db").display());
    Arc::new(SqliteCatalog::connect(&url, 2).await.unwrap())
}

#[tokio::test]
async fn test_i_love_you_recommends_the_love_track() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = sqlite_catalog(&dir).await;
    let love = track("love-only", 0.45, 0.55);
    assert_eq!(love.mood, MoodLabel::Love);
    catalog
        .upsert(&[love.clone(), track("sad-1", 0.1, 0.2), track("joy-1", 0.8, 0.9)])
        .await
        .unwrap();

    let recommender = Recommender::new(Arc::new(MoodClassifier::new(ForcedIndex(2))), catalog);
    let result = recommender.recommend("I love you", false).await;

    match &result {
        RecommendationResult::Found {
            mood,
            source,
            track,
            phrase,
        } => {
            assert_eq!(*mood, MoodLabel::Love);
            assert_eq!(*source, MoodSource::Classified);
            assert_eq!(track.name, love.name);
            assert_eq!(track.artist, love.artist);
            assert_eq!(track.track_url, love.track_url);
            assert_eq!(track.playlist_url, love.playlist_url);
            assert!(phrase.contains("full of love"));
        }
        other => panic!("expected a track, got {other:?}"),
    }

    assert_eq!(
        result.render(),
        format!(
            "You seem full of love :heart_eyes: \n\nHere's a song that could fit your mood:\n**{} by {}** \n{} \n\nFrom this playlist: \n{}",
            love.name, love.artist, love.track_url, love.playlist_url
        )
    );
}

#[tokio::test]
async fn test_unmapped_index_recommends_neutral() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = sqlite_catalog(&dir).await;
    catalog
        .upsert(&[track("neutral-1", 0.7, 0.3)])
        .await
        .unwrap();

    let recommender = Recommender::new(Arc::new(MoodClassifier::new(ForcedIndex(4))), catalog);
    let result = recommender.recommend("whatever", false).await;

    assert_eq!(result.mood(), Some(MoodLabel::Neutral));
    assert_eq!(result.track().unwrap().id, "neutral-1");
    assert!(result.render().starts_with("You seem neutral :neutral_face:"));
}

#[tokio::test]
async fn test_purple_is_guidance() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = sqlite_catalog(&dir).await;
    catalog.upsert(&[track("sad-1", 0.1, 0.1)]).await.unwrap();

    let recommender = Recommender::new(Arc::new(MoodClassifier::new(ForcedIndex(0))), catalog);
    let result = recommender.recommend("purple", true).await;

    assert!(matches!(result, RecommendationResult::InvalidMood { .. }));
    assert!(result.track().is_none());
}

#[tokio::test]
async fn test_catalog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let catalog = sqlite_catalog(&dir).await;
        assert_eq!(catalog.upsert(&[track("angry-1", 0.2, 0.8)]).await.unwrap(), 1);
        catalog.close().await;
    }

    let catalog = sqlite_catalog(&dir).await;
    assert_eq!(catalog.upsert(&[track("angry-1", 0.2, 0.8)]).await.unwrap(), 0);

    let recommender = Recommender::new(Arc::new(MoodClassifier::new(ForcedIndex(3))), catalog);
    let result = recommender.recommend("angry", true).await;
    assert_eq!(result.track().unwrap().id, "angry-1");
}
