mod common;

use bytes::Bytes;
use chrono::{Duration, Utc};
use common::Harness;
use debaide_core::domain::{Difficulty, NewTopic, SegmentKind, SessionStatus};
use debaide_core::ports::{DatabaseService, Transcription};
use debaide_core::ArenaError;
use futures::future::join_all;

#[tokio::test]
async fn scoring_is_computed_once_and_then_replayed() {
    let h = Harness::new();
    let topic = h.topic("Social media does more harm than good").await;
    let (session, _) = h.practice.start_session(topic.id, None).await.unwrap();

    for kind in ["opening", "rebuttal", "closing"] {
        h.practice
            .submit_text_segment(session.id, kind, "Platforms amplify outrage for engagement.")
            .await
            .unwrap();
    }

    let first = h.practice.score_session(session.id).await.unwrap();
    let second = h.practice.score_session(session.id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.scorer.calls(), 1);

    let history = h.practice.history(session.id).await.unwrap();
    assert_eq!(history.session.status, SessionStatus::Completed);
    assert_eq!(history.segments.len(), 3);
    assert_eq!(history.scorecard, Some(first));
}

#[tokio::test]
async fn concurrent_scoring_calls_the_scorer_once() {
    let h = Harness::new();
    let topic = h.topic("Remote work should be the default").await;
    let (session, _) = h.practice.start_session(topic.id, None).await.unwrap();
    h.practice
        .submit_text_segment(session.id, "opening", "Commutes waste hours every week.")
        .await
        .unwrap();

    let results = join_all((0..5).map(|_| h.practice.score_session(session.id))).await;
    let cards: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
    assert!(cards.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(h.scorer.calls(), 1);
}

#[tokio::test]
async fn scoring_without_segments_is_rejected() {
    let h = Harness::new();
    let topic = h.topic("Nuclear energy is essential").await;
    let (session, _) = h.practice.start_session(topic.id, None).await.unwrap();

    let err = h.practice.score_session(session.id).await.unwrap_err();
    assert!(matches!(err, ArenaError::InvalidState(_)));
    assert_eq!(h.scorer.calls(), 0);
    assert!(matches!(
        h.practice.score_session(uuid::Uuid::new_v4()).await,
        Err(ArenaError::NotFound(_))
    ));
}

#[tokio::test]
async fn segments_are_unique_per_kind_and_closed_after_scoring() {
    let h = Harness::new();
    let topic = h.topic("Privacy is more important than security").await;
    let (session, _) = h.practice.start_session(topic.id, None).await.unwrap();

    h.practice.submit_text_segment(session.id, "opening", "First take.").await.unwrap();
    assert!(matches!(
        h.practice.submit_text_segment(session.id, "opening", "Second take.").await,
        Err(ArenaError::InvalidState(_))
    ));
    assert!(matches!(
        h.practice.submit_text_segment(session.id, "summary", "Wrong kind.").await,
        Err(ArenaError::InvalidKind(_))
    ));

    h.practice.score_session(session.id).await.unwrap();
    assert!(matches!(
        h.practice.submit_text_segment(session.id, "closing", "Too late.").await,
        Err(ArenaError::InvalidState(_))
    ));
}

#[tokio::test]
async fn text_durations_follow_speaking_rate() {
    let h = Harness::new();
    let topic = h.topic("College should be free").await;
    let (session, _) = h.practice.start_session(topic.id, None).await.unwrap();

    let speech = vec!["tuition"; 300].join(" ");
    let segment = h.practice.submit_text_segment(session.id, "closing", &speech).await.unwrap();
    assert_eq!(segment.duration, 120.0);
    assert_eq!(segment.audio_url, None);
}

#[tokio::test]
async fn audio_segments_are_stored_then_transcribed() {
    let h = Harness::new();
    let topic = h.topic("Video games cause violence").await;
    let (session, _) = h.practice.start_session(topic.id, None).await.unwrap();

    let segment = h
        .practice
        .submit_audio_segment(session.id, "rebuttal", "take.m4a", Bytes::from_static(b"RIFF...."))
        .await
        .unwrap();

    let keys = h.storage.keys.lock().unwrap().clone();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with(&format!("{}/rebuttal_", session.id)));
    assert!(keys[0].ends_with(".m4a"));
    assert_eq!(segment.audio_url, Some(format!("/storage/audio/{}", keys[0])));
    assert_eq!(segment.kind, SegmentKind::Rebuttal);
    // Ten words and no measured duration: estimated at 150 wpm.
    assert_eq!(segment.duration, 4.0);
}

#[tokio::test]
async fn failed_transcriptions_still_record_a_segment() {
    let h = Harness::with_transcription(Transcription::placeholder());
    let topic = h.topic("UBI would benefit society").await;
    let (session, _) = h.practice.start_session(topic.id, None).await.unwrap();

    let segment = h
        .practice
        .submit_audio_segment(session.id, "opening", "clip.webm", Bytes::from_static(b"\x1aE\xdf\xa3"))
        .await
        .unwrap();
    assert_eq!(segment.transcript, Transcription::placeholder().text);
    assert_eq!(segment.duration, 5.0);

    assert!(matches!(
        h.practice
            .submit_audio_segment(session.id, "closing", "clip.webm", Bytes::new())
            .await,
        Err(ArenaError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn three_sessions_average_exactly() {
    let h = Harness::new();
    let topic = h.topic("Standardized testing measures ability").await;
    let owner = h.user("dana").await.id;
    h.scorer.script(&[10.0, 14.0, 18.0]);

    for _ in 0..3 {
        let (session, _) = h.practice.start_session(topic.id, Some(owner)).await.unwrap();
        h.practice
            .submit_text_segment(session.id, "opening", "Tests are imperfect but comparable.")
            .await
            .unwrap();
        h.practice.score_session(session.id).await.unwrap();
    }

    let stats = h.store.get_user_stats(owner).await.unwrap().unwrap();
    assert_eq!(stats.completed_practice_sessions, 3);
    assert_eq!(stats.average_practice_score, 14.0);
    assert_eq!(stats.avg_structure_score, 3.5);
    assert_eq!(stats.total_battles, 0);
    assert_eq!(stats.topics_debated.get(&topic.id), Some(&3));
}

#[tokio::test]
async fn out_of_range_scores_are_clamped() {
    let h = Harness::new();
    let topic = h.topic("Climate change is human-caused").await;
    h.scorer.script(&[36.0]);

    let (session, _) = h.practice.start_session(topic.id, None).await.unwrap();
    h.practice.submit_text_segment(session.id, "opening", "The data is clear.").await.unwrap();
    let card = h.practice.score_session(session.id).await.unwrap();

    assert_eq!(card.scores.total, 20.0);
    assert_eq!(card.scores.structure, 5.0);
}

#[tokio::test]
async fn daily_topic_is_generated_once_per_day() {
    let h = Harness::new();
    h.store
        .insert_topic_at(
            &NewTopic::new("Yesterday's topic", "Old news", Difficulty::Easy, "misc"),
            Utc::now() - Duration::days(1) - Duration::hours(1),
        )
        .await;

    let first = h.catalog.daily_topic().await.unwrap();
    let second = h.catalog.daily_topic().await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(h.generator.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(first.title.starts_with("Cities should ban cars"));
}

#[tokio::test]
async fn seeding_only_fills_an_empty_catalog() {
    let h = Harness::new();
    assert_eq!(h.catalog.seed_defaults().await.unwrap(), 10);
    assert_eq!(h.catalog.seed_defaults().await.unwrap(), 0);
    assert_eq!(h.catalog.list_topics().await.unwrap().len(), 10);
}

#[tokio::test]
async fn sessions_require_an_existing_topic() {
    let h = Harness::new();
    assert!(matches!(
        h.practice.start_session(4_242, None).await,
        Err(ArenaError::NotFound(_))
    ));
}
