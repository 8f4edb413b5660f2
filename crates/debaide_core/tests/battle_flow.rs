mod common;

use common::{verdict_json, Harness};
use debaide_core::domain::{BattleStatus, SegmentKind, Stance};
use debaide_core::ports::DatabaseService;
use debaide_core::ArenaError;
use futures::future::join_all;
use uuid::Uuid;

#[tokio::test]
async fn opening_round_passes_the_turn_then_resets_it() {
    let h = Harness::new();
    let topic = h.topic("AI safety").await;
    let (creator, joiner) = (h.user("creator").await.id, h.user("joiner").await.id);

    let (battle, _) = h.battles.create_battle(creator, topic.id, "pro").await.unwrap();
    assert_eq!(battle.status, BattleStatus::Waiting);

    let (battle, _) = h.battles.join_battle(joiner, battle.id).await.unwrap();
    assert_eq!(battle.player2_stance, Some(Stance::Con));
    assert_eq!(battle.current_turn, creator);

    let receipt = h
        .battles
        .submit_segment(battle.id, creator, "opening", "AI safety research must come first.")
        .await
        .unwrap();
    assert_eq!(receipt.current_turn, joiner);
    assert_eq!(receipt.current_segment, SegmentKind::Opening);

    let receipt = h
        .battles
        .submit_segment(battle.id, joiner, "opening", "Progress and safety go together.")
        .await
        .unwrap();
    assert_eq!(receipt.current_segment, SegmentKind::Rebuttal);
    assert_eq!(receipt.current_turn, creator);

    let stored = h.store.get_battle(battle.id).await.unwrap();
    assert_eq!(stored.status, BattleStatus::InProgress);
    assert_eq!(stored.current_turn, creator);
    assert_eq!(stored.current_segment, SegmentKind::Rebuttal);
}

#[tokio::test]
async fn out_of_turn_and_out_of_stage_submissions_change_nothing() {
    let h = Harness::new();
    let topic = h.topic("Space exploration").await;
    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    let battle = h.started_battle(topic.id, p1, p2).await;

    let err = h.battles.submit_segment(battle.id, p2, "opening", "Me first").await.unwrap_err();
    assert!(matches!(err, ArenaError::Forbidden(_)));

    let err = h.battles.submit_segment(battle.id, p1, "closing", "Skipping ahead").await.unwrap_err();
    assert!(matches!(err, ArenaError::InvalidState(_)));
    assert!(err.to_string().contains("Current segment is opening"));

    let err = h.battles.submit_segment(battle.id, p1, "crossfire", "Nope").await.unwrap_err();
    assert!(matches!(err, ArenaError::InvalidKind(_)));

    let err = h.battles.submit_segment(battle.id, p1, "opening", "   ").await.unwrap_err();
    assert!(matches!(err, ArenaError::InvalidInput(_)));

    let stored = h.store.get_battle(battle.id).await.unwrap();
    assert_eq!(stored.current_turn, p1);
    assert_eq!(stored.current_segment, SegmentKind::Opening);
    assert!(h.store.get_battle_segments(battle.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_submissions_for_one_turn_admit_exactly_one() {
    let h = Harness::new();
    let topic = h.topic("Four-day work week").await;
    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    let battle_id = h.started_battle(topic.id, p1, p2).await.id;

    let attempts = (0..8).map(|i| {
        let text = format!("Opening draft number {}", i);
        let battles = &h.battles;
        async move { battles.submit_segment(battle_id, p1, "opening", &text).await }
    });
    let results = join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let segments = h.store.get_battle_segments(battle_id).await.unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(h.store.get_battle(battle_id).await.unwrap().current_turn, p2);
}

#[tokio::test]
async fn concurrent_creates_by_one_user_leave_one_waiting_battle() {
    let h = Harness::new();
    let topic_id = h.topic("Daylight saving time should end").await.id;
    let (creator, browser) = (Uuid::new_v4(), Uuid::new_v4());

    let attempts = (0..6).map(|i| {
        let battles = &h.battles;
        let stance = if i % 2 == 0 { "pro" } else { "con" };
        async move { battles.create_battle(creator, topic_id, stance).await }
    });
    let created: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap().0.id).collect();

    let open = h.battles.available(browser).await.unwrap();
    assert_eq!(open.len(), 1);
    assert!(created.contains(&open[0].0.id));
    let mut survivors = 0;
    for id in &created {
        if h.store.get_battle(*id).await.is_ok() {
            survivors += 1;
        }
    }
    assert_eq!(survivors, 1);
}

#[tokio::test]
async fn concurrent_judgments_call_the_judge_once() {
    let h = Harness::new();
    let topic = h.topic("Esports belong in the Olympics").await;
    let (p1, p2) = (h.user("fern").await.id, h.user("gus").await.id);
    let battle = h.started_battle(topic.id, p1, p2).await;
    h.play_through(battle.id, p1, p2).await;

    let results = join_all([p1, p2].map(|requester| h.battles.judge_battle(battle.id, requester))).await;

    assert_eq!(h.judge.calls(), 1);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ArenaError::InvalidState(_)))));
    let winner = h.store.get_user_stats(p2).await.unwrap().unwrap();
    assert_eq!((winner.total_battles, winner.battles_won), (1, 1));
}

#[tokio::test]
async fn practice_and_battle_stats_for_one_user_both_land() {
    let h = Harness::new();
    let topic = h.topic("Space exploration is worth the cost").await;
    let (p1, p2) = (h.user("cleo").await.id, h.user("dev").await.id);
    let battle = h.started_battle(topic.id, p1, p2).await;
    h.play_through(battle.id, p1, p2).await;
    let (session, _) = h.practice.start_session(topic.id, Some(p2)).await.unwrap();
    h.practice
        .submit_text_segment(session.id, "opening", "Spin-off technology pays for itself.")
        .await
        .unwrap();

    let (scored, judged) = tokio::join!(
        h.practice.score_session(session.id),
        h.battles.judge_battle(battle.id, p1)
    );
    scored.unwrap();
    assert_eq!(judged.unwrap().winner_id, p2);

    let stats = h.store.get_user_stats(p2).await.unwrap().unwrap();
    assert_eq!(stats.completed_practice_sessions, 1);
    assert_eq!(stats.average_practice_score, 12.0);
    assert_eq!((stats.total_battles, stats.battles_won, stats.current_win_streak), (1, 1, 1));
    assert_eq!(stats.topics_debated.get(&topic.id), Some(&2));
}

#[tokio::test]
async fn concurrent_battle_stat_updates_are_all_counted() {
    let h = Harness::new();
    let topic = h.topic("Remote juries should be allowed").await;
    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    let battle = h.started_battle(topic.id, p1, p2).await;
    h.play_through(battle.id, p1, p2).await;
    h.battles.judge_battle(battle.id, p1).await.unwrap();

    let finished = h.store.get_battle(battle.id).await.unwrap();
    let segments = h.store.get_battle_segments(battle.id).await.unwrap();
    let results = join_all((0..4).map(|_| h.stats.record_battle(&finished, &segments))).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let winner = h.store.get_user_stats(p2).await.unwrap().unwrap();
    assert_eq!((winner.total_battles, winner.battles_won, winner.best_win_streak), (5, 5, 5));
    let loser = h.store.get_user_stats(p1).await.unwrap().unwrap();
    assert_eq!((loser.total_battles, loser.battles_lost), (5, 5));
}

#[tokio::test]
async fn joining_rules() {
    let h = Harness::new();
    let topic = h.topic("Homework should be abolished").await;
    let (creator, other, late) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let (battle, _) = h.battles.create_battle(creator, topic.id, "con").await.unwrap();
    assert!(matches!(
        h.battles.join_battle(creator, battle.id).await,
        Err(ArenaError::InvalidState(_))
    ));

    let (joined, _) = h.battles.join_battle(other, battle.id).await.unwrap();
    assert_eq!(joined.player2_stance, Some(Stance::Pro));
    assert!(matches!(
        h.battles.join_battle(late, battle.id).await,
        Err(ArenaError::InvalidState(_))
    ));
    assert!(matches!(
        h.battles.join_battle(late, Uuid::new_v4()).await,
        Err(ArenaError::NotFound(_))
    ));
}

#[tokio::test]
async fn creation_validates_topic_then_stance() {
    let h = Harness::new();
    let topic = h.topic("Zoos are ethical").await;
    let creator = Uuid::new_v4();

    assert!(matches!(
        h.battles.create_battle(creator, 9_999, "sideways").await,
        Err(ArenaError::NotFound(_))
    ));
    assert!(matches!(
        h.battles.create_battle(creator, topic.id, "sideways").await,
        Err(ArenaError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn a_new_battle_replaces_the_creators_waiting_one() {
    let h = Harness::new();
    let topic = h.topic("Cash should be phased out").await;
    let (creator, browser) = (Uuid::new_v4(), Uuid::new_v4());

    let (first, _) = h.battles.create_battle(creator, topic.id, "pro").await.unwrap();
    let (second, _) = h.battles.create_battle(creator, topic.id, "con").await.unwrap();

    assert!(matches!(h.store.get_battle(first.id).await, Err(_)));
    let open = h.battles.available(browser).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].0.id, second.id);
    assert!(h.battles.available(creator).await.unwrap().is_empty());
}

#[tokio::test]
async fn full_battle_is_judged_and_feeds_stats() {
    let h = Harness::new();
    let topic = h.topic("AI safety").await;
    let (p1, p2) = (h.user("ana").await.id, h.user("ben").await.id);
    let battle = h.started_battle(topic.id, p1, p2).await;
    h.play_through(battle.id, p1, p2).await;

    let status = h.battles.overview(battle.id, p1).await.unwrap();
    assert_eq!(status.player1_segments, SegmentKind::ALL.to_vec());
    assert_eq!(status.player2_segments, SegmentKind::ALL.to_vec());
    assert_eq!(status.battle.current_segment, SegmentKind::Closing);

    h.judge.reply(format!("```json\n{}\n```", verdict_json("player2")));
    let outcome = h.battles.judge_battle(battle.id, p1).await.unwrap();
    assert_eq!(outcome.winner_id, p2);
    assert_eq!(outcome.winner_username, "ben");
    assert_eq!(outcome.judgment["player2_scores"]["total"], 38);

    let stored = h.store.get_battle(battle.id).await.unwrap();
    assert_eq!(stored.status, BattleStatus::Completed);
    assert_eq!(stored.winner_id, Some(p2));
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.judgment, Some(outcome.judgment.clone()));

    let winner = h.store.get_user_stats(p2).await.unwrap().unwrap();
    assert_eq!((winner.total_battles, winner.battles_won, winner.current_win_streak), (1, 1, 1));
    assert_eq!(winner.topics_debated.get(&topic.id), Some(&1));
    assert!(winner.total_debate_time > 0.0);
    assert_eq!(winner.completed_practice_sessions, 0);

    let loser = h.store.get_user_stats(p1).await.unwrap().unwrap();
    assert_eq!((loser.total_battles, loser.battles_lost, loser.current_win_streak), (1, 1, 0));

    assert!(matches!(
        h.battles.judge_battle(battle.id, p1).await,
        Err(ArenaError::InvalidState(_))
    ));
    assert_eq!(h.judge.calls(), 1);
}

#[tokio::test]
async fn judging_an_incomplete_battle_names_the_missing_player() {
    let h = Harness::new();
    let topic = h.topic("Tipping culture has gone too far").await;
    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    let battle = h.started_battle(topic.id, p1, p2).await;

    for (player, kind) in [(p1, "opening"), (p2, "opening"), (p1, "rebuttal"), (p2, "rebuttal"), (p1, "closing")] {
        h.battles.submit_segment(battle.id, player, kind, "A considered point.").await.unwrap();
    }

    let err = h.battles.judge_battle(battle.id, p1).await.unwrap_err();
    assert!(matches!(err, ArenaError::InvalidState(_)));
    let message = err.to_string();
    assert!(message.contains("Player 2"), "{}", message);
    assert!(message.contains("closing"), "{}", message);
    assert_eq!(h.judge.calls(), 0);
}

#[tokio::test]
async fn outsiders_cannot_judge_or_peek() {
    let h = Harness::new();
    let topic = h.topic("Public transit should be free").await;
    let (p1, p2, outsider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let battle = h.started_battle(topic.id, p1, p2).await;
    h.play_through(battle.id, p1, p2).await;

    assert!(matches!(
        h.battles.judge_battle(battle.id, outsider).await,
        Err(ArenaError::Forbidden(_))
    ));
    assert!(matches!(
        h.battles.overview(battle.id, outsider).await,
        Err(ArenaError::Forbidden(_))
    ));
    assert!(matches!(
        h.battles.segments(battle.id, outsider).await,
        Err(ArenaError::Forbidden(_))
    ));
    assert_eq!(h.battles.segments(battle.id, p2).await.unwrap().len(), 6);
}

#[tokio::test]
async fn a_bad_verdict_leaves_the_battle_judgeable() {
    let h = Harness::new();
    let topic = h.topic("Art made by AI is real art").await;
    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    let battle = h.started_battle(topic.id, p1, p2).await;
    h.play_through(battle.id, p1, p2).await;

    h.judge.reply("Player one was more convincing overall.");
    assert!(matches!(
        h.battles.judge_battle(battle.id, p2).await,
        Err(ArenaError::UpstreamFailure(_))
    ));
    h.judge.fail("connection reset");
    assert!(matches!(
        h.battles.judge_battle(battle.id, p2).await,
        Err(ArenaError::UpstreamFailure(_))
    ));

    let stored = h.store.get_battle(battle.id).await.unwrap();
    assert_eq!(stored.status, BattleStatus::InProgress);
    assert_eq!(stored.winner_id, None);
    assert!(h.store.get_user_stats(p1).await.unwrap().is_none());

    h.judge.reply(verdict_json("player1"));
    let outcome = h.battles.judge_battle(battle.id, p2).await.unwrap();
    assert_eq!(outcome.winner_id, p1);
}

#[tokio::test]
async fn closing_cannot_be_resubmitted_while_awaiting_judgment() {
    let h = Harness::new();
    let topic = h.topic("Voting should be mandatory").await;
    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    let battle = h.started_battle(topic.id, p1, p2).await;
    h.play_through(battle.id, p1, p2).await;

    let err = h.battles.submit_segment(battle.id, p1, "closing", "One more thing").await.unwrap_err();
    assert!(matches!(err, ArenaError::InvalidState(_)));
    assert_eq!(h.store.get_battle_segments(battle.id).await.unwrap().len(), 6);
}

#[tokio::test]
async fn streaks_follow_the_longest_run() {
    let h = Harness::new();
    let topic = h.topic("Chess is a sport").await;
    let (hero, rival) = (Uuid::new_v4(), Uuid::new_v4());

    for hero_wins in [true, false, true, true] {
        let battle = h.started_battle(topic.id, hero, rival).await;
        h.play_through(battle.id, hero, rival).await;
        h.judge.reply(verdict_json(if hero_wins { "player1" } else { "player2" }));
        h.battles.judge_battle(battle.id, rival).await.unwrap();
    }

    let stats = h.store.get_user_stats(hero).await.unwrap().unwrap();
    assert_eq!(stats.current_win_streak, 2);
    assert_eq!(stats.best_win_streak, 2);
    assert_eq!(stats.total_battles, 4);
    assert_eq!(stats.topics_debated.get(&topic.id), Some(&4));
}
