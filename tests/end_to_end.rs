use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pgn_replay::chess::cursor::GameCursor;
use pgn_replay::chess::loader::{Layer, load_game};
use pgn_replay::chess::metadata::extract;
use pgn_replay::chess::moves::tokenize;
use pgn_replay::chess::reader::{read_source, split};
use pgn_replay::chess::replay::{ReplayOutcome, ReplayScheduler, plan, timeouts};
use pgn_replay::chess::worker::WorkerClient;
use pgn_replay::{FilterCriteria, ReplayConfig, ReplayMode};
use tokio::time::Instant;

const EVERGREEN: &str = r#"[Event "Third Rosenwald Trophy"]
[Site "New York, NY USA"]
[Date "1956.10.17"]
[Round "8"]
[White "Donald Byrne"]
[Black "Robert James Fischer"]
[Result "0-1"]
[ECO "D92"]

1. Nf3 Nf6 2. c4 g6 3. Nc3 Bg7 4. d4 O-O 5. Bf4 d5 6. Qb3 dxc4 7. Qxc4 c6
8. e4 Nbd7 9. Rd1 Nb6 10. Qc5 Bg4 11. Bg5 Na4 12. Qa3 Nxc3 13. bxc3 Nxe4
14. Bxe7 Qb6 15. Bc4 Nxc3 16. Bc5 Rfe8+ 17. Kf1 Be6 18. Bxb6 Bxc4+ 19. Kg1 Ne2+
20. Kf1 Nxd4+ 21. Kg1 Ne2+ 22. Kf1 Nc3+ 23. Kg1 axb6 24. Qb4 Ra4 25. Qxb6 Nxd1
26. h3 Rxa2 27. Kh2 Nxf2 28. Re1 Rxe1 29. Qd8+ Bf8 30. Nxe1 Bd5 31. Nf3 Ne4
32. Qb8 b5 33. h4 h5 34. Ne5 Kg7 35. Kg1 Bc5+ 36. Kf1 Ng3+ 37. Ke1 Bb4+ 38. Kd1
Bb3+ 39. Kc1 Ne2+ 40. Kb1 Nc3+ 41. Kc1 Rc2# 0-1
"#;

const LICHESS_BLITZ: &str = r#"[Event "Rated Blitz game"]
[Site "https://lichess.org/abcdefgh"]
[White "PlayerA"]
[Black "PlayerB"]
[Result "1-0"]
[WhiteElo "1850"]
[BlackElo "1790"]
[TimeControl "180+0"]
[ECO "C60"]

1. e4 { [%clk 0:02:58] } 1... e5 { [%clk 0:02:55] } 2. Nf3 { [%clk 0:02:50] } 2... Nc6 { [%clk 0:02:41] } 3. Bb5 { [%clk 0:02:20] } 3... a6 { [%clk 0:02:20] } 4. Ba4 { [%clk 0:01:50] } 4... Nf6 { [%clk 0:01:50] } 5. O-O { [%clk 0:01:35] } 5... Be7 { [%clk 0:01:10] } 1-0
"#;

#[test]
fn test_evergreen_loads_without_clocks() {
    let games = split(EVERGREEN);
    assert_eq!(games.len(), 1);

    let meta = extract(&games[0].raw_pgn, games[0].index);
    assert_eq!(meta.white, "Donald Byrne");
    assert_eq!(meta.black, "Robert James Fischer");
    assert_eq!(meta.result, "0-1");
    assert_eq!(meta.eco.as_deref(), Some("D92"));

    assert_eq!(tokenize(&games[0].raw_pgn).len(), 82);

    let game = load_game(&games[0]).unwrap();
    assert_eq!(game.layer, Layer::Strict);
    assert_eq!(game.moves.len(), 82);
    assert_eq!(game.moves.last().map(String::as_str), Some("Rc2#"));
    assert!(game.clocks.history.is_empty());
    assert!(game.clocks.think_times.iter().all(Option::is_none));

    let mut cursor = GameCursor::from(game);
    cursor.end().unwrap();
    assert_eq!(cursor.current_ply(), 82);
    assert!(cursor.legal_moves().is_empty());
}

#[test]
fn test_lichess_proportional_replay_fits_target() {
    let games = split(LICHESS_BLITZ);
    let game = load_game(&games[0]).unwrap();
    assert_eq!(game.moves.len(), 10);
    assert_eq!(game.clocks.think_times[0], Some(2.0));
    assert_eq!(game.clocks.think_times[1], Some(5.0));

    let recorded: f64 = game.clocks.think_times.iter().flatten().sum();
    assert_eq!(recorded, 180.0 + 180.0 - 95.0 - 70.0);

    let config = ReplayConfig::default()
        .with_mode(ReplayMode::Proportional)
        .with_proportional_minutes(1.0);
    let delays = plan(&timeouts(&config, &game.clocks.think_times), 0).unwrap();

    assert_eq!(delays.len(), 10);
    assert!(delays.windows(2).all(|w| w[1] - w[0] >= Duration::from_millis(999)));
    assert!(*delays.last().unwrap() <= Duration::from_millis(60_000));
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_lichess_replay_ends_within_a_minute() {
    let game = load_game(&split(LICHESS_BLITZ)[0]).unwrap();
    let config = ReplayConfig::default()
        .with_mode(ReplayMode::Proportional)
        .with_proportional_minutes(1.0);

    let fired = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fired);
    let origin = Instant::now();
    let mut scheduler = ReplayScheduler::new(config.completion_grace());
    let completion = scheduler
        .schedule(
            &timeouts(&config, &game.clocks.think_times),
            0,
            move |ply: usize| -> ControlFlow<()> {
                sink.lock().unwrap().push((ply, origin.elapsed()));
                ControlFlow::Continue(())
            },
        )
        .unwrap();

    assert_eq!(completion.wait().await, ReplayOutcome::Completed);
    let fired = fired.lock().unwrap();
    assert_eq!(fired.len(), 10);
    assert_eq!(fired.last().map(|(ply, _)| *ply), Some(9));
    assert!(fired.last().unwrap().1 <= Duration::from_millis(60_000));
}

#[tokio::test]
async fn test_worker_round_trip_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("games.pgn");
    std::fs::write(&path, format!("{}\n{}", EVERGREEN, LICHESS_BLITZ)).unwrap();

    let blob = read_source(path.to_str().unwrap(), None).unwrap();
    let mut worker = WorkerClient::spawn().unwrap();
    let summary = worker.load(blob).await.unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.white_players, vec!["Donald Byrne", "PlayerA (1850)"]);

    let matches = worker.filter(FilterCriteria::default()).await.unwrap();
    assert_eq!(matches, vec![1, 0]);

    let criteria = FilterCriteria {
        result: "0-1".to_string(),
        ..FilterCriteria::default()
    };
    assert_eq!(worker.filter(criteria).await.unwrap(), vec![0]);

    let payload = worker.load_game(1).await.unwrap();
    assert!(payload.error.is_none());
    assert_eq!(payload.moves.len(), 10);
    assert_eq!(payload.clock_history.len(), 11);
}
