#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::num::NonZero;

    use itertools::Itertools;
    use proptest::prelude::*;
    use serde_json::json;

    use crate::board::Board;
    use crate::cell::{CellCode, HintKind};
    use crate::command::{Command, CommandKind};
    use crate::error::{LevelError, RestoreError};
    use crate::level::{BuilderInvalidReason, CachedLevelSource, Level, LevelBuilder, LevelPack, LevelSource};
    use crate::location::{Location, Vertex};
    use crate::rules::{CompletionKind, CoverageEvaluator};
    use crate::saved::{CellRef, SavedBoardState};
    use crate::score::{normalize_score_state, MemoryScoreStore, PersistedScoreState, ScoreManager, ScoreMode, ScorePersistence};
    use crate::session::{BoardPersistence, MemoryBoardStore, PuzzleSession};
    use crate::signature::{canonical_signature, candidate_paths, constraint_signature};
    use crate::snapshot::Snapshot;
    use crate::step::Step;
    use crate::store::GameStateStore;
    use crate::topology::{crossing_word, find_islands, free_reduce, relabel, topology_signature, Generator, Island};

    fn store_for(level: Level) -> GameStateStore<LevelPack> {
        let mut store = GameStateStore::new(LevelPack(vec![level]));
        store.load_level(0).unwrap();
        store
    }

    fn draw(store: &mut GameStateStore<LevelPack>, cells: &[(usize, usize)]) {
        for &(r, c) in cells {
            assert!(store.start_or_try_step(Location(r, c)), "could not step onto {},{}", r, c);
        }
    }

    fn snapshot_of(level: &Level, cells: &[(usize, usize)]) -> Snapshot {
        let mut store = store_for(level.clone());
        draw(&mut store, cells);
        store.snapshot()
    }

    fn signature_of(level: &Level, cells: &[(usize, usize)]) -> String {
        canonical_signature(&snapshot_of(level, cells))
    }

    fn path_of(store: &GameStateStore<LevelPack>) -> Vec<(usize, usize)> {
        store.snapshot().path().iter().map(|loc| (loc.0, loc.1)).collect_vec()
    }

    fn at(r: i64, c: i64) -> CellRef {
        CellRef::Object { r, c }
    }

    fn open_grid(rows: usize, cols: usize) -> Level {
        let row = ".".repeat(cols);
        Level::from_rows(&vec![row.as_str(); rows])
    }

    fn ring_around_pillar() -> Level {
        Level::from_rows(&["...", ".#.", "..."])
    }

    const RING: [(usize, usize); 8] = [(0, 0), (0, 1), (0, 2), (1, 2), (2, 2), (2, 1), (2, 0), (1, 0)];

    // ---- levels and boards ----

    #[test]
    fn parse_level_json() {
        let level: Level = serde_json::from_value(json!({
            "grid": ["..", "#t"],
            "stitches": [[1, 1]],
            "cornerCounts": [[0, 0, 0]],
        })).unwrap();
        let board = Board::try_from(&level).unwrap();

        assert_eq!(board.rows(), 2);
        assert_eq!(board.total_usable(), 3);
        assert!(board.is_stitch(Vertex(1, 1)));
        assert_eq!(board.base_cell(Location(1, 1)), Some(CellCode::Hint(HintKind::Turn)));
        assert_eq!(format!("{}", board), "..\n#t\n");
    }

    #[test]
    fn reject_malformed_levels() {
        assert_eq!(Board::try_from(&Level::from_rows(&[])).unwrap_err(), LevelError::Empty);
        assert_eq!(
            Board::try_from(&Level::from_rows(&["...", ".."])).unwrap_err(),
            LevelError::RaggedRows { row: 1, expected: 3, found: 2 },
        );
        assert_eq!(
            Board::try_from(&Level::from_rows(&["..", ".x"])).unwrap_err(),
            LevelError::UnknownCellCode { code: 'x', at: Location(1, 1) },
        );
        assert_eq!(
            Board::try_from(&open_grid(2, 2).with_stitches(&[(0, 1)])).unwrap_err(),
            LevelError::StitchOutOfBounds { vertex: Vertex(0, 1) },
        );
        assert_eq!(
            Board::try_from(&open_grid(2, 2).with_corner_counts(&[(3, 0, 1)])).unwrap_err(),
            LevelError::CornerOutOfBounds { vertex: Vertex(3, 0) },
        );
        assert_eq!(
            Board::try_from(&open_grid(2, 2).with_corner_counts(&[(1, 1, 5)])).unwrap_err(),
            LevelError::CornerTargetTooLarge { vertex: Vertex(1, 1), target: 5 },
        );
    }

    #[test]
    fn builder_produces_level_rows() {
        let level = LevelBuilder::with_dims((NonZero::new(2).unwrap(), NonZero::new(3).unwrap()))
            .add_wall(Location(0, 1))
            .add_movable_wall(Location(1, 2))
            .set_cell(Location(1, 0), CellCode::Hint(HintKind::Straight))
            .add_stitch(Vertex(1, 1))
            .add_corner_count(Vertex(0, 0), 0)
            .build()
            .unwrap();

        assert_eq!(level.grid, vec![".#.".to_string(), "s.m".to_string()]);
        assert_eq!(level.stitches, vec![[1, 1]]);
        assert_eq!(level.corner_counts, vec![[0, 0, 0]]);
    }

    #[test]
    fn builder_invalidates_out_of_bounds_features() {
        let mut builder = LevelBuilder::with_dims((NonZero::new(2).unwrap(), NonZero::new(2).unwrap()));
        builder.add_stitch(Vertex(2, 1)).add_wall(Location(0, 0));

        assert_eq!(builder.is_valid(), Some(&vec![BuilderInvalidReason::FeatureOutOfBounds]));
        assert!(builder.build().is_err());

        let mut builder = LevelBuilder::with_dims((NonZero::new(2).unwrap(), NonZero::new(2).unwrap()));
        builder.add_corner_count(Vertex(1, 1), 7);
        assert_eq!(builder.is_valid(), Some(&vec![BuilderInvalidReason::CornerTargetTooLarge]));
    }

    #[test]
    fn cached_source_evicts_least_recently_used() {
        let calls = Cell::new(0);
        let mut source = CachedLevelSource::with_capacity(|index: usize| {
            calls.set(calls.get() + 1);
            (index < 5).then(|| open_grid(1, index + 1))
        }, 2);

        assert!(source.level(0).is_some());
        assert!(source.level(1).is_some());
        assert_eq!(source.level(0).unwrap().grid, vec![".".to_string()]);
        assert_eq!(calls.get(), 2);

        assert!(source.level(2).is_some());
        assert_eq!(source.cached_indices(), vec![0, 2]);

        assert!(source.level(1).is_some());
        assert_eq!(calls.get(), 4);

        assert!(source.level(9).is_none());
        assert_eq!(source.cached_indices(), vec![2, 1]);
    }

    // ---- the state machine ----

    #[test]
    fn load_missing_level() {
        let mut store = GameStateStore::new(LevelPack(vec![open_grid(2, 2)]));
        assert_eq!(store.load_level(3), Err(LevelError::Missing { index: 3 }));
        assert!(store.dispatch(Command::LoadLevel { level_index: 1 }).is_err());
        assert_eq!(store.snapshot().level_index(), None);
    }

    #[test]
    fn closure_level_source() {
        let mut store = GameStateStore::new(|index: usize| (index == 7).then(|| open_grid(2, 3)));
        assert!(store.load_level(0).is_err());
        store.load_level(7).unwrap();
        assert_eq!(store.snapshot().cols(), 3);
    }

    #[test]
    fn commands_before_load_do_nothing() {
        let mut store = GameStateStore::new(LevelPack(vec![]));
        let transition = store.dispatch(Command::StartOrStep(at(0, 0))).unwrap();
        assert!(!transition.changed);
        assert!(transition.snapshot.path().is_empty());
    }

    #[test]
    fn step_and_backtrack() {
        let mut store = store_for(open_grid(3, 3));
        draw(&mut store, &[(0, 0), (0, 1), (1, 1)]);

        // second-to-last cell backtracks
        assert!(store.start_or_try_step(Location(0, 1)));
        assert_eq!(path_of(&store), vec![(0, 0), (0, 1)]);

        // not adjacent to the tail
        assert!(!store.start_or_try_step(Location(2, 2)));
        // the tail itself
        assert!(!store.start_or_try_step(Location(0, 1)));
        assert_eq!(path_of(&store), vec![(0, 0), (0, 1)]);
    }

    #[test]
    fn visited_cells_are_not_revisited() {
        let mut store = store_for(open_grid(3, 3));
        draw(&mut store, &[(0, 0), (0, 1), (1, 1), (1, 0)]);

        assert!(!store.start_or_try_step(Location(0, 0)));
        assert_eq!(path_of(&store).len(), 4);
    }

    #[test]
    fn blocked_and_out_of_bounds_targets_are_ignored() {
        let mut store = store_for(Level::from_rows(&[".#", ".."]));

        assert!(!store.start_or_try_step(Location(0, 1)));
        assert!(store.snapshot().path().is_empty());

        draw(&mut store, &[(0, 0)]);
        assert!(!store.start_or_try_step(Location(0, 1)));
        assert!(!store.start_or_try_step(Location(0, 2)));

        let transition = store.dispatch(Command::StartOrStep(at(-1, 0))).unwrap();
        assert!(!transition.changed);
        assert!(!transition.validate);
        assert_eq!(transition.snapshot.path(), &[Location(0, 0)]);
    }

    #[test]
    fn diagonal_steps_need_a_stitch() {
        let mut store = store_for(open_grid(2, 2));
        draw(&mut store, &[(0, 0)]);
        assert!(!store.start_or_try_step(Location(1, 1)));

        let mut store = store_for(open_grid(2, 2).with_stitches(&[(1, 1)]));
        draw(&mut store, &[(0, 0), (1, 1), (0, 1), (1, 0)]);
        assert_eq!(path_of(&store), vec![(0, 0), (1, 1), (0, 1), (1, 0)]);
    }

    #[test]
    fn stitches_tunnel_between_walls() {
        let mut store = store_for(Level::from_rows(&[".#", "#."]).with_stitches(&[(1, 1)]));
        draw(&mut store, &[(1, 1), (0, 0)]);
        assert_eq!(path_of(&store), vec![(1, 1), (0, 0)]);
    }

    #[test]
    fn grow_from_start() {
        let mut store = store_for(open_grid(2, 3));
        draw(&mut store, &[(0, 1), (0, 2)]);

        assert!(store.start_or_try_step_from_start(Location(0, 0)));
        assert_eq!(path_of(&store), vec![(0, 0), (0, 1), (0, 2)]);

        // the second cell backtracks the head
        assert!(store.start_or_try_step_from_start(Location(0, 1)));
        assert_eq!(path_of(&store), vec![(0, 1), (0, 2)]);

        assert!(store.start_or_try_step_from_start(Location(1, 1)));
        assert_eq!(path_of(&store), vec![(1, 1), (0, 1), (0, 2)]);

        // visited, and not the second cell
        assert!(!store.start_or_try_step_from_start(Location(0, 2)));
    }

    #[test]
    fn from_start_on_empty_path_starts_it() {
        let mut store = store_for(open_grid(2, 2));
        assert!(store.start_or_try_step_from_start(Location(1, 0)));
        assert_eq!(path_of(&store), vec![(1, 0)]);
    }

    #[test]
    fn finalize_drops_lone_cells() {
        let mut store = store_for(open_grid(2, 2));
        assert!(!store.finalize_path_after_pointer_up());

        draw(&mut store, &[(0, 0)]);
        assert!(store.finalize_path_after_pointer_up());
        assert!(store.snapshot().path().is_empty());

        draw(&mut store, &[(0, 0), (0, 1)]);
        assert!(!store.finalize_path_after_pointer_up());
        assert_eq!(path_of(&store).len(), 2);
    }

    #[test]
    fn reset_and_reverse() {
        let mut store = store_for(open_grid(2, 2));
        assert!(!store.reset_path());

        draw(&mut store, &[(0, 0)]);
        assert!(!store.reverse_path());

        draw(&mut store, &[(0, 1), (1, 1)]);
        assert!(store.reverse_path());
        assert_eq!(path_of(&store), vec![(1, 1), (0, 1), (0, 0)]);

        assert!(store.reset_path());
        assert!(store.snapshot().visited().is_empty());
    }

    #[test]
    fn move_walls() {
        let mut store = store_for(Level::from_rows(&["m.t", "..#"]));
        draw(&mut store, &[(1, 0), (1, 1)]);

        // onto a hint, a wall, the path, itself, and from a non-movable cell
        assert!(!store.move_wall(Location(0, 0), Location(0, 2)));
        assert!(!store.move_wall(Location(0, 0), Location(1, 2)));
        assert!(!store.move_wall(Location(0, 0), Location(1, 1)));
        assert!(!store.move_wall(Location(0, 0), Location(0, 0)));
        assert!(!store.move_wall(Location(1, 2), Location(0, 1)));

        assert!(store.move_wall(Location(0, 0), Location(0, 1)));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.cell(Location(0, 0)), Some(CellCode::Empty));
        assert_eq!(snapshot.cell(Location(0, 1)), Some(CellCode::MovableWall));
        assert_eq!(snapshot.board().base_cell(Location(0, 0)), Some(CellCode::MovableWall));

        // vacated cells become usable
        assert!(store.start_or_try_step_from_start(Location(0, 0)));
    }

    #[test]
    fn dispatch_reports_transitions() {
        let mut store = GameStateStore::new(LevelPack(vec![open_grid(2, 2)]));

        let load = store.dispatch(Command::LoadLevel { level_index: 0 }).unwrap();
        assert!(load.changed && load.rebuild_grid && load.validate);
        assert_eq!(load.command, "level/load");

        let step = store.dispatch(Command::StartOrStep(at(0, 0))).unwrap();
        assert!(step.changed && step.validate && !step.rebuild_grid);
        assert_eq!(step.command, CommandKind::StartOrStep.to_string());

        let unknown = store.dispatch(Command::Unknown("path/teleport".to_string())).unwrap();
        assert!(!unknown.changed);
        assert_eq!(unknown.command, "path/teleport");
        assert_eq!(unknown.snapshot.path(), &[Location(0, 0)]);

        let moved = store.dispatch(Command::MoveWall { from: at(0, 1), to: at(1, 1) }).unwrap();
        assert!(!moved.changed);
    }

    #[test]
    fn dispatch_json_envelopes() {
        let mut store = GameStateStore::new(LevelPack(vec![open_grid(2, 2)]));
        store.dispatch_json(r#"{"type": "level/load", "payload": {"levelIndex": 0}}"#).unwrap();
        store.dispatch_json(r#"{"type": "path/start-or-step", "payload": {"r": 0, "c": 0}}"#).unwrap();
        store.dispatch_json(r#"{"type": "path/start-or-step", "payload": {"r": 1, "c": 0}}"#).unwrap();
        store.dispatch_json(r#"{"type": "path/start-or-step-from-start", "payload": {"r": 0, "c": 1}}"#).unwrap();
        assert_eq!(path_of(&store), vec![(0, 1), (0, 0), (1, 0)]);

        let reversed = store.dispatch_json(r#"{"type": "path/reverse"}"#).unwrap();
        assert!(reversed.changed);
        assert_eq!(path_of(&store), vec![(1, 0), (0, 0), (0, 1)]);

        let unknown = store.dispatch_json(r#"{"type": "ui/wiggle", "payload": {}}"#).unwrap();
        assert!(!unknown.changed);
        assert_eq!(unknown.command, "ui/wiggle");

        let malformed = store.dispatch_json(r#"{"type": "path/start-or-step", "payload": {"row": 1}}"#).unwrap();
        assert!(!malformed.changed);

        let reset = store.dispatch_json(r#"{"type": "path/reset", "payload": {}}"#).unwrap();
        assert!(reset.changed);
        assert!(reset.snapshot.path().is_empty());
    }

    #[test]
    fn snapshot_indexes_path() {
        let snapshot = snapshot_of(&open_grid(2, 2), &[(1, 1), (1, 0), (0, 0)]);
        assert_eq!(snapshot.index_of(Location(1, 0)), Some(1));
        assert_eq!(snapshot.index_of(Location(0, 1)), None);
        assert_eq!(snapshot.visited().len(), 3);
        assert_eq!(snapshot.total_usable(), 4);
        assert!(!snapshot.is_closed_loop());

        let snapshot = snapshot_of(&open_grid(2, 2), &[(0, 0), (0, 1), (1, 1), (1, 0)]);
        assert!(snapshot.is_closed_loop());
    }

    // ---- restoring saved boards ----

    #[test]
    fn restore_round_trip() {
        let level = Level::from_rows(&["m..", "..."]);
        let mut store = store_for(level.clone());
        assert!(store.move_wall(Location(0, 0), Location(1, 2)));
        draw(&mut store, &[(0, 0), (0, 1), (1, 1)]);
        let saved = store.snapshot().to_saved();
        let raw = saved.to_json().unwrap();

        let mut fresh = store_for(level);
        fresh.restore_mutable_state(&SavedBoardState::from_json(&raw).unwrap()).unwrap();
        assert_eq!(path_of(&fresh), vec![(0, 0), (0, 1), (1, 1)]);
        assert_eq!(fresh.snapshot().cell(Location(1, 2)), Some(CellCode::MovableWall));
        assert_eq!(fresh.snapshot().cell(Location(0, 0)), Some(CellCode::Empty));
    }

    #[test]
    fn restore_accepts_object_pairs_and_omitted_walls() {
        let mut store = store_for(Level::from_rows(&["m..", "..."]));
        let saved = SavedBoardState::from_json(r#"{"path": [{"r": 0, "c": 1}, [0, 2]]}"#).unwrap();
        store.restore_mutable_state(&saved).unwrap();
        assert_eq!(path_of(&store), vec![(0, 1), (0, 2)]);
        assert_eq!(store.snapshot().cell(Location(0, 0)), Some(CellCode::MovableWall));
    }

    #[test]
    fn restore_rejects_bad_paths() {
        let mut store = store_for(Level::from_rows(&["m.#", "..."]));
        draw(&mut store, &[(1, 0), (1, 1)]);

        let cases = [
            (json!({"path": [[0, 1], [0, 3]]}), RestoreError::PathOutOfBounds { index: 1 }),
            (json!({"path": [[-1, 0]]}), RestoreError::PathOutOfBounds { index: 0 }),
            (json!({"path": [[0, 1], [0, 2]]}), RestoreError::PathBlocked(Location(0, 2))),
            (json!({"path": [[0, 0]]}), RestoreError::PathBlocked(Location(0, 0))),
            (json!({"path": [[1, 0], [1, 1], [1, 0]]}), RestoreError::PathDuplicate(Location(1, 0))),
            (json!({"path": [[1, 0], [0, 1]]}), RestoreError::PathNotAdjacent { from: Location(1, 0), to: Location(0, 1) }),
        ];

        for (raw, expected) in cases {
            let saved: SavedBoardState = serde_json::from_value(raw).unwrap();
            assert_eq!(store.restore_mutable_state(&saved), Err(expected));
            // untouched
            assert_eq!(path_of(&store), vec![(1, 0), (1, 1)]);
        }
    }

    #[test]
    fn restore_checks_stitches_of_current_level() {
        let mut store = store_for(open_grid(2, 2));
        let saved = SavedBoardState::from_json(r#"{"path": [[0, 0], [1, 1]]}"#).unwrap();
        assert!(store.restore_mutable_state(&saved).is_err());

        let mut store = store_for(open_grid(2, 2).with_stitches(&[(1, 1)]));
        assert!(store.restore_mutable_state(&saved).is_ok());
    }

    #[test]
    fn restore_rejects_bad_walls() {
        let mut store = store_for(Level::from_rows(&["m.t", "..#"]));

        let count = SavedBoardState::from_json(r#"{"path": [], "movableWalls": []}"#).unwrap();
        assert_eq!(store.restore_mutable_state(&count), Err(RestoreError::MovableWallCount { expected: 1, found: 0 }));

        let count = SavedBoardState::from_json(r#"{"path": [], "movableWalls": [[0, 0], [1, 1]]}"#).unwrap();
        assert!(matches!(store.restore_mutable_state(&count), Err(RestoreError::MovableWallCount { .. })));

        let on_hint = SavedBoardState::from_json(r#"{"path": [], "movableWalls": [[0, 2]]}"#).unwrap();
        assert!(matches!(store.restore_mutable_state(&on_hint), Err(RestoreError::MovableWallPlacement(_))));

        let outside = SavedBoardState::from_json(r#"{"path": [], "movableWalls": [[5, 5]]}"#).unwrap();
        assert!(matches!(store.restore_mutable_state(&outside), Err(RestoreError::MovableWallPlacement(_))));

        let onto_path = SavedBoardState::from_json(r#"{"path": [[1, 0], [1, 1]], "movableWalls": [[1, 1]]}"#).unwrap();
        assert_eq!(store.restore_mutable_state(&onto_path), Err(RestoreError::PathBlocked(Location(1, 1))));

        let twice = Level::from_rows(&["mm.", "..."]);
        let mut store = store_for(twice);
        let duplicate = SavedBoardState::from_json(r#"{"path": [], "movableWalls": [[1, 1], [1, 1]]}"#).unwrap();
        assert_eq!(store.restore_mutable_state(&duplicate), Err(RestoreError::DuplicateMovableWall(Location(1, 1))));
    }

    #[test]
    fn restore_without_level() {
        let mut store = GameStateStore::new(LevelPack(vec![]));
        assert_eq!(store.restore_mutable_state(&SavedBoardState::default()), Err(RestoreError::NoLevel));
        assert!(SavedBoardState::from_json("{\"path\": 3}").is_err());
    }

    // ---- signatures ----

    #[test]
    fn empty_path_has_empty_signature() {
        assert_eq!(signature_of(&open_grid(2, 2), &[]), "");
    }

    #[test]
    fn plain_path_signature() {
        assert_eq!(signature_of(&open_grid(1, 3), &[(0, 0), (0, 1), (0, 2)]), "-|-|-||-");
    }

    #[test]
    fn hint_at_path_end() {
        let level = Level::from_rows(&["t.."]);
        assert_eq!(signature_of(&level, &[(0, 0), (0, 1), (0, 2)]), "t@0,0:END|-|-||-");
        assert_eq!(signature_of(&level, &[(0, 2), (0, 1), (0, 0)]), "t@0,0:END|-|-||-");
    }

    #[test]
    fn hint_records_direction() {
        let level = Level::from_rows(&[".s."]);
        let snapshot = snapshot_of(&level, &[(0, 0), (0, 1), (0, 2)]);
        assert_eq!(constraint_signature(&snapshot, snapshot.path()), "s@0,1:R>R|-|-");
        assert_eq!(canonical_signature(&snapshot), "s@0,1:L>L|-|-||-");
    }

    #[test]
    fn rps_cells_have_bare_tokens() {
        let level = Level::from_rows(&[".g", "p."]);
        let snapshot = snapshot_of(&level, &[(0, 0), (0, 1), (1, 1), (1, 0)]);
        assert_eq!(constraint_signature(&snapshot, snapshot.path()), "g@0,1>p@1,0|-|-");
    }

    #[test]
    fn stitch_slots() {
        let level = open_grid(2, 2).with_stitches(&[(1, 1)]);
        assert_eq!(signature_of(&level, &[(0, 0), (1, 1)]), "-|1,1:A|-||-");
        assert_eq!(signature_of(&level, &[(0, 1), (1, 0)]), "-|1,1:B|-||-");

        let snapshot = snapshot_of(&level, &[(0, 0), (1, 1), (0, 1), (1, 0)]);
        assert_eq!(constraint_signature(&snapshot, snapshot.path()), "-|1,1:A>1,1:B|-");
    }

    #[test]
    fn corner_counts_fire_when_met() {
        let level = open_grid(2, 2).with_corner_counts(&[(1, 1, 2)]);
        assert_eq!(signature_of(&level, &[(0, 0), (0, 1), (1, 1)]), "-|-|1,1:a||-");

        let level = open_grid(2, 2).with_corner_counts(&[(1, 1, 1), (0, 0, 0)]);
        let snapshot = snapshot_of(&level, &[(0, 0), (0, 1), (1, 1)]);
        assert_eq!(constraint_signature(&snapshot, snapshot.path()), "-|-|0,0:0>1,1:8");
        assert_eq!(canonical_signature(&snapshot), "-|-|0,0:0>1,1:2||-");
    }

    #[test]
    fn unmet_corner_counts_stay_silent() {
        let level = open_grid(2, 2).with_corner_counts(&[(1, 1, 4)]);
        assert_eq!(signature_of(&level, &[(0, 0), (0, 1), (1, 1), (1, 0)]), "-|-|-||-");
    }

    #[test]
    fn small_loop_is_rotation_and_reversal_invariant() {
        let level = open_grid(2, 2);
        let loop_sig = signature_of(&level, &[(0, 0), (0, 1), (1, 1), (1, 0)]);
        assert_eq!(loop_sig, signature_of(&level, &[(0, 1), (1, 1), (1, 0), (0, 0)]));
        assert_eq!(loop_sig, signature_of(&level, &[(1, 0), (1, 1), (0, 1), (0, 0)]));
    }

    #[test]
    fn loop_candidates_cover_all_rotations() {
        let snapshot = snapshot_of(&ring_around_pillar(), &RING);
        assert_eq!(candidate_paths(&snapshot).len(), 16);

        let snapshot = snapshot_of(&open_grid(1, 3), &[(0, 0), (0, 1), (0, 2)]);
        assert_eq!(candidate_paths(&snapshot).len(), 2);
    }

    #[test]
    fn ring_rotations_share_a_signature() {
        let level = ring_around_pillar().with_corner_counts(&[(1, 1, 1)]);
        let expected = signature_of(&level, &RING);

        for k in 0..RING.len() {
            let mut rotated = RING.to_vec();
            rotated.rotate_left(k);
            assert_eq!(signature_of(&level, &rotated), expected);
            rotated.reverse();
            assert_eq!(signature_of(&level, &rotated), expected);
        }
    }

    #[test]
    fn hint_directions_distinguish_snake_from_transpose() {
        let level = Level::from_rows(&["...", ".t.", "..."]);
        let rows = [(0, 0), (0, 1), (0, 2), (1, 2), (1, 1), (1, 0), (2, 0), (2, 1), (2, 2)];
        let cols = [(0, 0), (1, 0), (2, 0), (2, 1), (1, 1), (0, 1), (0, 2), (1, 2), (2, 2)];
        assert_ne!(signature_of(&level, &rows), signature_of(&level, &cols));

        let open = open_grid(3, 3);
        assert_eq!(signature_of(&open, &rows), signature_of(&open, &cols));
    }

    #[test]
    fn corner_masks_distinguish_solutions() {
        let level = open_grid(2, 3).with_corner_counts(&[(1, 1, 1)]);
        let around = signature_of(&level, &[(0, 0), (0, 1), (0, 2), (1, 2), (1, 1), (1, 0)]);
        let zigzag = signature_of(&level, &[(0, 0), (1, 0), (1, 1), (0, 1), (0, 2), (1, 2)]);
        assert_eq!(around, "-|-|1,1:1||-");
        assert_eq!(zigzag, "-|-|1,1:2||-");
    }

    // ---- topology ----

    #[test]
    fn islands_ignore_boundary_walls() {
        let level = Level::from_rows(&["#....", ".#...", "..#..", "..m#.", "....."]);
        let board = Board::try_from(&level).unwrap();
        let islands = find_islands(&board.base);
        assert_eq!(islands.len(), 2);
        assert_eq!(islands.iter().map(|island| island.id).collect_vec(), vec![1, 2]);

        let edge = Board::try_from(&Level::from_rows(&["..#..", ".....", "....."])).unwrap();
        assert!(find_islands(&edge.base).is_empty());
    }

    #[test]
    fn winding_side_matters() {
        let level = Level::from_rows(&[".....", ".....", "..#..", ".....", "....."]);
        let right = [(1, 2), (1, 3), (2, 3), (3, 3), (3, 2)];
        let left = [(1, 2), (1, 1), (2, 1), (3, 1), (3, 2)];

        assert_eq!(signature_of(&level, &right), "-|-|-||+1");
        assert_eq!(signature_of(&level, &left), "-|-|-||-");
    }

    #[test]
    fn undone_winding_cancels() {
        let level = Level::from_rows(&[".....", ".....", "..#..", ".....", "....."]);
        let snapshot = snapshot_of(&level, &[(1, 3), (2, 3), (3, 3), (3, 4), (2, 4), (1, 4)]);
        let islands = find_islands(snapshot.grid());
        assert_eq!(topology_signature(&islands, snapshot.path()), "-");
    }

    #[test]
    fn ring_winds_once() {
        let level = ring_around_pillar();
        let snapshot = snapshot_of(&level, &RING);
        let islands = find_islands(snapshot.grid());
        assert_eq!(topology_signature(&islands, snapshot.path()), "+1");
        assert_eq!(canonical_signature(&snapshot), "-|-|-||+1");
    }

    #[test]
    fn side_by_side_islands_unwind() {
        let level = Level::from_rows(&[".......", ".......", ".#.#...", ".......", "......."]);
        let g = |id: usize, positive: bool| Generator { id, positive };

        let u_turn = snapshot_of(&level, &[(1, 4), (2, 4), (3, 4), (3, 5), (2, 5), (1, 5)]);
        let islands = find_islands(u_turn.grid());
        assert_eq!(islands.len(), 2);
        assert_eq!(
            crossing_word(&islands, u_turn.path()),
            vec![g(1, true), g(2, true), g(2, false), g(1, false)],
        );
        assert_eq!(canonical_signature(&u_turn), "-|-|-||-");

        assert_eq!(signature_of(&level, &[(1, 4), (2, 4), (3, 4)]), "-|-|-||+1,+2");
        assert_eq!(signature_of(&level, &[(3, 4), (2, 4), (1, 4)]), "-|-|-||+1,+2");
        assert_eq!(signature_of(&level, &[(1, 2), (2, 2), (3, 2)]), "-|-|-||+1");
    }

    #[test]
    fn ray_crossings() {
        let pillar = Island::from_cells(&[Location(2, 2)]);

        // horizontal, and both ends on the near side of the ray
        assert_eq!(pillar.crossing(Location(2, 3), Location(2, 4)), None);
        assert_eq!(pillar.crossing(Location(1, 3), Location(2, 3)), None);

        // right of the centroid, either way
        assert_eq!(pillar.crossing(Location(2, 3), Location(3, 3)), Some((0, 1)));
        assert_eq!(pillar.crossing(Location(3, 3), Location(2, 3)), Some((1, 1)));
        // left of it
        assert_eq!(pillar.crossing(Location(2, 1), Location(3, 1)), None);
        assert_eq!(pillar.crossing(Location(3, 1), Location(2, 1)), None);
    }

    #[test]
    fn ray_crossings_level_with_centroid() {
        let pillar = Island::from_cells(&[Location(2, 2)]);

        // meets the centroid exactly; the ray lies just below it, so only steps sloping right cross
        assert_eq!(pillar.crossing(Location(1, 1), Location(3, 3)), Some((1, 2)));
        assert_eq!(pillar.crossing(Location(3, 3), Location(1, 1)), Some((1, 2)));
        assert_eq!(pillar.crossing(Location(1, 3), Location(3, 1)), None);
        assert_eq!(pillar.crossing(Location(3, 1), Location(1, 3)), None);

        // vertical through the centroid column
        assert_eq!(pillar.crossing(Location(1, 2), Location(3, 2)), None);
        assert_eq!(pillar.crossing(Location(3, 2), Location(1, 2)), None);
    }

    #[test]
    fn ray_crossings_with_fractional_centroid() {
        // centroid (2, 2.5)
        let bar = Island::from_cells(&[Location(2, 2), Location(2, 3)]);
        assert_eq!(bar.crossing(Location(2, 3), Location(3, 3)), Some((0, 2)));
        assert_eq!(bar.crossing(Location(2, 2), Location(3, 2)), None);

        // centroid (2.5, 2)
        let post = Island::from_cells(&[Location(2, 2), Location(3, 2)]);
        assert_eq!(post.crossing(Location(2, 3), Location(3, 3)), Some((1, 2)));
        assert_eq!(post.crossing(Location(1, 3), Location(2, 3)), None);
    }

    #[test]
    fn free_reduction() {
        let g = |id: usize, positive: bool| Generator { id, positive };
        assert!(free_reduce(&[g(1, true), g(1, false)]).is_empty());
        assert_eq!(free_reduce(&[g(1, true), g(2, true), g(2, false), g(1, false), g(3, true)]), vec![g(3, true)]);
        assert_eq!(free_reduce(&[g(1, true), g(1, true)]), vec![g(1, true), g(1, true)]);
        assert_eq!(free_reduce(&[g(1, true), g(2, false), g(1, false)]).len(), 3);
    }

    #[test]
    fn relabel_by_first_appearance() {
        let g = |id: usize, positive: bool| Generator { id, positive };
        assert_eq!(relabel(&[]), "-");
        assert_eq!(relabel(&[g(5, true), g(3, false), g(5, true)]), "+1,-2,+1");

        let long = (1..=36).map(|id| g(id, true)).collect_vec();
        assert!(relabel(&long).ends_with(",+z,+10"));
    }

    #[test]
    fn step_tokens() {
        assert_eq!(Step::direction_to(Location(1, 1), Location(0, 0)), Some(Step::UpLeft));
        assert_eq!(Step::UpLeft.to_string(), "UL");
        assert_eq!(Step::DownRight.invert(), Step::UpLeft);
        assert_eq!(Step::direction_to(Location(0, 0), Location(0, 2)), None);
        assert!(Step::DownLeft.is_diagonal() && !Step::Down.is_diagonal());
    }

    // ---- scoring ----

    #[test]
    fn nth_distinct_solution_scores_n() {
        let mut scores = ScoreManager::load(MemoryScoreStore::default());

        assert_eq!(scores.register_solved(ScoreMode::Infinite, "4", "a").awarded, 1);
        assert_eq!(scores.register_solved(ScoreMode::Infinite, "4", "b").awarded, 2);
        let third = scores.register_solved(ScoreMode::Infinite, "4", "c");
        assert_eq!(third.awarded, 3);
        assert!(third.is_new);
        assert_eq!(third.level_distinct_count, 3);
        assert_eq!(third.mode_total, 6);
        assert_eq!(third.totals.unwrap().infinite, 6);

        assert_eq!(scores.register_solved(ScoreMode::Infinite, "5", "a").awarded, 1);
        assert_eq!(scores.read_totals().infinite, 7);
        assert_eq!(scores.read_totals().daily, 0);
    }

    #[test]
    fn registering_twice_is_idempotent() {
        let mut scores = ScoreManager::load(MemoryScoreStore::default());
        scores.register_solved(ScoreMode::Daily, "2026-10-17", "sig");

        let again = scores.register_solved(ScoreMode::Daily, " 2026-10-17 ", "sig ");
        assert_eq!(again.awarded, 0);
        assert!(!again.is_new);
        assert_eq!(again.mode_total, 1);
        assert_eq!(again.level_distinct_count, 1);
        assert_eq!(scores.read_distinct_count(ScoreMode::Daily, "2026-10-17"), 1);
    }

    #[test]
    fn blank_registrations_do_nothing() {
        let mut scores = ScoreManager::load(MemoryScoreStore::default());
        let outcome = scores.register_solved(ScoreMode::Infinite, "  ", "sig");
        assert_eq!(outcome.awarded, 0);
        assert!(!outcome.is_new);
        assert_eq!(scores.register_solved(ScoreMode::Infinite, "1", "").awarded, 0);
        assert_eq!(scores.read_score_state(), PersistedScoreState::default());
        assert!(scores.persistence().read().is_none());
    }

    #[test]
    fn ledger_persists_and_reloads() {
        let mut scores = ScoreManager::load(MemoryScoreStore::default());
        scores.register_solved(ScoreMode::Infinite, "0", "zeta");
        scores.register_solved(ScoreMode::Infinite, "0", "alpha");
        scores.register_solved(ScoreMode::Daily, "2026-10-17", "x");

        let raw = scores.persistence().read().unwrap();
        let written: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(written, json!({
            "infiniteTotal": 3,
            "dailyTotal": 1,
            "infiniteByLevel": {"0": ["alpha", "zeta"]},
            "dailyByDate": {"2026-10-17": ["x"]},
        }));

        let mut reloaded = ScoreManager::load(MemoryScoreStore::with_contents(raw));
        assert_eq!(reloaded.read_score_state(), scores.read_score_state());
        assert!(!reloaded.register_solved(ScoreMode::Infinite, "0", "alpha").is_new);
        assert_eq!(reloaded.register_solved(ScoreMode::Infinite, "0", "beta").awarded, 3);
    }

    #[test]
    fn normalize_tolerates_garbage() {
        assert_eq!(normalize_score_state(&json!(null)), PersistedScoreState::default());
        assert_eq!(normalize_score_state(&json!([1, 2, 3])), PersistedScoreState::default());
        assert_eq!(normalize_score_state(&json!("oops")), PersistedScoreState::default());

        let state = normalize_score_state(&json!({
            "infiniteTotal": -4,
            "dailyTotal": "7.9",
            "infiniteByLevel": {
                " 3 ": [" b ", "a", "b", "", 12, null],
                "4": "not a list",
                "5": [],
                "  ": ["orphan"],
            },
            "dailyByDate": 17,
        }));
        assert_eq!(state.infinite_total, 0);
        assert_eq!(state.daily_total, 7);
        assert_eq!(state.infinite_by_level.len(), 1);
        assert_eq!(state.infinite_by_level["3"], vec!["a".to_string(), "b".to_string()]);
        assert!(state.daily_by_date.is_empty());

        assert_eq!(normalize_score_state(&json!({"infiniteTotal": 12.5})).infinite_total, 12);
    }

    #[test]
    fn normalize_merges_keys_equal_after_trimming() {
        let state = normalize_score_state(&json!({
            "infiniteByLevel": {"1": ["a"], " 1": ["b", "a"], "1 ": "junk"},
        }));
        assert_eq!(state.infinite_by_level.len(), 1);
        assert_eq!(state.infinite_by_level["1"], vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn normalize_keeps_large_totals_exact() {
        let state = normalize_score_state(&json!({
            "infiniteTotal": 9_007_199_254_740_993u64,
            "dailyTotal": "18446744073709551615",
        }));
        assert_eq!(state.infinite_total, 9_007_199_254_740_993);
        assert_eq!(state.daily_total, u64::MAX);
    }

    #[test]
    fn unreadable_persisted_ledger_starts_empty() {
        let scores = ScoreManager::load(MemoryScoreStore::with_contents("{not json"));
        assert_eq!(scores.read_score_state(), PersistedScoreState::default());
    }

    #[test]
    fn score_modes_parse() {
        assert_eq!("daily".parse::<ScoreMode>().unwrap(), ScoreMode::Daily);
        assert_eq!(ScoreMode::Infinite.to_string(), "infinite");
        assert!("weekly".parse::<ScoreMode>().is_err());
    }

    // ---- sessions ----

    fn session_for(level: Level) -> PuzzleSession<LevelPack, CoverageEvaluator, MemoryBoardStore> {
        PuzzleSession::new(
            GameStateStore::new(LevelPack(vec![level])),
            CoverageEvaluator,
            MemoryBoardStore::default(),
            ScoreMode::Infinite,
        )
    }

    #[test]
    fn session_scores_distinct_solutions_once() {
        let mut scores = ScoreManager::load(MemoryScoreStore::default());
        let mut session = session_for(open_grid(1, 3));
        session.dispatch(Command::LoadLevel { level_index: 0 }, &mut scores).unwrap();

        let first = session.dispatch(Command::StartOrStep(at(0, 0)), &mut scores).unwrap();
        assert_eq!(first.completion.unwrap().kind, None);
        session.dispatch(Command::StartOrStep(at(0, 1)), &mut scores).unwrap();
        let done = session.dispatch(Command::StartOrStep(at(0, 2)), &mut scores).unwrap();
        assert_eq!(done.completion.unwrap().kind, Some(CompletionKind::Good));
        assert_eq!(done.signature.as_deref(), Some("-|-|-||-"));
        assert_eq!(done.outcome.unwrap().awarded, 1);

        session.dispatch(Command::ResetPath, &mut scores).unwrap();
        for c in [2, 1, 0] {
            session.dispatch(Command::StartOrStep(at(0, c)), &mut scores).unwrap();
        }
        assert_eq!(scores.read_distinct_count(ScoreMode::Infinite, "0"), 1);
        assert_eq!(scores.read_totals().infinite, 1);

        let ignored = session.dispatch(Command::StartOrStep(at(0, 2)), &mut scores).unwrap();
        assert!(ignored.evaluation.is_none());
    }

    #[test]
    fn daily_sessions_use_the_date_key() {
        let mut scores = ScoreManager::load(MemoryScoreStore::default());
        let mut session = PuzzleSession::new(
            GameStateStore::new(LevelPack(vec![open_grid(1, 2)])),
            CoverageEvaluator,
            MemoryBoardStore::default(),
            ScoreMode::Daily,
        ).with_date_key("2026-10-17");
        session.dispatch(Command::LoadLevel { level_index: 0 }, &mut scores).unwrap();
        session.dispatch(Command::StartOrStep(at(0, 0)), &mut scores).unwrap();
        session.dispatch(Command::StartOrStep(at(0, 1)), &mut scores).unwrap();

        assert_eq!(scores.read_distinct_count(ScoreMode::Daily, "2026-10-17"), 1);
        assert_eq!(scores.read_totals().infinite, 0);
    }

    #[test]
    fn daily_sessions_without_a_date_credit_nothing() {
        let mut scores = ScoreManager::load(MemoryScoreStore::default());
        let mut session = PuzzleSession::new(
            GameStateStore::new(LevelPack(vec![open_grid(1, 2)])),
            CoverageEvaluator,
            MemoryBoardStore::default(),
            ScoreMode::Daily,
        );
        assert_eq!(session.level_key(), None);

        session.dispatch(Command::LoadLevel { level_index: 0 }, &mut scores).unwrap();
        session.dispatch(Command::StartOrStep(at(0, 0)), &mut scores).unwrap();
        let done = session.dispatch(Command::StartOrStep(at(0, 1)), &mut scores).unwrap();

        assert_eq!(done.completion.unwrap().kind, Some(CompletionKind::Good));
        assert!(done.signature.is_some());
        assert!(done.outcome.is_none());
        assert_eq!(scores.read_score_state(), PersistedScoreState::default());
    }

    #[test]
    fn session_saves_and_restores_boards() {
        let mut scores = ScoreManager::load(MemoryScoreStore::default());
        let mut session = session_for(open_grid(2, 2));
        session.dispatch(Command::LoadLevel { level_index: 0 }, &mut scores).unwrap();
        session.dispatch(Command::StartOrStep(at(1, 1)), &mut scores).unwrap();
        session.dispatch(Command::StartOrStep(at(1, 0)), &mut scores).unwrap();

        let boards = session.boards().clone();
        assert!(boards.load(0).is_some());

        let mut resumed = PuzzleSession::new(
            GameStateStore::new(LevelPack(vec![open_grid(2, 2)])),
            CoverageEvaluator,
            boards,
            ScoreMode::Infinite,
        );
        assert_eq!(resumed.restore_or_load(0), Ok(true));
        assert_eq!(resumed.store().snapshot().path(), &[Location(1, 1), Location(1, 0)]);

        let mut corrupt = MemoryBoardStore::default();
        corrupt.save(0, "{\"path\": [[0, 0], [1, 1]]}").unwrap();
        let mut fallback = PuzzleSession::new(
            GameStateStore::new(LevelPack(vec![open_grid(2, 2)])),
            CoverageEvaluator,
            corrupt,
            ScoreMode::Infinite,
        );
        assert_eq!(fallback.restore_or_load(0), Ok(false));
        assert!(fallback.store().snapshot().path().is_empty());
        assert!(fallback.restore_or_load(1).is_err());
    }

    // ---- properties ----

    fn arena() -> Level {
        Level::from_rows(&["t.m.", ".#..", "..g.", "s..."])
            .with_stitches(&[(2, 2), (1, 3)])
            .with_corner_counts(&[(2, 2, 2), (0, 0, 0), (3, 1, 1)])
    }

    fn arb_cell() -> impl Strategy<Value = CellRef> {
        (-1i64..5, -1i64..5).prop_map(|(r, c)| CellRef::Object { r, c })
    }

    fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            6 => arb_cell().prop_map(Command::StartOrStep),
            3 => arb_cell().prop_map(Command::StartOrStepFromStart),
            1 => Just(Command::FinalizeAfterPointer),
            1 => Just(Command::ResetPath),
            1 => Just(Command::ReversePath),
            2 => (arb_cell(), arb_cell()).prop_map(|(from, to)| Command::MoveWall { from, to }),
        ]
    }

    fn assert_legal(snapshot: &Snapshot) {
        let path = snapshot.path();
        assert_eq!(path.iter().unique().count(), path.len());
        assert!(path.len() <= snapshot.total_usable());
        assert!(path.iter().all(|loc| snapshot.cell(*loc).is_some_and(|code| code.is_usable())));
        assert!(path.iter().tuple_windows().all(|(a, b)| snapshot.board().adjacent(*a, *b)));
        assert_eq!(snapshot.visited(), &path.iter().copied().collect::<HashSet<_>>());
        assert_eq!(snapshot.grid().iter().filter(|code| **code == CellCode::MovableWall).count(), 1);
    }

    proptest! {
        #[test]
        fn path_stays_legal(commands in prop::collection::vec(arb_command(), 0..80)) {
            let mut store = store_for(arena());
            for command in commands {
                let transition = store.dispatch(command).unwrap();
                assert_legal(&transition.snapshot);
            }
        }

        #[test]
        fn signature_survives_reversal(commands in prop::collection::vec(arb_command(), 0..80)) {
            let mut store = store_for(arena());
            for command in commands {
                store.dispatch(command).unwrap();
            }

            let before = canonical_signature(&store.snapshot());
            store.reverse_path();
            prop_assert_eq!(before, canonical_signature(&store.snapshot()));
        }

        #[test]
        fn saved_boards_restore_exactly(commands in prop::collection::vec(arb_command(), 0..80)) {
            let mut store = store_for(arena());
            for command in commands {
                store.dispatch(command).unwrap();
            }

            let snapshot = store.snapshot();
            let mut fresh = store_for(arena());
            prop_assert!(fresh.restore_mutable_state(&snapshot.to_saved()).is_ok());
            let restored = fresh.snapshot();
            prop_assert_eq!(restored.path(), snapshot.path());
            prop_assert_eq!(restored.grid(), snapshot.grid());
        }
    }
}
