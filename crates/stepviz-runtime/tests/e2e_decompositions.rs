#![forbid(unsafe_code)]

//! End-to-end tests driving decompositions through [`Workspace`].
//!
//! Validates:
//! - Array insert issues its moves from the tail down
//! - Deleting the last cell is a single resize
//! - Tree init wires heap positions to parents
//! - Step-by-step playback exposes the next step before it runs
//! - Only one composite is staged across structures
//! - Restaging a structure mid-playback builds from the rolled-back state

use stepviz_runtime::policy_config::CapacityMode;
use stepviz_runtime::{
    Action, Affected, CommandError, EngineConfig, Intent, Mode, Phase, RestagePolicy, Side,
    StepReport, StructureKind, Submitted, Workspace,
};

const ARRAY: StructureKind = StructureKind::Array;
const STACK: StructureKind = StructureKind::Stack;
const TREE: StructureKind = StructureKind::BinaryTree;

fn immediate(ws: &mut Workspace, kind: StructureKind, action: Action) {
    ws.submit(Intent::new(kind, action).with_mode(Mode::Immediate))
        .unwrap();
}

fn staged(ws: &mut Workspace, kind: StructureKind, action: Action) -> usize {
    match ws.submit(Intent::new(kind, action).with_mode(Mode::Step)).unwrap() {
        Submitted::Staged { total, .. } => total,
        other => panic!("expected a staged composite, got {other:?}"),
    }
}

fn next_description(ws: &Workspace) -> Option<String> {
    ws.view()
        .and_then(|(_, view)| view.next)
        .map(|step| step.description)
}

fn array_with(values: &[i64]) -> Workspace {
    let mut ws = Workspace::default();
    immediate(
        &mut ws,
        ARRAY,
        Action::Init {
            values: values.to_vec(),
        },
    );
    ws
}

// ============================================================================
// Array insert order
// ============================================================================

#[test]
fn insert_moves_run_from_the_tail_down() {
    let mut ws = array_with(&[1, 2, 3, 4]);
    let total = staged(&mut ws, ARRAY, Action::Insert { index: 2, value: 99 });
    assert_eq!(total, 3);
    ws.start().unwrap();

    let mut seen = Vec::new();
    let mut states = Vec::new();
    loop {
        seen.push(next_description(&ws).unwrap());
        let (_, report) = ws.step().unwrap();
        states.push(ws.contents(ARRAY));
        if matches!(report, StepReport::Committed { .. }) {
            break;
        }
    }

    assert_eq!(
        seen,
        vec!["Move [3] -> [4]", "Move [2] -> [3]", "Write 99 at [2]"]
    );
    assert_eq!(
        states,
        vec![
            vec![1, 2, 3, 4, 4],
            vec![1, 2, 3, 3, 4],
            vec![1, 2, 99, 3, 4],
        ]
    );
    assert_eq!(ws.undo(), Some(Ok("Insert 99 at index 2".into())));
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 3, 4]);
}

#[test]
fn insert_highlights_the_cells_each_move_touches() {
    let mut ws = array_with(&[1, 2, 3, 4]);
    staged(&mut ws, ARRAY, Action::Insert { index: 2, value: 99 });
    ws.start().unwrap();
    let (_, view) = ws.view().unwrap();
    assert_eq!(view.phase, Phase::Visualizing);
    assert_eq!(view.next.unwrap().affected, Affected::Indices(vec![3, 4]));
    ws.step().unwrap();
    let (_, view) = ws.view().unwrap();
    assert_eq!(view.last.unwrap().affected, Affected::Indices(vec![3, 4]));
    assert_eq!(view.next.unwrap().affected, Affected::Indices(vec![2, 3]));
}

#[test]
fn insert_at_end_is_a_single_write() {
    let mut ws = array_with(&[1, 2]);
    let total = staged(&mut ws, ARRAY, Action::Insert { index: 2, value: 5 });
    assert_eq!(total, 1);
    assert_eq!(next_description(&ws).as_deref(), Some("Write 5 at [2]"));
    ws.execute_all().unwrap();
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 5]);
}

#[test]
fn insert_past_the_end_is_rejected() {
    let mut ws = array_with(&[1, 2]);
    let err = ws
        .submit(Intent::new(ARRAY, Action::Insert { index: 5, value: 0 }))
        .unwrap_err();
    assert_eq!(
        err,
        CommandError::PositionOutOfBounds {
            position: 5,
            length: 2
        }
    );
    assert_eq!(ws.staged_structure(), None);
}

#[test]
fn insert_into_full_fixed_array_is_rejected() {
    let mut config = EngineConfig::default();
    config.array.capacity = CapacityMode::Fixed;
    config.array.fixed_capacity = 3;
    let mut ws = Workspace::new(config);
    immediate(
        &mut ws,
        ARRAY,
        Action::Init {
            values: vec![1, 2, 3],
        },
    );
    let err = ws
        .submit(Intent::new(ARRAY, Action::Insert { index: 0, value: 0 }))
        .unwrap_err();
    assert_eq!(err, CommandError::CapacityExceeded { capacity: 3 });
}

// ============================================================================
// Array delete boundary
// ============================================================================

#[test]
fn delete_last_index_is_one_resize() {
    let mut ws = array_with(&[1, 2, 3, 4]);
    let total = staged(&mut ws, ARRAY, Action::Delete { index: 3 });
    assert_eq!(total, 1);
    assert_eq!(next_description(&ws).as_deref(), Some("Resize to 3"));
    ws.execute_all().unwrap();
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 3]);
    assert_eq!(ws.undo(), Some(Ok("Delete 4 at index 3".into())));
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 3, 4]);
}

#[test]
fn delete_first_index_shifts_every_cell_left() {
    let mut ws = array_with(&[1, 2, 3, 4]);
    let total = staged(&mut ws, ARRAY, Action::Delete { index: 0 });
    assert_eq!(total, 4);
    ws.execute_all().unwrap();
    assert_eq!(ws.contents(ARRAY), vec![2, 3, 4]);
    let record = ws.records(ARRAY).last().unwrap();
    assert_eq!(record.steps, 4);
}

// ============================================================================
// Sort
// ============================================================================

#[test]
fn sort_step_count_matches_swaps() {
    let mut ws = array_with(&[3, 1, 2]);
    let total = staged(&mut ws, ARRAY, Action::Sort);
    assert_eq!(total, 2);
    let (_, view) = ws.view().unwrap();
    assert_eq!(view.description, "Bubble sort (2 swaps)");
    ws.execute_all().unwrap();
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 3]);
}

#[test]
fn sorting_a_sorted_array_stages_nothing() {
    let mut ws = array_with(&[1, 2, 3]);
    let err = ws.submit(Intent::new(ARRAY, Action::Sort)).unwrap_err();
    assert!(matches!(err, CommandError::EmptyOperation(_)));
    assert_eq!(ws.staged_structure(), None);
}

// ============================================================================
// Tree init
// ============================================================================

#[test]
fn tree_init_attaches_by_heap_position() {
    let mut ws = Workspace::default();
    immediate(
        &mut ws,
        TREE,
        Action::Init {
            values: vec![10, 5, 15, 3, 7, 12, 20],
        },
    );
    let tree = ws.tree().container();
    assert_eq!(tree.shape(), "10(5(3,7),15(12,20))");

    let value = |id| tree.node(id).map(|n| n.value);
    let root = tree.root().unwrap();
    let left = tree.child(root, Side::Left).unwrap();
    let right = tree.child(root, Side::Right).unwrap();
    assert_eq!(value(left), Some(5));
    assert_eq!(value(right), Some(15));
    assert_eq!(tree.child(left, Side::Left).and_then(value), Some(3));
    assert_eq!(tree.child(left, Side::Right).and_then(value), Some(7));
    assert_eq!(tree.child(right, Side::Left).and_then(value), Some(12));
    assert_eq!(tree.child(right, Side::Right).and_then(value), Some(20));
    assert_eq!(tree.node(left).unwrap().parent, Some(root));
}

#[test]
fn tree_init_keeps_null_slot_positions() {
    let mut ws = Workspace::default();
    immediate(
        &mut ws,
        TREE,
        Action::InitTree {
            slots: vec![Some(1), None, Some(3), None, None, Some(6)],
        },
    );
    assert_eq!(ws.tree().container().shape(), "1(_,3(6))");
    assert_eq!(ws.contents(TREE), vec![1, 3, 6]);
}

#[test]
fn tree_init_rejects_orphan_values() {
    let mut ws = Workspace::default();
    let err = ws
        .submit(Intent::new(
            TREE,
            Action::InitTree {
                slots: vec![Some(1), None, Some(3), Some(4)],
            },
        ))
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidInput(_)));
    assert_eq!(ws.tree().container().shape(), "()");
}

#[test]
fn tree_init_steps_stage_then_connect_each_node() {
    let mut ws = Workspace::default();
    let total = staged(
        &mut ws,
        TREE,
        Action::Init {
            values: vec![1, 2],
        },
    );
    assert_eq!(total, 4);
    ws.start().unwrap();
    ws.step().unwrap();
    let staged_node = ws.tree().container().staged();
    assert!(staged_node.is_some());
    ws.step().unwrap();
    assert_eq!(ws.tree().container().root(), staged_node);
    assert_eq!(ws.tree().container().staged(), None);
    ws.step().unwrap();
    assert!(ws.tree().container().staged().is_some());
    let (_, report) = ws.step().unwrap();
    assert!(matches!(report, StepReport::Committed { .. }));
    assert_eq!(ws.tree().container().staged(), None);
    assert_eq!(ws.tree().container().shape(), "1(2)");
}

#[test]
fn tree_rejects_array_actions() {
    let mut ws = Workspace::default();
    let err = ws.submit(Intent::new(TREE, Action::Sort)).unwrap_err();
    assert!(matches!(err, CommandError::Unsupported { .. }));
}

// ============================================================================
// Stack composites
// ============================================================================

#[test]
fn stack_reverse_pops_then_pushes() {
    let mut ws = Workspace::default();
    immediate(
        &mut ws,
        STACK,
        Action::Init {
            values: vec![1, 2, 3],
        },
    );
    let total = staged(&mut ws, STACK, Action::Reverse);
    assert_eq!(total, 6);
    ws.execute_all().unwrap();
    assert_eq!(ws.contents(STACK), vec![3, 2, 1]);
    ws.undo().unwrap().unwrap();
    assert_eq!(ws.contents(STACK), vec![1, 2, 3]);
}

#[test]
fn pop_on_empty_stack_is_rejected() {
    let mut ws = Workspace::default();
    let err = ws.submit(Intent::new(STACK, Action::Pop)).unwrap_err();
    assert!(matches!(err, CommandError::InvalidInput(_)));
}

// ============================================================================
// One staged composite across structures
// ============================================================================

#[test]
fn staging_elsewhere_rolls_back_partial_progress() {
    let mut ws = array_with(&[1, 2, 3, 4]);
    staged(&mut ws, ARRAY, Action::Insert { index: 0, value: 9 });
    ws.start().unwrap();
    ws.step().unwrap();
    ws.step().unwrap();
    assert_ne!(ws.contents(ARRAY), vec![1, 2, 3, 4]);

    staged(&mut ws, STACK, Action::Push { value: 7 });
    assert_eq!(ws.staged_structure(), Some(STACK));
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 3, 4]);
    assert_eq!(ws.active(), STACK);
}

#[test]
fn restaging_same_structure_builds_from_rolled_back_state() {
    let mut ws = array_with(&[1, 2, 3]);
    staged(&mut ws, ARRAY, Action::Insert { index: 1, value: 9 });
    ws.start().unwrap();
    ws.step().unwrap();
    ws.step().unwrap();
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 2, 3]);

    immediate(&mut ws, ARRAY, Action::Delete { index: 1 });
    assert_eq!(ws.contents(ARRAY), vec![1, 3]);
    assert_eq!(ws.staged_structure(), None);

    let last = ws.records(ARRAY).last().unwrap();
    assert_eq!(last.description, "Delete 2 at index 1");
    assert_eq!(ws.undo().unwrap().unwrap(), "Delete 2 at index 1");
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 3]);
}

#[test]
fn restaging_same_stack_mid_reverse_pops_original_top() {
    let mut ws = Workspace::default();
    immediate(
        &mut ws,
        STACK,
        Action::Init {
            values: vec![1, 2, 3],
        },
    );
    staged(&mut ws, STACK, Action::Reverse);
    ws.start().unwrap();
    ws.step().unwrap();
    ws.step().unwrap();
    assert_eq!(ws.contents(STACK), vec![1]);

    staged(&mut ws, STACK, Action::Pop);
    assert_eq!(ws.contents(STACK), vec![1, 2, 3]);
    ws.execute_all().unwrap();
    assert_eq!(ws.contents(STACK), vec![1, 2]);
}

#[test]
fn rejected_restage_on_same_structure_keeps_partial_progress() {
    let mut ws = array_with(&[1, 2, 3]);
    staged(&mut ws, ARRAY, Action::Insert { index: 1, value: 9 });
    ws.start().unwrap();
    ws.step().unwrap();

    assert!(ws.submit(Intent::new(ARRAY, Action::Delete { index: 3 })).is_err());
    assert_eq!(ws.staged_structure(), Some(ARRAY));
    assert_eq!(ws.contents(ARRAY), vec![1, 2, 3, 3]);
    let (_, view) = ws.view().unwrap();
    assert_eq!(view.cursor, 1);
}

#[test]
fn forbid_policy_keeps_partial_composite() {
    let mut config = EngineConfig::default();
    config.staging.restage = RestagePolicy::Forbid;
    let mut ws = Workspace::new(config);
    immediate(
        &mut ws,
        ARRAY,
        Action::Init {
            values: vec![1, 2],
        },
    );
    staged(&mut ws, ARRAY, Action::Insert { index: 0, value: 9 });
    ws.start().unwrap();
    ws.step().unwrap();

    let err = ws
        .submit(Intent::new(STACK, Action::Push { value: 7 }))
        .unwrap_err();
    assert!(matches!(err, CommandError::StagingBusy(_)));
    assert_eq!(ws.staged_structure(), Some(ARRAY));
    assert_eq!(ws.active(), ARRAY);
}

#[test]
fn rejected_request_keeps_existing_stage() {
    let mut ws = array_with(&[1, 2]);
    staged(&mut ws, ARRAY, Action::Insert { index: 0, value: 9 });
    assert!(ws.submit(Intent::new(STACK, Action::Pop)).is_err());
    assert_eq!(ws.staged_structure(), Some(ARRAY));
}

#[test]
fn empty_composite_elsewhere_keeps_existing_stage() {
    let mut ws = array_with(&[1, 2]);
    staged(&mut ws, STACK, Action::Push { value: 3 });
    let err = ws.submit(Intent::new(ARRAY, Action::Sort)).unwrap_err();
    assert!(matches!(err, CommandError::EmptyOperation(_)));
    assert_eq!(ws.staged_structure(), Some(STACK));
}

#[test]
fn undo_is_refused_while_staged_then_allowed_after_cancel() {
    let mut ws = array_with(&[1, 2]);
    staged(&mut ws, ARRAY, Action::Delete { index: 0 });
    assert!(matches!(ws.undo(), Some(Err(CommandError::StagingBusy(_)))));
    ws.cancel().unwrap();
    assert_eq!(ws.contents(ARRAY), vec![1, 2]);
    assert!(ws.undo().unwrap().is_ok());
    assert!(ws.contents(ARRAY).is_empty());
}

#[test]
fn cancel_after_start_is_refused() {
    let mut ws = array_with(&[1, 2]);
    staged(&mut ws, ARRAY, Action::Delete { index: 0 });
    ws.start().unwrap();
    assert!(ws.cancel().is_err());
    ws.execute_all().unwrap_err();
}

#[test]
fn undo_follows_the_active_structure() {
    let mut ws = array_with(&[1]);
    immediate(&mut ws, STACK, Action::Push { value: 5 });
    assert_eq!(ws.active(), STACK);
    assert_eq!(ws.undo(), Some(Ok("Push 5".into())));
    assert!(ws.undo().is_none());

    ws.set_active(ARRAY);
    assert!(ws.undo().unwrap().is_ok());
    assert!(ws.contents(ARRAY).is_empty());
    assert_eq!(ws.redo().map(|r| r.is_ok()), Some(true));
    assert_eq!(ws.contents(ARRAY), vec![1]);
}

#[test]
fn reinit_clears_previous_history() {
    let mut ws = array_with(&[1, 2]);
    immediate(&mut ws, ARRAY, Action::Insert { index: 0, value: 0 });
    immediate(
        &mut ws,
        ARRAY,
        Action::Init {
            values: vec![7, 8, 9],
        },
    );
    assert_eq!(ws.records(ARRAY).len(), 1);
    assert!(ws.undo().unwrap().is_ok());
    assert!(ws.contents(ARRAY).is_empty());
    assert!(ws.undo().is_none());
}
