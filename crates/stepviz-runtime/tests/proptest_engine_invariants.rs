#![forbid(unsafe_code)]

//! Property tests for engine invariants.
//!
//! Validates:
//! - Executing then undoing any composite restores the container exactly.
//! - N commits followed by N undos return to the starting state.
//! - A new commit empties the redo stack.
//! - Stepping through a composite matches running it in one call.
//! - Pop after a push sequence returns the last pushed value.
//! - Under any interleaving of staging, stepping and restaging, containers
//!   match a plain model that applies committed actions only.

use proptest::prelude::*;

use stepviz_runtime::ops::{ArrayOp, StackOp, array, stack, tree};
use stepviz_runtime::policy_config::CapacityMode;
use stepviz_runtime::{
    Action, ArrayCapacity, ArrayStructure, BinaryTree, Container, EngineConfig, HistoryConfig,
    Intent, Mode, RestagePolicy, Session, StackStructure, StepReport, StructureKind, Submitted,
    UserOperation, Workspace,
};

// ============================================================================
// Strategy helpers
// ============================================================================

/// Array requests a user can make.
#[derive(Debug, Clone)]
enum ArrayReq {
    Insert(usize, i64),
    Delete(usize),
    Sort,
}

fn array_req_strategy() -> impl Strategy<Value = ArrayReq> {
    prop_oneof![
        3 => (0usize..12, -50i64..50).prop_map(|(i, v)| ArrayReq::Insert(i, v)),
        2 => (0usize..12).prop_map(ArrayReq::Delete),
        1 => Just(ArrayReq::Sort),
    ]
}

/// Stack requests a user can make.
#[derive(Debug, Clone)]
enum StackReq {
    Push(i64),
    Pop,
    Clear,
    Reverse,
}

fn stack_req_strategy() -> impl Strategy<Value = StackReq> {
    prop_oneof![
        4 => (-50i64..50).prop_map(StackReq::Push),
        2 => Just(StackReq::Pop),
        1 => Just(StackReq::Clear),
        1 => Just(StackReq::Reverse),
    ]
}

fn capacity_strategy() -> impl Strategy<Value = ArrayCapacity> {
    prop_oneof![
        Just(ArrayCapacity::Growable),
        (4usize..20).prop_map(ArrayCapacity::Fixed),
    ]
}

/// Build the composite for `req`, or `None` when the request is invalid
/// for the current contents.
fn build_array(arr: &ArrayStructure, req: &ArrayReq) -> Option<UserOperation<ArrayOp>> {
    let op = match req {
        ArrayReq::Insert(i, v) => array::insert(arr, *i, *v),
        ArrayReq::Delete(i) => array::delete(arr, *i),
        ArrayReq::Sort => array::sort(arr),
    };
    op.ok().filter(|op| !op.is_empty())
}

fn build_stack(st: &StackStructure, req: &StackReq) -> Option<UserOperation<StackOp>> {
    let op = match req {
        StackReq::Push(v) => stack::push(st, *v),
        StackReq::Pop => stack::pop(st),
        StackReq::Clear => stack::clear(st),
        StackReq::Reverse => stack::reverse(st),
    };
    op.ok().filter(|op| !op.is_empty())
}

fn array_session(capacity: ArrayCapacity, values: &[i64]) -> Session<ArrayOp> {
    Session::new(
        ArrayStructure::from_values(capacity, values),
        HistoryConfig::unlimited(),
        RestagePolicy::Rollback,
    )
}

fn stack_session(values: &[i64]) -> Session<StackOp> {
    Session::new(
        StackStructure::from_values(None, values),
        HistoryConfig::unlimited(),
        RestagePolicy::Rollback,
    )
}

// ============================================================================
// Invariant 1: execute then undo is the identity, for every composite kind
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn array_composite_round_trips(
        capacity in capacity_strategy(),
        values in prop::collection::vec(-50i64..50, 0..4),
        req in array_req_strategy(),
    ) {
        let mut arr = ArrayStructure::from_values(capacity, &values);
        let before = arr.clone();
        if let Some(mut op) = build_array(&arr, &req) {
            op.execute_all(&mut arr).unwrap();
            op.undo_all(&mut arr).unwrap();
            prop_assert_eq!(arr, before);
        }
    }

    #[test]
    fn array_init_round_trips(
        capacity in capacity_strategy(),
        values in prop::collection::vec(-50i64..50, 1..4),
    ) {
        let mut arr = ArrayStructure::new(capacity);
        let mut op = array::init(&arr, &values).unwrap();
        op.execute_all(&mut arr).unwrap();
        prop_assert_eq!(arr.contents(), values);
        op.undo_all(&mut arr).unwrap();
        prop_assert!(arr.is_empty());
    }

    #[test]
    fn stack_composite_round_trips(
        values in prop::collection::vec(-50i64..50, 0..8),
        req in stack_req_strategy(),
    ) {
        let mut st = StackStructure::from_values(None, &values);
        let before = st.clone();
        if let Some(mut op) = build_stack(&st, &req) {
            op.execute_all(&mut st).unwrap();
            op.undo_all(&mut st).unwrap();
            prop_assert_eq!(st, before);
        }
    }

    #[test]
    fn tree_init_round_trips(values in prop::collection::vec(-50i64..50, 1..16)) {
        let slots: Vec<Option<i64>> = values.iter().copied().map(Some).collect();
        let mut t = BinaryTree::new();
        let mut op = tree::init(&t, &slots).unwrap();
        op.execute_all(&mut t).unwrap();
        prop_assert_eq!(t.contents(), values);
        prop_assert_eq!(t.staged(), None);
        op.undo_all(&mut t).unwrap();
        prop_assert_eq!(t, BinaryTree::new());
    }
}

// ============================================================================
// Invariant 2: N commits then N undos restore the starting state
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn array_history_is_lifo(
        values in prop::collection::vec(-50i64..50, 0..5),
        reqs in prop::collection::vec(array_req_strategy(), 1..20),
    ) {
        let mut s = array_session(ArrayCapacity::Growable, &values);
        let before = s.container().clone();
        let mut commits = 0usize;
        for req in &reqs {
            if let Some(op) = build_array(s.container(), req) {
                s.stage(op).unwrap();
                s.execute_all().unwrap();
                commits += 1;
            }
        }
        prop_assert_eq!(s.history().undo_depth(), commits);
        for _ in 0..commits {
            prop_assert!(s.undo().unwrap().is_ok());
        }
        prop_assert!(s.undo().is_none());
        prop_assert_eq!(s.container(), &before);
    }

    #[test]
    fn stack_history_is_lifo(
        values in prop::collection::vec(-50i64..50, 0..5),
        reqs in prop::collection::vec(stack_req_strategy(), 1..20),
    ) {
        let mut s = stack_session(&values);
        let before = s.container().clone();
        let mut commits = 0usize;
        for req in &reqs {
            if let Some(op) = build_stack(s.container(), req) {
                s.stage(op).unwrap();
                s.execute_all().unwrap();
                commits += 1;
            }
        }
        for _ in 0..commits {
            prop_assert!(s.undo().unwrap().is_ok());
        }
        prop_assert_eq!(s.container(), &before);
    }

    #[test]
    fn redo_replays_everything_undone(
        reqs in prop::collection::vec(stack_req_strategy(), 1..15),
        undo_count in 0usize..15,
    ) {
        let mut s = stack_session(&[1, 2, 3]);
        for req in &reqs {
            if let Some(op) = build_stack(s.container(), req) {
                s.stage(op).unwrap();
                s.execute_all().unwrap();
            }
        }
        let after = s.container().clone();
        let undone = undo_count.min(s.history().undo_depth());
        for _ in 0..undone {
            s.undo().unwrap().unwrap();
        }
        prop_assert_eq!(s.history().redo_depth(), undone);
        for _ in 0..undone {
            s.redo().unwrap().unwrap();
        }
        prop_assert!(s.redo().is_none());
        prop_assert_eq!(s.container(), &after);
    }
}

// ============================================================================
// Invariant 3: a new commit clears redo
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn commit_after_undo_clears_redo(
        pushes in prop::collection::vec(-50i64..50, 1..10),
        undo_count in 1usize..10,
        fresh in -50i64..50,
    ) {
        let mut s = stack_session(&[]);
        for v in &pushes {
            s.stage_with(|st| stack::push(st, *v)).unwrap();
            s.execute_all().unwrap();
        }
        let undone = undo_count.min(pushes.len());
        for _ in 0..undone {
            s.undo().unwrap().unwrap();
        }
        prop_assert!(s.can_redo());

        s.stage_with(|st| stack::push(st, fresh)).unwrap();
        s.execute_all().unwrap();
        prop_assert!(!s.can_redo());
        prop_assert!(s.redo().is_none());
        prop_assert_eq!(s.container().peek(), Some(fresh));
    }
}

// ============================================================================
// Invariant 4: stepping equals running in one call
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn stepping_matches_execute_all(
        values in prop::collection::vec(-50i64..50, 1..6),
        req in array_req_strategy(),
    ) {
        let mut stepped = array_session(ArrayCapacity::Growable, &values);
        let mut direct = stepped.clone();
        let Some(op) = build_array(stepped.container(), &req) else {
            return Ok(());
        };
        let total = op.len();

        direct.stage(op.clone()).unwrap();
        direct.execute_all().unwrap();

        stepped.stage(op).unwrap();
        stepped.start().unwrap();
        let mut reports = Vec::new();
        for _ in 0..total {
            reports.push(stepped.step().unwrap());
        }
        prop_assert!(
            matches!(reports.last(), Some(StepReport::Committed { .. })),
            "last report should be Committed"
        );
        prop_assert!(
            reports[..total - 1]
                .iter()
                .all(|r| matches!(r, StepReport::Advanced { .. })),
            "all reports before the last should be Advanced"
        );

        prop_assert_eq!(stepped.container(), direct.container());
        prop_assert_eq!(stepped.records(), direct.records());
        let stepped_entries: Vec<_> = stepped.history().undo_entries().collect();
        let direct_entries: Vec<_> = direct.history().undo_entries().collect();
        prop_assert_eq!(stepped_entries, direct_entries);
    }
}

// ============================================================================
// Invariant 5: stack LIFO
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn pop_returns_last_push(
        base in prop::collection::vec(-50i64..50, 0..6),
        pushes in prop::collection::vec(-50i64..50, 1..8),
    ) {
        let mut s = stack_session(&base);
        for v in &pushes {
            s.stage_with(|st| stack::push(st, *v)).unwrap();
            s.execute_all().unwrap();
        }
        let before_last: Vec<i64> = {
            let mut all = base.clone();
            all.extend_from_slice(&pushes[..pushes.len() - 1]);
            all
        };

        s.stage_with(stack::pop).unwrap();
        let popped = s
            .stepper()
            .staged()
            .and_then(|op| op.steps().first())
            .map(|step| step.op().clone());
        prop_assert!(
            matches!(popped, Some(StackOp::Pop { .. })),
            "expected a Pop op"
        );
        s.execute_all().unwrap();

        let entry = s.history().undo_entries().last().unwrap();
        prop_assert_eq!(entry.steps()[0].op().popped_value(), pushes.last().copied());
        prop_assert_eq!(s.container().contents(), before_last);
    }
}

// ============================================================================
// Model check: interleaved staging, stepping and restaging
// ============================================================================

#[derive(Debug, Clone)]
enum Event {
    Array(ArrayReq, bool),
    Stack(StackReq, bool),
    Start,
    Step,
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => (array_req_strategy(), any::<bool>()).prop_map(|(r, now)| Event::Array(r, now)),
        2 => (stack_req_strategy(), any::<bool>()).prop_map(|(r, now)| Event::Stack(r, now)),
        2 => Just(Event::Start),
        4 => Just(Event::Step),
    ]
}

#[derive(Debug, Clone)]
enum Pending {
    Array(ArrayReq),
    Stack(StackReq),
}

/// Plain vectors that only see committed actions.
#[derive(Debug, Default)]
struct Model {
    array: Vec<i64>,
    stack: Vec<i64>,
}

impl Model {
    fn commit(&mut self, action: Pending) {
        match action {
            Pending::Array(ArrayReq::Insert(i, v)) => self.array.insert(i, v),
            Pending::Array(ArrayReq::Delete(i)) => {
                self.array.remove(i);
            }
            Pending::Array(ArrayReq::Sort) => self.array.sort_unstable(),
            Pending::Stack(StackReq::Push(v)) => self.stack.push(v),
            Pending::Stack(StackReq::Pop) => {
                self.stack.pop();
            }
            Pending::Stack(StackReq::Clear) => self.stack.clear(),
            Pending::Stack(StackReq::Reverse) => self.stack.reverse(),
        }
    }
}

fn to_action(req: &Pending) -> Action {
    match req {
        Pending::Array(ArrayReq::Insert(i, v)) => Action::Insert {
            index: *i,
            value: *v,
        },
        Pending::Array(ArrayReq::Delete(i)) => Action::Delete { index: *i },
        Pending::Array(ArrayReq::Sort) => Action::Sort,
        Pending::Stack(StackReq::Push(v)) => Action::Push { value: *v },
        Pending::Stack(StackReq::Pop) => Action::Pop,
        Pending::Stack(StackReq::Clear) => Action::Clear,
        Pending::Stack(StackReq::Reverse) => Action::Reverse,
    }
}

/// Structures not in the middle of playback must match the model.
fn settled_matches(ws: &Workspace, model: &Model) -> bool {
    let mid_playback = |kind| {
        ws.view()
            .is_some_and(|(staged, view)| staged == kind && view.cursor > 0)
    };
    (mid_playback(StructureKind::Array) || ws.contents(StructureKind::Array) == model.array)
        && (mid_playback(StructureKind::Stack) || ws.contents(StructureKind::Stack) == model.stack)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn containers_track_committed_actions_only(
        array_base in prop::collection::vec(-50i64..50, 1..6),
        stack_base in prop::collection::vec(-50i64..50, 1..6),
        events in prop::collection::vec(event_strategy(), 1..40),
    ) {
        let mut config = EngineConfig::default();
        config.array.capacity = CapacityMode::Growable;
        let mut ws = Workspace::new(config);
        for (kind, values) in [
            (StructureKind::Array, &array_base),
            (StructureKind::Stack, &stack_base),
        ] {
            let init = Action::Init { values: values.clone() };
            ws.submit(Intent::new(kind, init).with_mode(Mode::Immediate)).unwrap();
        }
        let mut model = Model {
            array: array_base.clone(),
            stack: stack_base.clone(),
        };
        let mut pending: Option<Pending> = None;

        for event in events {
            let request = match event {
                Event::Array(r, now) => Some((StructureKind::Array, Pending::Array(r), now)),
                Event::Stack(r, now) => Some((StructureKind::Stack, Pending::Stack(r), now)),
                Event::Start => {
                    let _ = ws.start();
                    None
                }
                Event::Step => {
                    if let Ok((_, StepReport::Committed { .. })) = ws.step() {
                        let done = pending.take().expect("committed without a pending action");
                        model.commit(done);
                    }
                    None
                }
            };
            if let Some((kind, req, now)) = request {
                let mode = if now { Mode::Immediate } else { Mode::Step };
                match ws.submit(Intent::new(kind, to_action(&req)).with_mode(mode)) {
                    Ok(Submitted::Committed { .. }) => {
                        pending = None;
                        model.commit(req);
                    }
                    Ok(Submitted::Staged { .. }) => pending = Some(req),
                    Err(_) => {}
                }
            }
            prop_assert!(
                settled_matches(&ws, &model),
                "array {:?} stack {:?} vs {:?}",
                ws.contents(StructureKind::Array),
                ws.contents(StructureKind::Stack),
                model
            );
        }
    }
}
