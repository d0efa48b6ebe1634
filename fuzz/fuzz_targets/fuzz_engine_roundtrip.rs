#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stepviz_runtime::{
    Action, EngineConfig, Intent, Mode, RestagePolicy, StructureKind, Workspace,
};

#[derive(Debug, Arbitrary)]
enum Req {
    ArrayInit(Vec<i8>),
    Insert(u8, i8),
    Delete(u8),
    Sort,
    StackInit(Vec<i8>),
    Push(i8),
    Pop,
    Clear,
    Reverse,
    TreeInit(Vec<Option<i8>>),
    Start,
    Step,
    RunAll,
    Cancel,
    Undo,
    Redo,
    Use(u8),
}

#[derive(Debug, Arbitrary)]
struct Input {
    forbid: bool,
    immediate_mask: u32,
    reqs: Vec<Req>,
}

fn kind(n: u8) -> StructureKind {
    StructureKind::ALL[usize::from(n) % StructureKind::ALL.len()]
}

fn widen(values: &[i8]) -> Vec<i64> {
    values.iter().take(16).map(|&v| i64::from(v)).collect()
}

fuzz_target!(|input: Input| {
    let mut config = EngineConfig::default();
    if input.forbid {
        config.staging.restage = RestagePolicy::Forbid;
    }
    let mut ws = Workspace::new(config);

    for (i, req) in input.reqs.iter().take(64).enumerate() {
        let mode = if input.immediate_mask & (1 << (i % 32)) != 0 {
            Mode::Immediate
        } else {
            Mode::Step
        };
        let intent = |structure, action| Intent::new(structure, action).with_mode(mode);
        // Engine errors are expected outcomes; only panics and broken
        // invariants are findings.
        let _ = match req {
            Req::ArrayInit(v) => ws
                .submit(intent(StructureKind::Array, Action::Init { values: widen(v) }))
                .map(drop),
            Req::Insert(index, value) => ws
                .submit(intent(
                    StructureKind::Array,
                    Action::Insert {
                        index: usize::from(*index % 24),
                        value: i64::from(*value),
                    },
                ))
                .map(drop),
            Req::Delete(index) => ws
                .submit(intent(
                    StructureKind::Array,
                    Action::Delete {
                        index: usize::from(*index % 24),
                    },
                ))
                .map(drop),
            Req::Sort => ws.submit(intent(StructureKind::Array, Action::Sort)).map(drop),
            Req::StackInit(v) => ws
                .submit(intent(StructureKind::Stack, Action::Init { values: widen(v) }))
                .map(drop),
            Req::Push(value) => ws
                .submit(intent(
                    StructureKind::Stack,
                    Action::Push {
                        value: i64::from(*value),
                    },
                ))
                .map(drop),
            Req::Pop => ws.submit(intent(StructureKind::Stack, Action::Pop)).map(drop),
            Req::Clear => ws.submit(intent(StructureKind::Stack, Action::Clear)).map(drop),
            Req::Reverse => ws.submit(intent(StructureKind::Stack, Action::Reverse)).map(drop),
            Req::TreeInit(slots) => {
                let slots = slots.iter().take(16).map(|s| s.map(i64::from)).collect();
                ws.submit(intent(StructureKind::BinaryTree, Action::InitTree { slots }))
                    .map(drop)
            }
            Req::Start => ws.start(),
            Req::Step => ws.step().map(drop),
            Req::RunAll => ws.execute_all().map(drop),
            Req::Cancel => ws.cancel(),
            Req::Undo => ws.undo().unwrap_or(Ok(String::new())).map(drop),
            Req::Redo => ws.redo().unwrap_or(Ok(String::new())).map(drop),
            Req::Use(n) => {
                ws.set_active(kind(*n));
                Ok(())
            }
        };
        assert!(
            ws.staged_structure().is_none() || ws.view().is_some(),
            "staged structure without a view"
        );
    }

    // Finish whatever is staged, then every structure must unwind to empty.
    while ws.staged_structure().is_some() {
        // Fails harmlessly when already playing.
        let _ = ws.start();
        ws.step().expect("step of a staged composite");
    }
    for structure in StructureKind::ALL {
        ws.set_active(structure);
        while let Some(result) = ws.undo() {
            result.expect("undo of a committed composite");
        }
        assert!(
            ws.contents(structure).is_empty(),
            "{structure} not empty after undoing everything"
        );
    }
});
