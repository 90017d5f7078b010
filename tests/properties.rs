use tapeir::{
    compile,
    interpreter::{
        ir_interpreter::{IrInterpreter, Outcome},
        Runtime,
    },
    ir::{verify::reachable_blocks, BlockKind, Module, Terminator},
    CompileError, CompileOptions, LoopSemantics, Target,
};

fn run(module: &Module) -> (Outcome, Vec<u8>) {
    let mut runtime = Runtime::new(vec![]).with_step_limit(1_000_000);
    let outcome = IrInterpreter::new()
        .interpret(&mut runtime, module)
        .expect("program should run");
    (outcome, runtime.into_output())
}

fn both_semantics() -> Vec<CompileOptions> {
    vec![
        CompileOptions::default(),
        CompileOptions::default().with_loop_semantics(LoopSemantics::Guarded),
    ]
}

const PROGRAMS: &[&str] = &[
    "",
    "+",
    "[]",
    "+[-]",
    "++[>+<-]>.",
    "+[>+[-]<-]",
    "[[[]]][][[]]",
    "+.e-.",
    "hello world",
];

// ── Block graph shape ──────────────────────────────────────────────────

#[test]
fn one_header_per_open_bracket() {
    for options in both_semantics() {
        for program in PROGRAMS {
            let module = compile(program, &options).unwrap();
            let opens = program.chars().filter(|c| *c == '[').count();
            assert_eq!(
                module.loop_headers().count(),
                opens,
                "headers for {program:?}"
            );
        }
    }
}

#[test]
fn every_block_is_terminated_and_reachable() {
    for options in both_semantics() {
        for program in PROGRAMS {
            let module = compile(program, &options).unwrap();
            let reachable = reachable_blocks(&module.function);
            for (id, block) in module.function.blocks() {
                assert!(block.is_terminated(), "{program:?}: {}", block.label());
                assert!(reachable.contains(&id), "{program:?}: {}", block.label());
            }
        }
    }
}

#[test]
fn only_the_exit_block_returns() {
    let module = compile("+[>+[-]<-]", &CompileOptions::default()).unwrap();
    let returning: Vec<BlockKind> = module
        .function
        .blocks()
        .filter(|(_, b)| matches!(b.terminator(), Some(Terminator::Return(_))))
        .map(|(_, b)| b.kind)
        .collect();
    assert_eq!(returning, vec![BlockKind::Exit]);
}

#[test]
fn empty_loop_branches_to_itself_or_a_distinct_exit() {
    let module = compile("+[]", &CompileOptions::default()).unwrap();
    let (header, block) = module.loop_headers().next().unwrap();

    match block.terminator() {
        Some(Terminator::CondBranch {
            if_true, if_false, ..
        }) => {
            // The condition is `cell == 0`, so the true arm leaves the loop
            assert_ne!(if_true, if_false);
            assert_eq!(*if_false, header);
            assert!(matches!(
                module.function.block(*if_true).unwrap().kind,
                BlockKind::LoopExit { index: 0, depth: 1 }
            ));
        }
        other => panic!("expected a conditional branch, got {other:?}"),
    }
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn stray_close_bracket_is_reported_with_its_position() {
    match compile("+\n+]", &CompileOptions::default()) {
        Err(CompileError::UnmatchedBracket {
            bracket: ']',
            position,
            ..
        }) => {
            assert_eq!(position.line, 2);
            assert_eq!(position.col, 2);
            assert_eq!(position.offset, 3);
        }
        other => panic!("expected an unmatched bracket, got {other:?}"),
    }
}

#[test]
fn lone_close_bracket_is_an_error() {
    assert!(matches!(
        compile("]", &CompileOptions::default()),
        Err(CompileError::UnmatchedBracket { bracket: ']', .. })
    ));
}

#[test]
fn unclosed_bracket_fails_at_end_of_input() {
    for options in both_semantics() {
        match compile("[", &options) {
            Err(CompileError::UnmatchedBracket {
                bracket: '[',
                position,
                ..
            }) => assert_eq!(position.offset, 0),
            other => panic!("expected an unmatched bracket, got {other:?}"),
        }
    }

    // The innermost open loop is the one reported
    assert!(matches!(
        compile("[[]  [", &CompileOptions::default()),
        Err(CompileError::UnmatchedBracket { position, .. }) if position.offset == 5
    ));
}

#[test]
fn zero_length_tape_is_a_configuration_error() {
    let options = CompileOptions::default().with_tape_length(0);
    assert!(matches!(
        compile("+", &options),
        Err(CompileError::Configuration(_))
    ));
}

// ── Executed semantics ─────────────────────────────────────────────────

#[test]
fn incrementing_tape_length_times_writes_length_mod_256() {
    for tape_length in [1usize, 100, 255, 256, 300] {
        let options = CompileOptions::default().with_tape_length(tape_length);
        let source = "+".repeat(tape_length) + ".";
        let module = compile(&source, &options).unwrap();
        let (_, output) = run(&module);
        assert_eq!(output, vec![(tape_length % 256) as u8]);
    }
}

#[test]
fn decrementing_zero_wraps_to_255() {
    let module = compile("-.", &CompileOptions::default()).unwrap();
    let (outcome, output) = run(&module);
    assert_eq!(output, vec![255]);
    assert_eq!(outcome, Outcome::Returned(255));
}

#[test]
fn ignored_characters_produce_identical_ir() {
    let options = CompileOptions::default();
    let noisy = compile("+x+", &options).unwrap();
    let clean = compile("++", &options).unwrap();
    assert_eq!(noisy, clean);
    assert_eq!(noisy.to_string(), clean.to_string());
}

#[test]
fn prints_a_hello() {
    // 8 * 9 = 72 'H', then 33 more for 'i'
    let source = format!("++++++++[>+++++++++<-]>.{}.", "+".repeat(33));
    let module = compile(&source, &CompileOptions::default()).unwrap();
    let (outcome, output) = run(&module);
    assert_eq!(output, b"Hi".to_vec());
    assert_eq!(outcome, Outcome::Returned(b'i'));
}

#[test]
fn loops_agree_when_the_first_cell_is_nonzero() {
    let source = "+++[>++[>+<-]<-]>>.";
    let outputs: Vec<Vec<u8>> = both_semantics()
        .iter()
        .map(|options| run(&compile(source, options).unwrap()).1)
        .collect();
    assert_eq!(outputs[0], vec![6]);
    assert_eq!(outputs[0], outputs[1]);
}

// ── Rendering ──────────────────────────────────────────────────────────

#[test]
fn text_form_is_deterministic_and_names_the_target() {
    let options = CompileOptions::default().with_target(Target::LinuxArm64);
    let first = compile("+[.>]e", &options).unwrap().to_string();
    let second = compile("+[.>]e", &options).unwrap().to_string();
    assert_eq!(first, second);

    assert!(first.contains("target triple = \"aarch64-unknown-linux-gnu\""));
    assert!(first.contains("define i8 @main() {"));
    assert!(first.contains("alloca [100 x i8]"));
    assert!(first.contains("loop0.header:"));
    assert!(first.contains("loop0.exit:"));
    assert!(first.contains(
        "call i32 asm sideeffect \"svc 0\", \"={x0},{x8},{x0},{x1},{x2},~{memory}\"("
    ));
    assert!(first.contains("ret i8 %"));
}
