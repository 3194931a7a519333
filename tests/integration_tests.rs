//! End-to-end compilation tests through the `sable` facade.

use sable::prelude::*;
use sable::{ErrorKind, FunctionFlags};
use sable_compiler::DispatchKind;

fn compiler() -> ScriptCompiler {
    ScriptCompiler::with_standard_library().unwrap()
}

fn compile(source: &str) -> CompiledUnit {
    compiler()
        .compile("test", source, &ScriptInterface::generic())
        .unwrap_or_else(|err| panic!("{source}: {err}"))
}

fn compile_error(source: &str) -> ScriptError {
    compiler()
        .compile("test", source, &ScriptInterface::generic())
        .expect_err("expected a compile error")
}

fn main_chunk(unit: &CompiledUnit) -> &BytecodeChunk {
    &unit.main().unwrap().chunk
}

fn call_sites(unit: &CompiledUnit) -> Vec<(DispatchKind, String)> {
    unit.constants
        .call_sites()
        .map(|site| (site.kind, site.name.clone()))
        .collect()
}

// ============================================================================
// Type propagation
// ============================================================================

#[test]
fn def_receivers_make_calls_dynamic() {
    let unit = compile("def list = new ArrayList(); list.add(1); list.size()");
    let sites = call_sites(&unit);
    assert!(sites.contains(&(DispatchKind::MethodCall, "add".to_string())));
    assert!(sites.contains(&(DispatchKind::MethodCall, "size".to_string())));
}

#[test]
fn static_receivers_bind_directly() {
    let unit = compile("ArrayList list = new ArrayList(); list.add(1); list.size()");
    assert!(call_sites(&unit).is_empty());
    main_chunk(&unit).assert_contains_opcodes(&[OpCode::New, OpCode::CallVirtual]);
}

#[test]
fn def_arithmetic_uses_operator_sites() {
    let unit = compile("def a = 1; def b = 2; a + b");
    assert!(call_sites(&unit)
        .iter()
        .any(|(kind, _)| *kind == DispatchKind::BinaryOperator));
}

#[test]
fn def_operands_defer_string_concatenation() {
    for source in ["def x = 1; x + 'a'", "def x = 1; 'a' + x", "String s = 'a'; def x = 1; s += x; s"] {
        let unit = compile(source);
        assert!(
            call_sites(&unit).contains(&(DispatchKind::BinaryOperator, "add".to_string())),
            "{source}"
        );
        assert_eq!(main_chunk(&unit).count_op(OpCode::Concat), 0, "{source}");
    }
}

#[test]
fn numeric_promotion_widens_operands() {
    let unit = compile("int i = 1; long l = 2L; double d = 0.5; i + l + d");
    let chunk = main_chunk(&unit);
    chunk.assert_contains_sequence(&[OpCode::I2L, OpCode::GetLocal, OpCode::AddI64, OpCode::L2D]);
    chunk.assert_contains_opcodes(&[OpCode::AddF64]);
}

#[test]
fn narrowing_requires_a_cast() {
    let err = compile_error("long l = 1L; int i = l; i");
    assert_eq!(err.kind(), ErrorKind::Compile);
    let unit = compile("long l = 1L; int i = (int) l; i");
    main_chunk(&unit).assert_contains_opcodes(&[OpCode::L2I]);
}

// ============================================================================
// Index normalization
// ============================================================================

#[test]
fn array_reads_and_writes_normalize_negative_indexes() {
    let unit = compile("int[] a = new int[4]; int i = -1; a[i] = 7; a[i]");
    let normalize = [OpCode::Pick, OpCode::ArrayLength, OpCode::NormalizeIndex];
    assert_eq!(main_chunk(&unit).count_sequence(&normalize), 2);
}

#[test]
fn maps_never_normalize() {
    let unit = compile("Map m = new HashMap(); m['k'] = 1; m['k']");
    assert_eq!(main_chunk(&unit).count_op(OpCode::NormalizeIndex), 0);
}

// ============================================================================
// Loop budget
// ============================================================================

#[test]
fn every_loop_checks_the_shared_counter() {
    let unit = compile(
        "int n = 0;
         for (int i = 0; i < 3; i++) { n++; }
         while (n > 0) { n--; }
         do { n++; } while (n < 2);
         for (int x : new int[] {1, 2}) { n += x; }
         n",
    );
    let main = unit.main().unwrap();
    let slot = main.loop_counter_slot.expect("a loop counter");
    let checks: Vec<_> = main
        .chunk
        .instructions()
        .into_iter()
        .filter(|inst| inst.op == OpCode::LoopCheck)
        .collect();
    assert_eq!(checks.len(), 4);
    assert!(checks.iter().all(|inst| inst.operand == Some(slot)));
}

#[test]
fn zero_budget_disables_instrumentation() {
    let compiler = compiler().with_settings(CompilerSettings::default().with_max_loop_counter(0));
    let unit = compiler
        .compile("test", "int n = 0; while (n < 3) { n++; } n", &ScriptInterface::generic())
        .unwrap();
    let main = unit.main().unwrap();
    assert_eq!(main.max_loop_counter, 0);
    assert_eq!(main.chunk.count_op(OpCode::LoopCheck), 0);
}

#[test]
fn functions_have_their_own_counters() {
    let unit = compile("int spin(int n) { while (n > 0) { n--; } return n; } spin(3)");
    assert!(unit.main().unwrap().loop_counter_slot.is_none());
    let spin = unit.function("spin").unwrap();
    assert!(spin.loop_counter_slot.is_some());
    assert_eq!(spin.max_loop_counter, 1_000_000);
}

// ============================================================================
// Compound assignment
// ============================================================================

#[test]
fn compound_assignment_evaluates_the_receiver_once() {
    let unit = compile("int[] a = new int[2]; a[1] += 5; a[1]");
    let chunk = main_chunk(&unit);
    chunk.assert_contains_sequence(&[OpCode::Dup2, OpCode::ArrayLoad]);
    // One load for `+=`, one for the final read.
    assert_eq!(chunk.count_op(OpCode::ArrayLoad), 2);
}

#[test]
fn string_compound_assignment_concatenates() {
    let unit = compile("String s = 'a'; s += 1; s");
    main_chunk(&unit).assert_contains_sequence(&[OpCode::GetLocal, OpCode::PushOne, OpCode::Concat, OpCode::SetLocal]);
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn conditions_short_circuit() {
    let unit = compile("int x = 0; if (x > 0 && x < 10 || x == -1) { return 1; } 0");
    let chunk = main_chunk(&unit);
    // No boolean value is materialized for the condition.
    assert_eq!(chunk.count_op(OpCode::PushTrue), 0);
    assert_eq!(chunk.count_op(OpCode::PushFalse), 0);
    assert!(chunk.count_op(OpCode::JumpIfFalse) + chunk.count_op(OpCode::JumpIfTrue) >= 3);
}

#[test]
fn exceptions_register_handlers() {
    let unit = compile("int x = 0; try { x = Integer.parseInt('7'); } catch (IllegalArgumentException e) { x = -1; } x");
    let handlers = main_chunk(&unit).handlers();
    assert_eq!(handlers.len(), 1);
    assert!(matches!(
        unit.constants.get(u32::from(handlers[0].catch_type)),
        Some(Constant::Type(_))
    ));
}

#[test]
fn lambdas_lift_into_synthetic_functions() {
    let unit = compile("List l = [3, 1, 2]; l.sort((a, b) -> a - b); l");
    let lambda = unit
        .functions
        .iter()
        .find(|f| f.flags.contains(FunctionFlags::SYNTHETIC))
        .expect("a lifted lambda");
    assert!(lambda.name.starts_with("lambda$"));
    assert_eq!(lambda.params.len(), 2);
}

// ============================================================================
// Errors and settings
// ============================================================================

#[test]
fn unknown_variables_are_user_errors() {
    let err = compile_error("missing + 1");
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert!(err.is_user_facing());
}

#[test]
fn disabled_regexes_are_rejected() {
    let compiler = compiler().with_settings(CompilerSettings::default().with_regexes(false));
    let err = compiler
        .compile("test", "'abc' ==~ /b/", &ScriptInterface::generic())
        .unwrap_err();
    assert!(err.is_user_facing());
}

#[test]
fn settings_load_from_json_with_defaults() {
    let settings: CompilerSettings = serde_json::from_str(r#"{ "max_loop_counter": 50 }"#).unwrap();
    assert_eq!(settings.max_loop_counter, 50);
    assert!(settings.regexes_enabled);
    assert!(!settings.picky);
}

#[test]
fn compilation_is_deterministic() {
    let source = "int f(int x) { return x * x; } def d = f(3); d + 1";
    assert_eq!(compile(source), compile(source));
}

#[test]
fn compilers_share_across_threads() {
    let compiler = compiler();
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let compiler = compiler.clone();
            std::thread::spawn(move || {
                let source = format!("int x = {n}; x * 2");
                compiler
                    .compile("shared", &source, &ScriptInterface::generic())
                    .map(|unit| unit.functions.len())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }
}
