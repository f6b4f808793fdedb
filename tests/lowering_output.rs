//! Printed-output checks over whole lowered functions, exercising the
//! public entry points the way an embedding front-end would.

use genlower::ast::facts::mark_yield_containment;
use genlower::ast::{AstArena, BinaryOp, NodeIndex, UnaryOp};
use genlower::lower_function;
use genlower::transforms::ir_printer::IRPrinter;

fn lower_to_string(arena: &mut AstArena, func: NodeIndex) -> String {
    mark_yield_containment(arena, func);
    IRPrinter::emit_to_string(&lower_function(arena, func))
}

#[test]
fn test_counting_loop_machine() {
    // function* range(n) { for (var i = 0; i < n; i++) { yield i; } }
    let mut arena = AstArena::new();
    let zero = arena.number("0");
    let init = arena.var_stmt(&[("i", Some(zero))]);
    let i1 = arena.ident("i");
    let n = arena.ident("n");
    let cond = arena.binary(BinaryOp::LessThan, i1, n);
    let i2 = arena.ident("i");
    let incr = arena.postfix(UnaryOp::PlusPlus, i2);
    let i3 = arena.ident("i");
    let y = arena.yield_expr(Some(i3));
    let ystmt = arena.expr_stmt(y);
    let loop_body = arena.block(vec![ystmt]);
    let for_stmt = arena.for_stmt(Some(init), Some(cond), Some(incr), loop_body);
    let body = arena.block(vec![for_stmt]);
    let func = arena.function_decl("range", &["n"], body, true);

    let output = lower_to_string(&mut arena, func);
    let expected = "\
function range(n) {
    var i;
    return __generator(this, function (_a) {
        switch (_a.label) {
            case 0:
                i = 0;
                _a.label = 1;
            case 1:
                if (!(i < n)) return [3 /*break*/, 4];
                return [4 /*yield*/, i];
            case 2:
                _a.sent();
                _a.label = 3;
            case 3:
                i++;
                return [3 /*break*/, 1];
            case 4: return [2 /*return*/];
        }
    });
}";
    assert_eq!(output, expected);
}

#[test]
fn test_delegation_machine() {
    // function* f(xs) { yield* xs; }
    let mut arena = AstArena::new();
    let xs = arena.ident("xs");
    let ystar = arena.yield_star(xs);
    let stmt = arena.expr_stmt(ystar);
    let body = arena.block(vec![stmt]);
    let func = arena.function_decl("f", &["xs"], body, true);

    let output = lower_to_string(&mut arena, func);
    let expected = "\
function f(xs) {
    return __generator(this, function (_a) {
        switch (_a.label) {
            case 0: return [5 /*yield**/, __values(xs)];
            case 1:
                _a.sent();
                return [2 /*return*/];
        }
    });
}";
    assert_eq!(output, expected);
}

#[test]
fn test_non_generator_body_is_untouched() {
    // A plain function containing a generator expression: only the inner
    // body becomes a machine.
    let mut arena = AstArena::new();
    let one = arena.number("1");
    let y = arena.yield_expr(Some(one));
    let ystmt = arena.expr_stmt(y);
    let inner_body = arena.block(vec![ystmt]);
    let inner = arena.function_expr(None, &[], inner_body, true);
    let ret = arena.ret(Some(inner));
    let body = arena.block(vec![ret]);
    let func = arena.function_decl("make", &[], body, true);

    let output = lower_to_string(&mut arena, func);
    // The outer generator has no suspension of its own; its machine returns
    // the inner function immediately.
    assert!(output.contains("return [2 /*return*/, function () {"));
    assert!(output.contains("return [4 /*yield*/, 1];"));
}

#[test]
fn test_return_value_threads_through_finally() {
    // try { return f(); } finally { cleanup(); } inside a generator: the
    // return becomes a protocol instruction so the finally region sees it.
    let mut arena = AstArena::new();
    let y = arena.yield_expr(None);
    let ystmt = arena.expr_stmt(y);
    let f = arena.ident("f");
    let call = arena.call(f, vec![]);
    let ret = arena.ret(Some(call));
    let try_block = arena.block(vec![ystmt, ret]);
    let cleanup = arena.ident("cleanup");
    let cleanup_call = arena.call(cleanup, vec![]);
    let cleanup_stmt = arena.expr_stmt(cleanup_call);
    let finally_block = arena.block(vec![cleanup_stmt]);
    let try_stmt = arena.try_stmt(try_block, None, Some(finally_block));
    let body = arena.block(vec![try_stmt]);
    let func = arena.function_decl("g", &[], body, true);

    let output = lower_to_string(&mut arena, func);
    assert!(output.contains("_a.trys.push([0, , 2, 3]);"));
    assert!(output.contains("return [2 /*return*/, f()];"));
    assert!(output.contains("cleanup();"));
    assert!(output.contains("return [7 /*endfinally*/];"));
}

#[test]
fn test_deeply_nested_regions_resolve() {
    // Two protected regions, one inside the other, each with a suspension.
    let mut arena = AstArena::new();
    let one = arena.number("1");
    let y_inner = arena.yield_expr(Some(one));
    let s_inner = arena.expr_stmt(y_inner);
    let inner_try_block = arena.block(vec![s_inner]);
    let inner_catch_block = arena.block(vec![]);
    let inner_catch = arena.catch_clause("e", inner_catch_block);
    let inner_try = arena.try_stmt(inner_try_block, Some(inner_catch), None);

    let two = arena.number("2");
    let y_outer = arena.yield_expr(Some(two));
    let s_outer = arena.expr_stmt(y_outer);
    let outer_try_block = arena.block(vec![s_outer, inner_try]);
    let outer_catch_block = arena.block(vec![]);
    let outer_catch = arena.catch_clause("e", outer_catch_block);
    let outer_try = arena.try_stmt(outer_try_block, Some(outer_catch), None);
    let body = arena.block(vec![outer_try]);
    let func = arena.function_decl("f", &[], body, true);

    let output = lower_to_string(&mut arena, func);
    // Both catch bindings hoist under distinct names and both regions get
    // their own trys record.
    assert!(output.contains("var e_1, e_2;"));
    assert_eq!(output.matches(".trys.push([").count(), 2);
    assert!(output.contains("e_1 = _a.sent();"));
    assert!(output.contains("e_2 = _a.sent();"));
}
