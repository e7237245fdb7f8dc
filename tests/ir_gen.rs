//! 前端集成测试: 源码到 Koopa IR 文本

use sysyc::front::generate_ir;
use sysyc::sysy::CompUnitParser;
use sysyc::CompilerError;

fn compile_ir(src: &str) -> Result<String, CompilerError> {
    let ast = CompUnitParser::new().parse(src).expect("source should parse");
    generate_ir(&ast, None)
}

fn ir(src: &str) -> String {
    compile_ir(src).expect("lowering should succeed")
}

#[test]
fn library_preamble_is_declared() {
    let text = ir("int main() { return 0; }");
    assert!(text.contains("decl @getint(): i32"));
    assert!(text.contains("decl @getch(): i32"));
    assert!(text.contains("decl @getarray(*i32): i32"));
    assert!(text.contains("decl @putint(i32)"));
    assert!(text.contains("decl @putch(i32)"));
    assert!(text.contains("decl @putarray(i32, *i32)"));
    assert!(text.contains("decl @starttime()"));
    assert!(text.contains("decl @stoptime()"));
}

#[test]
fn minimal_main() {
    let text = ir("int main() { return 0; }");
    assert!(text.contains("fun @main(): i32 {"));
    assert!(text.contains("%entry:"));
    assert!(text.contains("  ret 0"));
}

#[test]
fn missing_return_synthesizes_default() {
    let text = ir("int main() { int x = 1; }");
    assert!(text.contains("  ret 0"));

    let text = ir("void log() { } int main() { return 0; }");
    assert!(text.contains("fun @log() {"));
    assert!(text.contains("\n  ret\n"));
}

#[test]
fn constant_expressions_leave_no_instructions() {
    let text = ir("int main() { const int N = 4; return N * 2 + 1; }");
    assert!(text.contains("  ret 9"));
    assert!(!text.contains("load"));
    assert!(!text.contains("mul"));
    assert!(!text.contains("add"));
    assert!(!text.contains("alloc"));
}

#[test]
fn unary_operators_fold_and_lower() {
    let text = ir("int main() { return !0; }");
    assert!(text.contains("  ret 1"));

    // 运行期操作数: -x 降级为 sub 0, x
    let text = ir("int main() { int x = getint(); return -x; }");
    assert!(text.contains("= sub 0, %"));
}

#[test]
fn scalar_variables_load_and_store() {
    let text = ir("int main() { int a = 1; int b = 2; return a + b * 3; }");
    assert!(text.contains("@a_0 = alloc i32"));
    assert!(text.contains("  store 1, @a_0"));
    assert!(text.contains("@b_1 = alloc i32"));
    assert!(text.contains("= load @a_0"));
    assert!(text.contains("= mul "));
    assert!(text.contains("= add "));
}

#[test]
fn nested_scopes_uniquify_against_globals() {
    let text = ir("int x = 1; int main() { int x = 2; { int x = 3; } return x; }");
    assert!(text.contains("global @x = alloc i32, 1"));
    assert!(text.contains("@x_0 = alloc i32"));
    assert!(text.contains("@x_1 = alloc i32"));
    // 返回的是函数体作用域的 x
    assert!(text.contains("= load @x_0"));
}

#[test]
fn if_else_with_both_arms_terminated_suppresses_merge_block() {
    let text = ir("int main() { if (getint()) return 1; else return 2; }");
    assert!(text.contains("br %0, %then_0, %else_0"));
    assert!(text.contains("%then_0:"));
    assert!(text.contains("%else_0:"));
    assert!(!text.contains("%endif_0"));
    // 函数体已终结, 不追加默认 ret
    assert!(!text.contains("ret 0"));
}

#[test]
fn if_without_else_always_merges() {
    let text = ir("int main() { if (getint()) putint(1); return 0; }");
    assert!(text.contains("br %0, %then_0, %endif_0"));
    assert!(text.contains("  jump %endif_0"));
    assert!(text.contains("%endif_0:"));
    assert!(text.contains("  ret 0"));
}

#[test]
fn while_loop_shape() {
    let text = ir("int main() { int i = 0; int s = 0; while (i < 10) { s = s + i; i = i + 1; } return s; }");
    assert!(text.contains("  jump %while_entry_0"));
    assert!(text.contains("%while_entry_0:"));
    assert!(text.contains("br %"));
    assert!(text.contains("%while_body_0:"));
    assert!(text.contains("%while_end_0:"));
    // 回边
    let back_edges = text.matches("jump %while_entry_0").count();
    assert_eq!(back_edges, 2);
}

#[test]
fn break_and_continue_target_innermost_loop() {
    let text = ir("int main() { while (1) { while (1) { continue; } break; } return 0; }");
    assert!(text.contains("jump %while_entry_1"));
    assert!(text.contains("jump %while_end_0"));
}

#[test]
fn short_circuit_and_evaluates_rhs_in_its_own_block() {
    let text = ir("int main() { int a = getint(); return a && getint(); }");
    assert!(text.contains("= alloc i32"));
    assert!(text.contains("= ne 0, %"));
    assert!(text.contains("%land_rhs_0:"));
    assert!(text.contains("%land_end_0:"));
    // 第二次 getint 只出现在右操作数块里
    let rhs_label_pos = text.find("%land_rhs_0:").unwrap();
    let second_call_pos = text.rfind("call @getint()").unwrap();
    assert!(second_call_pos > rhs_label_pos);
}

#[test]
fn short_circuit_or_branches_to_end_when_lhs_true() {
    let text = ir("int main() { int a = getint(); return a || getint(); }");
    // 左侧为真直接去汇合块
    assert!(text.contains(", %lor_end_0, %lor_rhs_0"));
    assert!(text.contains("%lor_rhs_0:"));
    assert!(text.contains("%lor_end_0:"));
}

#[test]
fn global_array_with_const_dimension() {
    let text = ir("const int N = 4; int a[N] = {1, 2, 3, 4}; int main() { return a[2]; }");
    assert!(text.contains("global @a = alloc [i32, 4], {1, 2, 3, 4}"));
    // 常量下标直接折叠, 不留乘加指令
    assert!(text.contains("= getelemptr @a, 2"));
    assert!(!text.contains("= mul"));
}

#[test]
fn uninitialized_global_array_is_zeroinit() {
    let text = ir("int buf[8]; int main() { return buf[0]; }");
    assert!(text.contains("global @buf = alloc [i32, 8], zeroinit"));
}

#[test]
fn local_multi_dim_array_flattens_row_major() {
    let text = ir("int main() { int a[2][3] = {{1,2,3},{4,5,6}}; return a[1][1]; }");
    assert!(text.contains("@a_0 = alloc [i32, 6]"));
    // 六个展平位置逐个写入
    for i in 0..6 {
        assert!(text.contains(&format!("getelemptr @a_0, {}", i)));
    }
    assert!(text.contains("store 4, %"));
    // a[1][1] 的展平下标是 1*3+1 = 4
    let access = text.rfind("getelemptr @a_0, 4").unwrap();
    let last_store = text.rfind("store").unwrap();
    assert!(access > last_store);
}

#[test]
fn partial_initializer_pads_with_zero_stores() {
    let text = ir("int main() { int a[2][2] = {{7}}; return a[0][0]; }");
    assert!(text.contains("@a_0 = alloc [i32, 4]"));
    assert!(text.contains("store 7, %"));
    assert_eq!(text.matches("store 0, %").count(), 3);
}

#[test]
fn runtime_index_uses_stride_arithmetic() {
    let text = ir("int main() { int a[2][3]; int i = getint(); int j = getint(); return a[i][j]; }");
    // i * 3 + j
    assert!(text.contains("= mul %"));
    assert!(text.contains(", 3"));
    assert!(text.contains("= add %"));
    assert!(text.contains("= getelemptr @a_0, %"));
}

#[test]
fn array_parameter_lowers_to_pointer() {
    let text = ir("int f(int p[], int n) { return p[n]; } int main() { int a[4] = {}; return f(a, 0); }");
    assert!(text.contains("fun @f(%p0: *i32, %p1: i32): i32"));
    assert!(text.contains("@p_0 = alloc *i32"));
    assert!(text.contains("  store %p0, @p_0"));
    // 形参数组: 先取出指针, 再 getptr
    assert!(text.contains("= load @p_0"));
    assert!(text.contains("= getptr %"));
    // 整个数组传参: getelemptr base, 0
    assert!(text.contains("= getelemptr @a_"));
    assert!(text.contains("= call @f(%"));
}

#[test]
fn array_parameter_passed_through_is_normalized() {
    let text = ir(
        "int f(int p[]) { return p[0]; } \
         int g(int p[]) { return f(p); } \
         int main() { return 0; }",
    );
    // 形参整体转传时发射 getptr p, 0
    assert!(text.contains("= getptr %"));
    assert!(text.contains(", 0"));
}

#[test]
fn multi_dim_array_parameter_keeps_inner_strides() {
    let text = ir("int f(int m[][3], int i, int j) { return m[i][j]; } int main() { return 0; }");
    assert!(text.contains("fun @f(%p0: *i32, %p1: i32, %p2: i32): i32"));
    // i*3 + j 的步长算术
    assert!(text.contains(", 3"));
    assert!(text.contains("= getptr %"));
}

#[test]
fn void_call_has_no_result_temporary() {
    let text = ir("int main() { putint(42); return 0; }");
    assert!(text.contains("  call @putint(42)"));
    assert!(!text.contains("= call @putint"));
}

#[test]
fn undefined_identifier_is_rejected() {
    assert!(compile_ir("int main() { return y; }").is_err());
}

#[test]
fn redeclaration_in_same_scope_is_rejected() {
    assert!(compile_ir("int main() { int x = 1; int x = 2; return x; }").is_err());
    // 跨作用域遮蔽是允许的
    assert!(compile_ir("int main() { int x = 1; { int x = 2; } return x; }").is_ok());
}

#[test]
fn calling_a_variable_is_rejected() {
    assert!(compile_ir("int a; int main() { return a(); }").is_err());
}

#[test]
fn assigning_to_constant_is_rejected() {
    assert!(compile_ir("int main() { const int N = 1; N = 2; return N; }").is_err());
    assert!(compile_ir("const int A[2] = {1, 2}; int main() { A[0] = 3; return 0; }").is_err());
}

#[test]
fn non_constant_dimension_is_rejected() {
    assert!(compile_ir("int main() { int n = getint(); int a[n]; return 0; }").is_err());
}

#[test]
fn non_constant_global_initializer_is_rejected() {
    assert!(compile_ir("int g = 1; int h = g; int main() { return h; }").is_err());
}

#[test]
fn misaligned_initializer_is_rejected() {
    assert!(compile_ir("int a[2][3] = {1, {2}, 3}; int main() { return 0; }").is_err());
}

#[test]
fn break_outside_loop_is_rejected() {
    assert!(compile_ir("int main() { break; return 0; }").is_err());
    assert!(compile_ir("int main() { continue; return 0; }").is_err());
}

#[test]
fn dimension_mismatch_is_rejected() {
    // 标量当数组用
    assert!(compile_ir("int main() { int x = 1; return x[0]; }").is_err());
    // 下标多于维数
    assert!(compile_ir("int main() { int a[2]; return a[0][1]; }").is_err());
    // 赋值目标必须是具体元素
    assert!(compile_ir("int main() { int a[2][2]; a[0] = 1; return 0; }").is_err());
}

#[test]
fn duplicate_function_name_is_rejected() {
    assert!(compile_ir("int f() { return 0; } int f() { return 1; } int main() { return 0; }").is_err());
    // 与库函数同名也算重复声明
    assert!(compile_ir("int getint() { return 0; } int main() { return 0; }").is_err());
}

#[test]
fn statements_after_terminator_are_skipped() {
    let text = ir("int main() { return 1; putint(2); return 3; }");
    assert!(text.contains("  ret 1"));
    assert!(!text.contains("call @putint"));
    assert!(!text.contains("ret 3"));
}
