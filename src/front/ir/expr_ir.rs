//! 表达式降级
//!
//! 每个表达式降级后得到一个操作数串: 字面量、`%n` 临时值或 `@name`
//! 指针。进入任何表达式前都先尝试常量折叠, 可折叠的子表达式不会在
//! IR 中留下指令。

use crate::front::ast::*;
use crate::front::ir::{GenerateIR, IrContext};
use crate::front::symbol::{Symbol, SymbolKind, VarType};
use crate::CompilerError;

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Mod => "mod",
    }
}

fn rel_op_text(op: RelOp) -> &'static str {
    match op {
        RelOp::Lt => "lt",
        RelOp::Gt => "gt",
        RelOp::Le => "le",
        RelOp::Ge => "ge",
    }
}

fn eq_op_text(op: EqOp) -> &'static str {
    match op {
        EqOp::Eq => "eq",
        EqOp::Ne => "ne",
    }
}

pub fn generate_unary_op_ir(
    op: &UnaryOp,
    expr: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let v = expr.generate_ir(ctx)?;
    let op_text = match op {
        UnaryOp::Plus => "add",
        UnaryOp::Minus => "sub",
        UnaryOp::Not => "eq",
    };
    let t = ctx.fresh_temp();
    ctx.emit(format!("{} = {} 0, {}", t, op_text, v));
    Ok(t)
}

pub fn generate_binary_op_ir(
    op: &BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let l = lhs.generate_ir(ctx)?;
    let r = rhs.generate_ir(ctx)?;
    let t = ctx.fresh_temp();
    ctx.emit(format!("{} = {} {}, {}", t, binary_op_text(*op), l, r));
    Ok(t)
}

pub fn generate_rel_op_ir(
    op: &RelOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let l = lhs.generate_ir(ctx)?;
    let r = rhs.generate_ir(ctx)?;
    let t = ctx.fresh_temp();
    ctx.emit(format!("{} = {} {}, {}", t, rel_op_text(*op), l, r));
    Ok(t)
}

pub fn generate_eq_op_ir(
    op: &EqOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let l = lhs.generate_ir(ctx)?;
    let r = rhs.generate_ir(ctx)?;
    let t = ctx.fresh_temp();
    ctx.emit(format!("{} = {} {}, {}", t, eq_op_text(*op), l, r));
    Ok(t)
}

// 短路求值都走同一个栈槽套路: 槽里先存入左操作数的布尔值, 需要右
// 操作数时在单独的基本块里求值并覆盖, 汇合块从槽里读回结果。
// 结果要跨多路合流存活, 用内存槽就不需要 φ 节点。

pub fn generate_land_op_ir(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let slot = ctx.fresh_temp();
    ctx.emit(format!("{} = alloc i32", slot));

    let l = lhs.generate_ir(ctx)?;
    let l_bool = ctx.fresh_temp();
    ctx.emit(format!("{} = ne 0, {}", l_bool, l));
    ctx.emit(format!("store {}, {}", l_bool, slot));

    let id = ctx.fresh_label_id();
    let rhs_label = format!("%land_rhs_{}", id);
    let end_label = format!("%land_end_{}", id);

    // 左侧为假时整个表达式已定值, 跳过右侧
    ctx.emit(format!("br {}, {}, {}", l_bool, rhs_label, end_label));
    ctx.emit_label(&rhs_label);
    let r = rhs.generate_ir(ctx)?;
    let r_bool = ctx.fresh_temp();
    ctx.emit(format!("{} = ne 0, {}", r_bool, r));
    ctx.emit(format!("store {}, {}", r_bool, slot));
    ctx.emit(format!("jump {}", end_label));

    ctx.emit_label(&end_label);
    let result = ctx.fresh_temp();
    ctx.emit(format!("{} = load {}", result, slot));
    Ok(result)
}

pub fn generate_lor_op_ir(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let slot = ctx.fresh_temp();
    ctx.emit(format!("{} = alloc i32", slot));

    let l = lhs.generate_ir(ctx)?;
    let l_bool = ctx.fresh_temp();
    ctx.emit(format!("{} = ne 0, {}", l_bool, l));
    ctx.emit(format!("store {}, {}", l_bool, slot));

    let id = ctx.fresh_label_id();
    let rhs_label = format!("%lor_rhs_{}", id);
    let end_label = format!("%lor_end_{}", id);

    // 左侧为真时跳过右侧
    ctx.emit(format!("br {}, {}, {}", l_bool, end_label, rhs_label));
    ctx.emit_label(&rhs_label);
    let r = rhs.generate_ir(ctx)?;
    let r_bool = ctx.fresh_temp();
    ctx.emit(format!("{} = ne 0, {}", r_bool, r));
    ctx.emit(format!("store {}, {}", r_bool, slot));
    ctx.emit(format!("jump {}", end_label));

    ctx.emit_label(&end_label);
    let result = ctx.fresh_temp();
    ctx.emit(format!("{} = load {}", result, slot));
    Ok(result)
}

pub fn generate_call_ir(
    func_name: &str,
    args: &[Expr],
    span: Span,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let sym = ctx.symtab.lookup(func_name).ok_or_else(|| {
        ctx.error_at_span(format!("Function `{}` not found", func_name), span)
    })?;
    let ret_ty = match sym.kind {
        SymbolKind::Func(ret) => ret,
        _ => {
            return Err(ctx.error_at_span(
                format!("`{}` is not a function", func_name),
                span,
            ))
        }
    };

    // 实参从左到右求值
    let mut ops = Vec::with_capacity(args.len());
    for arg in args {
        ops.push(arg.generate_ir(ctx)?);
    }
    let arg_list = ops.join(", ");

    match ret_ty {
        DataType::Int => {
            let t = ctx.fresh_temp();
            ctx.emit(format!("{} = call @{}({})", t, sym.name, arg_list));
            Ok(t)
        }
        DataType::Void => {
            ctx.emit(format!("call @{}({})", sym.name, arg_list));
            Ok(String::new())
        }
    }
}

/// 行主序展平多维下标, 得到线性偏移的操作数
///
/// `dims` 是概念上的完整维度表, 首维的值不参与计算(形参数组首维未知)。
/// 下标全是字面量时偏移直接折叠成常量。
fn flat_offset(ctx: &mut IrContext, dims: &[usize], index_ops: &[String]) -> String {
    if index_ops.is_empty() {
        return "0".to_string();
    }
    let mut acc = index_ops[0].clone();
    for j in 1..index_ops.len() {
        acc = ctx.fold_or_emit("mul", &acc, &dims[j].to_string());
        acc = ctx.fold_or_emit("add", &acc, &index_ops[j]);
    }
    if index_ops.len() < dims.len() {
        let tail: usize = dims[index_ops.len()..].iter().product();
        acc = ctx.fold_or_emit("mul", &acc, &tail.to_string());
    }
    acc
}

/// 数组访问: 返回指向元素(全下标)或子数组(部分下标)的指针操作数
///
/// 本地/全局数组是一次 `getelemptr`; 形参数组先 `load` 出指针再
/// `getptr`, 不带下标时也发射 `getptr p, 0`, 让下游统一按指针处理。
fn array_access_ptr(
    sym: &Symbol,
    lval: &LVal,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let (full_dims, is_param) = match &sym.kind {
        SymbolKind::Var(VarType::Array(dims)) | SymbolKind::ConstArray(dims) => {
            (dims.clone(), false)
        }
        SymbolKind::Var(VarType::ArrayPtr(sub)) => {
            // 概念维度表: 省略的首维记 0, 不参与步长计算
            let mut dims = Vec::with_capacity(sub.len() + 1);
            dims.push(0);
            dims.extend_from_slice(sub);
            (dims, true)
        }
        _ => {
            return Err(ctx.error_at_span(
                format!("`{}` is not an array", lval.name),
                lval.span,
            ))
        }
    };
    if lval.indices.len() > full_dims.len() {
        return Err(ctx.error_at_span(
            format!("Too many indices for array `{}`", lval.name),
            lval.span,
        ));
    }

    let mut index_ops = Vec::with_capacity(lval.indices.len());
    for index in &lval.indices {
        index_ops.push(index.generate_ir(ctx)?);
    }
    let offset = flat_offset(ctx, &full_dims, &index_ops);

    if is_param {
        let base = ctx.fresh_temp();
        ctx.emit(format!("{} = load @{}", base, sym.name));
        let ptr = ctx.fresh_temp();
        ctx.emit(format!("{} = getptr {}, {}", ptr, base, offset));
        Ok(ptr)
    } else {
        let ptr = ctx.fresh_temp();
        ctx.emit(format!("{} = getelemptr @{}, {}", ptr, sym.name, offset));
        Ok(ptr)
    }
}

/// 右值位置的 LVal
///
/// 常量标量在常量折叠阶段就已变成字面量, 这里兜底处理; 数组全下标
/// 访问读出元素值, 部分下标返回子数组指针(用于传参)。
pub fn generate_lval_ir(lval: &LVal, ctx: &mut IrContext) -> Result<String, CompilerError> {
    let sym = ctx.symtab.lookup(&lval.name).ok_or_else(|| {
        ctx.error_at_span(format!("Identifier `{}` not found", lval.name), lval.span)
    })?;
    match &sym.kind {
        SymbolKind::Const(v) => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span(
                    format!("`{}` is not an array", lval.name),
                    lval.span,
                ));
            }
            Ok(v.to_string())
        }
        SymbolKind::Func(_) => Err(ctx.error_at_span(
            format!("`{}` is a function, not a variable", lval.name),
            lval.span,
        )),
        SymbolKind::Var(VarType::Scalar) => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span(
                    format!("`{}` is not an array", lval.name),
                    lval.span,
                ));
            }
            let t = ctx.fresh_temp();
            ctx.emit(format!("{} = load @{}", t, sym.name));
            Ok(t)
        }
        SymbolKind::Var(ty) => {
            let rank = ty.rank();
            let ptr = array_access_ptr(&sym, lval, ctx)?;
            if lval.indices.len() == rank {
                let t = ctx.fresh_temp();
                ctx.emit(format!("{} = load {}", t, ptr));
                Ok(t)
            } else {
                Ok(ptr)
            }
        }
        SymbolKind::ConstArray(dims) => {
            let rank = dims.len();
            let ptr = array_access_ptr(&sym, lval, ctx)?;
            if lval.indices.len() == rank {
                let t = ctx.fresh_temp();
                ctx.emit(format!("{} = load {}", t, ptr));
                Ok(t)
            } else {
                Ok(ptr)
            }
        }
    }
}

/// 赋值目标位置的 LVal, 返回 store 的目的操作数
pub fn generate_lval_ptr_ir(lval: &LVal, ctx: &mut IrContext) -> Result<String, CompilerError> {
    let sym = ctx.symtab.lookup(&lval.name).ok_or_else(|| {
        ctx.error_at_span(format!("Identifier `{}` not found", lval.name), lval.span)
    })?;
    match &sym.kind {
        SymbolKind::Const(_) | SymbolKind::ConstArray(_) => Err(ctx.error_at_span(
            format!("Cannot assign to constant `{}`", lval.name),
            lval.span,
        )),
        SymbolKind::Func(_) => Err(ctx.error_at_span(
            format!("Cannot assign to function `{}`", lval.name),
            lval.span,
        )),
        SymbolKind::Var(VarType::Scalar) => {
            if !lval.indices.is_empty() {
                return Err(ctx.error_at_span(
                    format!("`{}` is not an array", lval.name),
                    lval.span,
                ));
            }
            Ok(format!("@{}", sym.name))
        }
        SymbolKind::Var(ty) => {
            // 赋值必须落到具体元素上
            if lval.indices.len() != ty.rank() {
                return Err(ctx.error_at_span(
                    format!("Array `{}` must be fully indexed in assignment", lval.name),
                    lval.span,
                ));
            }
            array_access_ptr(&sym, lval, ctx)
        }
    }
}
