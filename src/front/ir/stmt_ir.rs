//! 语句降级
//!
//! 每条语句降级后返回终结标志: 语句内所有控制流路径都以
//! return/break/continue 收尾时为真。块在第一条终结语句处停止,
//! 其后的语句不可达, 直接跳过。

use crate::front::ast::{Block, BlockItem, Expr, LVal, Span, Stmt};
use crate::front::ir::expr_ir::generate_lval_ptr_ir;
use crate::front::ir::{GenerateIR, IrContext};
use crate::CompilerError;

pub fn generate_return_stmt_ir(
    expr: &Option<Expr>,
    ctx: &mut IrContext,
) -> Result<bool, CompilerError> {
    match expr {
        Some(e) => {
            let v = e.generate_ir(ctx)?;
            ctx.emit(format!("ret {}", v));
        }
        None => ctx.emit("ret"),
    }
    Ok(true)
}

pub fn generate_assign_stmt_ir(
    lval: &LVal,
    expr: &Expr,
    ctx: &mut IrContext,
) -> Result<bool, CompilerError> {
    // 先算右值再定位目标
    let v = expr.generate_ir(ctx)?;
    let dest = generate_lval_ptr_ir(lval, ctx)?;
    ctx.emit(format!("store {}, {}", v, dest));
    Ok(false)
}

pub fn generate_expr_stmt_ir(
    expr: &Option<Expr>,
    ctx: &mut IrContext,
) -> Result<bool, CompilerError> {
    if let Some(e) = expr {
        e.generate_ir(ctx)?;
    }
    Ok(false)
}

pub fn generate_block_stmt_ir(block: &Block, ctx: &mut IrContext) -> Result<bool, CompilerError> {
    ctx.symtab.enter_scope();
    let mut terminated = false;
    for item in block {
        match item {
            BlockItem::Decl(decl) => decl.generate_ir(ctx)?,
            BlockItem::Stmt(stmt) => {
                terminated = stmt.generate_ir(ctx)?;
                if terminated {
                    break;
                }
            }
        }
    }
    ctx.symtab.exit_scope()?;
    Ok(terminated)
}

pub fn generate_if_stmt_ir(
    cond: &Expr,
    then_stmt: &Stmt,
    else_stmt: Option<&Stmt>,
    ctx: &mut IrContext,
) -> Result<bool, CompilerError> {
    let c = cond.generate_ir(ctx)?;
    let id = ctx.fresh_label_id();
    let then_label = format!("%then_{}", id);
    let endif_label = format!("%endif_{}", id);

    match else_stmt {
        Some(else_s) => {
            let else_label = format!("%else_{}", id);
            ctx.emit(format!("br {}, {}, {}", c, then_label, else_label));

            ctx.emit_label(&then_label);
            let then_term = then_stmt.generate_ir(ctx)?;
            if !then_term {
                ctx.emit(format!("jump {}", endif_label));
            }

            ctx.emit_label(&else_label);
            let else_term = else_s.generate_ir(ctx)?;
            if !else_term {
                ctx.emit(format!("jump {}", endif_label));
            }

            // 两个分支都终结时汇合块不可达, 不发射
            if !(then_term && else_term) {
                ctx.emit_label(&endif_label);
            }
            Ok(then_term && else_term)
        }
        None => {
            ctx.emit(format!("br {}, {}, {}", c, then_label, endif_label));

            ctx.emit_label(&then_label);
            let then_term = then_stmt.generate_ir(ctx)?;
            if !then_term {
                ctx.emit(format!("jump {}", endif_label));
            }

            ctx.emit_label(&endif_label);
            Ok(false)
        }
    }
}

pub fn generate_while_stmt_ir(
    cond: &Expr,
    body: &Stmt,
    ctx: &mut IrContext,
) -> Result<bool, CompilerError> {
    let id = ctx.fresh_label_id();
    let entry_label = format!("%while_entry_{}", id);
    let body_label = format!("%while_body_{}", id);
    let end_label = format!("%while_end_{}", id);

    ctx.emit(format!("jump {}", entry_label));
    ctx.emit_label(&entry_label);
    let c = cond.generate_ir(ctx)?;
    ctx.emit(format!("br {}, {}, {}", c, body_label, end_label));

    ctx.emit_label(&body_label);
    ctx.symtab
        .enter_loop(entry_label.clone(), end_label.clone());
    let body_term = body.generate_ir(ctx)?;
    ctx.symtab.exit_loop();
    if !body_term {
        ctx.emit(format!("jump {}", entry_label));
    }

    // 循环之后的代码可以经 break 到达, while 本身不终结
    ctx.emit_label(&end_label);
    Ok(false)
}

pub fn generate_break_stmt_ir(span: &Span, ctx: &mut IrContext) -> Result<bool, CompilerError> {
    let target = ctx
        .symtab
        .current_break()
        .map_err(|_| ctx.error_at_span("`break` used outside of loop", *span))?;
    ctx.emit(format!("jump {}", target));
    Ok(true)
}

pub fn generate_continue_stmt_ir(span: &Span, ctx: &mut IrContext) -> Result<bool, CompilerError> {
    let target = ctx
        .symtab
        .current_continue()
        .map_err(|_| ctx.error_at_span("`continue` used outside of loop", *span))?;
    ctx.emit(format!("jump {}", target));
    Ok(true)
}
