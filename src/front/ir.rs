//! # AST 到 Koopa IR 的降级
//!
//! 逐节点遍历 AST, 向上下文的文本缓冲追加 Koopa IR。符号解析、常量
//! 折叠、短路求值、终结分析和数组展平都在这一趟完成; 产出的 IR 文本
//! 既可以直接输出(-koopa), 也可以交给 koopa 的解析器建图后走后端。

pub mod context;
pub mod expr_ir;
pub mod stmt_ir;

pub use context::IrContext;

use crate::front::ast::*;
use crate::front::consteval;
use crate::front::init;
use crate::front::symbol::{SymbolKind, VarType};
use crate::CompilerError;
use expr_ir::*;
use stmt_ir::*;

pub trait GenerateIR {
    type Output;
    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError>;
}

impl GenerateIR for CompUnit {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        declare_library_functions(ctx)?;
        // 顶层项按源码顺序处理
        for item in &self.items {
            match item {
                GlobalItem::Decl(decl) => decl.generate_ir(ctx)?,
                GlobalItem::FuncDef(func) => func.generate_ir(ctx)?,
            }
        }
        Ok(())
    }
}

/// 预先声明 SysY 运行时库的八个过程并登记为函数符号
fn declare_library_functions(ctx: &mut IrContext) -> Result<(), CompilerError> {
    let decls: [(&str, &str, DataType); 8] = [
        ("getint", "", DataType::Int),
        ("getch", "", DataType::Int),
        ("getarray", "*i32", DataType::Int),
        ("putint", "i32", DataType::Void),
        ("putch", "i32", DataType::Void),
        ("putarray", "i32, *i32", DataType::Void),
        ("starttime", "", DataType::Void),
        ("stoptime", "", DataType::Void),
    ];
    for (name, params, ret) in decls {
        let ret_text = match ret {
            DataType::Int => ": i32",
            DataType::Void => "",
        };
        ctx.emit_top(format!("decl @{}({}){}", name, params, ret_text));
        ctx.symtab.add(name, SymbolKind::Func(ret))?;
    }
    ctx.emit_blank();
    Ok(())
}

/// 求各维长度, 必须是正的常量
fn eval_dims(
    dims: &[Expr],
    ctx: &IrContext,
    span: Span,
) -> Result<Vec<usize>, CompilerError> {
    let mut out = Vec::with_capacity(dims.len());
    for dim in dims {
        let v = consteval::eval(dim, &ctx.symtab)
            .map_err(|_| ctx.error_at_span("Array dimension is not a constant", span))?;
        if v <= 0 {
            return Err(ctx.error_at_span("Array dimension must be positive", span));
        }
        out.push(v as usize);
    }
    Ok(out)
}

impl GenerateIR for FuncDef {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        // 临时值和标签计数按函数重置
        ctx.reset_counters();
        ctx.ret_ty = self.ty;

        // 形参类型: 标量 i32, 数组形参退化为 *i32, 余下维度记在符号里
        let mut param_types = Vec::with_capacity(self.params.len());
        for param in &self.params {
            if param.is_array {
                let dims = eval_dims(&param.dims, ctx, param.span)?;
                param_types.push(VarType::ArrayPtr(dims));
            } else {
                param_types.push(VarType::Scalar);
            }
        }

        ctx.symtab
            .add(&self.name, SymbolKind::Func(self.ty))
            .map_err(|_| {
                ctx.error_at_span(format!("Function `{}` already declared", self.name), self.span)
            })?;

        let sig = param_types
            .iter()
            .enumerate()
            .map(|(i, ty)| format!("%p{}: {}", i, param_type_text(ty)))
            .collect::<Vec<_>>()
            .join(", ");
        let ret_text = match self.ty {
            DataType::Int => ": i32",
            DataType::Void => "",
        };
        ctx.emit_top(format!("fun @{}({}){} {{", self.name, sig, ret_text));
        ctx.emit_label("%entry");

        // 形参作用域: 每个形参立刻落到栈槽里, 之后当普通变量使用
        ctx.symtab.enter_scope();
        for (i, (param, ty)) in self.params.iter().zip(&param_types).enumerate() {
            let sym = ctx
                .symtab
                .add(&param.name, SymbolKind::Var(ty.clone()))
                .map_err(|_| {
                    ctx.error_at_span(
                        format!("Parameter `{}` already declared", param.name),
                        param.span,
                    )
                })?;
            ctx.emit(format!("@{} = alloc {}", sym.name, param_type_text(ty)));
            ctx.emit(format!("store %p{}, @{}", i, sym.name));
        }

        let terminated = generate_block_stmt_ir(&self.body, ctx)?;
        // 函数体没有终结时合成默认 return
        if !terminated {
            match self.ty {
                DataType::Int => ctx.emit("ret 0"),
                DataType::Void => ctx.emit("ret"),
            }
        }
        ctx.symtab.exit_scope()?;

        ctx.emit_top("}");
        ctx.emit_blank();
        Ok(())
    }
}

fn param_type_text(ty: &VarType) -> &'static str {
    match ty {
        VarType::Scalar => "i32",
        _ => "*i32",
    }
}

impl GenerateIR for Stmt {
    type Output = bool;

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Stmt::Return(expr) => generate_return_stmt_ir(expr, ctx),
            Stmt::Assign(lval, expr) => generate_assign_stmt_ir(lval, expr, ctx),
            Stmt::Block(block) => generate_block_stmt_ir(block, ctx),
            Stmt::Expr(expr) => generate_expr_stmt_ir(expr, ctx),
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
                ..
            } => generate_if_stmt_ir(cond, then_stmt, else_stmt.as_deref(), ctx),
            Stmt::While { cond, body, .. } => generate_while_stmt_ir(cond, body, ctx),
            Stmt::Break(span) => generate_break_stmt_ir(span, ctx),
            Stmt::Continue(span) => generate_continue_stmt_ir(span, ctx),
        }
    }
}

impl GenerateIR for Expr {
    type Output = String;

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        // 可折叠的表达式直接变字面量, 不产生指令
        if let Ok(v) = consteval::eval(self, &ctx.symtab) {
            return Ok(v.to_string());
        }
        match self {
            Expr::IntLiteral(n, _) => Ok(n.to_string()),
            Expr::LVal(lval) => generate_lval_ir(lval, ctx),
            Expr::UnaryOp(op, expr, _) => generate_unary_op_ir(op, expr, ctx),
            Expr::BinaryOp(op, lhs, rhs, _) => generate_binary_op_ir(op, lhs, rhs, ctx),
            Expr::RelOp(op, lhs, rhs, _) => generate_rel_op_ir(op, lhs, rhs, ctx),
            Expr::EqOp(op, lhs, rhs, _) => generate_eq_op_ir(op, lhs, rhs, ctx),
            Expr::LAndOp(_, lhs, rhs, _) => generate_land_op_ir(lhs, rhs, ctx),
            Expr::LOrOp(_, lhs, rhs, _) => generate_lor_op_ir(lhs, rhs, ctx),
            Expr::Call(name, args, span) => generate_call_ir(name, args, *span, ctx),
        }
    }
}

impl GenerateIR for Decl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Decl::ConstDecl(decl) => decl.generate_ir(ctx),
            Decl::VarDecl(decl) => decl.generate_ir(ctx),
        }
    }
}

impl GenerateIR for ConstDecl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        for def in &self.defs {
            if def.dims.is_empty() {
                // 常量标量折叠进符号表, 不产生 IR
                let expr = match &def.init {
                    ConstInitVal::Single(e) => e,
                    ConstInitVal::List(_) => {
                        return Err(ctx.error_at_span(
                            format!("Scalar constant `{}` cannot take a braced initializer", def.name),
                            def.span,
                        ))
                    }
                };
                let v = consteval::eval(expr, &ctx.symtab).map_err(|_| {
                    ctx.error_at_span(
                        format!("Initializer of constant `{}` is not constant", def.name),
                        def.span,
                    )
                })?;
                ctx.symtab.add(&def.name, SymbolKind::Const(v))?;
            } else {
                let dims = eval_dims(&def.dims, ctx, def.span)?;
                let items = match &def.init {
                    ConstInitVal::List(items) => items,
                    ConstInitVal::Single(_) => {
                        return Err(ctx.error_at_span(
                            format!("Array `{}` must be initialized with a list", def.name),
                            def.span,
                        ))
                    }
                };
                let vals = init::flatten_const(items, &dims, &ctx.symtab)?;
                let sym = ctx.symtab.add(&def.name, SymbolKind::ConstArray(dims))?;
                if ctx.symtab.is_global() {
                    emit_global_array(ctx, &sym.name, &vals);
                } else {
                    ctx.emit(format!("@{} = alloc [i32, {}]", sym.name, vals.len()));
                    for (i, v) in vals.iter().enumerate() {
                        let ptr = ctx.fresh_temp();
                        ctx.emit(format!("{} = getelemptr @{}, {}", ptr, sym.name, i));
                        ctx.emit(format!("store {}, {}", v, ptr));
                    }
                }
            }
        }
        Ok(())
    }
}

impl GenerateIR for VarDecl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        for def in &self.defs {
            if def.dims.is_empty() {
                generate_scalar_var(def, ctx)?;
            } else {
                generate_array_var(def, ctx)?;
            }
        }
        Ok(())
    }
}

fn generate_scalar_var(def: &VarDef, ctx: &mut IrContext) -> Result<(), CompilerError> {
    if ctx.symtab.is_global() {
        // 全局变量的初始化值必须可折叠
        let init_text = match &def.init {
            Some(InitVal::Single(e)) => consteval::eval(e, &ctx.symtab)
                .map_err(|_| {
                    ctx.error_at_span(
                        format!("Global initializer of `{}` is not constant", def.name),
                        def.span,
                    )
                })?
                .to_string(),
            Some(InitVal::List(_)) => {
                return Err(ctx.error_at_span(
                    format!("Scalar `{}` cannot take a braced initializer", def.name),
                    def.span,
                ))
            }
            None => "zeroinit".to_string(),
        };
        let sym = ctx.symtab.add(&def.name, SymbolKind::Var(VarType::Scalar))?;
        ctx.emit_top(format!("global @{} = alloc i32, {}", sym.name, init_text));
    } else {
        let sym = ctx.symtab.add(&def.name, SymbolKind::Var(VarType::Scalar))?;
        ctx.emit(format!("@{} = alloc i32", sym.name));
        match &def.init {
            Some(InitVal::Single(e)) => {
                let v = e.generate_ir(ctx)?;
                ctx.emit(format!("store {}, @{}", v, sym.name));
            }
            Some(InitVal::List(_)) => {
                return Err(ctx.error_at_span(
                    format!("Scalar `{}` cannot take a braced initializer", def.name),
                    def.span,
                ))
            }
            None => {}
        }
    }
    Ok(())
}

fn generate_array_var(def: &VarDef, ctx: &mut IrContext) -> Result<(), CompilerError> {
    let dims = eval_dims(&def.dims, ctx, def.span)?;
    let total: usize = dims.iter().product();

    let flat = match &def.init {
        Some(InitVal::List(items)) => Some(init::flatten_var(items, &dims)?),
        Some(InitVal::Single(_)) => {
            return Err(ctx.error_at_span(
                format!("Array `{}` must be initialized with a list", def.name),
                def.span,
            ))
        }
        None => None,
    };

    if ctx.symtab.is_global() {
        // 全局数组: 聚合初始化值逐项折叠, 未初始化则 zeroinit
        let body = match &flat {
            Some(slots) => {
                let mut vals = Vec::with_capacity(total);
                for slot in slots {
                    let v = match slot {
                        Some(e) => consteval::eval(e, &ctx.symtab).map_err(|_| {
                            ctx.error_at_span(
                                format!("Global initializer of `{}` is not constant", def.name),
                                def.span,
                            )
                        })?,
                        None => 0,
                    };
                    vals.push(v);
                }
                aggregate_text(&vals)
            }
            None => "zeroinit".to_string(),
        };
        let sym = ctx
            .symtab
            .add(&def.name, SymbolKind::Var(VarType::Array(dims)))?;
        ctx.emit_top(format!(
            "global @{} = alloc [i32, {}], {}",
            sym.name, total, body
        ));
    } else {
        let sym = ctx
            .symtab
            .add(&def.name, SymbolKind::Var(VarType::Array(dims)))?;
        ctx.emit(format!("@{} = alloc [i32, {}]", sym.name, total));
        if let Some(slots) = flat {
            // 有初始化列表时逐个展平位置写入, 缺省位置补零
            for (i, slot) in slots.iter().enumerate() {
                let v = match slot {
                    Some(e) => e.generate_ir(ctx)?,
                    None => "0".to_string(),
                };
                let ptr = ctx.fresh_temp();
                ctx.emit(format!("{} = getelemptr @{}, {}", ptr, sym.name, i));
                ctx.emit(format!("store {}, {}", v, ptr));
            }
        }
    }
    Ok(())
}

fn emit_global_array(ctx: &mut IrContext, name: &str, vals: &[i32]) {
    ctx.emit_top(format!(
        "global @{} = alloc [i32, {}], {}",
        name,
        vals.len(),
        aggregate_text(vals)
    ));
}

fn aggregate_text(vals: &[i32]) -> String {
    format!(
        "{{{}}}",
        vals.iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}
