//! # 汇编生成模块
//!
//! 为每种 Koopa IR 指令实现对应的 RISC-V 生成逻辑。
//!
//! ## 生成策略
//!
//! - 所有非 unit 值都在栈上有溢出槽, 计算前读入 t0/t1, 算完写回
//! - t2 只在地址计算时当第三个暂存
//! - 比较与逻辑运算展开成多条指令(xor/snez/seqz/slt/sgt 组合)
//! - return 把值放进 a0 后统一跳到函数出口标签, 出口处恢复 ra 和 sp
//! - 非入口基本块的标签带函数名前缀, 不同函数的同名块互不冲突

use koopa::ir::entities::ValueData;
use koopa::ir::values::{Binary, Branch, Call, GetElemPtr, GetPtr, Jump, Load, Return, Store};
use koopa::ir::{BinaryOp, FunctionData, Program, TypeKind, Value, ValueKind};

use crate::back::context::Context;
use crate::back::frame::FrameLayout;
use crate::back::insts::{Instruction, Reg, ARG_REGS};
use crate::back::utils::{load_reg_with_offset, store_reg_with_offset};
use crate::CompilerError;

pub trait GenerateAsm {
    fn generate(&self, program: &Program, ctx: &mut Context) -> Result<(), CompilerError>;
}

impl GenerateAsm for Program {
    fn generate(&self, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
        // 先产出 .data 段的全局变量
        for &value in self.inst_layout() {
            let is_global_alloc =
                matches!(self.borrow_value(value).kind(), ValueKind::GlobalAlloc(_));
            if is_global_alloc {
                generate_global_alloc(program, ctx, value)?;
            }
        }
        // 再产出 .text 段; 库函数只有声明没有基本块, 跳过
        for &func in self.func_layout() {
            let func_data = self.func(func);
            if func_data.layout().entry_bb().is_none() {
                continue;
            }
            ctx.current_func = Some(func);
            func_data.generate(program, ctx)?;
        }
        Ok(())
    }
}

impl GenerateAsm for FunctionData {
    fn generate(&self, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
        let name = &self.name()[1..];
        let frame = FrameLayout::plan(self)?;
        ctx.reset_for_function(name, frame);

        ctx.program.push(Instruction::Section(".text".to_string()));
        ctx.program.push(Instruction::Global(name.to_string()));
        ctx.program.push(Instruction::Label(name.to_string()));

        // 基本块标签: 入口块复用函数标签, 其余用 函数名_块名
        let mut bb_index = 0;
        for (bb, _node) in self.layout().bbs() {
            let label = if bb_index == 0 {
                name.to_string()
            } else {
                match self.dfg().bb(*bb).name() {
                    Some(bb_name) => {
                        let trimmed = bb_name.trim_start_matches(|c| c == '%' || c == '@');
                        format!("{}_{}", name, trimmed)
                    }
                    None => format!("{}_bb{}", name, bb_index),
                }
            };
            ctx.bb_labels.insert(*bb, label);
            bb_index += 1;
        }

        // prologue: 压栈, 保存 ra
        let size = ctx.frame.size;
        ctx.adjust_sp(-size);
        if ctx.frame.ra_saved {
            let offset = ctx.frame.ra_offset();
            store_reg_with_offset(ctx, Reg::Ra, offset, Reg::T0);
        }

        let mut first = true;
        for (bb, node) in self.layout().bbs() {
            if !first {
                let label = ctx.bb_label(*bb)?;
                ctx.program.push(Instruction::Label(label));
            }
            first = false;
            for &inst in node.insts().keys() {
                ctx.current_inst = Some(inst);
                self.dfg().value(inst).generate(program, ctx)?;
            }
        }

        // epilogue: 恢复 ra, 退栈
        let epilogue = ctx.epilogue_label();
        ctx.program.push(Instruction::Label(epilogue));
        if ctx.frame.ra_saved {
            let offset = ctx.frame.ra_offset();
            load_reg_with_offset(ctx, Reg::Ra, offset, Reg::T0);
        }
        ctx.adjust_sp(size);
        ctx.program.push(Instruction::Ret);
        Ok(())
    }
}

impl GenerateAsm for ValueData {
    fn generate(&self, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
        match self.kind() {
            ValueKind::Return(ret) => generate_return(ret, program, ctx),
            ValueKind::Binary(bin) => generate_binary(bin, program, ctx),
            ValueKind::Load(load) => generate_load(load, program, ctx),
            ValueKind::Store(store) => generate_store(store, program, ctx),
            ValueKind::Branch(branch) => generate_branch(branch, program, ctx),
            ValueKind::Jump(jump) => generate_jump(jump, ctx),
            ValueKind::Call(call) => generate_call(call, program, ctx),
            ValueKind::GetElemPtr(gep) => generate_get_elem_ptr(gep, program, ctx),
            ValueKind::GetPtr(gp) => generate_get_ptr(gp, program, ctx),
            // alloc 在栈帧规划阶段处理; 整数作为操作数按需加载
            ValueKind::Alloc(_) | ValueKind::Integer(_) | ValueKind::ZeroInit(_) => Ok(()),
            other => Err(CompilerError::CodeGenerationError(format!(
                "Unsupported instruction kind: {:?}",
                other
            ))),
        }
    }
}

fn current_func_data<'p>(
    program: &'p Program,
    ctx: &Context,
) -> Result<&'p FunctionData, CompilerError> {
    let func = ctx.current_func.ok_or_else(|| {
        CompilerError::CodeGenerationError("No current function context".to_string())
    })?;
    Ok(program.func(func))
}

fn current_inst(ctx: &Context) -> Result<Value, CompilerError> {
    ctx.current_inst.ok_or_else(|| {
        CompilerError::CodeGenerationError("No current instruction context".to_string())
    })
}

fn generate_return(ret: &Return, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    if let Some(value) = ret.value() {
        let func = current_func_data(program, ctx)?;
        ctx.load_operand(value, Reg::A0, func)?;
    }
    let epilogue = ctx.epilogue_label();
    ctx.program.push(Instruction::J(epilogue));
    Ok(())
}

fn generate_binary(bin: &Binary, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let inst = current_inst(ctx)?;
    let func = current_func_data(program, ctx)?;
    ctx.load_operand(bin.lhs(), Reg::T0, func)?;
    ctx.load_operand(bin.rhs(), Reg::T1, func)?;

    match bin.op() {
        BinaryOp::Add => ctx.program.push(Instruction::Add(Reg::T0, Reg::T0, Reg::T1)),
        BinaryOp::Sub => ctx.program.push(Instruction::Sub(Reg::T0, Reg::T0, Reg::T1)),
        BinaryOp::Mul => ctx.program.push(Instruction::Mul(Reg::T0, Reg::T0, Reg::T1)),
        BinaryOp::Div => ctx.program.push(Instruction::Div(Reg::T0, Reg::T0, Reg::T1)),
        BinaryOp::Mod => ctx.program.push(Instruction::Rem(Reg::T0, Reg::T0, Reg::T1)),
        BinaryOp::Eq => {
            ctx.program.push(Instruction::Xor(Reg::T0, Reg::T0, Reg::T1));
            ctx.program.push(Instruction::Seqz(Reg::T0, Reg::T0));
        }
        BinaryOp::NotEq => {
            ctx.program.push(Instruction::Xor(Reg::T0, Reg::T0, Reg::T1));
            ctx.program.push(Instruction::Snez(Reg::T0, Reg::T0));
        }
        BinaryOp::Lt => ctx.program.push(Instruction::Slt(Reg::T0, Reg::T0, Reg::T1)),
        BinaryOp::Gt => ctx.program.push(Instruction::Sgt(Reg::T0, Reg::T0, Reg::T1)),
        BinaryOp::Le => {
            ctx.program.push(Instruction::Sgt(Reg::T0, Reg::T0, Reg::T1));
            ctx.program.push(Instruction::Seqz(Reg::T0, Reg::T0));
        }
        BinaryOp::Ge => {
            ctx.program.push(Instruction::Slt(Reg::T0, Reg::T0, Reg::T1));
            ctx.program.push(Instruction::Seqz(Reg::T0, Reg::T0));
        }
        // 先布尔化再按位与, 否则 2 && 1 会算错
        BinaryOp::And => {
            ctx.program.push(Instruction::Snez(Reg::T0, Reg::T0));
            ctx.program.push(Instruction::Snez(Reg::T1, Reg::T1));
            ctx.program.push(Instruction::And(Reg::T0, Reg::T0, Reg::T1));
        }
        BinaryOp::Or => {
            ctx.program.push(Instruction::Or(Reg::T0, Reg::T0, Reg::T1));
            ctx.program.push(Instruction::Snez(Reg::T0, Reg::T0));
        }
        BinaryOp::Xor => ctx.program.push(Instruction::Xor(Reg::T0, Reg::T0, Reg::T1)),
        other => {
            return Err(CompilerError::CodeGenerationError(format!(
                "Unsupported binary operator: {:?}",
                other
            )))
        }
    }
    ctx.save_result(inst, Reg::T0, Reg::T1)
}

fn generate_load(load: &Load, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let inst = current_inst(ctx)?;
    let src = load.src();
    if let Some(name) = ctx.global_names.get(&src).cloned() {
        // 全局变量: la + lw
        ctx.program.push(Instruction::La(Reg::T0, name));
        ctx.program.push(Instruction::Lw(Reg::T0, 0, Reg::T0));
    } else {
        let func = current_func_data(program, ctx)?;
        if matches!(func.dfg().value(src).kind(), ValueKind::Alloc(_)) {
            let offset = ctx.frame.offset_of(src).ok_or_else(|| {
                CompilerError::CodeGenerationError(format!("Alloc {:?} has no stack slot", src))
            })?;
            load_reg_with_offset(ctx, Reg::T0, offset, Reg::T0);
        } else {
            // 指针临时值: 先取出指针, 再从指针取数
            ctx.load_operand(src, Reg::T0, func)?;
            ctx.program.push(Instruction::Lw(Reg::T0, 0, Reg::T0));
        }
    }
    ctx.save_result(inst, Reg::T0, Reg::T1)
}

fn generate_store(store: &Store, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let func = current_func_data(program, ctx)?;
    ctx.load_operand(store.value(), Reg::T0, func)?;
    let dest = store.dest();
    if let Some(name) = ctx.global_names.get(&dest).cloned() {
        ctx.program.push(Instruction::La(Reg::T1, name));
        ctx.program.push(Instruction::Sw(Reg::T0, 0, Reg::T1));
    } else if matches!(func.dfg().value(dest).kind(), ValueKind::Alloc(_)) {
        let offset = ctx.frame.offset_of(dest).ok_or_else(|| {
            CompilerError::CodeGenerationError(format!("Alloc {:?} has no stack slot", dest))
        })?;
        store_reg_with_offset(ctx, Reg::T0, offset, Reg::T1);
    } else {
        ctx.load_operand(dest, Reg::T1, func)?;
        ctx.program.push(Instruction::Sw(Reg::T0, 0, Reg::T1));
    }
    Ok(())
}

fn generate_branch(branch: &Branch, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let func = current_func_data(program, ctx)?;
    ctx.load_operand(branch.cond(), Reg::T0, func)?;
    let true_label = ctx.bb_label(branch.true_bb())?;
    let false_label = ctx.bb_label(branch.false_bb())?;
    ctx.program.push(Instruction::Bnez(Reg::T0, true_label));
    ctx.program.push(Instruction::J(false_label));
    Ok(())
}

fn generate_jump(jump: &Jump, ctx: &mut Context) -> Result<(), CompilerError> {
    let target = ctx.bb_label(jump.target())?;
    ctx.program.push(Instruction::J(target));
    Ok(())
}

fn generate_call(call: &Call, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let func = current_func_data(program, ctx)?;
    // 前 8 个参数进 a0-a7, 其余放进栈顶的出参暂存区
    for (idx, &arg) in call.args().iter().enumerate() {
        if idx < 8 {
            ctx.load_operand(arg, ARG_REGS[idx], func)?;
        } else {
            ctx.load_operand(arg, Reg::T0, func)?;
            store_reg_with_offset(ctx, Reg::T0, ((idx - 8) * 4) as i32, Reg::T1);
        }
    }

    let callee_name = program.func(call.callee()).name()[1..].to_string();
    ctx.program.push(Instruction::Call(callee_name));

    // 有返回值时把 a0 落到本指令的溢出槽
    let inst = current_inst(ctx)?;
    if !func.dfg().value(inst).ty().is_unit() {
        ctx.save_result(inst, Reg::A0, Reg::T0)?;
    }
    Ok(())
}

fn generate_global_alloc(
    program: &Program,
    ctx: &mut Context,
    value: Value,
) -> Result<(), CompilerError> {
    let data = program.borrow_value(value);
    let init = match data.kind() {
        ValueKind::GlobalAlloc(galloc) => galloc.init(),
        _ => return Ok(()),
    };
    let name = data
        .name()
        .as_ref()
        .ok_or_else(|| {
            CompilerError::CodeGenerationError(format!("Global value {:?} has no name", value))
        })?
        .trim_start_matches('@')
        .to_string();
    drop(data);
    ctx.global_names.insert(value, name.clone());

    ctx.program.push(Instruction::Section(".data".to_string()));
    ctx.program.push(Instruction::Global(name.clone()));
    ctx.program.push(Instruction::Label(name));
    emit_global_init(init, program, ctx)
}

fn emit_global_init(init: Value, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    // 先把需要的信息拷出来, 再释放对 Program 的借用
    enum Item {
        Word(i32),
        Zero(i32),
        Elems(Vec<Value>),
    }
    let item = {
        let data = program.borrow_value(init);
        match data.kind() {
            ValueKind::Integer(i) => Item::Word(i.value()),
            ValueKind::ZeroInit(_) => Item::Zero(data.ty().size() as i32),
            ValueKind::Aggregate(agg) => Item::Elems(agg.elems().to_vec()),
            other => {
                return Err(CompilerError::CodeGenerationError(format!(
                    "Unsupported global initializer: {:?}",
                    other
                )))
            }
        }
    };
    match item {
        Item::Word(v) => ctx.program.push(Instruction::Word(v)),
        Item::Zero(size) => ctx.program.push(Instruction::Zero(size)),
        Item::Elems(elems) => {
            for elem in elems {
                emit_global_init(elem, program, ctx)?;
            }
        }
    }
    Ok(())
}

fn generate_get_elem_ptr(
    gep: &GetElemPtr,
    program: &Program,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    let inst = current_inst(ctx)?;
    let func = current_func_data(program, ctx)?;
    let src = gep.src();

    // 基地址: 全局用 la, 本地 alloc 取栈上地址, 其余是已算好的指针
    let src_ty = if let Some(name) = ctx.global_names.get(&src).cloned() {
        ctx.program.push(Instruction::La(Reg::T0, name));
        program.borrow_value(src).ty().clone()
    } else {
        if matches!(func.dfg().value(src).kind(), ValueKind::Alloc(_)) {
            ctx.load_slot_address(src, Reg::T0)?;
        } else {
            ctx.load_operand(src, Reg::T0, func)?;
        }
        func.dfg().value(src).ty().clone()
    };
    let elem_size = match src_ty.kind() {
        TypeKind::Pointer(base) => match base.kind() {
            TypeKind::Array(elem, _) => elem.size() as i32,
            _ => {
                return Err(CompilerError::CodeGenerationError(format!(
                    "getelemptr source is not a pointer to array: {:?}",
                    src_ty
                )))
            }
        },
        _ => {
            return Err(CompilerError::CodeGenerationError(format!(
                "getelemptr source is not a pointer: {:?}",
                src_ty
            )))
        }
    };

    ctx.load_operand(gep.index(), Reg::T1, func)?;
    ctx.program.push(Instruction::Li(Reg::T2, elem_size));
    ctx.program.push(Instruction::Mul(Reg::T1, Reg::T1, Reg::T2));
    ctx.program.push(Instruction::Add(Reg::T0, Reg::T0, Reg::T1));
    ctx.save_result(inst, Reg::T0, Reg::T1)
}

fn generate_get_ptr(gp: &GetPtr, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let inst = current_inst(ctx)?;
    let func = current_func_data(program, ctx)?;
    let src = gp.src();

    // 基地址本身就是指针值, 从溢出槽读回而不是取址
    ctx.load_operand(src, Reg::T0, func)?;
    let src_ty = if ctx.global_names.contains_key(&src) {
        program.borrow_value(src).ty().clone()
    } else {
        func.dfg().value(src).ty().clone()
    };
    let elem_size = match src_ty.kind() {
        TypeKind::Pointer(base) => base.size() as i32,
        _ => {
            return Err(CompilerError::CodeGenerationError(format!(
                "getptr source is not a pointer: {:?}",
                src_ty
            )))
        }
    };

    ctx.load_operand(gp.index(), Reg::T1, func)?;
    ctx.program.push(Instruction::Li(Reg::T2, elem_size));
    ctx.program.push(Instruction::Mul(Reg::T1, Reg::T1, Reg::T2));
    ctx.program.push(Instruction::Add(Reg::T0, Reg::T0, Reg::T1));
    ctx.save_result(inst, Reg::T0, Reg::T1)
}
