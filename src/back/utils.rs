use crate::back::context::Context;
use crate::back::insts::{Instruction, Reg};

// lw/sw 的立即数只有 12 位, 超界偏移先物化到 tmp 再间接访存。
// tmp 做加载目标时可以和 reg 相同; 做存储时必须是另一个寄存器。

pub fn load_reg_with_offset(ctx: &mut Context, reg: Reg, offset: i32, tmp: Reg) {
    if (-2048..=2047).contains(&offset) {
        ctx.program.push(Instruction::Lw(reg, offset, Reg::Sp));
    } else {
        ctx.program.push(Instruction::Li(tmp, offset));
        ctx.program.push(Instruction::Add(tmp, Reg::Sp, tmp));
        ctx.program.push(Instruction::Lw(reg, 0, tmp));
    }
}

pub fn store_reg_with_offset(ctx: &mut Context, reg: Reg, offset: i32, tmp: Reg) {
    if (-2048..=2047).contains(&offset) {
        ctx.program.push(Instruction::Sw(reg, offset, Reg::Sp));
    } else {
        ctx.program.push(Instruction::Li(tmp, offset));
        ctx.program.push(Instruction::Add(tmp, Reg::Sp, tmp));
        ctx.program.push(Instruction::Sw(reg, 0, tmp));
    }
}
