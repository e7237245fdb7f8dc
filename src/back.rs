//! # 后端模块
//!
//! 后端把解析好的 Koopa IR 程序翻译成 RISC-V 汇编。
//!
//! ## 主要功能
//!
//! 1. **栈帧规划**
//!    - 每个非 unit 的 IR 值分配一个 4 字节对齐的溢出槽
//!    - alloc 按类型完整大小保留空间, 数组占满整块
//!    - 有调用时保存 ra, 参数超过 8 个时预留出参暂存区
//!    - 总大小对齐到 16 字节
//!
//! 2. **指令选择**
//!    - 每种 IR 指令对应固定的 RISC-V 序列
//!    - 只用 t0-t2 做临时寄存器, a0-a7 传参/返回
//!    - 12 位立即数放不下的偏移先物化再间接访存
//!
//! 3. **全局变量**
//!    - `.data` 段发射 `.word` / `.zero`
//!
//! ## 模块结构
//!
//! - `frame`: 栈帧规划, 偏移分配
//! - `asm`: 逐 IR 指令的汇编生成
//! - `insts`: RISC-V 指令与寄存器定义
//! - `program`: 汇编程序的表示与输出
//! - `context`: 代码生成上下文
//! - `utils`: sp 相对访存辅助

pub mod asm;
pub mod context;
pub mod frame;
pub mod insts;
pub mod program;
pub mod utils;

use koopa::ir::Program;

use crate::back::asm::GenerateAsm;
use crate::back::context::Context;
use crate::CompilerError;

/// 从 Koopa IR 程序生成 RISC-V 汇编文本
pub fn generate_asm(program: &Program) -> Result<String, CompilerError> {
    let mut ctx = Context::new();
    program.generate(program, &mut ctx)?;
    Ok(ctx.program.dump())
}
