//! SysY 编译器: 前端降级到 Koopa IR 文本, 后端再翻译成 RISC-V 汇编。
//!
//! 以库形式暴露各阶段, `compiler` 二进制只是一层命令行驱动。

use lalrpop_util::lalrpop_mod;

pub mod back;
pub mod front;
pub mod utils;

pub use utils::CompilerError;

// lalrpop 在构建时从 src/sysy.lalrpop 生成解析器
lalrpop_mod!(pub sysy);
