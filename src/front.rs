//! # 前端模块
//!
//! 前端把 SysY 的 AST 降级为 Koopa IR 文本。
//!
//! - `ast`: 语法树节点定义(lalrpop 解析器的输出)
//! - `symbol`: 作用域栈、循环上下文与符号重命名
//! - `consteval`: 常量表达式折叠
//! - `init`: 数组初始化列表展平
//! - `ir`: 逐节点的降级实现

pub mod ast;
pub mod consteval;
pub mod init;
pub mod ir;
pub mod symbol;

use crate::front::ast::CompUnit;
use crate::front::ir::{GenerateIR, IrContext};
use crate::utils::SourceMap;
use crate::CompilerError;

/// 把 AST 降级为 Koopa IR 文本
pub fn generate_ir(
    ast: &CompUnit,
    source_map: Option<SourceMap>,
) -> Result<String, CompilerError> {
    let mut ctx = IrContext::new(source_map);
    ast.generate_ir(&mut ctx)?;
    Ok(ctx.finish())
}
