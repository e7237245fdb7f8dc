use std::collections::HashMap;

use koopa::ir::{BasicBlock, Function, FunctionData, Value, ValueKind};

use crate::back::frame::FrameLayout;
use crate::back::insts::{Instruction, Reg, ARG_REGS};
use crate::back::program::AsmProgram;
use crate::back::utils::{load_reg_with_offset, store_reg_with_offset};
use crate::CompilerError;

/// 汇编生成上下文
///
/// 持有输出程序、当前函数的栈帧布局、基本块标签映射和全局符号名。
pub struct Context {
    pub program: AsmProgram,
    pub frame: FrameLayout,
    /// 全局 alloc 到符号名的映射(已去掉 `@` 前缀)
    pub global_names: HashMap<Value, String>,
    /// 基本块到汇编标签的映射, 按函数重建
    pub bb_labels: HashMap<BasicBlock, String>,
    pub current_func: Option<Function>,
    pub current_inst: Option<Value>,
    pub func_name: String,
}

impl Context {
    pub fn new() -> Self {
        Self {
            program: AsmProgram::new(),
            frame: FrameLayout::empty(),
            global_names: HashMap::new(),
            bb_labels: HashMap::new(),
            current_func: None,
            current_inst: None,
            func_name: String::new(),
        }
    }

    pub fn reset_for_function(&mut self, name: &str, frame: FrameLayout) {
        self.frame = frame;
        self.bb_labels.clear();
        self.current_inst = None;
        self.func_name = name.to_string();
    }

    /// 每个函数唯一的出口标签, return 统一跳到这里
    pub fn epilogue_label(&self) -> String {
        format!("{}_epilogue", self.func_name)
    }

    pub fn bb_label(&self, bb: BasicBlock) -> Result<String, CompilerError> {
        self.bb_labels.get(&bb).cloned().ok_or_else(|| {
            CompilerError::CodeGenerationError(format!("Basic block {:?} has no label", bb))
        })
    }

    /// 把一个值操作数装入指定寄存器
    ///
    /// 立即数用 li; 函数参数前 8 个来自 a0-a7, 其余在调用者栈帧里;
    /// alloc 的"值"是它的地址; 其他指令结果从各自的溢出槽读回。
    pub fn load_operand(
        &mut self,
        val: Value,
        reg: Reg,
        func: &FunctionData,
    ) -> Result<(), CompilerError> {
        if let Some(name) = self.global_names.get(&val).cloned() {
            self.program.push(Instruction::La(reg, name));
            return Ok(());
        }
        let data = func.dfg().value(val);
        match data.kind() {
            ValueKind::Integer(i) => {
                self.program.push(Instruction::Li(reg, i.value()));
                Ok(())
            }
            ValueKind::FuncArgRef(arg) => {
                let idx = arg.index();
                if idx < 8 {
                    self.program.push(Instruction::Mv(reg, ARG_REGS[idx]));
                } else {
                    // 第 9 个起在调用者栈帧里, 位于本帧之上
                    let offset = self.frame.size + ((idx - 8) * 4) as i32;
                    load_reg_with_offset(self, reg, offset, reg);
                }
                Ok(())
            }
            ValueKind::Alloc(_) => self.load_slot_address(val, reg),
            _ => {
                let offset = self.frame.offset_of(val).ok_or_else(|| {
                    CompilerError::CodeGenerationError(format!(
                        "Value {:?} has no stack slot",
                        val
                    ))
                })?;
                load_reg_with_offset(self, reg, offset, reg);
                Ok(())
            }
        }
    }

    /// 把 alloc 区域的地址算进寄存器
    pub fn load_slot_address(&mut self, val: Value, reg: Reg) -> Result<(), CompilerError> {
        let offset = self.frame.offset_of(val).ok_or_else(|| {
            CompilerError::CodeGenerationError(format!("Alloc {:?} has no stack slot", val))
        })?;
        if (-2048..=2047).contains(&offset) {
            self.program.push(Instruction::Addi(reg, Reg::Sp, offset));
        } else {
            self.program.push(Instruction::Li(reg, offset));
            self.program.push(Instruction::Add(reg, Reg::Sp, reg));
        }
        Ok(())
    }

    /// 把寄存器写回指令结果的溢出槽
    pub fn save_result(&mut self, val: Value, reg: Reg, tmp: Reg) -> Result<(), CompilerError> {
        let offset = self.frame.offset_of(val).ok_or_else(|| {
            CompilerError::CodeGenerationError(format!("Value {:?} has no stack slot", val))
        })?;
        store_reg_with_offset(self, reg, offset, tmp);
        Ok(())
    }

    /// 调整栈指针, 处理超出 imm12 的栈帧
    pub fn adjust_sp(&mut self, delta: i32) {
        if (-2048..=2047).contains(&delta) {
            self.program.push(Instruction::Addi(Reg::Sp, Reg::Sp, delta));
        } else {
            self.program.push(Instruction::Li(Reg::T0, delta));
            self.program.push(Instruction::Add(Reg::Sp, Reg::Sp, Reg::T0));
        }
    }
}
