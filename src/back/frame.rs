//! # 栈帧规划
//!
//! 每个函数在进入代码生成前先做一趟布局: 所有非 unit 类型的指令结果
//! 都分到一个 4 字节对齐的溢出槽, alloc 按其指向类型的完整大小保留
//! 空间。布局结果:
//!
//! ```text
//! +---------------------+ <- sp + size
//! |   ra (有调用时)      |
//! +---------------------+
//! |   溢出槽 / alloc 区  |
//! +---------------------+ <- sp + arg_area
//! |   出参暂存区         |  (调用参数超过 8 个时)
//! +---------------------+ <- sp
//! ```
//!
//! 所有偏移都是调整 sp 之后的最终值, 从出参暂存区之上开始编排。
//! 总大小向上对齐到 16 字节且至少 16。

use std::collections::HashMap;

use koopa::ir::{FunctionData, TypeKind, Value, ValueKind};

use crate::CompilerError;

pub struct FrameLayout {
    /// 16 字节对齐后的栈帧总大小
    pub size: i32,
    /// 函数内是否有 call, 有则保存 ra
    pub ra_saved: bool,
    /// 出参暂存区大小: max(0, 最大实参数 - 8) * 4
    pub arg_area: i32,
    offsets: HashMap<Value, i32>,
}

impl FrameLayout {
    /// 空布局, 在进入第一个函数前占位
    pub fn empty() -> Self {
        Self {
            size: 0,
            ra_saved: false,
            arg_area: 0,
            offsets: HashMap::new(),
        }
    }

    /// 扫描函数的全部指令, 计算栈帧布局
    pub fn plan(func: &FunctionData) -> Result<Self, CompilerError> {
        let mut ra_saved = false;
        let mut max_extra_args = 0usize;
        for (_bb, node) in func.layout().bbs() {
            for &inst in node.insts().keys() {
                if let ValueKind::Call(call) = func.dfg().value(inst).kind() {
                    ra_saved = true;
                    max_extra_args = max_extra_args.max(call.args().len().saturating_sub(8));
                }
            }
        }
        let arg_area = (max_extra_args * 4) as i32;

        let mut cursor = arg_area;
        let mut offsets = HashMap::new();
        for (_bb, node) in func.layout().bbs() {
            for &inst in node.insts().keys() {
                let data = func.dfg().value(inst);
                if let ValueKind::Alloc(_) = data.kind() {
                    let bytes = match data.ty().kind() {
                        TypeKind::Pointer(base) => base.size() as i32,
                        _ => {
                            return Err(CompilerError::CodeGenerationError(format!(
                                "Alloc has non-pointer type: {:?}",
                                data.ty()
                            )))
                        }
                    };
                    offsets.insert(inst, cursor);
                    cursor += bytes;
                } else if !data.ty().is_unit() {
                    offsets.insert(inst, cursor);
                    cursor += 4;
                }
            }
        }

        let mut size = cursor + if ra_saved { 4 } else { 0 };
        size = (size + 15) / 16 * 16;
        if size == 0 {
            size = 16;
        }
        Ok(Self {
            size,
            ra_saved,
            arg_area,
            offsets,
        })
    }

    pub fn offset_of(&self, value: Value) -> Option<i32> {
        self.offsets.get(&value).copied()
    }

    /// ra 保存在栈帧最高处
    pub fn ra_offset(&self) -> i32 {
        self.size - 4
    }
}
