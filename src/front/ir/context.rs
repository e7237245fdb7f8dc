use crate::front::ast::{DataType, Span};
use crate::front::symbol::SymbolTable;
use crate::utils::SourceMap;
use crate::CompilerError;

/// IR 生成上下文
///
/// 持有追加式的 IR 文本缓冲、符号表以及当前函数内的临时值/标签计数器。
/// 计数器封装在上下文对象里而不是全局状态, 编译器可以作为库重入使用。
pub struct IrContext {
    text: String,
    pub symtab: SymbolTable,
    pub source_map: Option<SourceMap>,
    /// 当前函数的返回类型, 用于合成默认 return
    pub ret_ty: DataType,
    temp_count: u32,
    label_count: u32,
}

impl IrContext {
    pub fn new(source_map: Option<SourceMap>) -> Self {
        Self {
            text: String::new(),
            symtab: SymbolTable::new(),
            source_map,
            ret_ty: DataType::Void,
            temp_count: 0,
            label_count: 0,
        }
    }

    /// 取出生成完毕的 IR 文本
    pub fn finish(self) -> String {
        self.text
    }

    /// 函数边界重置临时值与标签计数; 符号重命名计数不受影响
    pub fn reset_counters(&mut self) {
        self.temp_count = 0;
        self.label_count = 0;
    }

    /// 分配一个新的临时值名 `%n`
    pub fn fresh_temp(&mut self) -> String {
        let t = format!("%{}", self.temp_count);
        self.temp_count += 1;
        t
    }

    /// 分配一个标签编号, 同一控制结构的几个标签共用一个编号
    pub fn fresh_label_id(&mut self) -> u32 {
        let id = self.label_count;
        self.label_count += 1;
        id
    }

    /// 输出一条函数体内的指令(两格缩进)
    pub fn emit(&mut self, line: impl AsRef<str>) {
        self.text.push_str("  ");
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    /// 输出基本块标签
    pub fn emit_label(&mut self, label: &str) {
        self.text.push_str(label);
        self.text.push_str(":\n");
    }

    /// 输出顶层文本(decl / global / fun / 右花括号)
    pub fn emit_top(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    pub fn emit_blank(&mut self) {
        self.text.push('\n');
    }

    /// 发射二元运算; 两个操作数都是字面量时直接折叠, 不产生指令
    ///
    /// 数组下标的步长算术走这里, 常量下标不会留下乘加指令。
    pub fn fold_or_emit(&mut self, op: &str, lhs: &str, rhs: &str) -> String {
        if let (Ok(a), Ok(b)) = (lhs.parse::<i32>(), rhs.parse::<i32>()) {
            let folded = match op {
                "add" => Some(a.wrapping_add(b)),
                "sub" => Some(a.wrapping_sub(b)),
                "mul" => Some(a.wrapping_mul(b)),
                _ => None,
            };
            if let Some(v) = folded {
                return v.to_string();
            }
        }
        let t = self.fresh_temp();
        self.emit(format!("{} = {} {}, {}", t, op, lhs, rhs));
        t
    }

    /// 构造带源码位置的错误, 位置取节点的整个字节区间
    pub fn error_at_span(&self, message: impl Into<String>, span: Span) -> CompilerError {
        let mut msg = message.into();
        if let Some(sm) = &self.source_map {
            msg = format!("{} at {}", msg, sm.format_range(span.begin, span.end));
        }
        CompilerError::IRGenerationError(msg)
    }
}
