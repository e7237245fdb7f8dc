//! # 符号表管理
//!
//! 维护词法作用域栈、循环上下文栈以及符号重命名。
//!
//! Koopa IR 的符号是扁平命名空间, 而 SysY 允许嵌套作用域中重复声明同名
//! 变量, 因此每个符号在进入符号表时分配一个唯一化名字:
//!
//! - 全局作用域: 直接使用源标识符;
//! - 嵌套作用域: 源标识符加计数器后缀, 若与已发放的名字或全局名冲突
//!   则换下一个计数值重试。
//!
//! 计数器在整个编译单元内单调递增, 不随函数边界重置。

use std::collections::{HashMap, HashSet};

use crate::front::ast::DataType;
use crate::CompilerError;

/// 变量的静态类型
#[derive(Debug, Clone, PartialEq)]
pub enum VarType {
    Scalar,
    /// 各维长度均为编译期常量的数组
    Array(Vec<usize>),
    /// 数组形参: 首维省略, 只记录余下各维
    ArrayPtr(Vec<usize>),
}

impl VarType {
    /// 数组的总维数
    pub fn rank(&self) -> usize {
        match self {
            VarType::Scalar => 0,
            VarType::Array(dims) => dims.len(),
            VarType::ArrayPtr(dims) => dims.len() + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// 编译期折叠完成的常量标量
    Const(i32),
    /// 常量数组: 按数组存储和访问, 但不可赋值
    ConstArray(Vec<usize>),
    /// 运行期变量(标量或数组)
    Var(VarType),
    /// 函数, 记录返回类型
    Func(DataType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// 源码中的标识符
    pub ident: String,
    /// 唯一化后的 IR 名字(不含 `@` 前缀)
    pub name: String,
    pub kind: SymbolKind,
}

/// 循环上下文: continue/break 的跳转目标标签
#[derive(Debug, Clone)]
struct LoopLabels {
    continue_label: String,
    break_label: String,
}

pub struct SymbolTable {
    // scopes[0] 是全局作用域
    scopes: Vec<HashMap<String, Symbol>>,
    // 已发放过的唯一化名字, 含全部全局名
    used_names: HashSet<String>,
    name_counter: u32,
    loops: Vec<LoopLabels>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            used_names: HashSet::new(),
            name_counter: 0,
            loops: Vec::new(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) -> Result<(), CompilerError> {
        if self.scopes.len() <= 1 {
            return Err(CompilerError::IRGenerationError(
                "Cannot exit scope: no nested scope is active".to_string(),
            ));
        }
        self.scopes.pop();
        Ok(())
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// 在当前作用域登记符号, 返回唯一化后的符号
    ///
    /// 同一作用域内重复声明返回错误。
    pub fn add(&mut self, ident: &str, kind: SymbolKind) -> Result<Symbol, CompilerError> {
        let scope = self
            .scopes
            .last()
            .expect("symbol table always has the global scope");
        if scope.contains_key(ident) {
            return Err(CompilerError::IRGenerationError(format!(
                "Identifier `{}` already declared in this scope",
                ident
            )));
        }

        let name = if self.is_global() {
            ident.to_string()
        } else {
            self.uniquify(ident)
        };
        self.used_names.insert(name.clone());

        let symbol = Symbol {
            ident: ident.to_string(),
            name,
            kind,
        };
        self.scopes
            .last_mut()
            .expect("symbol table always has the global scope")
            .insert(ident.to_string(), symbol.clone());
        Ok(symbol)
    }

    /// 自内向外查找符号
    pub fn lookup(&self, ident: &str) -> Option<Symbol> {
        for scope in self.scopes.iter().rev() {
            if let Some(sym) = scope.get(ident) {
                return Some(sym.clone());
            }
        }
        None
    }

    // 带后缀重命名, 与已发放名字或全局名冲突时换下一个计数值
    fn uniquify(&mut self, ident: &str) -> String {
        loop {
            let candidate = format!("{}_{}", ident, self.name_counter);
            self.name_counter += 1;
            if !self.used_names.contains(&candidate)
                && !self.scopes[0].values().any(|s| s.name == candidate)
            {
                return candidate;
            }
        }
    }

    pub fn enter_loop(&mut self, continue_label: String, break_label: String) {
        self.loops.push(LoopLabels {
            continue_label,
            break_label,
        });
    }

    pub fn exit_loop(&mut self) {
        self.loops.pop();
    }

    pub fn current_break(&self) -> Result<String, CompilerError> {
        self.loops
            .last()
            .map(|l| l.break_label.clone())
            .ok_or_else(|| {
                CompilerError::IRGenerationError("`break` used outside of loop".to_string())
            })
    }

    pub fn current_continue(&self) -> Result<String, CompilerError> {
        self.loops
            .last()
            .map(|l| l.continue_label.clone())
            .ok_or_else(|| {
                CompilerError::IRGenerationError("`continue` used outside of loop".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_symbols_keep_their_name() {
        let mut table = SymbolTable::new();
        let sym = table.add("x", SymbolKind::Var(VarType::Scalar)).unwrap();
        assert_eq!(sym.name, "x");
        assert!(table.is_global());
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let mut table = SymbolTable::new();
        table.add("x", SymbolKind::Var(VarType::Scalar)).unwrap();
        assert!(table.add("x", SymbolKind::Const(1)).is_err());
    }

    #[test]
    fn nested_scope_shadows_and_uniquifies() {
        let mut table = SymbolTable::new();
        table.add("x", SymbolKind::Var(VarType::Scalar)).unwrap();
        table.enter_scope();
        let inner = table.add("x", SymbolKind::Var(VarType::Scalar)).unwrap();
        assert_ne!(inner.name, "x");
        assert_eq!(table.lookup("x").unwrap().name, inner.name);
        table.exit_scope().unwrap();
        assert_eq!(table.lookup("x").unwrap().name, "x");
    }

    #[test]
    fn uniquified_name_avoids_global_collision() {
        let mut table = SymbolTable::new();
        // 全局已占用 x_0, 嵌套的 x 必须跳过它
        table.add("x_0", SymbolKind::Var(VarType::Scalar)).unwrap();
        table.add("x", SymbolKind::Var(VarType::Scalar)).unwrap();
        table.enter_scope();
        let inner = table.add("x", SymbolKind::Var(VarType::Scalar)).unwrap();
        assert_ne!(inner.name, "x_0");
        assert_ne!(inner.name, "x");
    }

    #[test]
    fn sibling_scopes_never_share_names() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        let a = table.add("v", SymbolKind::Var(VarType::Scalar)).unwrap();
        table.exit_scope().unwrap();
        table.enter_scope();
        let b = table.add("v", SymbolKind::Var(VarType::Scalar)).unwrap();
        table.exit_scope().unwrap();
        assert_ne!(a.name, b.name);
    }

    #[test]
    fn exit_global_scope_fails() {
        let mut table = SymbolTable::new();
        assert!(table.exit_scope().is_err());
    }

    #[test]
    fn loop_stack_tracks_innermost_loop() {
        let mut table = SymbolTable::new();
        assert!(table.current_break().is_err());
        table.enter_loop("%while_entry_0".into(), "%while_end_0".into());
        table.enter_loop("%while_entry_1".into(), "%while_end_1".into());
        assert_eq!(table.current_continue().unwrap(), "%while_entry_1");
        assert_eq!(table.current_break().unwrap(), "%while_end_1");
        table.exit_loop();
        assert_eq!(table.current_break().unwrap(), "%while_end_0");
        table.exit_loop();
        assert!(table.current_continue().is_err());
    }

    #[test]
    fn array_rank_counts_elided_dimension() {
        assert_eq!(VarType::Scalar.rank(), 0);
        assert_eq!(VarType::Array(vec![2, 3]).rank(), 2);
        assert_eq!(VarType::ArrayPtr(vec![3]).rank(), 2);
    }
}
