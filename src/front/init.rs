//! 数组初始化列表展平
//!
//! 把嵌套的花括号初始化列表按行主序展平成长度为各维乘积的一维序列。
//! 游标算法: 进入某层花括号时游标必须对齐到该层步长(该层起所有维度的
//! 乘积), 否则报错; 裸表达式写入游标处并前进一格; 一层的孩子处理完后
//! 游标补零对齐到该层步长的整数倍。

use crate::front::ast::{ConstInitVal, Expr, InitVal};
use crate::front::consteval;
use crate::front::symbol::SymbolTable;
use crate::CompilerError;

// 两种初始化树共用的借用视图
enum InitTree<'a> {
    Leaf(&'a Expr),
    List(Vec<InitTree<'a>>),
}

fn view_var(init: &InitVal) -> InitTree<'_> {
    match init {
        InitVal::Single(e) => InitTree::Leaf(e),
        InitVal::List(list) => InitTree::List(list.iter().map(view_var).collect()),
    }
}

fn view_const(init: &ConstInitVal) -> InitTree<'_> {
    match init {
        ConstInitVal::Single(e) => InitTree::Leaf(e),
        ConstInitVal::List(list) => InitTree::List(list.iter().map(view_const).collect()),
    }
}

fn product(dims: &[usize]) -> usize {
    dims.iter().product()
}

fn fill<'a>(
    items: &[InitTree<'a>],
    dims: &[usize],
    level: usize,
    cursor: &mut usize,
    out: &mut Vec<Option<&'a Expr>>,
) -> Result<(), CompilerError> {
    for item in items {
        match item {
            InitTree::Leaf(expr) => {
                if *cursor >= out.len() {
                    return Err(CompilerError::IRGenerationError(
                        "Too many initializer elements for array".to_string(),
                    ));
                }
                out[*cursor] = Some(expr);
                *cursor += 1;
            }
            InitTree::List(sub) => {
                if level + 1 >= dims.len() {
                    return Err(CompilerError::IRGenerationError(
                        "Braces nested deeper than the array rank".to_string(),
                    ));
                }
                let stride = product(&dims[level + 1..]);
                if *cursor % stride != 0 {
                    return Err(CompilerError::IRGenerationError(
                        "Initializer list is not aligned with array dimensions".to_string(),
                    ));
                }
                fill(sub, dims, level + 1, cursor, out)?;
            }
        }
    }
    // 补零对齐到本层步长
    let stride = product(&dims[level..]);
    let rem = *cursor % stride;
    if rem != 0 {
        *cursor += stride - rem;
    }
    Ok(())
}

fn flatten<'a>(
    items: &[InitTree<'a>],
    dims: &[usize],
) -> Result<Vec<Option<&'a Expr>>, CompilerError> {
    if dims.is_empty() {
        return Err(CompilerError::IRGenerationError(
            "Braced initializer is not allowed for a scalar".to_string(),
        ));
    }
    let total = product(dims);
    let mut out = vec![None; total];
    let mut cursor = 0;
    fill(items, dims, 0, &mut cursor, &mut out)?;
    Ok(out)
}

/// 展平变量数组的初始化列表, 缺省位置为 `None`(补零)
pub fn flatten_var<'a>(
    items: &'a [InitVal],
    dims: &[usize],
) -> Result<Vec<Option<&'a Expr>>, CompilerError> {
    let trees: Vec<_> = items.iter().map(view_var).collect();
    flatten(&trees, dims)
}

/// 展平常量数组的初始化列表并逐项折叠
pub fn flatten_const(
    items: &[ConstInitVal],
    dims: &[usize],
    table: &SymbolTable,
) -> Result<Vec<i32>, CompilerError> {
    let trees: Vec<_> = items.iter().map(view_const).collect();
    let flat = flatten(&trees, dims)?;
    flat.into_iter()
        .map(|slot| slot.map_or(Ok(0), |e| consteval::eval(e, table)))
        .collect()
}
