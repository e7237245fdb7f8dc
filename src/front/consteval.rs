//! 常量表达式求值
//!
//! 对表达式做纯折叠: 结果是 32 位补码整数, 引用运行期变量、数组元素或
//! 函数调用时失败。常量维度、常量初始化值和全局初始化值都经过这里。

use crate::front::ast::*;
use crate::front::symbol::{SymbolKind, SymbolTable};
use crate::CompilerError;

/// 求常量表达式的值, 非常量时返回错误
pub fn eval(expr: &Expr, table: &SymbolTable) -> Result<i32, CompilerError> {
    match expr {
        Expr::IntLiteral(n, _) => Ok(*n),
        Expr::LVal(lval) => {
            if !lval.indices.is_empty() {
                return Err(CompilerError::IRGenerationError(
                    "Array element is not a constant expression".to_string(),
                ));
            }
            let sym = table.lookup(&lval.name).ok_or_else(|| {
                CompilerError::IRGenerationError(format!(
                    "Identifier `{}` not found in constant expression",
                    lval.name
                ))
            })?;
            match sym.kind {
                SymbolKind::Const(v) => Ok(v),
                _ => Err(CompilerError::IRGenerationError(format!(
                    "`{}` is not a constant",
                    lval.name
                ))),
            }
        }
        Expr::UnaryOp(op, sub, _) => {
            let v = eval(sub, table)?;
            Ok(match op {
                UnaryOp::Plus => v,
                UnaryOp::Minus => v.wrapping_neg(),
                UnaryOp::Not => (v == 0) as i32,
            })
        }
        Expr::BinaryOp(op, lhs, rhs, _) => {
            let l = eval(lhs, table)?;
            let r = eval(rhs, table)?;
            match op {
                BinaryOp::Add => Ok(l.wrapping_add(r)),
                BinaryOp::Sub => Ok(l.wrapping_sub(r)),
                BinaryOp::Mul => Ok(l.wrapping_mul(r)),
                BinaryOp::Div => {
                    if r == 0 {
                        return Err(CompilerError::IRGenerationError(
                            "Division by zero in constant expression".to_string(),
                        ));
                    }
                    Ok(l.wrapping_div(r))
                }
                BinaryOp::Mod => {
                    if r == 0 {
                        return Err(CompilerError::IRGenerationError(
                            "Modulo by zero in constant expression".to_string(),
                        ));
                    }
                    Ok(l.wrapping_rem(r))
                }
            }
        }
        Expr::RelOp(op, lhs, rhs, _) => {
            let l = eval(lhs, table)?;
            let r = eval(rhs, table)?;
            let res = match op {
                RelOp::Lt => l < r,
                RelOp::Gt => l > r,
                RelOp::Le => l <= r,
                RelOp::Ge => l >= r,
            };
            Ok(res as i32)
        }
        Expr::EqOp(op, lhs, rhs, _) => {
            let l = eval(lhs, table)?;
            let r = eval(rhs, table)?;
            let res = match op {
                EqOp::Eq => l == r,
                EqOp::Ne => l != r,
            };
            Ok(res as i32)
        }
        // 结果已是常量, 两侧都求值, 不做短路
        Expr::LAndOp(_, lhs, rhs, _) => {
            let l = eval(lhs, table)?;
            let r = eval(rhs, table)?;
            Ok((l != 0 && r != 0) as i32)
        }
        Expr::LOrOp(_, lhs, rhs, _) => {
            let l = eval(lhs, table)?;
            let r = eval(rhs, table)?;
            Ok((l != 0 || r != 0) as i32)
        }
        Expr::Call(..) => Err(CompilerError::IRGenerationError(
            "Function call is not a constant expression".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::symbol::{SymbolKind, VarType};

    fn lit(v: i32) -> Expr {
        Expr::IntLiteral(v, Span::default())
    }

    fn bin(op: BinaryOp, l: Expr, r: Expr) -> Expr {
        Expr::BinaryOp(op, Box::new(l), Box::new(r), Span::default())
    }

    #[test]
    fn arithmetic_folds() {
        let table = SymbolTable::new();
        let e = bin(BinaryOp::Add, lit(1), bin(BinaryOp::Mul, lit(2), lit(3)));
        assert_eq!(eval(&e, &table).unwrap(), 7);
    }

    #[test]
    fn division_truncates_toward_zero() {
        let table = SymbolTable::new();
        assert_eq!(eval(&bin(BinaryOp::Div, lit(-7), lit(2)), &table).unwrap(), -3);
        assert_eq!(eval(&bin(BinaryOp::Mod, lit(-7), lit(2)), &table).unwrap(), -1);
    }

    #[test]
    fn division_by_zero_fails() {
        let table = SymbolTable::new();
        assert!(eval(&bin(BinaryOp::Div, lit(1), lit(0)), &table).is_err());
    }

    #[test]
    fn wrapping_arithmetic() {
        let table = SymbolTable::new();
        let e = bin(BinaryOp::Add, lit(i32::MAX), lit(1));
        assert_eq!(eval(&e, &table).unwrap(), i32::MIN);
    }

    #[test]
    fn logical_ops_fold_to_zero_or_one() {
        let table = SymbolTable::new();
        let and = Expr::LAndOp(LAndOp::And, Box::new(lit(2)), Box::new(lit(3)), Span::default());
        let or = Expr::LOrOp(LOrOp::Or, Box::new(lit(0)), Box::new(lit(0)), Span::default());
        let not = Expr::UnaryOp(UnaryOp::Not, Box::new(lit(5)), Span::default());
        assert_eq!(eval(&and, &table).unwrap(), 1);
        assert_eq!(eval(&or, &table).unwrap(), 0);
        assert_eq!(eval(&not, &table).unwrap(), 0);
    }

    #[test]
    fn const_symbol_resolves() {
        let mut table = SymbolTable::new();
        table.add("N", SymbolKind::Const(4)).unwrap();
        let e = Expr::LVal(LVal {
            name: "N".to_string(),
            indices: Vec::new(),
            span: Span::default(),
        });
        assert_eq!(eval(&e, &table).unwrap(), 4);
    }

    #[test]
    fn runtime_variable_is_not_constant() {
        let mut table = SymbolTable::new();
        table.add("x", SymbolKind::Var(VarType::Scalar)).unwrap();
        let e = Expr::LVal(LVal {
            name: "x".to_string(),
            indices: Vec::new(),
            span: Span::default(),
        });
        assert!(eval(&e, &table).is_err());
    }

    #[test]
    fn call_is_not_constant() {
        let table = SymbolTable::new();
        let e = Expr::Call("getint".to_string(), Vec::new(), Span::default());
        assert!(eval(&e, &table).is_err());
    }
}
