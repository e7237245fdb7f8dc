use super::{Block, DataType, Expr, Span};

// FuncFParam ::= "int" IDENT ["[" "]" {"[" ConstExp "]"}];
// 数组形参省略首维, dims 只存余下的各维
#[derive(Debug, Clone, PartialEq)]
pub struct FuncFParam {
    pub ty: DataType,
    pub name: String,
    pub is_array: bool,
    pub dims: Vec<Expr>,
    pub span: Span,
}

// FuncDef ::= ("int" | "void") IDENT "(" [FuncFParams] ")" Block;
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub ty: DataType,
    pub name: String,
    pub params: Vec<FuncFParam>,
    pub body: Block,
    pub span: Span,
}

// CompUnit ::= {Decl | FuncDef};
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalItem {
    Decl(super::Decl),
    FuncDef(FuncDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompUnit {
    pub items: Vec<GlobalItem>,
}
