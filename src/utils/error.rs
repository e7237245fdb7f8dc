use std::fmt;

/// 整个编译流程共用的错误类型, 出错即中止
///
/// 每类错误对应一个固定的退出码, 测试脚本据此区分失败在哪个阶段。
#[derive(Debug)]
pub enum CompilerError {
    IoError(std::io::Error),
    ParseError(String),
    IRGenerationError(String),
    CodeGenerationError(String),
    ArgsError(String),
}

impl CompilerError {
    /// 进程退出码, 按阶段区分
    pub fn exit_code(&self) -> i32 {
        match self {
            CompilerError::ArgsError(_) => 2,
            CompilerError::IoError(_) => 3,
            CompilerError::ParseError(_) => 4,
            CompilerError::IRGenerationError(_) => 5,
            CompilerError::CodeGenerationError(_) => 6,
        }
    }

    fn stage(&self) -> &'static str {
        match self {
            CompilerError::IoError(_) => "I/O error",
            CompilerError::ParseError(_) => "Parse error",
            CompilerError::IRGenerationError(_) => "IR generation error",
            CompilerError::CodeGenerationError(_) => "Code generation error",
            CompilerError::ArgsError(_) => "Argument error",
        }
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompilerError::IoError(e) => write!(f, "{}: {}", self.stage(), e),
            CompilerError::ParseError(msg)
            | CompilerError::IRGenerationError(msg)
            | CompilerError::CodeGenerationError(msg)
            | CompilerError::ArgsError(msg) => write!(f, "{}: {}", self.stage(), msg),
        }
    }
}

impl std::error::Error for CompilerError {}

// 驱动读写文件用 `?` 直接上抛
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError(err)
    }
}
