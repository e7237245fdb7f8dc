use colored::Colorize;

use crate::CompilerError;

/// 打印错误并按错误类别的退出码结束进程
pub fn report_and_exit(error: &CompilerError) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), error.to_string().bold());
    std::process::exit(error.exit_code())
}
