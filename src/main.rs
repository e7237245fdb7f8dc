use std::fs::read_to_string;

use koopa::ir::Type;
use lalrpop_util::lexer::Token;
use lalrpop_util::ParseError;

use sysyc::utils::args::{Mode, Params};
use sysyc::utils::logger::report_and_exit;
use sysyc::utils::SourceMap;
use sysyc::{back, front, sysy, CompilerError};

fn main() {
    if let Err(e) = run() {
        report_and_exit(&e);
    }
}

fn format_expected(expected: Vec<String>) -> String {
    if expected.is_empty() {
        "no expected tokens".to_string()
    } else {
        expected.join(", ")
    }
}

fn format_parse_error(source_map: &SourceMap, err: ParseError<usize, Token<'_>, &str>) -> String {
    match err {
        ParseError::InvalidToken { location } => {
            format!("Invalid token at {}", source_map.format_location(location))
        }
        ParseError::UnrecognizedEof { location, expected } => {
            format!(
                "Unexpected end of file at {}. Expected: {}",
                source_map.format_location(location),
                format_expected(expected)
            )
        }
        ParseError::UnrecognizedToken { token, expected } => {
            let (start, tok, end) = token;
            format!(
                "Unrecognized token {:?} at {}. Expected: {}",
                tok,
                source_map.format_range(start, end),
                format_expected(expected)
            )
        }
        ParseError::ExtraToken { token } => {
            let (start, tok, end) = token;
            format!(
                "Extra token {:?} at {}",
                tok,
                source_map.format_range(start, end)
            )
        }
        ParseError::User { error } => {
            format!("Parse error: {}", error)
        }
    }
}

fn run() -> Result<(), CompilerError> {
    let params = Params::from_args()?;

    let input = read_to_string(&params.input)?;
    let source_map = SourceMap::new(&input);

    let ast = sysy::CompUnitParser::new()
        .parse(&input)
        .map_err(|e| CompilerError::ParseError(format_parse_error(&source_map, e)))?;

    let ir_text = front::generate_ir(&ast, Some(source_map))?;

    match params.mode {
        Mode::Koopa => {
            std::fs::write(&params.output, ir_text)?;
        }
        Mode::Riscv => {
            // 目标是 riscv32, 指针 4 字节
            Type::set_ptr_size(4);
            let program = koopa::front::Driver::from(ir_text)
                .generate_program()
                .map_err(|e| {
                    CompilerError::CodeGenerationError(format!("Invalid Koopa IR: {:?}", e))
                })?;
            let asm = back::generate_asm(&program)?;
            std::fs::write(&params.output, asm)?;
        }
    }
    Ok(())
}
