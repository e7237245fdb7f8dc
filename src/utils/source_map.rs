/// 字节偏移到行列号的映射, 诊断信息用
///
/// AST 节点带的是字节区间, 报错时经 [`SourceMap::format_range`] 还原成
/// 行列范围; 单点位置(如词法错误)用 [`SourceMap::format_location`]。
#[derive(Debug, Clone)]
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(input: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(input.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { line_starts }
    }

    /// 1 起始的行列号
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        // line_starts 升序且首元素为 0, 统计 <= offset 的行起点数即行号
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let col = offset - self.line_starts[line - 1] + 1;
        (line, col)
    }

    pub fn format_location(&self, offset: usize) -> String {
        let (line, col) = self.line_col(offset);
        format!("line {}, column {}", line, col)
    }

    /// 半开区间 `[begin, end)` 的位置描述: 同行给列范围, 跨行给行范围
    pub fn format_range(&self, begin: usize, end: usize) -> String {
        let last = end.saturating_sub(1).max(begin);
        let (begin_line, begin_col) = self.line_col(begin);
        let (end_line, end_col) = self.line_col(last);
        if begin_line != end_line {
            format!("lines {}-{}", begin_line, end_line)
        } else if end_col > begin_col {
            format!("line {}, columns {}-{}", begin_line, begin_col, end_col)
        } else {
            format!("line {}, column {}", begin_line, begin_col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_map_to_lines_and_columns() {
        let map = SourceMap::new("int main() {\n  return 0;\n}\n");
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(4), (1, 5));
        assert_eq!(map.line_col(13), (2, 1));
        assert_eq!(map.line_col(25), (3, 1));
    }

    #[test]
    fn range_on_one_line_shows_columns() {
        let map = SourceMap::new("int x = 1;\n");
        assert_eq!(map.format_range(4, 5), "line 1, column 5");
        assert_eq!(map.format_range(4, 9), "line 1, columns 5-9");
    }

    #[test]
    fn range_across_lines_shows_lines() {
        let map = SourceMap::new("while (1)\n  x = 1;\n");
        assert_eq!(map.format_range(0, 18), "lines 1-2");
    }

    #[test]
    fn empty_range_degrades_to_a_point() {
        let map = SourceMap::new("x\n");
        assert_eq!(map.format_range(1, 1), "line 1, column 2");
    }
}
