/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : Graph 模块的错误类型。
 *                 解码相关的构造期错误（嵌套结构不匹配、配置不受支持）也归于此处，
 *                 本库没有执行期可恢复的错误路径。
 */

use crate::nn::NodeId;

/// Graph 操作错误类型
#[derive(Debug, PartialEq, Eq)]
pub enum GraphError {
    NodeNotFound(NodeId),
    InvalidOperation(String),
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
    ComputationError(String),
    DuplicateNodeName(String),
    /// 两个嵌套结构在某一层的容器形状（类型/长度/键集）不一致。
    /// `path`指出首个分歧处，如 "[1].cell_states/0"
    StructureMismatch {
        path: String,
        message: String,
    },
    /// 构造期即可判定的非法配置（缺失状态形状、非法温度、空束宽等）
    UnsupportedConfiguration(String),
}
