/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : 负责RNN抽象与序列解码的构建：计算图、循环单元、
 *                 嵌套结构工具、定长展开与动态解码
 */

mod display;
mod graph;
mod nodes;
mod rnn;
mod structure;

pub mod cell;
pub mod decode;

pub(in crate::nn) use display::format_node_display;
pub use cell::{GruCell, LstmCell, RnnCell};
pub use graph::{Graph, GraphError, GraphInner};
pub use nodes::NodeId;
pub use rnn::rnn;
pub use structure::{NestedStructure, StateShape};

#[cfg(test)]
mod tests;
