//! # Only Decode
//!
//! `only_decode`项目旨在用纯rust实现静态计算图上的RNN抽象与序列解码：
//! 单步循环单元（GRU、LSTM）、定长序列展开、采样/教师强制等解码策略，
//! 以及核心的束搜索（beam search）解码状态机与动态解码驱动循环。
//! 所有稠密计算都先构建为计算图节点，再由宿主驱动代码逐步执行。
//!

pub mod errors;
pub mod nn;
pub mod tensor;
