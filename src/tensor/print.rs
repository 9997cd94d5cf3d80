use super::Tensor;
use std::fmt;

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "形状: {:?}", self.shape())?;
        // 逐元素打印交给ndarray，超过一屏的张量靠形状行辨认即可
        writeln!(f, "{:.4}", self.data)
    }
}
