/*
 * @Author       : 老董
 * @Date         : 2026-02-25
 * @Description  : TensorArray - 解码循环使用的只追加步缓冲。
 *                 按索引写入（必须恰好是当前长度）、按索引读取，
 *                 循环结束后沿新的首维堆叠为单个张量。
 */

use crate::nn::GraphError;
use crate::tensor::Tensor;

/// 只追加的张量缓冲，每个元素对应一个时间步
#[derive(Default)]
pub struct TensorArray {
    items: Vec<Tensor>,
}

impl TensorArray {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// 在`index`处写入。只允许追加：`index`必须等于当前长度。
    pub fn write(&mut self, index: usize, tensor: Tensor) -> Result<(), GraphError> {
        if index != self.items.len() {
            return Err(GraphError::InvalidOperation(format!(
                "TensorArray只允许追加写入：当前长度为{}，但写入索引为{}",
                self.items.len(),
                index
            )));
        }
        self.items.push(tensor);
        Ok(())
    }

    /// 读取`index`处的张量
    pub fn read(&self, index: usize) -> Result<&Tensor, GraphError> {
        self.items.get(index).ok_or_else(|| {
            GraphError::InvalidOperation(format!(
                "TensorArray读取越界：长度为{}，但读取索引为{}",
                self.items.len(),
                index
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 沿新的首维（时间维）堆叠全部元素
    pub fn stack(&self) -> Result<Tensor, GraphError> {
        if self.items.is_empty() {
            return Err(GraphError::InvalidOperation(
                "TensorArray为空，无法堆叠".to_string(),
            ));
        }
        let refs = self.items.iter().collect::<Vec<_>>();
        Ok(Tensor::stack(&refs, true))
    }
}
