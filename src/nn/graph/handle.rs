/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : Graph 句柄（用户级 API）
 */

use super::error::GraphError;
use super::inner::GraphInner;
use crate::nn::NodeId;
use crate::tensor::Tensor;
use std::cell::RefCell;
use std::rc::Rc;

/// Graph - 计算图句柄
///
/// # 设计原则
/// - 是 `Rc<RefCell<GraphInner>>` 的薄封装
/// - Clone 语义：多个 Graph 引用同一个 GraphInner
/// - 单元（cell）持有句柄的克隆，构图一次、反复执行
#[derive(Clone)]
pub struct Graph {
    inner: Rc<RefCell<GraphInner>>,
}

impl Graph {
    // ==================== 创建 ====================

    /// 创建新图
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner::new())),
        }
    }

    /// 创建带种子的图（用于确定性的参数初始化）
    pub fn new_with_seed(seed: u64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner::new_with_seed(seed))),
        }
    }

    /// 从现有 GraphInner 创建句柄
    pub fn from_inner(inner: GraphInner) -> Self {
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// 获取内部 GraphInner 的不可变引用
    pub fn inner(&self) -> std::cell::Ref<'_, GraphInner> {
        self.inner.borrow()
    }

    /// 获取内部 GraphInner 的可变引用
    pub fn inner_mut(&self) -> std::cell::RefMut<'_, GraphInner> {
        self.inner.borrow_mut()
    }

    // ==================== 节点创建（代理） ====================

    /// 创建输入节点
    pub fn new_input_node(
        &self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_input_node(shape, name)
    }

    /// 创建参数节点
    pub fn new_parameter_node(
        &self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_parameter_node(shape, name)
    }

    /// 创建 State 节点
    pub fn new_state_node(
        &self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_state_node(shape, name)
    }

    // ==================== 节点值访问（代理） ====================

    pub fn set_node_value(&self, id: NodeId, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.inner.borrow_mut().set_node_value(id, value)
    }

    /// 取节点值的克隆（句柄层无法安全地外借引用）
    pub fn get_node_value(&self, id: NodeId) -> Result<Option<Tensor>, GraphError> {
        Ok(self.inner.borrow().get_node_value(id)?.cloned())
    }

    pub fn has_node_value(&self, id: NodeId) -> Result<bool, GraphError> {
        self.inner.borrow().has_node_value(id)
    }

    pub fn get_node_expected_shape(&self, id: NodeId) -> Result<Vec<usize>, GraphError> {
        self.inner.borrow().get_node_expected_shape(id)
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<String, GraphError> {
        Ok(self.inner.borrow().get_node_name(id)?.to_string())
    }

    pub fn nodes_count(&self) -> usize {
        self.inner.borrow().nodes_count()
    }

    // ==================== 执行 ====================

    /// 前向传播
    pub fn forward(&self, output: NodeId) -> Result<(), GraphError> {
        self.inner.borrow_mut().forward(output)
    }

    /// 设置/重置图的随机种子
    pub fn set_seed(&self, seed: u64) {
        self.inner.borrow_mut().set_seed(seed);
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
