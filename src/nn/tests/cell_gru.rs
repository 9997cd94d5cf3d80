/*
 * @Author       : 老董
 * @Date         : 2026-03-06
 * @Description  : GruCell 单元测试（与闭式公式数值对照）
 */

use crate::nn::cell::{GruCell, RnnCell};
use crate::nn::structure::{NestedStructure, StateShape};
use crate::nn::{Graph, GraphError};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// 测试 GRU 单元创建与节点形状
#[test]
fn test_gru_creation() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = GruCell::new(&graph, 10, 20, 16, Some("gru1"))?;

    assert_eq!(graph.get_node_expected_shape(gru.w_ux)?, vec![10, 20]);
    assert_eq!(graph.get_node_expected_shape(gru.w_uh)?, vec![20, 20]);
    assert_eq!(graph.get_node_expected_shape(gru.b_u)?, vec![1, 20]);
    assert_eq!(
        graph.get_node_expected_shape(gru.input_node())?,
        vec![16, 10]
    );
    assert_eq!(
        graph.get_node_expected_shape(gru.state_node())?,
        vec![16, 20]
    );

    // 参数已随机初始化
    assert!(graph.has_node_value(gru.w_ux)?);
    Ok(())
}

/// 测试 GRU 前向传播（与闭式公式对照，固定权重）
#[test]
fn test_gru_forward_matches_formula() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = GruCell::new(&graph, 1, 1, 1, Some("gru"))?;

    // 固定权重: u = σ(0.5x), r = σ(x), c = tanh(x + r*h)
    graph.set_node_value(gru.w_ux, Some(&Tensor::new(&[0.5], &[1, 1])))?;
    graph.set_node_value(gru.w_uh, Some(&Tensor::zeros(&[1, 1])))?;
    graph.set_node_value(gru.w_rx, Some(&Tensor::new(&[1.0], &[1, 1])))?;
    graph.set_node_value(gru.w_rh, Some(&Tensor::zeros(&[1, 1])))?;
    graph.set_node_value(gru.w_cx, Some(&Tensor::new(&[1.0], &[1, 1])))?;
    graph.set_node_value(gru.w_ch, Some(&Tensor::new(&[1.0], &[1, 1])))?;

    let xs = [1.0f32, -0.5, 0.8];
    let mut expected_h = 0.0f32;
    let mut states = NestedStructure::leaf(Tensor::zeros(&[1, 1]));

    for &x in &xs {
        let inputs = NestedStructure::leaf(Tensor::new(&[x], &[1, 1]));
        let (outputs, new_states) = gru.call(&inputs, &states)?;

        // 闭式公式
        let u = sigmoid(0.5 * x);
        let r = sigmoid(x);
        let c = (x + r * expected_h).tanh();
        expected_h = u * expected_h + (1.0 - u) * c;

        let h = outputs.as_leaf()?;
        assert_abs_diff_eq!(h[[0, 0]], expected_h, epsilon = 1e-6);
        // 输出即新状态
        assert_eq!(outputs, new_states);
        states = new_states;
    }
    Ok(())
}

/// 测试 get_initial_states：批大小推断与形状合成
#[test]
fn test_gru_get_initial_states() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = GruCell::new(&graph, 4, 6, 8, None)?;

    let batch_ref = NestedStructure::leaf(Tensor::zeros(&[8, 4]));
    let states = gru.get_initial_states(&batch_ref, None, 0.0, 0)?;

    let state = states.as_leaf()?;
    assert_eq!(state.shape(), &[8, 6]);
    assert!(state.data_as_slice().iter().all(|&v| v == 0.0));
    Ok(())
}

/// 测试 get_initial_states 的显式形状与填充值
#[test]
fn test_get_initial_states_with_explicit_shape() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = GruCell::new(&graph, 4, 6, 8, None)?;

    // 批维取自 batch_ref 的第1维（time_major场景）
    let batch_ref = NestedStructure::leaf(Tensor::zeros(&[5, 3, 4]));
    let shape = StateShape::seq(vec![StateShape::leaf(&[2]), StateShape::leaf(&[7])]);
    let states = gru.get_initial_states(&batch_ref, Some(&shape), 0.5, 1)?;

    match &states {
        NestedStructure::Seq(children) => {
            assert_eq!(children[0].as_leaf()?.shape(), &[3, 2]);
            assert_eq!(children[1].as_leaf()?.shape(), &[3, 7]);
            assert!(
                children[0]
                    .as_leaf()?
                    .data_as_slice()
                    .iter()
                    .all(|&v| v == 0.5)
            );
        }
        other => panic!("期望Seq结构，但得到{other:?}"),
    }
    Ok(())
}

/// batch_dim_idx 越界时报错
#[test]
fn test_get_initial_states_bad_batch_dim() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = GruCell::new(&graph, 4, 6, 8, None)?;

    let batch_ref = NestedStructure::leaf(Tensor::zeros(&[8, 4]));
    let result = gru.get_initial_states(&batch_ref, None, 0.0, 5);
    assert!(matches!(
        result,
        Err(GraphError::UnsupportedConfiguration(_))
    ));
    Ok(())
}

/// 既无显式形状、单元又不声明 state_shape 时报错
#[test]
fn test_get_initial_states_missing_shape() {
    struct ShapelessCell;
    impl RnnCell for ShapelessCell {
        fn call(
            &self,
            _inputs: &NestedStructure,
            states: &NestedStructure,
        ) -> Result<(NestedStructure, NestedStructure), GraphError> {
            Ok((states.clone(), states.clone()))
        }
        fn state_shape(&self) -> Result<StateShape, GraphError> {
            Err(GraphError::UnsupportedConfiguration(
                "本单元未声明状态形状".to_string(),
            ))
        }
    }

    let cell = ShapelessCell;
    let batch_ref = NestedStructure::leaf(Tensor::zeros(&[2, 3]));
    assert!(matches!(
        cell.get_initial_states(&batch_ref, None, 0.0, 0),
        Err(GraphError::UnsupportedConfiguration(_))
    ));
}
