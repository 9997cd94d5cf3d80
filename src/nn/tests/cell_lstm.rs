/*
 * @Author       : 老董
 * @Date         : 2026-03-06
 * @Description  : LstmCell 单元测试（与闭式公式数值对照）
 */

use crate::nn::cell::{LstmCell, RnnCell};
use crate::nn::structure::NestedStructure;
use crate::nn::{Graph, GraphError};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// 测试 LSTM 单元创建与节点形状
#[test]
fn test_lstm_creation() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let lstm = LstmCell::new(&graph, 3, 2, 4, Some("lstm1"))?;

    assert_eq!(graph.get_node_expected_shape(lstm.w_ii)?, vec![3, 2]);
    assert_eq!(graph.get_node_expected_shape(lstm.w_hf)?, vec![2, 2]);
    assert_eq!(graph.get_node_expected_shape(lstm.b_o)?, vec![1, 2]);
    assert_eq!(
        graph.get_node_expected_shape(lstm.hidden_state_node())?,
        vec![4, 2]
    );
    assert_eq!(
        graph.get_node_expected_shape(lstm.cell_state_node())?,
        vec![4, 2]
    );

    // 遗忘门偏置初始化为 1
    let b_f = graph.get_node_value(lstm.b_f)?.unwrap();
    assert!(b_f.data_as_slice().iter().all(|&v| v == 1.0));
    Ok(())
}

/// 测试 LSTM 前向传播（与闭式公式对照，固定权重）
#[test]
fn test_lstm_forward_matches_formula() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let lstm = LstmCell::new(&graph, 1, 1, 1, Some("lstm"))?;

    // 固定权重（隐藏到隐藏权重置零，便于闭式对照）
    graph.set_node_value(lstm.w_ii, Some(&Tensor::new(&[0.5], &[1, 1])))?;
    graph.set_node_value(lstm.w_hi, Some(&Tensor::zeros(&[1, 1])))?;
    graph.set_node_value(lstm.w_if, Some(&Tensor::new(&[0.3], &[1, 1])))?;
    graph.set_node_value(lstm.w_hf, Some(&Tensor::zeros(&[1, 1])))?;
    graph.set_node_value(lstm.w_ig, Some(&Tensor::new(&[1.0], &[1, 1])))?;
    graph.set_node_value(lstm.w_hg, Some(&Tensor::zeros(&[1, 1])))?;
    graph.set_node_value(lstm.w_io, Some(&Tensor::new(&[0.8], &[1, 1])))?;
    graph.set_node_value(lstm.w_ho, Some(&Tensor::zeros(&[1, 1])))?;

    let xs = [1.0f32, 0.5, -1.0];
    let mut expected_h = 0.0f32;
    let mut expected_c = 0.0f32;
    let mut states = NestedStructure::seq(vec![
        NestedStructure::leaf(Tensor::zeros(&[1, 1])),
        NestedStructure::leaf(Tensor::zeros(&[1, 1])),
    ]);

    for &x in &xs {
        let inputs = NestedStructure::leaf(Tensor::new(&[x], &[1, 1]));
        let (outputs, new_states) = lstm.call(&inputs, &states)?;

        // 闭式公式（b_f = 1，其余偏置为 0）
        let i = sigmoid(0.5 * x);
        let f = sigmoid(0.3 * x + 1.0);
        let g = x.tanh();
        let o = sigmoid(0.8 * x);
        expected_c = f * expected_c + i * g;
        expected_h = o * expected_c.tanh();

        let h = outputs.as_leaf()?;
        assert_abs_diff_eq!(h[[0, 0]], expected_h, epsilon = 1e-6);

        // 状态结构为 Seq[h, c]
        match &new_states {
            NestedStructure::Seq(pair) => {
                assert_abs_diff_eq!(pair[0].as_leaf()?[[0, 0]], expected_h, epsilon = 1e-6);
                assert_abs_diff_eq!(pair[1].as_leaf()?[[0, 0]], expected_c, epsilon = 1e-6);
            }
            other => panic!("期望Seq[h, c]状态，但得到{other:?}"),
        }
        states = new_states;
    }
    Ok(())
}

/// 状态结构错误时报 StructureMismatch
#[test]
fn test_lstm_rejects_wrong_state_structure() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let lstm = LstmCell::new(&graph, 1, 1, 1, None)?;

    let inputs = NestedStructure::leaf(Tensor::zeros(&[1, 1]));
    let bad_states = NestedStructure::leaf(Tensor::zeros(&[1, 1]));
    assert!(matches!(
        lstm.call(&inputs, &bad_states),
        Err(GraphError::StructureMismatch { .. })
    ));
    Ok(())
}

/// state_shape 模板与 get_initial_states 的结构一致
#[test]
fn test_lstm_initial_states_structure() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let lstm = LstmCell::new(&graph, 2, 3, 4, None)?;

    let batch_ref = NestedStructure::leaf(Tensor::zeros(&[4, 2]));
    let states = lstm.get_initial_states(&batch_ref, None, 0.0, 0)?;

    match &states {
        NestedStructure::Seq(pair) => {
            assert_eq!(pair.len(), 2);
            assert_eq!(pair[0].as_leaf()?.shape(), &[4, 3]);
            assert_eq!(pair[1].as_leaf()?.shape(), &[4, 3]);
        }
        other => panic!("期望Seq[h, c]状态，但得到{other:?}"),
    }
    Ok(())
}
